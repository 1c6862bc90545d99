use thiserror::Error;

pub type Result<T> = std::result::Result<T, HevcError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HevcError {
    /// Ran out of bits in the middle of a syntax element
    #[error("bitstream exhausted: needed {needed} bits, {available} available")]
    BitstreamExhausted { needed: u64, available: u64 },

    /// A required precondition of the syntax failed
    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),

    /// Well formed, but outside of what this parser supports
    #[error("unsupported parameter: {0}")]
    UnsupportedParameter(&'static str),

    /// The picture does not fit in the configured maximum resolution.
    /// The caller may grow its buffers and feed the NAL again.
    #[error("unsupported dimensions {width}x{height}")]
    UnsupportedDimensions { width: u32, height: u32 },

    /// A new SPS changed the picture size after a picture was already parsed
    #[error("resolution changed from {old_width}x{old_height} to {width}x{height}")]
    ResolutionChanged {
        old_width: u32,
        old_height: u32,
        width: u32,
        height: u32,
    },
}
