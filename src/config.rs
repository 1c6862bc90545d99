/// Decoder-wide limits the parser validates sequence geometry against
#[derive(Debug, PartialEq, Clone, Copy, Eq)]
pub struct ParserConfig {
    /// Largest picture width the output buffers were allocated for
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_width: 3840,
            max_height: 2160,
        }
    }
}

impl ParserConfig {
    pub fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
        }
    }

    /// Whether a `width` x `height` picture fits the allocated buffers.
    ///
    /// Portrait pictures are accepted as long as the area fits and
    /// the height stays within the longest configured side.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        let (w, h) = (width as u64, height as u64);
        let (max_w, max_h) = (self.max_width as u64, self.max_height as u64);

        w <= max_w && w * h <= max_w * max_h && h <= max_w.max(max_h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_limits() {
        let config = ParserConfig::new(1920, 1088);

        assert!(config.fits(1920, 1088));
        assert!(config.fits(1080, 1920));
        assert!(!config.fits(1928, 1080));
        assert!(!config.fits(1920, 1096));
        assert!(!config.fits(64, 1928));
    }
}
