//! HEVC (H.265) parameter set and slice segment header parsing.
//!
//! NAL units are expected without start codes and with emulation
//! prevention bytes already removed.

use log::{debug, warn};

pub mod bits;
pub mod config;
pub mod error;
pub mod hevc;
pub mod utils;

pub use bits::{BitReader, BitSource};
pub use config::ParserConfig;
pub use error::{HevcError, Result};

use hevc::context::{ParamSetTable, PpsId, SpsId, VpsId};
use hevc::poc::PocTracker;
use hevc::pps::PPSNAL;
use hevc::slice::SliceNAL;
use hevc::sps::SPSNAL;
use hevc::vps::VPSNAL;
use hevc::{NAL_PPS, NAL_SPS, NAL_VPS, NalHeader};

const NAL_HEADER_LEN: usize = 2;

/// Outcome of [`HevcParser::parse_nal`]
#[derive(Debug, PartialEq, Clone, Eq)]
pub enum ParsedNal {
    Vps(VpsId),
    Sps(SpsId),
    Pps(PpsId),
    Slice(Box<SliceNAL>),
    /// NAL unit type that carries nothing parsed here
    Other(u8),
}

/// Header parsing state for one elementary stream
#[derive(Debug, Clone, Default)]
pub struct HevcParser {
    config: ParserConfig,
    params: ParamSetTable,
    poc: PocTracker,

    first_pic_done: bool,
    reset_required: bool,

    /// Last independent slice segment, source of dependent segment fields
    prev_slice: Option<SliceNAL>,
    /// Aligned luma dimensions of the active SPS
    dimensions: Option<(u32, u32)>,
}

impl HevcParser {
    pub fn new() -> HevcParser {
        Self::default()
    }

    pub fn with_config(config: ParserConfig) -> HevcParser {
        HevcParser {
            config,
            ..Default::default()
        }
    }

    /// Parses one NAL unit, starting with its two byte header
    pub fn parse_nal(&mut self, data: &[u8]) -> Result<ParsedNal> {
        let nal = NalHeader::parse(data)?;

        if nal.nuh_layer_id > 0 {
            debug!("Skipping NAL type {} on layer {}", nal.nal_type, nal.nuh_layer_id);
            return Ok(ParsedNal::Other(nal.nal_type));
        }

        let rbsp = &data[NAL_HEADER_LEN..];

        match nal.nal_type {
            NAL_VPS => self.parse_vps(rbsp).map(ParsedNal::Vps),
            NAL_SPS => self.parse_sps(rbsp).map(ParsedNal::Sps),
            NAL_PPS => self.parse_pps(rbsp).map(ParsedNal::Pps),
            _ if nal.is_slice() => self
                .parse_slice_header(&nal, rbsp)
                .map(|slice| ParsedNal::Slice(Box::new(slice))),
            nal_type => Ok(ParsedNal::Other(nal_type)),
        }
    }

    pub fn parse_vps(&mut self, rbsp: &[u8]) -> Result<VpsId> {
        let mut bs = BitReader::new(rbsp);
        let vps = VPSNAL::parse(&mut bs)?;
        let id = vps.vps_id;

        self.params.store_vps(vps);

        Ok(id)
    }

    /// Parses and commits an SPS.
    ///
    /// After the first picture, an SPS with different dimensions is
    /// rejected and the session must be reset before continuing.
    pub fn parse_sps(&mut self, rbsp: &[u8]) -> Result<SpsId> {
        let mut bs = BitReader::new(rbsp);
        let staged = SPSNAL::parse(&mut bs, &self.params, &self.config)?;

        let (width, height) = (staged.sps().width, staged.sps().height);

        if self.first_pic_done {
            if let Some((old_width, old_height)) = self.dimensions {
                if (old_width, old_height) != (width, height) {
                    warn!("Resolution changed from {old_width}x{old_height} to {width}x{height}");
                    self.reset_required = true;

                    return Err(HevcError::ResolutionChanged {
                        old_width,
                        old_height,
                        width,
                        height,
                    });
                }
            }
        }

        self.dimensions = Some((width, height));

        Ok(self.params.commit_sps(staged))
    }

    pub fn parse_pps(&mut self, rbsp: &[u8]) -> Result<PpsId> {
        let mut bs = BitReader::new(rbsp);
        let staged = PPSNAL::parse(&mut bs, &self.params)?;

        Ok(self.params.commit_pps(staged))
    }

    /// Parses a slice segment header and derives its picture order count
    pub fn parse_slice_header(&mut self, nal: &NalHeader, rbsp: &[u8]) -> Result<SliceNAL> {
        let mut bs = BitReader::new(rbsp);
        let mut slice = SliceNAL::parse(&mut bs, nal, &self.params, self.prev_slice.as_ref())?;

        if !slice.dependent_slice_segment_flag {
            let same_picture = !slice.first_slice_segment_in_pic_flag
                && self
                    .prev_slice
                    .as_ref()
                    .is_some_and(|prev| prev.pps_id == slice.pps_id);

            slice.poc = match &self.prev_slice {
                Some(prev) if same_picture => prev.poc,
                _ => {
                    let log2_max_poc_lsb = self
                        .params
                        .pps(slice.pps_id)
                        .and_then(|pps| self.params.sps(pps.sps_id))
                        .map(|sps| sps.log2_max_poc_lsb)
                        .ok_or(HevcError::InvalidHeader("slice references an unknown SPS"))?;

                    self.poc.calculate(
                        nal,
                        log2_max_poc_lsb,
                        slice.slice_pic_order_cnt_lsb as i32,
                        self.first_pic_done,
                    )
                }
            };

            self.prev_slice = Some(slice.clone());
        }

        self.first_pic_done = true;

        debug!(
            "Slice {:?} at CTB {}: PPS {}, POC {}",
            slice.slice_type, slice.slice_segment_address, slice.pps_id, slice.poc
        );

        Ok(slice)
    }

    pub fn params(&self) -> &ParamSetTable {
        &self.params
    }

    pub fn poc(&self) -> &PocTracker {
        &self.poc
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn first_pic_done(&self) -> bool {
        self.first_pic_done
    }

    /// Set after a rejected resolution change
    pub fn reset_required(&self) -> bool {
        self.reset_required
    }

    /// Aligned luma dimensions of the last accepted SPS
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    /// Drops all parameter sets and picture state, keeping the config
    pub fn reset(&mut self) {
        *self = Self::with_config(self.config);
    }
}
