use crate::error::{HevcError, Result};

pub mod context;
pub mod hrd_parameters;
pub mod poc;
pub mod pps;
pub mod pred_weight_table;
pub mod profile_tier_level;
pub mod scaling_list_data;
pub mod short_term_rps;
pub mod slice;
pub mod sps;
pub mod vps;
pub mod vui_parameters;

// https://github.com/virinext/hevcesbrowser/blob/master/hevcparser/include/Hevc.h
pub const NAL_TRAIL_N: u8 = 0;
pub const NAL_TRAIL_R: u8 = 1;
pub const NAL_TSA_N: u8 = 2;
pub const NAL_TSA_R: u8 = 3;
pub const NAL_STSA_N: u8 = 4;
pub const NAL_STSA_R: u8 = 5;
pub const NAL_RADL_N: u8 = 6;
pub const NAL_RADL_R: u8 = 7;
pub const NAL_RASL_N: u8 = 8;
pub const NAL_RASL_R: u8 = 9;
pub const NAL_RSV_VCL_R15: u8 = 15;
pub const NAL_BLA_W_LP: u8 = 16;
pub const NAL_BLA_W_RADL: u8 = 17;
pub const NAL_BLA_N_LP: u8 = 18;
pub const NAL_IDR_W_RADL: u8 = 19;
pub const NAL_IDR_N_LP: u8 = 20;
pub const NAL_CRA_NUT: u8 = 21;
pub const NAL_IRAP_VCL23: u8 = 23;
pub const NAL_VPS: u8 = 32;
pub const NAL_SPS: u8 = 33;
pub const NAL_PPS: u8 = 34;
pub const NAL_AUD: u8 = 35;
pub const NAL_EOS_NUT: u8 = 36;
pub const NAL_EOB_NUT: u8 = 37;
pub const NAL_FD_NUT: u8 = 38;
pub const NAL_SEI_PREFIX: u8 = 39;
pub const NAL_SEI_SUFFIX: u8 = 40;

/// Largest number of pictures held for reference
pub const MAX_DPB_SIZE: usize = 16;

/// Bit depth supported for luma and chroma
pub const BIT_DEPTH: u32 = 8;

pub const MAX_SUB_LAYERS: u8 = 7;

/// Two byte NAL unit header
#[derive(Default, Debug, PartialEq, Clone, Copy, Eq)]
pub struct NalHeader {
    pub nal_type: u8,
    pub nuh_layer_id: u8,
    pub temporal_id: u8,
}

impl NalHeader {
    pub fn parse(data: &[u8]) -> Result<NalHeader> {
        let (b0, b1) = match data {
            [b0, b1, ..] => (*b0, *b1),
            _ => {
                return Err(HevcError::BitstreamExhausted {
                    needed: 16,
                    available: data.len() as u64 * 8,
                });
            }
        };

        if b0 & 0x80 != 0 {
            return Err(HevcError::InvalidHeader("forbidden_zero_bit is set"));
        }

        let temporal_id_plus1 = b1 & 0x07;
        if temporal_id_plus1 == 0 {
            return Err(HevcError::InvalidHeader("nuh_temporal_id_plus1 is zero"));
        }

        Ok(NalHeader {
            nal_type: (b0 >> 1) & 0x3F,
            nuh_layer_id: ((b0 & 0x01) << 5) | (b1 >> 3),
            temporal_id: temporal_id_plus1 - 1,
        })
    }

    pub fn is_type_slice(nal_type: u8) -> bool {
        matches!(
            nal_type,
            NAL_TRAIL_R
                | NAL_TRAIL_N
                | NAL_TSA_N
                | NAL_TSA_R
                | NAL_STSA_N
                | NAL_STSA_R
                | NAL_BLA_W_LP
                | NAL_BLA_W_RADL
                | NAL_BLA_N_LP
                | NAL_IDR_W_RADL
                | NAL_IDR_N_LP
                | NAL_CRA_NUT
                | NAL_RADL_N
                | NAL_RADL_R
                | NAL_RASL_N
                | NAL_RASL_R
        )
    }

    pub fn is_slice(&self) -> bool {
        Self::is_type_slice(self.nal_type)
    }

    pub fn is_irap(&self) -> bool {
        (NAL_BLA_W_LP..=NAL_IRAP_VCL23).contains(&self.nal_type)
    }

    pub fn is_idr(&self) -> bool {
        matches!(self.nal_type, NAL_IDR_W_RADL | NAL_IDR_N_LP)
    }

    pub fn is_bla(&self) -> bool {
        matches!(self.nal_type, NAL_BLA_W_LP | NAL_BLA_W_RADL | NAL_BLA_N_LP)
    }

    /// Sub-layer reference pictures, odd types below 16 and all IRAP types
    pub fn is_reference(&self) -> bool {
        (self.nal_type <= NAL_RSV_VCL_R15 && self.nal_type % 2 != 0) || self.is_irap()
    }

    pub fn is_leading(&self) -> bool {
        (NAL_RADL_N..=NAL_RASL_R).contains(&self.nal_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nal_header() {
        // IDR_W_RADL, layer 0, tid 0
        let nal = NalHeader::parse(&[0x26, 0x01]).unwrap();
        assert_eq!(nal.nal_type, NAL_IDR_W_RADL);
        assert_eq!(nal.nuh_layer_id, 0);
        assert_eq!(nal.temporal_id, 0);
        assert!(nal.is_irap() && nal.is_idr() && nal.is_reference());

        // SPS
        let nal = NalHeader::parse(&[0x42, 0x01]).unwrap();
        assert_eq!(nal.nal_type, NAL_SPS);
        assert!(!nal.is_slice());

        // TRAIL_N, tid 2
        let nal = NalHeader::parse(&[0x00, 0x03]).unwrap();
        assert_eq!(nal.temporal_id, 2);
        assert!(!nal.is_reference());
    }

    #[test]
    fn nal_header_errors() {
        assert!(NalHeader::parse(&[0x40]).is_err());
        assert!(NalHeader::parse(&[0x80, 0x01]).is_err());
        assert!(NalHeader::parse(&[0x40, 0x00]).is_err());
    }

    #[test]
    fn leading_pictures() {
        let radl = NalHeader {
            nal_type: NAL_RADL_R,
            ..Default::default()
        };
        assert!(radl.is_leading() && radl.is_reference());

        let cra = NalHeader {
            nal_type: NAL_CRA_NUT,
            ..Default::default()
        };
        assert!(!cra.is_leading() && cra.is_irap());
    }
}
