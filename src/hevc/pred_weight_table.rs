use crate::bits::BitSource;
use crate::error::Result;
use crate::utils::{clip_s8, clip3};

use super::BIT_DEPTH;
use super::slice::SliceType;

const MAX_LOG2_WEIGHT_DENOM: i32 = 7;

/// Half of the chroma sample range
const CHROMA_SHIFT: i32 = 1 << (BIT_DEPTH - 1);

/// Explicit weighted prediction factors for one reference picture
#[derive(Default, Debug, PartialEq, Clone, Copy, Eq)]
pub struct PredWeight {
    pub luma_weight_flag: bool,
    pub chroma_weight_flag: bool,

    pub luma_weight: i32,
    pub luma_offset: i32,
    /// Cb then Cr
    pub chroma_weight: [i32; 2],
    pub chroma_offset: [i32; 2],
}

#[derive(Default, Debug, PartialEq, Clone, Eq)]
pub struct PredWeightTable {
    pub luma_log2_weight_denom: u8,
    pub chroma_log2_weight_denom: u8,

    pub l0: Vec<PredWeight>,
    pub l1: Vec<PredWeight>,
}

impl PredWeightTable {
    pub fn parse(
        bs: &mut impl BitSource,
        chroma_format_idc: u8,
        slice_type: SliceType,
        num_ref_idx_l0_active: usize,
        num_ref_idx_l1_active: usize,
    ) -> Result<PredWeightTable> {
        let has_chroma = chroma_format_idc != 0;

        let luma_log2_weight_denom =
            clip3(0, MAX_LOG2_WEIGHT_DENOM as u32, bs.read_uev()?) as i32;

        let mut chroma_log2_weight_denom = luma_log2_weight_denom;
        if has_chroma {
            let delta_chroma_log2_weight_denom = bs.read_sev()?;
            chroma_log2_weight_denom = clip3(
                0,
                MAX_LOG2_WEIGHT_DENOM,
                luma_log2_weight_denom.saturating_add(delta_chroma_log2_weight_denom),
            );
        }

        let mut pwt = PredWeightTable {
            luma_log2_weight_denom: luma_log2_weight_denom as u8,
            chroma_log2_weight_denom: chroma_log2_weight_denom as u8,
            ..Default::default()
        };

        pwt.l0 = pwt.parse_list(bs, has_chroma, num_ref_idx_l0_active)?;

        if slice_type == SliceType::B {
            pwt.l1 = pwt.parse_list(bs, has_chroma, num_ref_idx_l1_active)?;
        }

        Ok(pwt)
    }

    fn parse_list(
        &self,
        bs: &mut impl BitSource,
        has_chroma: bool,
        num_ref_idx_active: usize,
    ) -> Result<Vec<PredWeight>> {
        let luma_denom = self.luma_log2_weight_denom as i32;
        let chroma_denom = self.chroma_log2_weight_denom as i32;

        let mut weights = vec![
            PredWeight {
                luma_weight: 1 << luma_denom,
                chroma_weight: [1 << chroma_denom; 2],
                ..Default::default()
            };
            num_ref_idx_active
        ];

        for w in weights.iter_mut() {
            w.luma_weight_flag = bs.read_flag()?;
        }

        if has_chroma {
            for w in weights.iter_mut() {
                w.chroma_weight_flag = bs.read_flag()?;
            }
        }

        for w in weights.iter_mut() {
            if w.luma_weight_flag {
                let delta_luma_weight = clip3(-128, 127, bs.read_sev()?);
                w.luma_weight = (1 << luma_denom) + delta_luma_weight;
                w.luma_offset = clip3(-128, 127, bs.read_sev()?);
            }

            if w.chroma_weight_flag {
                for (weight, offset) in
                    w.chroma_weight.iter_mut().zip(w.chroma_offset.iter_mut())
                {
                    let delta_chroma_weight = clip3(-128, 127, bs.read_sev()?);
                    *weight = (1 << chroma_denom) + delta_chroma_weight;

                    let delta_chroma_offset = clip3(-512, 511, bs.read_sev()?);
                    *offset = chroma_offset(delta_chroma_offset, *weight, chroma_denom);
                }
            }
        }

        Ok(weights)
    }
}

/// ChromaOffset derivation of (7-56)
pub fn chroma_offset(delta_chroma_offset: i32, chroma_weight: i32, log2_denom: i32) -> i32 {
    clip_s8(delta_chroma_offset - ((CHROMA_SHIFT * chroma_weight) >> log2_denom) + CHROMA_SHIFT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::BitReader;

    #[test]
    fn chroma_offset_derivation() {
        // Default weight cancels the half range
        assert_eq!(chroma_offset(0, 64, 6), 0);
        assert_eq!(chroma_offset(10, 64, 6), 10);

        // Half weight shifts the offset up by 64
        assert_eq!(chroma_offset(0, 32, 6), 64);

        // Saturation
        assert_eq!(chroma_offset(511, 64, 6), 127);
        assert_eq!(chroma_offset(-512, 64, 6), -128);
    }

    #[test]
    fn explicit_chroma_weights() {
        // denoms 6 and 5, no luma weight, Cb (0, 3) and Cr (-32, 0)
        let data = [0x3B, 0x66, 0x02, 0x0F];
        let mut bs = BitReader::new(&data);

        let pwt = PredWeightTable::parse(&mut bs, 1, SliceType::P, 1, 0).unwrap();
        assert_eq!((pwt.luma_log2_weight_denom, pwt.chroma_log2_weight_denom), (6, 5));

        let w = &pwt.l0[0];
        assert!(!w.luma_weight_flag && w.chroma_weight_flag);
        assert_eq!((w.luma_weight, w.luma_offset), (64, 0));
        assert_eq!(w.chroma_weight, [32, 0]);
        // Cr offset saturates at 127
        assert_eq!(w.chroma_offset, [3, 127]);
    }
}
