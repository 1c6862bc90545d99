use crate::bits::BitSource;
use crate::error::{HevcError, Result};
use crate::utils::clip3;

use super::MAX_DPB_SIZE;

/// Most pictures a set can reference, leaving one DPB slot for the current picture
pub const MAX_DELTA_POCS: usize = MAX_DPB_SIZE - 1;

const MAX_DELTA_POC_MINUS1: u32 = (1 << 15) - 1;

/// One `st_ref_pic_set()`.
///
/// `delta_poc` holds the negative partition first, closest picture first,
/// followed by the positive partition in increasing order.
#[derive(Default, Debug, PartialEq, Clone, Eq)]
pub struct ShortTermRPS {
    pub inter_ref_pic_set_prediction_flag: bool,
    pub delta_idx: usize,
    pub delta_rps: i32,
    /// `ref_idc` per entry of the referenced set plus one, inter predicted sets only
    pub ref_idc: Vec<u8>,

    pub num_negative_pics: usize,
    pub num_positive_pics: usize,
    pub delta_poc: Vec<i32>,
    pub used_by_curr_pic: Vec<bool>,
}

impl ShortTermRPS {
    /// Parses set `st_rps_idx`, predicting from `ref_sets` when signalled.
    ///
    /// `ref_sets` holds the sets already parsed from the SPS. In a slice header
    /// `st_rps_idx` equals `num_short_term_ref_pic_sets`.
    pub fn parse(
        bs: &mut impl BitSource,
        ref_sets: &[ShortTermRPS],
        num_short_term_ref_pic_sets: usize,
        st_rps_idx: usize,
    ) -> Result<ShortTermRPS> {
        let inter_ref_pic_set_prediction_flag = if st_rps_idx > 0 {
            bs.read_flag()?
        } else {
            false
        };

        if inter_ref_pic_set_prediction_flag {
            Self::parse_predicted(bs, ref_sets, num_short_term_ref_pic_sets, st_rps_idx)
        } else {
            Self::parse_explicit(bs)
        }
    }

    fn parse_explicit(bs: &mut impl BitSource) -> Result<ShortTermRPS> {
        let num_negative_pics = clip3(0, MAX_DELTA_POCS, bs.read_uev()? as usize);
        let num_positive_pics = clip3(
            0,
            MAX_DELTA_POCS - num_negative_pics,
            bs.read_uev()? as usize,
        );

        let mut rps = ShortTermRPS {
            num_negative_pics,
            num_positive_pics,
            ..Default::default()
        };

        let mut prev_poc = 0;
        for _ in 0..num_negative_pics {
            let delta_poc_s0_minus1 = clip3(0, MAX_DELTA_POC_MINUS1, bs.read_uev()?) as i32;
            prev_poc -= delta_poc_s0_minus1 + 1;

            rps.delta_poc.push(prev_poc);
            rps.used_by_curr_pic.push(bs.read_flag()?);
        }

        prev_poc = 0;
        for _ in 0..num_positive_pics {
            let delta_poc_s1_minus1 = clip3(0, MAX_DELTA_POC_MINUS1, bs.read_uev()?) as i32;
            prev_poc += delta_poc_s1_minus1 + 1;

            rps.delta_poc.push(prev_poc);
            rps.used_by_curr_pic.push(bs.read_flag()?);
        }

        Ok(rps)
    }

    fn parse_predicted(
        bs: &mut impl BitSource,
        ref_sets: &[ShortTermRPS],
        num_short_term_ref_pic_sets: usize,
        st_rps_idx: usize,
    ) -> Result<ShortTermRPS> {
        let delta_idx = if st_rps_idx == num_short_term_ref_pic_sets {
            (bs.read_uev()? as usize).saturating_add(1)
        } else {
            1
        };

        let ref_rps_idx = clip3(0, st_rps_idx - 1, st_rps_idx.saturating_sub(delta_idx));
        let ref_rps = ref_sets
            .get(ref_rps_idx)
            .ok_or(HevcError::InvalidHeader("reference RPS index out of range"))?;

        let delta_rps_sign = bs.read_flag()?;
        let abs_delta_rps = clip3(0, MAX_DELTA_POC_MINUS1, bs.read_uev()?) as i32 + 1;
        let delta_rps = if delta_rps_sign {
            -abs_delta_rps
        } else {
            abs_delta_rps
        };

        let mut rps = ShortTermRPS {
            inter_ref_pic_set_prediction_flag: true,
            delta_idx,
            delta_rps,
            ..Default::default()
        };

        let mut entries = Vec::with_capacity(ref_rps.num_delta_pocs() + 1);

        for j in 0..=ref_rps.num_delta_pocs() {
            // "1" is ref_idc 1, "01" is 2 and "00" is 0
            let used_by_curr_pic_flag = bs.read_flag()?;
            let ref_idc = if used_by_curr_pic_flag {
                1
            } else if bs.read_flag()? {
                2
            } else {
                0
            };
            rps.ref_idc.push(ref_idc);

            if ref_idc != 0 {
                let ref_delta = ref_rps.delta_poc.get(j).copied().unwrap_or(0);
                entries.push((delta_rps + ref_delta, used_by_curr_pic_flag));
            }
        }

        // Stable, equal deltas keep their coded order
        entries.sort_by_key(|&(delta_poc, _)| delta_poc);

        let split = entries.partition_point(|&(delta_poc, _)| delta_poc < 0);
        let (negative, positive) = entries.split_at(split);

        rps.num_negative_pics = negative.len().min(MAX_DELTA_POCS);
        rps.num_positive_pics = positive
            .len()
            .min(MAX_DELTA_POCS - rps.num_negative_pics);

        for &(delta_poc, used) in negative.iter().rev().take(rps.num_negative_pics) {
            rps.delta_poc.push(delta_poc);
            rps.used_by_curr_pic.push(used);
        }
        for &(delta_poc, used) in positive.iter().take(rps.num_positive_pics) {
            rps.delta_poc.push(delta_poc);
            rps.used_by_curr_pic.push(used);
        }

        Ok(rps)
    }

    pub fn num_delta_pocs(&self) -> usize {
        self.num_negative_pics + self.num_positive_pics
    }

    pub fn negative(&self) -> impl Iterator<Item = (i32, bool)> + '_ {
        self.entries().take(self.num_negative_pics)
    }

    pub fn positive(&self) -> impl Iterator<Item = (i32, bool)> + '_ {
        self.entries().skip(self.num_negative_pics)
    }

    /// Pictures referenced by the current picture, `NumPicTotalCurr` contribution
    pub fn num_used_by_curr_pic(&self) -> usize {
        self.used_by_curr_pic.iter().filter(|&&used| used).count()
    }

    fn entries(&self) -> impl Iterator<Item = (i32, bool)> + '_ {
        self.delta_poc
            .iter()
            .copied()
            .zip(self.used_by_curr_pic.iter().copied())
    }
}
