use crate::bits::BitSource;
use crate::error::{HevcError, Result};
use crate::utils::{ceil_log2, clip3};

use super::context::{ParamSetTable, PpsId};
use super::pps::PPSNAL;
use super::pred_weight_table::PredWeightTable;
use super::short_term_rps::{MAX_DELTA_POCS, ShortTermRPS};
use super::sps::SPSNAL;
use super::NalHeader;

const MAX_NUM_REF_IDX_ACTIVE: u32 = 15;
const MAX_SLICE_HEADER_EXTENSION_LENGTH: u32 = 256;
const MAX_QP: i32 = 51;

#[derive(Default, Debug, PartialEq, Clone, Copy, Eq)]
pub enum SliceType {
    B,
    P,
    #[default]
    I,
}

impl SliceType {
    pub fn from_u32(slice_type: u32) -> Option<Self> {
        match slice_type {
            0 => Some(Self::B),
            1 => Some(Self::P),
            2 => Some(Self::I),
            _ => None,
        }
    }

    pub fn is_inter(self) -> bool {
        self != Self::I
    }
}

/// Long-term reference picture signalled in the slice header
#[derive(Default, Debug, PartialEq, Clone, Copy, Eq)]
pub struct LongTermPic {
    /// Index into the SPS candidates, for the first `num_long_term_sps` entries
    pub lt_idx_sps: Option<u32>,
    pub poc_lsb_lt: u32,
    pub used_by_curr_pic_lt_flag: bool,
    pub delta_poc_msb_present_flag: bool,
    pub delta_poc_msb_cycle_lt: u32,
}

#[derive(Default, Debug, PartialEq, Clone, Eq)]
pub struct SliceNAL {
    pub first_slice_segment_in_pic_flag: bool,
    pub no_output_of_prior_pics_flag: bool,
    pub pps_id: PpsId,
    pub dependent_slice_segment_flag: bool,
    pub slice_segment_address: u32,

    pub slice_type: SliceType,
    pub pic_output_flag: bool,
    pub slice_pic_order_cnt_lsb: u32,
    /// `PicOrderCntVal`, filled in by the POC tracker of the session
    pub poc: i32,

    pub short_term_ref_pic_set_sps_flag: bool,
    pub short_term_ref_pic_set_idx: usize,
    /// Active set, copied from the SPS or coded inline
    pub short_term_ref_pic_set: ShortTermRPS,

    pub num_long_term_sps: u32,
    pub num_long_term_pics: u32,
    pub long_term_pics: Vec<LongTermPic>,

    pub slice_temporal_mvp_enabled_flag: bool,
    pub slice_sao_luma_flag: bool,
    pub slice_sao_chroma_flag: bool,

    pub num_ref_idx_active_override_flag: bool,
    pub num_ref_idx_l0_active: u8,
    pub num_ref_idx_l1_active: u8,
    pub num_pic_total_curr: u32,

    pub ref_pic_list_modification_flag_l0: bool,
    pub list_entry_l0: Vec<u32>,
    pub ref_pic_list_modification_flag_l1: bool,
    pub list_entry_l1: Vec<u32>,

    pub mvd_l1_zero_flag: bool,
    pub cabac_init_flag: bool,
    pub collocated_from_l0_flag: bool,
    pub collocated_ref_idx: u8,

    pub pred_weight_table: Option<PredWeightTable>,
    pub max_num_merge_cand: u8,

    pub slice_qp_delta: i32,
    pub slice_qp: i32,
    pub slice_cb_qp_offset: i32,
    pub slice_cr_qp_offset: i32,

    pub deblocking_filter_override_flag: bool,
    pub slice_deblocking_filter_disabled_flag: bool,
    pub beta_offset_div2: i32,
    pub tc_offset_div2: i32,
    pub slice_loop_filter_across_slices_enabled_flag: bool,

    pub offset_len: u8,
    pub entry_point_offsets: Vec<u32>,
    pub slice_segment_header_extension_length: u32,

    /// Byte offset of `slice_segment_data()` in the RBSP
    pub slice_data_offset: usize,
}

impl SliceNAL {
    /// Parses `slice_segment_header()`.
    ///
    /// `prev` is the last independent slice segment of the current picture,
    /// dependent segments inherit its fields.
    pub fn parse(
        bs: &mut impl BitSource,
        nal: &NalHeader,
        table: &ParamSetTable,
        prev: Option<&SliceNAL>,
    ) -> Result<SliceNAL> {
        let first_slice_segment_in_pic_flag = bs.read_flag()?;
        let no_output_of_prior_pics_flag = if nal.is_irap() {
            bs.read_flag()?
        } else {
            false
        };

        let pps_id = PpsId::new(bs.read_uev()?)
            .ok_or(HevcError::InvalidHeader("slice_pic_parameter_set_id out of range"))?;
        let pps = table
            .pps(pps_id)
            .ok_or(HevcError::InvalidHeader("slice references an unknown PPS"))?;
        let sps = table
            .sps(pps.sps_id)
            .ok_or(HevcError::InvalidHeader("slice references an unknown SPS"))?;

        let mut dependent_slice_segment_flag = false;
        let mut slice_segment_address = 0;

        if !first_slice_segment_in_pic_flag {
            if pps.dependent_slice_segments_enabled_flag {
                dependent_slice_segment_flag = bs.read_flag()?;
            }

            slice_segment_address = bs.read_bits(ceil_log2(sps.pic_size_in_ctb))?;
            if slice_segment_address >= sps.pic_size_in_ctb {
                return Err(HevcError::InvalidHeader("slice_segment_address out of range"));
            }
        }

        let mut slice = if dependent_slice_segment_flag {
            let prev = prev.ok_or(HevcError::InvalidHeader(
                "dependent slice segment without an independent one",
            ))?;

            if prev.pps_id != pps_id {
                return Err(HevcError::InvalidHeader("dependent slice segment changes PPS"));
            }

            SliceNAL {
                offset_len: 0,
                entry_point_offsets: Vec::new(),
                slice_segment_header_extension_length: 0,
                ..prev.clone()
            }
        } else {
            SliceNAL {
                pps_id,
                ..Default::default()
            }
        };

        slice.first_slice_segment_in_pic_flag = first_slice_segment_in_pic_flag;
        slice.no_output_of_prior_pics_flag = no_output_of_prior_pics_flag;
        slice.dependent_slice_segment_flag = dependent_slice_segment_flag;
        slice.slice_segment_address = slice_segment_address;

        if !dependent_slice_segment_flag {
            slice.parse_independent_fields(bs, nal, sps, pps)?;
        }

        slice.parse_entry_points(bs, sps, pps)?;

        if pps.slice_header_extension_present_flag {
            let length = bs.read_uev()?;
            if length > MAX_SLICE_HEADER_EXTENSION_LENGTH {
                return Err(HevcError::InvalidHeader("slice_segment_header_extension_length"));
            }

            slice.slice_segment_header_extension_length = length;
            bs.skip_bits(length as u64 * 8)?;
        }

        // byte_alignment()
        if !bs.read_flag()? {
            return Err(HevcError::InvalidHeader("alignment_bit_equal_to_one is zero"));
        }
        while !bs.is_byte_aligned() {
            bs.read_flag()?;
        }

        slice.slice_data_offset = (bs.position() / 8) as usize;

        Ok(slice)
    }

    fn parse_independent_fields(
        &mut self,
        bs: &mut impl BitSource,
        nal: &NalHeader,
        sps: &SPSNAL,
        pps: &PPSNAL,
    ) -> Result<()> {
        // slice_reserved_flag
        bs.skip_bits(pps.num_extra_slice_header_bits as u64)?;

        self.slice_type = SliceType::from_u32(bs.read_uev()?)
            .ok_or(HevcError::InvalidHeader("slice_type out of range"))?;

        self.pic_output_flag = if pps.output_flag_present_flag {
            bs.read_flag()?
        } else {
            true
        };

        if !nal.is_idr() {
            self.slice_pic_order_cnt_lsb = bs.read_bits(sps.log2_max_poc_lsb as u32)?;
            self.parse_ref_pic_sets(bs, sps)?;

            if sps.sps_temporal_mvp_enabled_flag {
                self.slice_temporal_mvp_enabled_flag = bs.read_flag()?;
            }
        }

        if sps.sao_enabled_flag {
            self.slice_sao_luma_flag = bs.read_flag()?;
            if sps.chroma_format_idc != 0 {
                self.slice_sao_chroma_flag = bs.read_flag()?;
            }
        }

        if self.slice_type.is_inter() {
            self.parse_ref_lists(bs, sps, pps)?;
        }

        let slice_qp_delta = bs.read_sev()?;
        let slice_qp = pps.init_qp as i64 + slice_qp_delta as i64;
        if !(0..=MAX_QP as i64).contains(&slice_qp) {
            return Err(HevcError::InvalidHeader("SliceQpY out of range"));
        }
        self.slice_qp_delta = slice_qp_delta;
        self.slice_qp = slice_qp as i32;

        if pps.pic_slice_level_chroma_qp_offsets_present_flag {
            self.slice_cb_qp_offset = clip3(-12, 12, bs.read_sev()?);
            self.slice_cr_qp_offset = clip3(-12, 12, bs.read_sev()?);
        }

        if pps.deblocking_filter_override_enabled_flag {
            self.deblocking_filter_override_flag = bs.read_flag()?;
        }

        if self.deblocking_filter_override_flag {
            self.slice_deblocking_filter_disabled_flag = bs.read_flag()?;

            if !self.slice_deblocking_filter_disabled_flag {
                self.beta_offset_div2 = clip3(-6, 6, bs.read_sev()?);
                self.tc_offset_div2 = clip3(-6, 6, bs.read_sev()?);
            }
        } else {
            self.slice_deblocking_filter_disabled_flag = pps.pic_disable_deblocking_filter_flag;
            self.beta_offset_div2 = pps.beta_offset_div2;
            self.tc_offset_div2 = pps.tc_offset_div2;
        }

        self.slice_loop_filter_across_slices_enabled_flag =
            pps.loop_filter_across_slices_enabled_flag;

        if pps.loop_filter_across_slices_enabled_flag
            && (self.slice_sao_luma_flag
                || self.slice_sao_chroma_flag
                || !self.slice_deblocking_filter_disabled_flag)
        {
            self.slice_loop_filter_across_slices_enabled_flag = bs.read_flag()?;
        }

        Ok(())
    }

    fn parse_ref_pic_sets(&mut self, bs: &mut impl BitSource, sps: &SPSNAL) -> Result<()> {
        let num_sets = sps.num_short_term_ref_pic_sets();

        self.short_term_ref_pic_set_sps_flag = bs.read_flag()?;

        if !self.short_term_ref_pic_set_sps_flag {
            self.short_term_ref_pic_set_idx = num_sets;
            self.short_term_ref_pic_set =
                ShortTermRPS::parse(bs, &sps.short_term_ref_pic_sets, num_sets, num_sets)?;
        } else {
            if num_sets == 0 {
                return Err(HevcError::InvalidHeader("SPS has no short-term RPS to select"));
            }

            if num_sets > 1 {
                self.short_term_ref_pic_set_idx =
                    bs.read_bits(ceil_log2(num_sets as u32))? as usize;
            }

            self.short_term_ref_pic_set = sps
                .short_term_ref_pic_sets
                .get(self.short_term_ref_pic_set_idx)
                .cloned()
                .ok_or(HevcError::InvalidHeader("short_term_ref_pic_set_idx out of range"))?;
        }

        if sps.long_term_ref_pics_present_flag {
            let num_lt_sps = sps.num_long_term_ref_pics_sps() as u32;

            if num_lt_sps > 0 {
                self.num_long_term_sps = bs.read_uev()?;
                if self.num_long_term_sps > num_lt_sps {
                    return Err(HevcError::InvalidHeader("num_long_term_sps out of range"));
                }
            }

            self.num_long_term_pics = bs.read_uev()?;

            let num_long_term = self.num_long_term_sps as u64 + self.num_long_term_pics as u64;
            if num_long_term + self.short_term_ref_pic_set.num_delta_pocs() as u64
                > MAX_DELTA_POCS as u64
            {
                return Err(HevcError::InvalidHeader("too many reference pictures"));
            }

            for i in 0..num_long_term as u32 {
                let mut lt = LongTermPic::default();

                if i < self.num_long_term_sps {
                    let lt_idx_sps = if num_lt_sps > 1 {
                        bs.read_bits(ceil_log2(num_lt_sps))?
                    } else {
                        0
                    };

                    let idx = lt_idx_sps as usize;
                    lt.lt_idx_sps = Some(lt_idx_sps);
                    lt.poc_lsb_lt = *sps
                        .lt_ref_pic_poc_lsb_sps
                        .get(idx)
                        .ok_or(HevcError::InvalidHeader("lt_idx_sps out of range"))?;
                    lt.used_by_curr_pic_lt_flag = sps.used_by_curr_pic_lt_sps_flag[idx];
                } else {
                    lt.poc_lsb_lt = bs.read_bits(sps.log2_max_poc_lsb as u32)?;
                    lt.used_by_curr_pic_lt_flag = bs.read_flag()?;
                }

                lt.delta_poc_msb_present_flag = bs.read_flag()?;
                if lt.delta_poc_msb_present_flag {
                    lt.delta_poc_msb_cycle_lt = bs.read_uev()?;
                }

                self.long_term_pics.push(lt);
            }
        }

        Ok(())
    }

    fn parse_ref_lists(
        &mut self,
        bs: &mut impl BitSource,
        sps: &SPSNAL,
        pps: &PPSNAL,
    ) -> Result<()> {
        let is_b = self.slice_type == SliceType::B;

        self.num_ref_idx_active_override_flag = bs.read_flag()?;

        if self.num_ref_idx_active_override_flag {
            self.num_ref_idx_l0_active =
                clip3(0, MAX_NUM_REF_IDX_ACTIVE - 1, bs.read_uev()?) as u8 + 1;

            if is_b {
                self.num_ref_idx_l1_active =
                    clip3(0, MAX_NUM_REF_IDX_ACTIVE - 1, bs.read_uev()?) as u8 + 1;
            }
        } else {
            self.num_ref_idx_l0_active = pps.num_ref_idx_l0_default_active;

            if is_b {
                self.num_ref_idx_l1_active = pps.num_ref_idx_l1_default_active;
            }
        }

        self.num_pic_total_curr = self.short_term_ref_pic_set.num_used_by_curr_pic() as u32
            + self
                .long_term_pics
                .iter()
                .filter(|lt| lt.used_by_curr_pic_lt_flag)
                .count() as u32;

        if self.num_pic_total_curr == 0 {
            return Err(HevcError::InvalidHeader("inter slice without reference pictures"));
        }

        if pps.lists_modification_present_flag && self.num_pic_total_curr > 1 {
            let entry_bits = ceil_log2(self.num_pic_total_curr);
            let max_entry = self.num_pic_total_curr - 1;

            self.ref_pic_list_modification_flag_l0 = bs.read_flag()?;
            if self.ref_pic_list_modification_flag_l0 {
                for _ in 0..self.num_ref_idx_l0_active {
                    let entry = clip3(0, max_entry, bs.read_bits(entry_bits)?);
                    self.list_entry_l0.push(entry);
                }
            }

            if is_b {
                self.ref_pic_list_modification_flag_l1 = bs.read_flag()?;
                if self.ref_pic_list_modification_flag_l1 {
                    for _ in 0..self.num_ref_idx_l1_active {
                        let entry = clip3(0, max_entry, bs.read_bits(entry_bits)?);
                        self.list_entry_l1.push(entry);
                    }
                }
            }
        }

        if is_b {
            self.mvd_l1_zero_flag = bs.read_flag()?;
        }

        if pps.cabac_init_present_flag {
            self.cabac_init_flag = bs.read_flag()?;
        }

        self.collocated_from_l0_flag = true;
        if self.slice_temporal_mvp_enabled_flag {
            if is_b {
                self.collocated_from_l0_flag = bs.read_flag()?;
            }

            let num_active = if self.collocated_from_l0_flag {
                self.num_ref_idx_l0_active
            } else {
                self.num_ref_idx_l1_active
            };

            if num_active > 1 {
                let collocated_ref_idx = bs.read_uev()?;
                if collocated_ref_idx >= num_active as u32 {
                    return Err(HevcError::InvalidHeader("collocated_ref_idx out of range"));
                }

                self.collocated_ref_idx = collocated_ref_idx as u8;
            }
        }

        if (pps.weighted_pred_flag && self.slice_type == SliceType::P)
            || (pps.weighted_bipred_flag && is_b)
        {
            self.pred_weight_table = Some(PredWeightTable::parse(
                bs,
                sps.chroma_format_idc,
                self.slice_type,
                self.num_ref_idx_l0_active as usize,
                self.num_ref_idx_l1_active as usize,
            )?);
        }

        let five_minus_max_num_merge_cand = bs.read_uev()?;
        if five_minus_max_num_merge_cand > 4 {
            return Err(HevcError::InvalidHeader("five_minus_max_num_merge_cand out of range"));
        }
        self.max_num_merge_cand = 5 - five_minus_max_num_merge_cand as u8;

        Ok(())
    }

    fn parse_entry_points(
        &mut self,
        bs: &mut impl BitSource,
        sps: &SPSNAL,
        pps: &PPSNAL,
    ) -> Result<()> {
        if !pps.tiles_enabled_flag && !pps.entropy_coding_sync_enabled_flag {
            return Ok(());
        }

        let max_entry_points = match (pps.tiles_enabled_flag, pps.entropy_coding_sync_enabled_flag)
        {
            (true, false) => pps.num_tile_columns * pps.num_tile_rows - 1,
            (false, true) => sps.pic_ht_in_ctb - 1,
            _ => pps.num_tile_columns * sps.pic_ht_in_ctb - 1,
        };

        let num_entry_point_offsets = bs.read_uev()?;
        if num_entry_point_offsets > max_entry_points {
            return Err(HevcError::InvalidHeader("num_entry_point_offsets out of range"));
        }

        if num_entry_point_offsets > 0 {
            let offset_len_minus1 = bs.read_uev()?;
            if offset_len_minus1 > 31 {
                return Err(HevcError::InvalidHeader("offset_len_minus1 out of range"));
            }

            self.offset_len = offset_len_minus1 as u8 + 1;

            for _ in 0..num_entry_point_offsets {
                let entry_point_offset_minus1 = bs.read_bits(self.offset_len as u32)?;
                self.entry_point_offsets
                    .push(entry_point_offset_minus1.saturating_add(1));
            }
        }

        Ok(())
    }

    pub fn is_intra(&self) -> bool {
        self.slice_type == SliceType::I
    }
}
