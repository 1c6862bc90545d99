use log::warn;

use crate::bits::BitSource;
use crate::config::ParserConfig;
use crate::error::{HevcError, Result};
use crate::utils::{align8, align32, clip3};

use super::context::{ParamSetTable, SpsId, VpsId};
use super::profile_tier_level::ProfileTierLevel;
use super::scaling_list_data::ScalingListData;
use super::short_term_rps::ShortTermRPS;
use super::vps::SubLayerOrderingInfo;
use super::vui_parameters::VuiParameters;
use super::{BIT_DEPTH, MAX_SUB_LAYERS};

pub const CHROMA_FORMAT_420: u8 = 1;

pub const MAX_SHORT_TERM_REF_PIC_SETS: usize = 64;
pub const MAX_LONG_TERM_REF_PICS_SPS: u32 = 32;

/// Horizontal padding around reference pictures
const PAD_WIDTH: u32 = 160;

/// Larger than any conformant picture side
const MAX_PIC_DIMENSION: u32 = u16::MAX as u32;

#[allow(clippy::upper_case_acronyms)]
#[derive(Default, Debug, PartialEq, Clone, Eq)]
pub struct SPSNAL {
    pub vps_id: VpsId,
    pub max_sub_layers: u8,
    pub temporal_id_nesting_flag: bool,

    pub ptl: ProfileTierLevel,
    pub sps_id: SpsId,
    pub chroma_format_idc: u8,
    pub separate_colour_plane_flag: bool,
    /// Luma width, aligned to 8
    pub width: u32,
    /// Luma height, aligned to 8
    pub height: u32,

    pub pic_conformance_flag: bool,
    pub conf_win_left_offset: u32,
    pub conf_win_right_offset: u32,
    pub conf_win_top_offset: u32,
    pub conf_win_bottom_offset: u32,

    pub bit_depth: u8,
    pub bit_depth_chroma: u8,
    pub log2_max_poc_lsb: u8,
    pub sublayer_ordering_info: bool,
    pub sub_layer_ordering_info: Vec<SubLayerOrderingInfo>,

    pub log2_min_cb_size: u8,
    pub log2_diff_max_min_coding_block_size: u8,
    pub log2_min_tb_size: u8,
    pub log2_diff_max_min_transform_block_size: u8,
    pub max_transform_hierarchy_depth_inter: u8,
    pub max_transform_hierarchy_depth_intra: u8,

    pub scaling_list_enabled_flag: bool,
    pub scaling_list_data_present_flag: bool,
    /// Default lists when enabled without data, flat when disabled
    pub scaling_list_data: ScalingListData,

    pub amp_enabled_flag: bool,
    pub sao_enabled_flag: bool,
    pub pcm_enabled_flag: bool,
    pub pcm_bit_depth: u8,
    pub pcm_bit_depth_chroma: u8,
    pub pcm_log2_min_pcm_cb_size: u8,
    pub pcm_log2_max_pcm_cb_size: u8,
    pub pcm_loop_filter_disable_flag: bool,

    pub short_term_ref_pic_sets: Vec<ShortTermRPS>,

    pub long_term_ref_pics_present_flag: bool,
    pub lt_ref_pic_poc_lsb_sps: Vec<u32>,
    pub used_by_curr_pic_lt_sps_flag: Vec<bool>,

    pub sps_temporal_mvp_enabled_flag: bool,
    pub sps_strong_intra_smoothing_enable_flag: bool,

    pub vui_present: bool,
    pub vui_parameters: VuiParameters,

    pub sps_extension_flag: bool,

    // Computed values
    pub log2_ctb_size: u8,
    pub log2_max_tb_size: u8,
    pub pic_wd_in_ctb: u32,
    pub pic_ht_in_ctb: u32,
    pub pic_size_in_ctb: u32,
    pub pic_wd_in_min_cb: u32,
    pub pic_ht_in_min_cb: u32,
    pub display_width: u32,
    pub display_height: u32,
    /// Luma stride of padded reference pictures
    pub ref_stride: u32,
}

/// A fully parsed and validated SPS not yet visible in the table
#[derive(Debug, PartialEq, Clone, Eq)]
pub struct StagedSps(SPSNAL);

impl StagedSps {
    pub fn id(&self) -> SpsId {
        self.0.sps_id
    }

    pub fn sps(&self) -> &SPSNAL {
        &self.0
    }

    pub(crate) fn into_inner(self) -> SPSNAL {
        self.0
    }
}

impl SPSNAL {
    pub fn parse(
        bs: &mut impl BitSource,
        table: &ParamSetTable,
        config: &ParserConfig,
    ) -> Result<StagedSps> {
        let mut sps = SPSNAL {
            vps_id: VpsId::clamped(bs.read_bits(4)?),
            max_sub_layers: clip3(1, MAX_SUB_LAYERS, bs.read_bits(3)? as u8 + 1),
            temporal_id_nesting_flag: bs.read_flag()?,
            ..Default::default()
        };

        sps.ptl = ProfileTierLevel::parse(bs, sps.max_sub_layers)?;

        let sps_id = bs.read_uev()?;
        sps.sps_id = match SpsId::new(sps_id) {
            Some(id) => id,
            None if table.sps_done() => {
                return Err(HevcError::UnsupportedParameter("sps_seq_parameter_set_id"));
            }
            None => {
                warn!("SPS id {sps_id} out of range, using 0");
                SpsId::default()
            }
        };

        let chroma_format_idc = bs.read_uev()?;
        if chroma_format_idc != CHROMA_FORMAT_420 as u32 {
            return Err(HevcError::UnsupportedParameter("chroma_format_idc"));
        }
        sps.chroma_format_idc = CHROMA_FORMAT_420;

        sps.parse_dimensions(bs, config)?;

        sps.pic_conformance_flag = bs.read_flag()?;
        if sps.pic_conformance_flag {
            sps.conf_win_left_offset = bs.read_uev()?;
            sps.conf_win_right_offset = bs.read_uev()?;
            sps.conf_win_top_offset = bs.read_uev()?;
            sps.conf_win_bottom_offset = bs.read_uev()?;
        }

        if bs.read_uev()? != 0 || bs.read_uev()? != 0 {
            return Err(HevcError::UnsupportedParameter("bit depth other than 8"));
        }
        sps.bit_depth = BIT_DEPTH as u8;
        sps.bit_depth_chroma = BIT_DEPTH as u8;

        let log2_max_poc_lsb_minus4 = bs.read_uev()?;
        if log2_max_poc_lsb_minus4 > 12 {
            return Err(HevcError::InvalidHeader("log2_max_pic_order_cnt_lsb_minus4 out of range"));
        }
        sps.log2_max_poc_lsb = log2_max_poc_lsb_minus4 as u8 + 4;

        sps.sublayer_ordering_info = bs.read_flag()?;
        sps.sub_layer_ordering_info = SubLayerOrderingInfo::parse_list(
            bs,
            sps.max_sub_layers,
            sps.sublayer_ordering_info,
        )?;

        sps.parse_block_sizes(bs)?;

        sps.scaling_list_enabled_flag = bs.read_flag()?;
        if sps.scaling_list_enabled_flag {
            sps.scaling_list_data_present_flag = bs.read_flag()?;

            sps.scaling_list_data = if sps.scaling_list_data_present_flag {
                ScalingListData::parse(bs)?
            } else {
                ScalingListData::default_lists()
            };
        } else {
            sps.scaling_list_data = ScalingListData::flat();
        }

        sps.amp_enabled_flag = bs.read_flag()?;
        sps.sao_enabled_flag = bs.read_flag()?;
        sps.pcm_enabled_flag = bs.read_flag()?;

        if sps.pcm_enabled_flag {
            sps.parse_pcm(bs)?;
        }

        let num_short_term_ref_pic_sets =
            clip3(0, MAX_SHORT_TERM_REF_PIC_SETS, bs.read_uev()? as usize);

        for i in 0..num_short_term_ref_pic_sets {
            let rps = ShortTermRPS::parse(
                bs,
                &sps.short_term_ref_pic_sets,
                num_short_term_ref_pic_sets,
                i,
            )?;
            sps.short_term_ref_pic_sets.push(rps);
        }

        sps.long_term_ref_pics_present_flag = bs.read_flag()?;
        if sps.long_term_ref_pics_present_flag {
            let num_long_term_ref_pics_sps =
                clip3(0, MAX_LONG_TERM_REF_PICS_SPS, bs.read_uev()?);

            for _ in 0..num_long_term_ref_pics_sps {
                sps.lt_ref_pic_poc_lsb_sps
                    .push(bs.read_bits(sps.log2_max_poc_lsb as u32)?);
                sps.used_by_curr_pic_lt_sps_flag.push(bs.read_flag()?);
            }
        }

        sps.sps_temporal_mvp_enabled_flag = bs.read_flag()?;
        sps.sps_strong_intra_smoothing_enable_flag = bs.read_flag()?;

        sps.vui_present = bs.read_flag()?;
        if sps.vui_present {
            sps.vui_parameters = VuiParameters::parse(bs, sps.max_sub_layers)?;
        }

        sps.sps_extension_flag = bs.read_flag()?;

        sps.derive_geometry()?;

        Ok(StagedSps(sps))
    }

    fn parse_dimensions(&mut self, bs: &mut impl BitSource, config: &ParserConfig) -> Result<()> {
        let width = bs.read_uev()?;
        let height = bs.read_uev()?;

        if width == 0 || height == 0 {
            return Err(HevcError::InvalidHeader("zero picture dimension"));
        }

        if width > MAX_PIC_DIMENSION || height > MAX_PIC_DIMENSION {
            return Err(HevcError::UnsupportedDimensions { width, height });
        }

        // Multiples of the smallest coding block
        self.width = align8(width);
        self.height = align8(height);

        if !config.fits(self.width, self.height) {
            return Err(HevcError::UnsupportedDimensions {
                width: self.width,
                height: self.height,
            });
        }

        Ok(())
    }

    fn parse_block_sizes(&mut self, bs: &mut impl BitSource) -> Result<()> {
        let log2_min_cb_size = bs.read_uev()?.saturating_add(3);
        let log2_diff_max_min_cb_size = bs.read_uev()?;
        let log2_min_tb_size = bs.read_uev()?.saturating_add(2);
        let log2_diff_max_min_tb_size = bs.read_uev()?;

        let log2_ctb_size = log2_min_cb_size.saturating_add(log2_diff_max_min_cb_size);
        let log2_max_tb_size = log2_min_tb_size.saturating_add(log2_diff_max_min_tb_size);

        if !(4..=6).contains(&log2_ctb_size) {
            return Err(HevcError::InvalidHeader("CTB size out of range"));
        }
        if log2_max_tb_size > log2_ctb_size {
            return Err(HevcError::InvalidHeader("transform block larger than CTB"));
        }

        // Both bounded by the CTB size from here on
        self.log2_min_cb_size = log2_min_cb_size as u8;
        self.log2_diff_max_min_coding_block_size = log2_diff_max_min_cb_size as u8;
        self.log2_min_tb_size = log2_min_tb_size as u8;
        self.log2_diff_max_min_transform_block_size = log2_diff_max_min_tb_size as u8;
        self.log2_ctb_size = log2_ctb_size as u8;
        self.log2_max_tb_size = log2_max_tb_size as u8;

        let max_depth = (log2_ctb_size - log2_min_tb_size) as u8;
        self.max_transform_hierarchy_depth_inter =
            clip3(0, max_depth, bs.read_uev()?.min(255) as u8);
        self.max_transform_hierarchy_depth_intra =
            clip3(0, max_depth, bs.read_uev()?.min(255) as u8);

        Ok(())
    }

    fn parse_pcm(&mut self, bs: &mut impl BitSource) -> Result<()> {
        self.pcm_bit_depth = bs.read_bits(4)? as u8 + 1;
        self.pcm_bit_depth_chroma = bs.read_bits(4)? as u8 + 1;

        if self.pcm_bit_depth > self.bit_depth || self.pcm_bit_depth_chroma > self.bit_depth_chroma
        {
            return Err(HevcError::InvalidHeader("PCM bit depth exceeds sample bit depth"));
        }

        let log2_min_pcm_cb_size = bs.read_uev()?.saturating_add(3);
        let log2_max_pcm_cb_size = log2_min_pcm_cb_size.saturating_add(bs.read_uev()?);

        if log2_max_pcm_cb_size > (self.log2_ctb_size as u32).min(5) {
            return Err(HevcError::InvalidHeader("PCM coding block size out of range"));
        }

        self.pcm_log2_min_pcm_cb_size = log2_min_pcm_cb_size as u8;
        self.pcm_log2_max_pcm_cb_size = log2_max_pcm_cb_size as u8;
        self.pcm_loop_filter_disable_flag = bs.read_flag()?;

        Ok(())
    }

    fn derive_geometry(&mut self) -> Result<()> {
        let ctb_size = self.ctb_size();

        self.pic_wd_in_ctb = self.width.div_ceil(ctb_size);
        self.pic_ht_in_ctb = self.height.div_ceil(ctb_size);
        self.pic_size_in_ctb = self.pic_wd_in_ctb * self.pic_ht_in_ctb;

        self.pic_wd_in_min_cb = self.width >> self.log2_min_cb_size;
        self.pic_ht_in_min_cb = self.height >> self.log2_min_cb_size;

        // 4:2:0 cropping is in units of two luma samples
        let crop_x = 2 * (self.conf_win_left_offset as i64 + self.conf_win_right_offset as i64);
        let crop_y = 2 * (self.conf_win_top_offset as i64 + self.conf_win_bottom_offset as i64);

        let display_width = self.width as i64 - crop_x;
        let display_height = self.height as i64 - crop_y;

        if display_width <= 0 || display_height <= 0 {
            return Err(HevcError::InvalidHeader("conformance window crops the whole picture"));
        }

        self.display_width = display_width as u32;
        self.display_height = display_height as u32;
        self.ref_stride = align32(self.width + PAD_WIDTH);

        Ok(())
    }

    pub fn ctb_size(&self) -> u32 {
        1 << self.log2_ctb_size
    }

    pub fn max_dec_pic_buffering(&self) -> u32 {
        self.sub_layer_ordering_info
            .last()
            .map_or(1, |info| info.max_dec_pic_buffering)
    }

    pub fn num_short_term_ref_pic_sets(&self) -> usize {
        self.short_term_ref_pic_sets.len()
    }

    pub fn num_long_term_ref_pics_sps(&self) -> usize {
        self.lt_ref_pic_poc_lsb_sps.len()
    }

    /// PPS derived tile and QP geometry stays usable across both SPS
    pub fn same_ctb_grid(&self, other: &SPSNAL) -> bool {
        self.log2_ctb_size == other.log2_ctb_size
            && self.pic_wd_in_ctb == other.pic_wd_in_ctb
            && self.pic_ht_in_ctb == other.pic_ht_in_ctb
    }
}
