use crate::bits::BitSource;
use crate::error::Result;

use super::hrd_parameters::HrdParameters;

const EXTENDED_SAR: u8 = 255;

/// `video_format` when no video signal type is coded
const VIDEO_FORMAT_UNSPECIFIED: u8 = 5;

/// Colour description value meaning "unspecified"
const COLOUR_UNSPECIFIED: u8 = 2;

#[derive(Debug, PartialEq, Clone, Eq)]
pub struct VuiParameters {
    pub sar_present: bool,
    pub sar_idc: u8,
    pub sar_num: u16,
    pub sar_den: u16,
    pub overscan_info_present_flag: bool,
    pub overscan_appropriate_flag: bool,
    pub video_signal_type_present_flag: bool,

    pub video_format: u8,
    pub video_full_range_flag: bool,
    pub colour_description_present_flag: bool,
    pub colour_primaries: u8,
    pub transfer_characteristic: u8,
    pub matrix_coeffs: u8,

    pub chroma_loc_info_present_flag: bool,
    pub chroma_sample_loc_type_top_field: u32,
    pub chroma_sample_loc_type_bottom_field: u32,
    pub neutral_chroma_indication_flag: bool,
    pub field_seq_flag: bool,
    pub frame_field_info_present_flag: bool,

    pub default_display_window_flag: bool,
    pub def_disp_win_left_offset: u32,
    pub def_disp_win_right_offset: u32,
    pub def_disp_win_top_offset: u32,
    pub def_disp_win_bottom_offset: u32,

    pub vui_timing_info_present_flag: bool,
    pub vui_num_units_in_tick: u32,
    pub vui_time_scale: u32,
    pub vui_poc_proportional_to_timing_flag: bool,
    pub vui_num_ticks_poc_diff_one_minus1: u32,
    pub vui_hrd_parameters_present_flag: bool,
    pub hrd_parameters: Option<HrdParameters>,

    pub bitstream_restriction_flag: bool,
    pub tiles_fixed_structure_flag: bool,
    pub motion_vectors_over_pic_boundaries_flag: bool,
    pub restricted_ref_pic_lists_flag: bool,

    pub min_spatial_segmentation_idc: u32,
    pub max_bytes_per_pic_denom: u32,
    pub max_bits_per_min_cu_denom: u32,
    pub log2_max_mv_length_horizontal: u32,
    pub log2_max_mv_length_vertical: u32,
}

impl Default for VuiParameters {
    fn default() -> Self {
        Self {
            sar_present: false,
            sar_idc: 0,
            sar_num: 0,
            sar_den: 0,
            overscan_info_present_flag: false,
            overscan_appropriate_flag: false,
            video_signal_type_present_flag: false,
            video_format: VIDEO_FORMAT_UNSPECIFIED,
            video_full_range_flag: false,
            colour_description_present_flag: false,
            colour_primaries: COLOUR_UNSPECIFIED,
            transfer_characteristic: COLOUR_UNSPECIFIED,
            matrix_coeffs: COLOUR_UNSPECIFIED,
            chroma_loc_info_present_flag: false,
            chroma_sample_loc_type_top_field: 0,
            chroma_sample_loc_type_bottom_field: 0,
            neutral_chroma_indication_flag: false,
            field_seq_flag: false,
            frame_field_info_present_flag: false,
            default_display_window_flag: false,
            def_disp_win_left_offset: 0,
            def_disp_win_right_offset: 0,
            def_disp_win_top_offset: 0,
            def_disp_win_bottom_offset: 0,
            vui_timing_info_present_flag: false,
            vui_num_units_in_tick: 0,
            vui_time_scale: 0,
            vui_poc_proportional_to_timing_flag: false,
            vui_num_ticks_poc_diff_one_minus1: 0,
            vui_hrd_parameters_present_flag: false,
            hrd_parameters: None,
            bitstream_restriction_flag: false,
            tiles_fixed_structure_flag: false,
            motion_vectors_over_pic_boundaries_flag: true,
            restricted_ref_pic_lists_flag: false,
            min_spatial_segmentation_idc: 0,
            max_bytes_per_pic_denom: 2,
            max_bits_per_min_cu_denom: 1,
            log2_max_mv_length_horizontal: 15,
            log2_max_mv_length_vertical: 15,
        }
    }
}

impl VuiParameters {
    pub fn parse(bs: &mut impl BitSource, max_sub_layers: u8) -> Result<VuiParameters> {
        let mut vui = VuiParameters {
            sar_present: bs.read_flag()?,
            ..Default::default()
        };

        if vui.sar_present {
            vui.sar_idc = bs.read_bits(8)? as u8;

            if vui.sar_idc == EXTENDED_SAR {
                vui.sar_num = bs.read_bits(16)? as u16;
                vui.sar_den = bs.read_bits(16)? as u16;
            }
        }

        vui.overscan_info_present_flag = bs.read_flag()?;
        if vui.overscan_info_present_flag {
            vui.overscan_appropriate_flag = bs.read_flag()?;
        }

        vui.video_signal_type_present_flag = bs.read_flag()?;
        if vui.video_signal_type_present_flag {
            vui.video_format = bs.read_bits(3)? as u8;
            vui.video_full_range_flag = bs.read_flag()?;
            vui.colour_description_present_flag = bs.read_flag()?;

            if vui.colour_description_present_flag {
                vui.colour_primaries = bs.read_bits(8)? as u8;
                vui.transfer_characteristic = bs.read_bits(8)? as u8;
                vui.matrix_coeffs = bs.read_bits(8)? as u8;
            }
        }

        vui.chroma_loc_info_present_flag = bs.read_flag()?;
        if vui.chroma_loc_info_present_flag {
            vui.chroma_sample_loc_type_top_field = bs.read_uev()?;
            vui.chroma_sample_loc_type_bottom_field = bs.read_uev()?;
        }

        vui.neutral_chroma_indication_flag = bs.read_flag()?;
        vui.field_seq_flag = bs.read_flag()?;
        vui.frame_field_info_present_flag = bs.read_flag()?;
        vui.default_display_window_flag = bs.read_flag()?;

        if vui.default_display_window_flag {
            vui.def_disp_win_left_offset = bs.read_uev()?;
            vui.def_disp_win_right_offset = bs.read_uev()?;
            vui.def_disp_win_top_offset = bs.read_uev()?;
            vui.def_disp_win_bottom_offset = bs.read_uev()?;
        }

        vui.vui_timing_info_present_flag = bs.read_flag()?;
        if vui.vui_timing_info_present_flag {
            vui.vui_num_units_in_tick = bs.read_bits(32)?;
            vui.vui_time_scale = bs.read_bits(32)?;

            vui.vui_poc_proportional_to_timing_flag = bs.read_flag()?;
            if vui.vui_poc_proportional_to_timing_flag {
                vui.vui_num_ticks_poc_diff_one_minus1 = bs.read_uev()?;
            }

            vui.vui_hrd_parameters_present_flag = bs.read_flag()?;
            if vui.vui_hrd_parameters_present_flag {
                vui.hrd_parameters = Some(HrdParameters::parse(bs, true, max_sub_layers)?);
            }
        }

        vui.bitstream_restriction_flag = bs.read_flag()?;
        if vui.bitstream_restriction_flag {
            vui.tiles_fixed_structure_flag = bs.read_flag()?;
            vui.motion_vectors_over_pic_boundaries_flag = bs.read_flag()?;
            vui.restricted_ref_pic_lists_flag = bs.read_flag()?;

            vui.min_spatial_segmentation_idc = bs.read_uev()?;
            vui.max_bytes_per_pic_denom = bs.read_uev()?;
            vui.max_bits_per_min_cu_denom = bs.read_uev()?;
            vui.log2_max_mv_length_horizontal = bs.read_uev()?;
            vui.log2_max_mv_length_vertical = bs.read_uev()?;
        }

        Ok(vui)
    }

    pub fn aspect_ratio(&self) -> Option<(u16, u16)> {
        if !self.sar_present {
            return None;
        }

        match self.sar_idc {
            1 => Some((1, 1)),
            2 => Some((12, 11)),
            3 => Some((10, 11)),
            4 => Some((16, 11)),
            5 => Some((40, 33)),
            6 => Some((24, 11)),
            7 => Some((20, 11)),
            8 => Some((32, 11)),
            9 => Some((80, 33)),
            10 => Some((18, 11)),
            11 => Some((15, 11)),
            12 => Some((64, 33)),
            13 => Some((160, 99)),
            14 => Some((4, 3)),
            15 => Some((3, 2)),
            16 => Some((2, 1)),
            EXTENDED_SAR => Some((self.sar_num, self.sar_den)),
            _ => None,
        }
    }

    /// Frame rate from the timing info, as a `(num, den)` pair
    pub fn frame_rate(&self) -> Option<(u32, u32)> {
        if !self.vui_timing_info_present_flag || self.vui_num_units_in_tick == 0 {
            return None;
        }

        Some((self.vui_time_scale, self.vui_num_units_in_tick))
    }
}
