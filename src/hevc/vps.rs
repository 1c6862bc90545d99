use log::warn;

use crate::bits::BitSource;
use crate::error::{HevcError, Result};
use crate::utils::clip3;

use super::MAX_DPB_SIZE;
use super::context::VpsId;
use super::hrd_parameters::HrdParameters;
use super::profile_tier_level::ProfileTierLevel;

const MAX_LAYER_SETS: u32 = 1024;

/// DPB sizing for one temporal sub-layer
#[derive(Default, Debug, PartialEq, Clone, Copy, Eq)]
pub struct SubLayerOrderingInfo {
    pub max_dec_pic_buffering: u32,
    pub max_num_reorder_pics: u32,
    pub max_latency_increase_plus1: u32,
}

impl SubLayerOrderingInfo {
    /// Parses the ordering info loop shared by the VPS and SPS.
    /// Sub-layers below the first coded one take the values of the highest.
    pub(crate) fn parse_list(
        bs: &mut impl BitSource,
        max_sub_layers: u8,
        ordering_info_present: bool,
    ) -> Result<Vec<SubLayerOrderingInfo>> {
        let count = max_sub_layers as usize;
        let start = if ordering_info_present { 0 } else { count - 1 };

        let mut infos = vec![SubLayerOrderingInfo::default(); count];

        for info in infos.iter_mut().skip(start) {
            let max_dec_pic_buffering_minus1 =
                clip3(0, MAX_DPB_SIZE as u32 - 1, bs.read_uev()?);

            info.max_dec_pic_buffering = max_dec_pic_buffering_minus1 + 1;
            info.max_num_reorder_pics = clip3(0, max_dec_pic_buffering_minus1, bs.read_uev()?);
            info.max_latency_increase_plus1 = bs.read_uev()?;
        }

        let highest = infos[count - 1];
        infos[..start].fill(highest);

        Ok(infos)
    }
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Default, Debug, PartialEq, Clone, Eq)]
pub struct VPSNAL {
    pub vps_id: VpsId,
    pub vps_max_layers: u8,
    pub vps_max_sub_layers: u8,
    pub vps_temporal_id_nesting_flag: bool,
    pub ptl: ProfileTierLevel,
    pub vps_sub_layer_ordering_info_present_flag: bool,
    pub sub_layer_ordering_info: Vec<SubLayerOrderingInfo>,

    pub vps_max_layer_id: u8,
    pub vps_num_layer_sets: u32,
    pub vps_timing_info_present_flag: bool,
    pub vps_num_units_in_tick: u32,
    pub vps_time_scale: u32,
    pub vps_poc_proportional_to_timing_flag: bool,
    pub vps_num_ticks_poc_diff_one: u32,
    pub vps_num_hrd_parameters: u32,
    pub hrd_parameters: Vec<HrdParameters>,
    pub vps_extension_flag: bool,
}

impl VPSNAL {
    pub fn parse(bs: &mut impl BitSource) -> Result<VPSNAL> {
        let vps_id = VpsId::new(bs.read_bits(4)?)
            .ok_or(HevcError::UnsupportedParameter("vps_video_parameter_set_id"))?;

        let mut vps = VPSNAL {
            vps_id,
            ..Default::default()
        };

        if bs.read_bits(2)? != 3 {
            warn!("VPS {}: vps_reserved_three_2bits mismatch", vps_id);
        }

        vps.vps_max_layers = bs.read_bits(6)? as u8 + 1;
        vps.vps_max_sub_layers = bs.read_bits(3)? as u8 + 1;
        if vps.vps_max_sub_layers > super::MAX_SUB_LAYERS {
            return Err(HevcError::InvalidHeader("vps_max_sub_layers_minus1 out of range"));
        }

        vps.vps_temporal_id_nesting_flag = bs.read_flag()?;

        if bs.read_bits(16)? != 0xFFFF {
            warn!("VPS {}: vps_reserved_0xffff_16bits mismatch", vps_id);
        }

        vps.ptl = ProfileTierLevel::parse(bs, vps.vps_max_sub_layers)?;

        vps.vps_sub_layer_ordering_info_present_flag = bs.read_flag()?;
        vps.sub_layer_ordering_info = SubLayerOrderingInfo::parse_list(
            bs,
            vps.vps_max_sub_layers,
            vps.vps_sub_layer_ordering_info_present_flag,
        )?;

        vps.vps_max_layer_id = bs.read_bits(6)? as u8;
        vps.vps_num_layer_sets = clip3(0, MAX_LAYER_SETS - 1, bs.read_uev()?) + 1;

        for _ in 1..vps.vps_num_layer_sets {
            // layer_id_included_flag[i][j]
            bs.skip_bits(vps.vps_max_layer_id as u64 + 1)?;
        }

        vps.vps_timing_info_present_flag = bs.read_flag()?;

        if vps.vps_timing_info_present_flag {
            vps.vps_num_units_in_tick = bs.read_bits(32)?;
            vps.vps_time_scale = bs.read_bits(32)?;
            vps.vps_poc_proportional_to_timing_flag = bs.read_flag()?;

            if vps.vps_poc_proportional_to_timing_flag {
                vps.vps_num_ticks_poc_diff_one = bs.read_uev()?.saturating_add(1);
            }

            vps.vps_num_hrd_parameters = clip3(0, vps.vps_num_layer_sets, bs.read_uev()?);

            for i in 0..vps.vps_num_hrd_parameters {
                bs.read_uev()?; // hrd_layer_set_idx

                let cprms_present = if i > 0 { bs.read_flag()? } else { true };

                vps.hrd_parameters.push(HrdParameters::parse(
                    bs,
                    cprms_present,
                    vps.vps_max_sub_layers,
                )?);
            }
        }

        vps.vps_extension_flag = bs.read_flag()?;

        Ok(vps)
    }

    pub fn max_dec_pic_buffering(&self) -> u32 {
        self.sub_layer_ordering_info
            .last()
            .map_or(1, |info| info.max_dec_pic_buffering)
    }
}
