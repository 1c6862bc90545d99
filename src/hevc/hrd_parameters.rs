use crate::bits::BitSource;
use crate::error::Result;
use crate::utils::clip3;

const MAX_CPB_CNT_MINUS1: u32 = 31;
const MAX_ELEMENTAL_DURATION_IN_TC_MINUS1: u32 = 2047;

#[derive(Debug, PartialEq, Clone, Eq)]
pub struct HrdParameters {
    pub nal_hrd_parameters_present_flag: bool,
    pub vcl_hrd_parameters_present_flag: bool,
    pub sub_pic_hrd_params_present_flag: bool,

    pub tick_divisor_minus2: u8,
    pub du_cpb_removal_delay_increment_length_minus1: u8,
    pub sub_pic_cpb_params_in_pic_timing_sei_flag: bool,
    pub dpb_output_delay_du_length_minus1: u8,

    pub bit_rate_scale: u8,
    pub cpb_size_scale: u8,
    pub cpb_size_du_scale: u8,
    pub initial_cpb_removal_delay_length_minus1: u8,
    pub au_cpb_removal_delay_length_minus1: u8,
    pub dpb_output_delay_length_minus1: u8,

    pub sub_layers: Vec<SubLayerHrd>,
}

/// Per temporal sub-layer timing, with its NAL and VCL CPB specifications
#[derive(Debug, Default, PartialEq, Clone, Eq)]
pub struct SubLayerHrd {
    pub fixed_pic_rate_general_flag: bool,
    pub fixed_pic_rate_within_cvs_flag: bool,
    pub elemental_duration_in_tc_minus1: u32,
    pub low_delay_hrd_flag: bool,
    pub cpb_cnt_minus1: u32,

    pub nal_cpb: Vec<CpbSpec>,
    pub vcl_cpb: Vec<CpbSpec>,
}

#[derive(Debug, Default, PartialEq, Clone, Eq)]
pub struct CpbSpec {
    pub bit_rate_value_minus1: u32,
    pub cpb_size_value_minus1: u32,
    pub cpb_size_du_value_minus1: u32,
    pub bit_rate_du_value_minus1: u32,
    pub cbr_flag: bool,
}

impl Default for HrdParameters {
    fn default() -> Self {
        Self {
            nal_hrd_parameters_present_flag: false,
            vcl_hrd_parameters_present_flag: false,
            sub_pic_hrd_params_present_flag: false,
            tick_divisor_minus2: 0,
            du_cpb_removal_delay_increment_length_minus1: 0,
            sub_pic_cpb_params_in_pic_timing_sei_flag: false,
            dpb_output_delay_du_length_minus1: 0,
            bit_rate_scale: 0,
            cpb_size_scale: 0,
            cpb_size_du_scale: 0,
            initial_cpb_removal_delay_length_minus1: 23,
            au_cpb_removal_delay_length_minus1: 23,
            dpb_output_delay_length_minus1: 23,
            sub_layers: Vec::new(),
        }
    }
}

impl HrdParameters {
    pub fn parse(
        bs: &mut impl BitSource,
        common_inf_present: bool,
        max_sub_layers: u8,
    ) -> Result<HrdParameters> {
        let mut hrd = HrdParameters::default();

        if common_inf_present {
            hrd.nal_hrd_parameters_present_flag = bs.read_flag()?;
            hrd.vcl_hrd_parameters_present_flag = bs.read_flag()?;

            if hrd.nal_hrd_parameters_present_flag || hrd.vcl_hrd_parameters_present_flag {
                hrd.sub_pic_hrd_params_present_flag = bs.read_flag()?;

                if hrd.sub_pic_hrd_params_present_flag {
                    hrd.tick_divisor_minus2 = bs.read_bits(8)? as u8;
                    hrd.du_cpb_removal_delay_increment_length_minus1 = bs.read_bits(5)? as u8;
                    hrd.sub_pic_cpb_params_in_pic_timing_sei_flag = bs.read_flag()?;
                    hrd.dpb_output_delay_du_length_minus1 = bs.read_bits(5)? as u8;
                }

                hrd.bit_rate_scale = bs.read_bits(4)? as u8;
                hrd.cpb_size_scale = bs.read_bits(4)? as u8;

                if hrd.sub_pic_hrd_params_present_flag {
                    hrd.cpb_size_du_scale = bs.read_bits(4)? as u8;
                }

                hrd.initial_cpb_removal_delay_length_minus1 = bs.read_bits(5)? as u8;
                hrd.au_cpb_removal_delay_length_minus1 = bs.read_bits(5)? as u8;
                hrd.dpb_output_delay_length_minus1 = bs.read_bits(5)? as u8;
            }
        }

        for _ in 0..max_sub_layers {
            let mut sub_layer = SubLayerHrd {
                fixed_pic_rate_general_flag: bs.read_flag()?,
                fixed_pic_rate_within_cvs_flag: true,
                ..Default::default()
            };

            if !sub_layer.fixed_pic_rate_general_flag {
                sub_layer.fixed_pic_rate_within_cvs_flag = bs.read_flag()?;
            }

            if sub_layer.fixed_pic_rate_within_cvs_flag {
                sub_layer.elemental_duration_in_tc_minus1 =
                    clip3(0, MAX_ELEMENTAL_DURATION_IN_TC_MINUS1, bs.read_uev()?);
            } else {
                sub_layer.low_delay_hrd_flag = bs.read_flag()?;
            }

            if !sub_layer.low_delay_hrd_flag {
                sub_layer.cpb_cnt_minus1 = clip3(0, MAX_CPB_CNT_MINUS1, bs.read_uev()?);
            }

            if hrd.nal_hrd_parameters_present_flag {
                sub_layer.nal_cpb = hrd.parse_sub_layer_cpbs(bs, sub_layer.cpb_cnt_minus1)?;
            }

            if hrd.vcl_hrd_parameters_present_flag {
                sub_layer.vcl_cpb = hrd.parse_sub_layer_cpbs(bs, sub_layer.cpb_cnt_minus1)?;
            }

            hrd.sub_layers.push(sub_layer);
        }

        Ok(hrd)
    }

    fn parse_sub_layer_cpbs(
        &self,
        bs: &mut impl BitSource,
        cpb_cnt_minus1: u32,
    ) -> Result<Vec<CpbSpec>> {
        (0..=cpb_cnt_minus1)
            .map(|_| {
                let mut cpb = CpbSpec {
                    bit_rate_value_minus1: bs.read_uev()?,
                    cpb_size_value_minus1: bs.read_uev()?,
                    ..Default::default()
                };

                if self.sub_pic_hrd_params_present_flag {
                    cpb.cpb_size_du_value_minus1 = bs.read_uev()?;
                    cpb.bit_rate_du_value_minus1 = bs.read_uev()?;
                }

                cpb.cbr_flag = bs.read_flag()?;

                Ok(cpb)
            })
            .collect()
    }
}
