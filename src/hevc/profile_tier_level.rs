use crate::bits::BitSource;
use crate::error::Result;

/// Profile, tier and constraint flags shared by the general layer and sub-layers
#[derive(Default, Debug, PartialEq, Clone, Eq)]
pub struct ProfileInfo {
    pub profile_space: u8,
    pub tier_flag: bool,
    pub profile_idc: u8,
    pub profile_compatibility_flags: u32,
    pub progressive_source_flag: bool,
    pub interlaced_source_flag: bool,
    pub non_packed_constraint_flag: bool,
    pub frame_only_constraint_flag: bool,
}

#[derive(Default, Debug, PartialEq, Clone, Eq)]
pub struct SubLayerProfileTierLevel {
    pub profile_present_flag: bool,
    pub level_present_flag: bool,
    pub profile: Option<ProfileInfo>,
    pub level_idc: Option<u8>,
}

#[derive(Default, Debug, PartialEq, Clone, Eq)]
pub struct ProfileTierLevel {
    pub general: ProfileInfo,
    pub general_level_idc: u8,

    pub sub_layers: Vec<SubLayerProfileTierLevel>,
}

impl ProfileInfo {
    fn parse(bs: &mut impl BitSource) -> Result<ProfileInfo> {
        let profile = ProfileInfo {
            profile_space: bs.read_bits(2)? as u8,
            tier_flag: bs.read_flag()?,
            profile_idc: bs.read_bits(5)? as u8,
            profile_compatibility_flags: bs.read_bits(32)?,
            progressive_source_flag: bs.read_flag()?,
            interlaced_source_flag: bs.read_flag()?,
            non_packed_constraint_flag: bs.read_flag()?,
            frame_only_constraint_flag: bs.read_flag()?,
        };

        // Reserved constraint bits and the inbld flag
        bs.skip_bits(44)?;

        Ok(profile)
    }

    /// Compatibility flag `j`, MSB first as coded
    pub fn is_compatible_with(&self, profile_idc: u8) -> bool {
        profile_idc < 32 && (self.profile_compatibility_flags >> (31 - profile_idc)) & 1 == 1
    }
}

impl ProfileTierLevel {
    pub fn parse(bs: &mut impl BitSource, max_sub_layers: u8) -> Result<ProfileTierLevel> {
        let mut ptl = ProfileTierLevel {
            general: ProfileInfo::parse(bs)?,
            general_level_idc: bs.read_bits(8)? as u8,
            ..Default::default()
        };

        let max_sub_layers_minus1 = max_sub_layers.saturating_sub(1);

        for _ in 0..max_sub_layers_minus1 {
            ptl.sub_layers.push(SubLayerProfileTierLevel {
                profile_present_flag: bs.read_flag()?,
                level_present_flag: bs.read_flag()?,
                ..Default::default()
            });
        }

        if max_sub_layers_minus1 > 0 {
            for _ in max_sub_layers_minus1..8 {
                bs.skip_bits(2)?;
            }
        }

        for sub_layer in ptl.sub_layers.iter_mut() {
            if sub_layer.profile_present_flag {
                sub_layer.profile = Some(ProfileInfo::parse(bs)?);
            }

            if sub_layer.level_present_flag {
                sub_layer.level_idc = Some(bs.read_bits(8)? as u8);
            }
        }

        Ok(ptl)
    }
}
