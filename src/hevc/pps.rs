use log::warn;

use crate::bits::BitSource;
use crate::error::{HevcError, Result};
use crate::utils::clip3;

use super::context::{ParamSetTable, PpsId, SpsId};
use super::scaling_list_data::ScalingListData;
use super::sps::SPSNAL;

/// Position and size of a tile, in CTBs
#[derive(Default, Debug, PartialEq, Clone, Copy, Eq)]
pub struct Tile {
    pub pos_x: u32,
    pub pos_y: u32,
    pub width: u32,
    pub height: u32,
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Default, Debug, PartialEq, Clone, Eq)]
pub struct PPSNAL {
    pub pps_id: PpsId,
    pub sps_id: SpsId,
    pub dependent_slice_segments_enabled_flag: bool,
    pub output_flag_present_flag: bool,
    pub num_extra_slice_header_bits: u8,
    pub sign_data_hiding_flag: bool,
    pub cabac_init_present_flag: bool,
    pub num_ref_idx_l0_default_active: u8,
    pub num_ref_idx_l1_default_active: u8,
    pub init_qp: i32,
    pub constrained_intra_pred_flag: bool,
    pub transform_skip_enabled_flag: bool,
    pub cu_qp_delta_enabled_flag: bool,
    pub diff_cu_qp_delta_depth: u8,
    pub log2_min_cu_qp_delta_size: u8,
    pub cb_qp_offset: i32,
    pub cr_qp_offset: i32,
    pub pic_slice_level_chroma_qp_offsets_present_flag: bool,
    pub weighted_pred_flag: bool,
    pub weighted_bipred_flag: bool,
    pub transquant_bypass_enable_flag: bool,
    pub tiles_enabled_flag: bool,
    pub entropy_coding_sync_enabled_flag: bool,

    pub num_tile_columns: u32,
    pub num_tile_rows: u32,
    pub uniform_spacing_flag: bool,
    /// Row-major, `num_tile_columns * num_tile_rows` entries
    pub tiles: Vec<Tile>,

    pub loop_filter_across_tiles_enabled_flag: bool,
    pub loop_filter_across_slices_enabled_flag: bool,
    pub deblocking_filter_control_present_flag: bool,
    pub deblocking_filter_override_enabled_flag: bool,
    pub pic_disable_deblocking_filter_flag: bool,
    pub beta_offset_div2: i32,
    pub tc_offset_div2: i32,

    pub scaling_list_data_present_flag: bool,
    /// Overrides the SPS lists when present
    pub scaling_list_data: Option<ScalingListData>,

    pub lists_modification_present_flag: bool,
    pub log2_parallel_merge_level: u8,
    pub slice_header_extension_present_flag: bool,
    pub pps_extension_present_flag: bool,
}

/// A fully parsed and validated PPS not yet visible in the table
#[derive(Debug, PartialEq, Clone, Eq)]
pub struct StagedPps(PPSNAL);

impl StagedPps {
    pub fn id(&self) -> PpsId {
        self.0.pps_id
    }

    pub fn pps(&self) -> &PPSNAL {
        &self.0
    }

    pub(crate) fn into_inner(self) -> PPSNAL {
        self.0
    }
}

impl PPSNAL {
    pub fn parse(bs: &mut impl BitSource, table: &ParamSetTable) -> Result<StagedPps> {
        if !table.sps_done() {
            return Err(HevcError::InvalidHeader("PPS received before any SPS"));
        }

        let pps_id = bs.read_uev()?;
        let pps_id = match PpsId::new(pps_id) {
            Some(id) => id,
            None if table.pps_done() => {
                return Err(HevcError::UnsupportedParameter("pps_pic_parameter_set_id"));
            }
            None => {
                warn!("PPS id {pps_id} out of range, using 0");
                PpsId::default()
            }
        };

        let sps_id = SpsId::clamped(bs.read_uev()?);
        let sps = table
            .sps(sps_id)
            .ok_or(HevcError::InvalidHeader("PPS references an unknown SPS"))?;

        let mut pps = PPSNAL {
            pps_id,
            sps_id,
            ..Default::default()
        };

        pps.dependent_slice_segments_enabled_flag = bs.read_flag()?;
        pps.output_flag_present_flag = bs.read_flag()?;
        pps.num_extra_slice_header_bits = bs.read_bits(3)? as u8;
        pps.sign_data_hiding_flag = bs.read_flag()?;
        pps.cabac_init_present_flag = bs.read_flag()?;
        pps.num_ref_idx_l0_default_active = clip3(0, 14, bs.read_uev()?) as u8 + 1;
        pps.num_ref_idx_l1_default_active = clip3(0, 14, bs.read_uev()?) as u8 + 1;
        pps.init_qp = 26 + clip3(-26, 25, bs.read_sev()?);
        pps.constrained_intra_pred_flag = bs.read_flag()?;
        pps.transform_skip_enabled_flag = bs.read_flag()?;
        pps.cu_qp_delta_enabled_flag = bs.read_flag()?;

        if pps.cu_qp_delta_enabled_flag {
            let max_depth = sps.log2_diff_max_min_coding_block_size as u32;
            pps.diff_cu_qp_delta_depth = clip3(0, max_depth, bs.read_uev()?) as u8;
        }
        pps.log2_min_cu_qp_delta_size = sps.log2_ctb_size - pps.diff_cu_qp_delta_depth;

        pps.cb_qp_offset = clip3(-12, 12, bs.read_sev()?);
        pps.cr_qp_offset = clip3(-12, 12, bs.read_sev()?);

        pps.pic_slice_level_chroma_qp_offsets_present_flag = bs.read_flag()?;
        pps.weighted_pred_flag = bs.read_flag()?;
        pps.weighted_bipred_flag = bs.read_flag()?;

        pps.transquant_bypass_enable_flag = bs.read_flag()?;
        pps.tiles_enabled_flag = bs.read_flag()?;
        pps.entropy_coding_sync_enabled_flag = bs.read_flag()?;

        if pps.tiles_enabled_flag {
            pps.parse_tiles(bs, sps)?;
            pps.loop_filter_across_tiles_enabled_flag = bs.read_flag()?;
        } else {
            pps.num_tile_columns = 1;
            pps.num_tile_rows = 1;
            pps.uniform_spacing_flag = true;
            pps.tiles = vec![Tile {
                pos_x: 0,
                pos_y: 0,
                width: sps.pic_wd_in_ctb,
                height: sps.pic_ht_in_ctb,
            }];
        }

        pps.loop_filter_across_slices_enabled_flag = bs.read_flag()?;
        pps.deblocking_filter_control_present_flag = bs.read_flag()?;

        if pps.deblocking_filter_control_present_flag {
            pps.deblocking_filter_override_enabled_flag = bs.read_flag()?;
            pps.pic_disable_deblocking_filter_flag = bs.read_flag()?;

            if !pps.pic_disable_deblocking_filter_flag {
                pps.beta_offset_div2 = clip3(-6, 6, bs.read_sev()?);
                pps.tc_offset_div2 = clip3(-6, 6, bs.read_sev()?);
            }
        }

        pps.scaling_list_data_present_flag = bs.read_flag()?;
        if pps.scaling_list_data_present_flag {
            pps.scaling_list_data = Some(ScalingListData::parse(bs)?);
        }

        pps.lists_modification_present_flag = bs.read_flag()?;
        pps.log2_parallel_merge_level = clip3(
            2,
            sps.log2_ctb_size as u32,
            bs.read_uev()?.saturating_add(2),
        ) as u8;

        pps.slice_header_extension_present_flag = bs.read_flag()?;
        pps.pps_extension_present_flag = bs.read_flag()?;

        Ok(StagedPps(pps))
    }

    fn parse_tiles(&mut self, bs: &mut impl BitSource, sps: &SPSNAL) -> Result<()> {
        let num_tile_columns = bs.read_uev()?.saturating_add(1);
        let num_tile_rows = bs.read_uev()?.saturating_add(1);

        if num_tile_columns > sps.pic_wd_in_ctb || num_tile_rows > sps.pic_ht_in_ctb {
            return Err(HevcError::InvalidHeader("more tiles than CTBs"));
        }

        self.num_tile_columns = num_tile_columns;
        self.num_tile_rows = num_tile_rows;
        self.uniform_spacing_flag = bs.read_flag()?;

        let (column_widths, row_heights) = if self.uniform_spacing_flag {
            (
                uniform_spacing(sps.pic_wd_in_ctb, num_tile_columns),
                uniform_spacing(sps.pic_ht_in_ctb, num_tile_rows),
            )
        } else {
            (
                explicit_spacing(bs, sps.pic_wd_in_ctb, num_tile_columns)?,
                explicit_spacing(bs, sps.pic_ht_in_ctb, num_tile_rows)?,
            )
        };

        let column_starts = starts(&column_widths);
        let row_starts = starts(&row_heights);

        self.tiles = row_starts
            .iter()
            .zip(&row_heights)
            .flat_map(|(&pos_y, &height)| {
                column_starts
                    .iter()
                    .zip(&column_widths)
                    .map(move |(&pos_x, &width)| Tile {
                        pos_x,
                        pos_y,
                        width,
                        height,
                    })
            })
            .collect();

        Ok(())
    }

    pub fn tile(&self, column: u32, row: u32) -> Option<&Tile> {
        if column >= self.num_tile_columns || row >= self.num_tile_rows {
            return None;
        }

        self.tiles
            .get((row * self.num_tile_columns + column) as usize)
    }
}

/// Tile sizes `((i + 1) * total) / count - (i * total) / count`
pub fn uniform_spacing(total: u32, count: u32) -> Vec<u32> {
    let (total, count) = (total as u64, count as u64);

    (0..count)
        .map(|i| (((i + 1) * total) / count - (i * total) / count) as u32)
        .collect()
}

/// Coded sizes for all but the last tile, which takes the remainder
fn explicit_spacing(bs: &mut impl BitSource, total: u32, count: u32) -> Result<Vec<u32>> {
    let mut sizes = Vec::with_capacity(count as usize);
    let mut start = 0_u32;

    for _ in 0..count - 1 {
        let size = bs.read_uev()?.saturating_add(1);
        start = start.saturating_add(size);

        if start > total {
            return Err(HevcError::InvalidHeader("tile sizes exceed the picture"));
        }

        sizes.push(size);
    }

    let last = total - start;
    if last == 0 {
        return Err(HevcError::InvalidHeader("empty last tile"));
    }
    sizes.push(last);

    Ok(sizes)
}

fn starts(sizes: &[u32]) -> Vec<u32> {
    sizes
        .iter()
        .scan(0, |start, &size| {
            let pos = *start;
            *start += size;
            Some(pos)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_tiles() {
        assert_eq!(uniform_spacing(10, 3), vec![3, 3, 4]);
        assert_eq!(uniform_spacing(30, 4), vec![7, 8, 7, 8]);
        assert_eq!(uniform_spacing(5, 5), vec![1; 5]);
        assert_eq!(uniform_spacing(17, 1), vec![17]);

        for (total, count) in [(1, 1), (68, 20), (34, 7), (135, 11)] {
            let sizes = uniform_spacing(total, count);
            assert_eq!(sizes.iter().sum::<u32>(), total);
            assert!(sizes.iter().all(|&s| s > 0));
        }
    }

    #[test]
    fn tile_starts() {
        assert_eq!(starts(&[3, 3, 4]), vec![0, 3, 6]);
        assert!(starts(&[]).is_empty());
    }
}
