use crate::bits::BitSource;
use crate::error::Result;
use crate::utils::clip3;

/// Number of transform size classes, 4x4 to 32x32
pub const NUM_SIZE_IDS: usize = 4;

/// Start of every (size_id * 6 + matrix_id) matrix in the coefficient table.
/// The two 32x32 matrices live at indices 18 and 19.
const MATRIX_OFFSETS: [usize; 20] = [
    0, 16, 32, 48, 64, 80, 96, 160, 224, 288, 352, 416, 480, 736, 992, 1248, 1504, 1760, 2016,
    3040,
];

pub const SCALING_MATRIX_LEN: usize = 4064;

const FLAT_VALUE: u8 = 16;

/// Table 7-6, intra 8x8 default in up-right diagonal order
const DEFAULT_INTRA_8X8: [u8; 64] = [
    16, 16, 16, 16, 16, 16, 16, 16, 16, 16, 17, 16, 17, 16, 17, 18, 17, 18, 18, 17, 18, 21, 19, 20,
    21, 20, 19, 21, 24, 22, 22, 24, 24, 22, 22, 24, 25, 25, 27, 30, 27, 25, 25, 29, 31, 35, 35, 31,
    29, 36, 41, 44, 41, 36, 47, 54, 54, 47, 65, 70, 65, 88, 88, 115,
];

/// Table 7-6, inter 8x8 default in up-right diagonal order
const DEFAULT_INTER_8X8: [u8; 64] = [
    16, 16, 16, 16, 16, 16, 16, 16, 16, 16, 17, 17, 17, 17, 17, 18, 18, 18, 18, 18, 18, 20, 20, 20,
    20, 20, 20, 20, 24, 24, 24, 24, 24, 24, 24, 24, 25, 25, 25, 25, 25, 25, 25, 28, 28, 28, 28, 28,
    28, 33, 33, 33, 33, 33, 41, 41, 41, 41, 54, 54, 54, 71, 71, 91,
];

/// Up-right diagonal scan of a `blk` x `blk` block (6.5.3), as raster positions
const fn up_right_diagonal<const N: usize>(blk: usize) -> [u8; N] {
    let mut scan = [0_u8; N];
    let mut i = 0;
    let mut x: isize = 0;
    let mut y: isize = 0;

    while i < N {
        while y >= 0 {
            if (x as usize) < blk && (y as usize) < blk {
                scan[i] = (y as usize * blk + x as usize) as u8;
                i += 1;
            }

            y -= 1;
            x += 1;
        }

        y = x;
        x = 0;
    }

    scan
}

pub const DIAG_SCAN_4X4: [u8; 16] = up_right_diagonal::<16>(4);
pub const DIAG_SCAN_8X8: [u8; 64] = up_right_diagonal::<64>(8);

/// Dequantization scaling factors for every transform size and matrix id.
///
/// Matrices are stored in raster order at their full transform size,
/// 16x16 and 32x32 matrices are upsampled from the coded 8x8 lists.
#[derive(Debug, PartialEq, Clone, Eq)]
pub struct ScalingListData {
    pub coefficients: Vec<u8>,
}

impl Default for ScalingListData {
    fn default() -> Self {
        Self::flat()
    }
}

impl ScalingListData {
    pub fn num_matrices(size_id: usize) -> usize {
        if size_id == 3 { 2 } else { 6 }
    }

    fn num_elements(size_id: usize) -> usize {
        1 << (4 + (size_id << 1))
    }

    fn range(size_id: usize, matrix_id: usize) -> std::ops::Range<usize> {
        let start = MATRIX_OFFSETS[size_id * 6 + matrix_id];
        start..start + Self::num_elements(size_id)
    }

    /// Every coefficient at the mid value, used when scaling lists are disabled
    pub fn flat() -> Self {
        Self {
            coefficients: vec![FLAT_VALUE; SCALING_MATRIX_LEN],
        }
    }

    /// Default matrices of Table 7-5 and 7-6
    pub fn default_lists() -> Self {
        let mut scl = Self::flat();

        for size_id in 1..NUM_SIZE_IDS {
            let count = Self::num_matrices(size_id);

            for matrix_id in 0..count {
                // Intra matrices come first, 32x32 has one of each
                let list = if matrix_id < count / 2 {
                    &DEFAULT_INTRA_8X8
                } else {
                    &DEFAULT_INTER_8X8
                };

                let matrix = scl.matrix_mut(size_id, matrix_id);
                for (scan_pos, &value) in list.iter().enumerate() {
                    scatter(matrix, size_id, scan_pos, value);
                }
                if size_id > 1 {
                    matrix[0] = FLAT_VALUE;
                }
            }
        }

        scl
    }

    /// Starts from the default lists and applies the coded `scaling_list_data()`
    pub fn parse(bs: &mut impl BitSource) -> Result<ScalingListData> {
        let mut scl = Self::default_lists();
        scl.apply(bs)?;

        Ok(scl)
    }

    pub fn matrix(&self, size_id: usize, matrix_id: usize) -> &[u8] {
        &self.coefficients[Self::range(size_id, matrix_id)]
    }

    fn matrix_mut(&mut self, size_id: usize, matrix_id: usize) -> &mut [u8] {
        &mut self.coefficients[Self::range(size_id, matrix_id)]
    }

    fn apply(&mut self, bs: &mut impl BitSource) -> Result<()> {
        for size_id in 0..NUM_SIZE_IDS {
            for matrix_id in 0..Self::num_matrices(size_id) {
                let pred_mode_flag = bs.read_flag()?;

                if !pred_mode_flag {
                    let delta = clip3(0, matrix_id as u32, bs.read_uev()?) as usize;

                    if delta != 0 {
                        let src = Self::range(size_id, matrix_id - delta).start;
                        let dst = Self::range(size_id, matrix_id);
                        self.coefficients.copy_within(src..src + dst.len(), dst.start);
                    }

                    continue;
                }

                let coef_num = Self::num_elements(size_id).min(64);
                let mut next_coef = 8_i32;
                let mut dc_coef = None;

                if size_id > 1 {
                    let dc_coef_minus8 = clip3(-7, 247, bs.read_sev()?);
                    next_coef = dc_coef_minus8 + 8;
                    dc_coef = Some(next_coef as u8);
                }

                let matrix = self.matrix_mut(size_id, matrix_id);
                for scan_pos in 0..coef_num {
                    let delta_coef = clip3(-128, 127, bs.read_sev()?);
                    next_coef = (next_coef + delta_coef + 256) % 256;

                    scatter(matrix, size_id, scan_pos, next_coef as u8);
                }

                if let Some(dc) = dc_coef {
                    matrix[0] = dc;
                }
            }
        }

        Ok(())
    }
}

/// Writes the coefficient at `scan_pos` of the coded list, replicated over
/// the 2x2 or 4x4 sub-block it covers for 16x16 and 32x32 matrices
fn scatter(matrix: &mut [u8], size_id: usize, scan_pos: usize, value: u8) {
    match size_id {
        0 => matrix[DIAG_SCAN_4X4[scan_pos] as usize] = value,
        1 => matrix[DIAG_SCAN_8X8[scan_pos] as usize] = value,
        _ => {
            let ratio = if size_id == 2 { 2 } else { 4 };
            let stride = 8 * ratio;

            let pos = DIAG_SCAN_8X8[scan_pos] as usize;
            let offset = (pos >> 3) * stride * ratio + (pos & 7) * ratio;

            for row in 0..ratio {
                let start = offset + row * stride;
                matrix[start..start + ratio].fill(value);
            }
        }
    }
}
