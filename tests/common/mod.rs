#![allow(dead_code)]

use hevc_headers::hevc::{NAL_PPS, NAL_SPS, NAL_VPS};

/// MSB first bit writer for building RBSPs
#[derive(Default)]
pub struct BitWriter {
    data: Vec<u8>,
    current: u8,
    bits: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_bits(&mut self, value: u64, n: u32) -> &mut Self {
        for i in (0..n).rev() {
            self.put_flag((value >> i) & 1 == 1);
        }

        self
    }

    pub fn put_flag(&mut self, flag: bool) -> &mut Self {
        self.current = (self.current << 1) | flag as u8;
        self.bits += 1;

        if self.bits == 8 {
            self.data.push(self.current);
            self.current = 0;
            self.bits = 0;
        }

        self
    }

    pub fn put_ue(&mut self, value: u32) -> &mut Self {
        self.put_exp_golomb(value as u64)
    }

    pub fn put_se(&mut self, value: i32) -> &mut Self {
        let code = if value > 0 {
            2 * value as i64 - 1
        } else {
            -2 * value as i64
        };

        self.put_exp_golomb(code as u64)
    }

    /// `code_num` may need 33 bits, `i32::MIN` maps to 2^32
    fn put_exp_golomb(&mut self, code_num: u64) -> &mut Self {
        let code = code_num + 1;
        let len = 64 - code.leading_zeros();

        self.put_bits(0, len - 1);
        self.put_bits(code, len)
    }

    /// rbsp_trailing_bits(), also a valid byte_alignment()
    pub fn finish(&mut self) -> Vec<u8> {
        self.put_flag(true);
        while self.bits != 0 {
            self.put_flag(false);
        }

        std::mem::take(&mut self.data)
    }

    /// Bytes written so far, the last partial byte zero padded
    pub fn bytes(&self) -> Vec<u8> {
        let mut data = self.data.clone();
        if self.bits > 0 {
            data.push(self.current << (8 - self.bits));
        }

        data
    }
}

pub fn nal_header(nal_type: u8) -> [u8; 2] {
    [nal_type << 1, 1]
}

pub fn with_header(nal_type: u8, rbsp: &[u8]) -> Vec<u8> {
    let mut nal = nal_header(nal_type).to_vec();
    nal.extend_from_slice(rbsp);

    nal
}

/// Main profile, level 3.1, single sub-layer
pub fn put_profile_tier_level(w: &mut BitWriter) {
    w.put_bits(0, 2) // profile_space
        .put_flag(false) // tier
        .put_bits(1, 5) // Main
        .put_bits(0x6000_0000, 32)
        .put_flag(true) // progressive
        .put_flag(false)
        .put_flag(false)
        .put_flag(true) // frame only
        .put_bits(0, 44)
        .put_bits(93, 8);
}

pub fn vps_rbsp() -> Vec<u8> {
    let mut w = BitWriter::new();

    w.put_bits(0, 4) // vps_id
        .put_bits(3, 2)
        .put_bits(0, 6) // max_layers_minus1
        .put_bits(0, 3) // max_sub_layers_minus1
        .put_flag(true)
        .put_bits(0xFFFF, 16);

    put_profile_tier_level(&mut w);

    w.put_flag(true)
        .put_ue(4)
        .put_ue(2)
        .put_ue(0)
        .put_bits(0, 6) // max_layer_id
        .put_ue(0) // num_layer_sets_minus1
        .put_flag(true) // timing info
        .put_bits(1001, 32)
        .put_bits(60000, 32)
        .put_flag(false)
        .put_ue(0) // num_hrd_parameters
        .put_flag(false);

    w.finish()
}

pub fn vps_nal() -> Vec<u8> {
    with_header(NAL_VPS, &vps_rbsp())
}

/// Explicitly coded short-term RPS, negative deltas closest first
#[derive(Clone, Default)]
pub struct RpsSpec {
    pub negative: Vec<(i32, bool)>,
    pub positive: Vec<(i32, bool)>,
}

impl RpsSpec {
    pub fn put(&self, w: &mut BitWriter, has_inter_flag: bool) {
        if has_inter_flag {
            w.put_flag(false);
        }

        w.put_ue(self.negative.len() as u32)
            .put_ue(self.positive.len() as u32);

        let mut prev = 0;
        for &(delta_poc, used) in &self.negative {
            w.put_ue((prev - delta_poc - 1) as u32).put_flag(used);
            prev = delta_poc;
        }

        prev = 0;
        for &(delta_poc, used) in &self.positive {
            w.put_ue((delta_poc - prev - 1) as u32).put_flag(used);
            prev = delta_poc;
        }
    }
}

#[derive(Clone)]
pub struct SpsBuilder {
    pub sps_id: u32,
    pub chroma_format_idc: u32,
    pub width: u32,
    pub height: u32,
    pub conformance_window: Option<[u32; 4]>,
    pub bit_depth_luma_minus8: u32,
    pub log2_max_poc_lsb_minus4: u32,
    pub log2_min_cb_minus3: u32,
    pub log2_diff_max_min_cb: u32,
    pub log2_min_tb_minus2: u32,
    pub log2_diff_max_min_tb: u32,
    pub scaling_list_enabled: bool,
    pub sao: bool,
    pub short_term_ref_pic_sets: Vec<RpsSpec>,
    pub long_term_ref_pics: Option<Vec<(u32, bool)>>,
    pub temporal_mvp: bool,
    pub vui: bool,
}

impl Default for SpsBuilder {
    /// 256x128 with 64x64 CTBs
    fn default() -> Self {
        Self {
            sps_id: 0,
            chroma_format_idc: 1,
            width: 256,
            height: 128,
            conformance_window: None,
            bit_depth_luma_minus8: 0,
            log2_max_poc_lsb_minus4: 4,
            log2_min_cb_minus3: 0,
            log2_diff_max_min_cb: 3,
            log2_min_tb_minus2: 0,
            log2_diff_max_min_tb: 3,
            scaling_list_enabled: false,
            sao: false,
            short_term_ref_pic_sets: Vec::new(),
            long_term_ref_pics: None,
            temporal_mvp: false,
            vui: false,
        }
    }
}

/// 4:3 extended SAR, BT.2020 PQ, 60000/1001 timing with one NAL CPB
pub fn put_vui(w: &mut BitWriter) {
    w.put_flag(true)
        .put_bits(255, 8)
        .put_bits(4, 16)
        .put_bits(3, 16)
        .put_flag(false) // overscan
        .put_flag(true)
        .put_bits(5, 3)
        .put_flag(false)
        .put_flag(true)
        .put_bits(9, 8)
        .put_bits(16, 8)
        .put_bits(9, 8)
        .put_flag(false) // chroma loc
        .put_flag(false)
        .put_flag(false)
        .put_flag(false)
        .put_flag(false) // default display window
        .put_flag(true)
        .put_bits(1001, 32)
        .put_bits(60000, 32)
        .put_flag(false)
        .put_flag(true); // hrd_parameters_present

    // hrd_parameters(1, 0)
    w.put_flag(true) // nal
        .put_flag(false)
        .put_flag(false) // sub pic
        .put_bits(4, 4)
        .put_bits(6, 4)
        .put_bits(23, 5)
        .put_bits(23, 5)
        .put_bits(23, 5)
        .put_flag(true) // fixed_pic_rate_general_flag
        .put_ue(0)
        .put_ue(0) // cpb_cnt_minus1
        .put_ue(9999)
        .put_ue(19999)
        .put_flag(false);

    w.put_flag(false); // bitstream restriction
}

impl SpsBuilder {
    pub fn rbsp(&self) -> Vec<u8> {
        let mut w = BitWriter::new();

        w.put_bits(0, 4) // vps_id
            .put_bits(0, 3)
            .put_flag(true);

        put_profile_tier_level(&mut w);

        w.put_ue(self.sps_id)
            .put_ue(self.chroma_format_idc)
            .put_ue(self.width)
            .put_ue(self.height);

        match self.conformance_window {
            Some(offsets) => {
                w.put_flag(true);
                offsets.iter().for_each(|&o| {
                    w.put_ue(o);
                });
            }
            None => {
                w.put_flag(false);
            }
        }

        w.put_ue(self.bit_depth_luma_minus8)
            .put_ue(0)
            .put_ue(self.log2_max_poc_lsb_minus4)
            .put_flag(true)
            .put_ue(4)
            .put_ue(2)
            .put_ue(0)
            .put_ue(self.log2_min_cb_minus3)
            .put_ue(self.log2_diff_max_min_cb)
            .put_ue(self.log2_min_tb_minus2)
            .put_ue(self.log2_diff_max_min_tb)
            .put_ue(1)
            .put_ue(1);

        w.put_flag(self.scaling_list_enabled);
        if self.scaling_list_enabled {
            // Default lists
            w.put_flag(false);
        }

        w.put_flag(false) // amp
            .put_flag(self.sao)
            .put_flag(false); // pcm

        w.put_ue(self.short_term_ref_pic_sets.len() as u32);
        for (i, rps) in self.short_term_ref_pic_sets.iter().enumerate() {
            rps.put(&mut w, i > 0);
        }

        match &self.long_term_ref_pics {
            Some(pics) => {
                w.put_flag(true).put_ue(pics.len() as u32);
                for &(poc_lsb, used) in pics {
                    w.put_bits(poc_lsb as u64, self.log2_max_poc_lsb_minus4 + 4)
                        .put_flag(used);
                }
            }
            None => {
                w.put_flag(false);
            }
        }

        w.put_flag(self.temporal_mvp)
            .put_flag(true) // strong intra smoothing
            .put_flag(self.vui);

        if self.vui {
            put_vui(&mut w);
        }

        w.put_flag(false);

        w.finish()
    }

    pub fn nal(&self) -> Vec<u8> {
        with_header(NAL_SPS, &self.rbsp())
    }
}

#[derive(Clone)]
pub struct TileSpec {
    pub columns: u32,
    pub rows: u32,
    /// Explicit sizes minus the last, uniform spacing when `None`
    pub explicit: Option<(Vec<u32>, Vec<u32>)>,
}

#[derive(Clone)]
pub struct PpsBuilder {
    pub pps_id: u32,
    pub sps_id: u32,
    pub dependent_slice_segments_enabled: bool,
    pub output_flag_present: bool,
    pub num_extra_slice_header_bits: u32,
    pub cabac_init_present: bool,
    pub num_ref_idx_l0_default_minus1: u32,
    pub num_ref_idx_l1_default_minus1: u32,
    pub init_qp_minus26: i32,
    pub cu_qp_delta_depth: Option<u32>,
    pub slice_chroma_qp_offsets_present: bool,
    pub weighted_pred: bool,
    pub weighted_bipred: bool,
    pub tiles: Option<TileSpec>,
    pub entropy_coding_sync: bool,
    pub loop_filter_across_slices: bool,
    /// (override enabled, disable, beta_offset_div2, tc_offset_div2)
    pub deblocking: Option<(bool, bool, i32, i32)>,
    pub lists_modification_present: bool,
    pub slice_header_extension_present: bool,
}

impl Default for PpsBuilder {
    fn default() -> Self {
        Self {
            pps_id: 0,
            sps_id: 0,
            dependent_slice_segments_enabled: false,
            output_flag_present: false,
            num_extra_slice_header_bits: 0,
            cabac_init_present: false,
            num_ref_idx_l0_default_minus1: 0,
            num_ref_idx_l1_default_minus1: 0,
            init_qp_minus26: 0,
            cu_qp_delta_depth: None,
            slice_chroma_qp_offsets_present: false,
            weighted_pred: false,
            weighted_bipred: false,
            tiles: None,
            entropy_coding_sync: false,
            loop_filter_across_slices: false,
            deblocking: None,
            lists_modification_present: false,
            slice_header_extension_present: false,
        }
    }
}

impl PpsBuilder {
    pub fn rbsp(&self) -> Vec<u8> {
        let mut w = BitWriter::new();

        w.put_ue(self.pps_id)
            .put_ue(self.sps_id)
            .put_flag(self.dependent_slice_segments_enabled)
            .put_flag(self.output_flag_present)
            .put_bits(self.num_extra_slice_header_bits as u64, 3)
            .put_flag(false) // sign data hiding
            .put_flag(self.cabac_init_present)
            .put_ue(self.num_ref_idx_l0_default_minus1)
            .put_ue(self.num_ref_idx_l1_default_minus1)
            .put_se(self.init_qp_minus26)
            .put_flag(false)
            .put_flag(false);

        match self.cu_qp_delta_depth {
            Some(depth) => {
                w.put_flag(true).put_ue(depth);
            }
            None => {
                w.put_flag(false);
            }
        }

        w.put_se(0)
            .put_se(0)
            .put_flag(self.slice_chroma_qp_offsets_present)
            .put_flag(self.weighted_pred)
            .put_flag(self.weighted_bipred)
            .put_flag(false) // transquant bypass
            .put_flag(self.tiles.is_some())
            .put_flag(self.entropy_coding_sync);

        if let Some(tiles) = &self.tiles {
            w.put_ue(tiles.columns - 1)
                .put_ue(tiles.rows - 1)
                .put_flag(tiles.explicit.is_none());

            if let Some((widths, heights)) = &tiles.explicit {
                widths.iter().chain(heights).for_each(|&size| {
                    w.put_ue(size - 1);
                });
            }

            w.put_flag(true);
        }

        w.put_flag(self.loop_filter_across_slices);

        match self.deblocking {
            Some((override_enabled, disable, beta, tc)) => {
                w.put_flag(true).put_flag(override_enabled).put_flag(disable);
                if !disable {
                    w.put_se(beta).put_se(tc);
                }
            }
            None => {
                w.put_flag(false);
            }
        }

        w.put_flag(false) // scaling list
            .put_flag(self.lists_modification_present)
            .put_ue(0)
            .put_flag(self.slice_header_extension_present)
            .put_flag(false);

        w.finish()
    }

    pub fn nal(&self) -> Vec<u8> {
        with_header(NAL_PPS, &self.rbsp())
    }
}
