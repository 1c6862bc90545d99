use super::{NAL_CRA_NUT, NalHeader};

/// Picture order count state carried from one picture to the next
#[derive(Default, Debug, PartialEq, Clone, Copy, Eq)]
pub struct PocTracker {
    prev_poc_lsb: i32,
    prev_poc_msb: i32,
}

impl PocTracker {
    pub fn new(prev_poc_lsb: i32, prev_poc_msb: i32) -> Self {
        Self {
            prev_poc_lsb,
            prev_poc_msb,
        }
    }

    pub fn prev_poc_lsb(&self) -> i32 {
        self.prev_poc_lsb
    }

    pub fn prev_poc_msb(&self) -> i32 {
        self.prev_poc_msb
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Derives `PicOrderCntVal` for the picture carried by `nal`.
    ///
    /// Until the first picture has been decoded the MSB starts two ranges
    /// below zero so the first IRAP lands on MSB 0. Later IDR and BLA pictures
    /// keep increasing the MSB so output order stays monotonic across them.
    pub fn calculate(
        &mut self,
        nal: &NalHeader,
        log2_max_poc_lsb: u8,
        poc_lsb: i32,
        first_pic_done: bool,
    ) -> i32 {
        let max_poc_lsb = 1_i32 << log2_max_poc_lsb;

        if !first_pic_done {
            self.prev_poc_msb = -2 * max_poc_lsb;
        }

        let poc_msb = if nal.is_idr()
            || nal.is_bla()
            || (nal.nal_type == NAL_CRA_NUT && !first_pic_done)
        {
            self.prev_poc_lsb = 0;
            self.prev_poc_msb.wrapping_add(2 * max_poc_lsb)
        } else if poc_lsb < self.prev_poc_lsb
            && self.prev_poc_lsb - poc_lsb >= max_poc_lsb / 2
        {
            self.prev_poc_msb.wrapping_add(max_poc_lsb)
        } else if poc_lsb > self.prev_poc_lsb
            && poc_lsb - self.prev_poc_lsb > max_poc_lsb / 2
        {
            self.prev_poc_msb.wrapping_sub(max_poc_lsb)
        } else {
            self.prev_poc_msb
        };

        let update_prev = nal.temporal_id == 0 && nal.is_reference() && !nal.is_leading();
        if update_prev {
            self.prev_poc_lsb = poc_lsb;
            self.prev_poc_msb = poc_msb;
        }

        poc_msb.wrapping_add(poc_lsb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hevc::{NAL_IDR_W_RADL, NAL_RASL_R, NAL_TRAIL_N, NAL_TRAIL_R};

    fn nal(nal_type: u8, temporal_id: u8) -> NalHeader {
        NalHeader {
            nal_type,
            nuh_layer_id: 0,
            temporal_id,
        }
    }

    #[test]
    fn wraps_forward() {
        let mut poc = PocTracker::new(15, 0);

        assert_eq!(poc.calculate(&nal(NAL_TRAIL_R, 0), 4, 1, true), 17);
        assert_eq!(poc.prev_poc_msb(), 16);
        assert_eq!(poc.prev_poc_lsb(), 1);
    }

    #[test]
    fn wraps_backward() {
        let mut poc = PocTracker::new(1, 16);

        // 14 - 1 > 8, picture precedes the wrap
        assert_eq!(poc.calculate(&nal(NAL_TRAIL_N, 0), 4, 14, true), 14);
        // Non reference picture leaves the state alone
        assert_eq!(poc.prev_poc_msb(), 16);
    }

    #[test]
    fn jump_past_half_range_goes_back() {
        let mut poc = PocTracker::new(0, 0);

        // 15 - 0 > 8, read as the picture before lsb 0 of the same range
        assert_eq!(poc.calculate(&nal(NAL_TRAIL_R, 0), 4, 15, true), -1);
        assert_eq!(poc.prev_poc_msb(), -16);

        // Exactly half the range stays in the current MSB
        let mut poc = PocTracker::new(0, 0);
        assert_eq!(poc.calculate(&nal(NAL_TRAIL_R, 0), 4, 8, true), 8);
    }

    #[test]
    fn idr_then_trailing() {
        let mut poc = PocTracker::default();

        assert_eq!(poc.calculate(&nal(NAL_IDR_W_RADL, 0), 4, 0, false), 0);
        assert_eq!(poc.calculate(&nal(NAL_TRAIL_R, 0), 4, 7, true), 7);
        assert_eq!(poc.calculate(&nal(NAL_TRAIL_R, 0), 4, 14, true), 14);
        assert_eq!(poc.calculate(&nal(NAL_TRAIL_R, 0), 4, 1, true), 17);

        // A second IDR keeps counting up
        assert_eq!(poc.calculate(&nal(NAL_IDR_W_RADL, 0), 4, 0, true), 48);
    }

    #[test]
    fn state_updates() {
        let mut poc = PocTracker::new(4, 0);

        // Higher temporal layer
        poc.calculate(&nal(NAL_TRAIL_R, 1), 4, 5, true);
        assert_eq!(poc.prev_poc_lsb(), 4);

        // Leading picture
        poc.calculate(&nal(NAL_RASL_R, 0), 4, 2, true);
        assert_eq!(poc.prev_poc_lsb(), 4);

        poc.calculate(&nal(NAL_TRAIL_R, 0), 4, 6, true);
        assert_eq!(poc.prev_poc_lsb(), 6);
    }
}
