use std::fmt;

use log::{debug, warn};

use super::pps::{PPSNAL, StagedPps};
use super::sps::{SPSNAL, StagedSps};
use super::vps::VPSNAL;

pub const MAX_VPS_COUNT: usize = 16;
pub const MAX_SPS_COUNT: usize = 16;
pub const MAX_PPS_COUNT: usize = 64;

macro_rules! param_set_id {
    ($(#[$meta:meta])* $name:ident, $count:expr) => {
        $(#[$meta])*
        #[derive(Default, Debug, PartialEq, Clone, Copy, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u8);

        impl $name {
            pub const COUNT: usize = $count;

            /// `None` when `id` does not fit in the table
            pub fn new(id: u32) -> Option<Self> {
                (id < $count as u32).then_some(Self(id as u8))
            }

            pub fn clamped(id: u32) -> Self {
                Self(id.min($count as u32 - 1) as u8)
            }

            pub fn index(self) -> usize {
                self.0 as usize
            }

            pub fn value(self) -> u8 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

param_set_id!(
    /// `vps_video_parameter_set_id`, 0 to 15
    VpsId,
    MAX_VPS_COUNT
);
param_set_id!(
    /// `sps_seq_parameter_set_id`, 0 to 15
    SpsId,
    MAX_SPS_COUNT
);
param_set_id!(
    /// `pps_pic_parameter_set_id`, 0 to 63
    PpsId,
    MAX_PPS_COUNT
);

#[derive(Default, Debug, Clone)]
struct Slot<T> {
    record: T,
    valid: bool,
}

/// Parameter sets received so far, indexed by id.
///
/// A slot only becomes valid through a successful commit,
/// records that failed to parse never reach the table.
#[derive(Debug, Clone)]
pub struct ParamSetTable {
    vps: Vec<Slot<VPSNAL>>,
    sps: Vec<Slot<SPSNAL>>,
    pps: Vec<Slot<PPSNAL>>,

    sps_done: bool,
    pps_done: bool,
}

impl Default for ParamSetTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamSetTable {
    pub fn new() -> Self {
        Self {
            vps: vec![Slot::default(); MAX_VPS_COUNT],
            sps: vec![Slot::default(); MAX_SPS_COUNT],
            pps: vec![Slot::default(); MAX_PPS_COUNT],
            sps_done: false,
            pps_done: false,
        }
    }

    pub fn vps(&self, id: VpsId) -> Option<&VPSNAL> {
        let slot = &self.vps[id.index()];
        slot.valid.then_some(&slot.record)
    }

    pub fn sps(&self, id: SpsId) -> Option<&SPSNAL> {
        let slot = &self.sps[id.index()];
        slot.valid.then_some(&slot.record)
    }

    pub fn pps(&self, id: PpsId) -> Option<&PPSNAL> {
        let slot = &self.pps[id.index()];
        slot.valid.then_some(&slot.record)
    }

    /// Whether any SPS was accepted since the last reset
    pub fn sps_done(&self) -> bool {
        self.sps_done
    }

    /// Whether any PPS was accepted since the last reset
    pub fn pps_done(&self) -> bool {
        self.pps_done
    }

    pub fn store_vps(&mut self, vps: VPSNAL) {
        let id = vps.vps_id;
        debug!("VPS {} stored", id);

        self.vps[id.index()] = Slot {
            record: vps,
            valid: true,
        };
    }

    /// Moves a parsed SPS into its slot.
    ///
    /// If the slot held a valid SPS with a different CTB grid,
    /// every PPS referencing this id is invalidated.
    pub fn commit_sps(&mut self, staged: StagedSps) -> SpsId {
        let sps = staged.into_inner();
        let id = sps.sps_id;
        let slot = &self.sps[id.index()];

        if slot.valid && !slot.record.same_ctb_grid(&sps) {
            self.invalidate_pps_for_sps(id);
        }

        debug!(
            "SPS {} committed: {}x{}, CTB {}",
            id,
            sps.width,
            sps.height,
            sps.ctb_size()
        );

        self.sps[id.index()] = Slot {
            record: sps,
            valid: true,
        };
        self.sps_done = true;

        id
    }

    pub fn commit_pps(&mut self, staged: StagedPps) -> PpsId {
        let pps = staged.into_inner();
        let id = pps.pps_id;

        debug!(
            "PPS {} committed: SPS {}, {}x{} tiles",
            id, pps.sps_id, pps.num_tile_columns, pps.num_tile_rows
        );

        self.pps[id.index()] = Slot {
            record: pps,
            valid: true,
        };
        self.pps_done = true;

        id
    }

    /// Marks every PPS referencing `sps_id` as not valid
    pub fn invalidate_pps_for_sps(&mut self, sps_id: SpsId) {
        for slot in self
            .pps
            .iter_mut()
            .filter(|slot| slot.valid && slot.record.sps_id == sps_id)
        {
            warn!(
                "PPS {} invalidated by new SPS {}",
                slot.record.pps_id, sps_id
            );
            slot.valid = false;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids() {
        assert_eq!(SpsId::new(15).map(SpsId::value), Some(15));
        assert!(SpsId::new(16).is_none());
        assert_eq!(SpsId::clamped(1000).index(), 15);
        assert_eq!(PpsId::clamped(63).value(), 63);
        assert!(PpsId::new(64).is_none());
        assert!(VpsId::new(u32::MAX).is_none());
    }

    #[test]
    fn empty_table() {
        let table = ParamSetTable::new();

        assert!(table.vps(VpsId::default()).is_none());
        assert!(table.sps(SpsId::clamped(3)).is_none());
        assert!(table.pps(PpsId::clamped(63)).is_none());
        assert!(!table.sps_done() && !table.pps_done());
    }
}
