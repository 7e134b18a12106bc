//! Positioning collaborator.
//!
//! The demo boards carry no GNSS receiver, so the service reports a fixed
//! depot coordinate with an estimated fix while started and no fix once
//! stopped.

use frigolink_core::remote::{FixState, PositionService};
use log::debug;

const DEPOT_LAT_E6: i32 = 48_858_370;
const DEPOT_LON_E6: i32 = 2_294_481;

#[derive(Debug)]
pub struct GnssStub {
    active: bool,
}

impl GnssStub {
    pub const fn new() -> Self {
        Self { active: true }
    }

    pub fn start(&mut self) {
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }
}

impl Default for GnssStub {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionService for GnssStub {
    fn push_current_location(&mut self) -> FixState {
        if !self.active {
            return FixState::NoFix;
        }
        debug!(
            "position: lat_e6={} lon_e6={} (estimated)",
            DEPOT_LAT_E6, DEPOT_LON_E6
        );
        FixState::Estimated
    }
}
