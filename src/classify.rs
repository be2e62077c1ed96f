//! Raw transport code classification.

use crate::error::{EcoError, Result};
use crate::fixups::TransportFixups;
use crate::transport::TransportMode;

/// Transport codes of the source approval system.
pub mod code {
    pub const PLANE: i32 = 1;
    pub const BUS: i32 = 2;
    pub const PASSENGER: i32 = 3;
    pub const TRAIN: i32 = 4;
    pub const CAR_ADMINISTRATION: i32 = 5;
    pub const CAR_RENTAL: i32 = 6;
    pub const CAR_PERSONAL: i32 = 7;
    /// Catch-all, needs a fixup entry.
    pub const OTHER: i32 = 8;
}

/// Maps raw transport codes to [`TransportMode`]s.
#[derive(Debug, Clone, Copy)]
pub struct TransportClassifier<'a> {
    fixups: &'a TransportFixups,
}

impl<'a> TransportClassifier<'a> {
    pub fn new(fixups: &'a TransportFixups) -> Self {
        Self { fixups }
    }

    /// Classifies `raw_code` for mission `id`.
    ///
    /// Passenger is free: the trip cost was already reported on another
    /// mission. The catch-all code is answered by the fixup table alone and
    /// fails when the mission has no entry. Unlisted codes are `Unknown`.
    pub fn classify(&self, raw_code: i32, id: i32) -> Result<TransportMode> {
        let mode = match raw_code {
            code::PLANE => TransportMode::Plane,
            code::BUS => TransportMode::Bus,
            code::PASSENGER => TransportMode::Passenger,
            code::TRAIN => TransportMode::Train,
            code::CAR_ADMINISTRATION | code::CAR_RENTAL | code::CAR_PERSONAL => TransportMode::Car,
            code::OTHER => {
                return self.fixups.get(id).ok_or(EcoError::MissingTransportFixup {
                    id,
                    code: raw_code,
                });
            }
            _ => TransportMode::Unknown,
        };
        Ok(mode)
    }
}
