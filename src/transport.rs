//! Transport modes and their CO2 cost ordering.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EcoError;

/// Means of travel of a mission.
///
/// Declaration order is cost order: a variant declared later emits more CO2
/// per kilometre. [`cost_less`] and the derived `Ord` both rely on it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum TransportMode {
    #[default]
    Unknown = 0,
    Bike = 1,
    Tramway = 2,
    Train = 3,
    Bus = 4,
    Passenger = 5,
    Car = 6,
    Plane = 7,
}

/// Every known mode, cheapest first. `Unknown` is not listed.
pub const TRANSPORT_MODES: [TransportMode; 7] = [
    TransportMode::Bike,
    TransportMode::Tramway,
    TransportMode::Train,
    TransportMode::Bus,
    TransportMode::Passenger,
    TransportMode::Car,
    TransportMode::Plane,
];

/// Returns whether `a` costs strictly less CO2 than `b`.
pub fn cost_less(a: TransportMode, b: TransportMode) -> bool {
    a.rank() < b.rank()
}

impl TransportMode {
    /// Position in the cost order.
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            TransportMode::Unknown => "unknown",
            TransportMode::Bike => "bike",
            TransportMode::Tramway => "tramway",
            TransportMode::Train => "train",
            TransportMode::Bus => "bus",
            TransportMode::Passenger => "passenger",
            TransportMode::Car => "car",
            TransportMode::Plane => "plane",
        }
    }

    /// Emission factor in grams CO2-equivalent per passenger-kilometre.
    ///
    /// | mode      | g/km |
    /// |-----------|------|
    /// | bike      | 0    |
    /// | tramway   | 4    |
    /// | train     | 30   |
    /// | bus       | 100  |
    /// | passenger | 0    |
    /// | car       | 190  |
    /// | plane     | 230  |
    pub fn emission_factor(self) -> f64 {
        match self {
            TransportMode::Unknown | TransportMode::Bike | TransportMode::Passenger => 0.0,
            TransportMode::Tramway => 4.0,
            TransportMode::Train => 30.0,
            TransportMode::Bus => 100.0,
            TransportMode::Car => 190.0,
            TransportMode::Plane => 230.0,
        }
    }

    pub fn from_rank(rank: u8) -> Option<Self> {
        match rank {
            0 => Some(TransportMode::Unknown),
            1 => Some(TransportMode::Bike),
            2 => Some(TransportMode::Tramway),
            3 => Some(TransportMode::Train),
            4 => Some(TransportMode::Bus),
            5 => Some(TransportMode::Passenger),
            6 => Some(TransportMode::Car),
            7 => Some(TransportMode::Plane),
            _ => None,
        }
    }
}

/// CO2 cost in grams of `km` kilometres travelled with `mode`.
pub fn co2_grams(mode: TransportMode, km: i64) -> f64 {
    mode.emission_factor() * km as f64
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Parses a mode name as found in fixup files. `unknown` is rejected: a
/// fixup must resolve to a real mode.
impl FromStr for TransportMode {
    type Err = EcoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TRANSPORT_MODES
            .iter()
            .copied()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| EcoError::UnknownTransportName(s.to_string()))
    }
}
