//! Binary layout of stored missions.
//!
//! Key: the mission id, 4 bytes little-endian.
//! Value: one format byte, then the bitcode encoding of [`MissionRecord`].

use bitcode::{Decode, Encode};
use chrono::{Datelike, NaiveDate};

use crate::error::{EcoError, Result};
use crate::mission::{Location, Mission};
use crate::transport::TransportMode;

const FORMAT_V1: u8 = 1;

#[derive(Encode, Decode)]
struct LocationRecord {
    name: String,
    lat: f64,
    lng: f64,
}

#[derive(Encode, Decode)]
struct MissionRecord {
    id: i32,
    /// Days since 0001-01-01 (day 1).
    days: i32,
    start: LocationRecord,
    dest: LocationRecord,
    distance: f64,
    transport: u8,
}

impl From<&Location> for LocationRecord {
    fn from(loc: &Location) -> Self {
        Self {
            name: loc.name.clone(),
            lat: loc.lat,
            lng: loc.lng,
        }
    }
}

impl From<LocationRecord> for Location {
    fn from(rec: LocationRecord) -> Self {
        Location::new(rec.name, rec.lat, rec.lng)
    }
}

pub fn encode_key(id: i32) -> [u8; 4] {
    id.to_le_bytes()
}

pub fn decode_key(key: &[u8]) -> Result<i32> {
    let bytes: [u8; 4] = key.try_into().map_err(|_| EcoError::RecordKey(key.len()))?;
    Ok(i32::from_le_bytes(bytes))
}

/// Encodes `m`, rejecting missions that break the record invariants.
pub fn encode(m: &Mission) -> Result<Vec<u8>> {
    if m.id <= 0 {
        return Err(EcoError::InvalidRecord {
            id: m.id,
            reason: "id must be positive".to_string(),
        });
    }
    if !m.distance.is_finite() || m.distance < 0.0 {
        return Err(EcoError::InvalidRecord {
            id: m.id,
            reason: format!("invalid distance {}", m.distance),
        });
    }

    let record = MissionRecord {
        id: m.id,
        days: m.date.num_days_from_ce(),
        start: (&m.start).into(),
        dest: (&m.dest).into(),
        distance: m.distance,
        transport: m.mode.rank(),
    };

    let mut buf = vec![FORMAT_V1];
    buf.extend_from_slice(&bitcode::encode(&record));
    Ok(buf)
}

pub fn decode(bytes: &[u8]) -> Result<Mission> {
    let (&format, body) = bytes
        .split_first()
        .ok_or(EcoError::RecordFormat(0))?;
    if format != FORMAT_V1 {
        return Err(EcoError::RecordFormat(format));
    }

    let record: MissionRecord = bitcode::decode(body)?;
    let date = NaiveDate::from_num_days_from_ce_opt(record.days).ok_or_else(|| {
        EcoError::Invariant(format!(
            "mission {}: day number {} out of range",
            record.id, record.days
        ))
    })?;
    let mode =
        TransportMode::from_rank(record.transport).ok_or(EcoError::TransportByte(record.transport))?;

    Ok(Mission {
        id: record.id,
        date,
        start: record.start.into(),
        dest: record.dest.into(),
        distance: record.distance,
        mode,
    })
}
