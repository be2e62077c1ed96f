//! The canonical mission record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geo::Point;
use crate::transport::TransportMode;

/// A named geographic point.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn new(name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lng,
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.lat, self.lng)
    }
}

/// One resolved round trip, keyed by `id`.
///
/// Re-ingesting an id replaces the stored mission wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: i32,
    /// Outbound journey date.
    pub date: NaiveDate,
    pub start: Location,
    pub dest: Location,
    /// Round-trip distance in metres.
    #[serde(rename = "dist")]
    pub distance: f64,
    /// Lowercase mode name on the wire, never the numeric transport code.
    #[serde(rename = "transport")]
    pub mode: TransportMode,
}

impl Mission {
    /// Distance in whole kilometres, truncated.
    pub fn km(&self) -> i64 {
        self.distance as i64 / 1000
    }
}

impl fmt::Display for Mission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Mission{{id={} {} dest={:?} dist={}km transport={}}}",
            self.id,
            self.date.format("%Y-%m-%d"),
            self.dest.name,
            self.km(),
            self.mode
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paris_mission() -> Mission {
        Mission {
            id: 7,
            date: NaiveDate::from_ymd_opt(2019, 3, 14).unwrap(),
            start: Location::new("Clermont-Ferrand", 45.7774551, 3.0819427),
            dest: Location::new("Paris, Île-de-France, France", 48.8566101, 2.3514992),
            distance: 692_999.9,
            mode: TransportMode::Train,
        }
    }

    #[test]
    fn test_km_truncates() {
        assert_eq!(paris_mission().km(), 692);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            paris_mission().to_string(),
            "Mission{id=7 2019-03-14 dest=\"Paris, Île-de-France, France\" dist=692km transport=train}"
        );
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_value(paris_mission()).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["date"], "2019-03-14");
        assert_eq!(json["transport"], "train");
        assert_eq!(json["dest"]["lat"], 48.8566101);
        assert!(json.get("dist").is_some());

        let back: Mission = serde_json::from_value(json).unwrap();
        assert_eq!(back.id, 7);
        assert_eq!(back.mode, TransportMode::Train);
        assert_eq!(back.date, paris_mission().date);
    }
}
