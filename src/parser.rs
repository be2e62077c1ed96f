//! Raw travel-expense rows and their normalization into typed legs.
//!
//! The relational view is consumed as a CSV export with a header row, one
//! column per [`RawLeg`] field.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::classify::TransportClassifier;
use crate::error::{EcoError, Result};
use crate::transport::TransportMode;

/// Layout of the draft timestamp.
pub const DRAFT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Layout of journey dates.
pub const JOURNEY_DATE_FORMAT: &str = "%Y-%m-%d";

/// One row of the source view, as exported.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLeg {
    pub id: i32,
    /// When the mission was drafted.
    pub date: String,
    /// Funding organization.
    pub org: String,
    /// Group funding the mission.
    pub group: String,
    pub departure: String,
    pub destination: String,
    pub object: String,
    #[serde(rename = "type")]
    pub kind: i16,
    pub transport_name: String,
    pub outbound_date: String,
    pub outbound_start: String,
    pub outbound_stop: String,
    pub inbound_date: String,
    pub inbound_start: String,
    pub inbound_stop: String,
    pub comment: String,
    pub valid: i16,
    pub cost: Option<f64>,
    pub residence_familiale: i8,
    pub residence_return: Option<i64>,
    pub housing: String,
    pub transport_id: i32,
    pub transport_label: String,
}

/// Approval-workflow state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityCode(pub i16);

impl ValidityCode {
    pub fn is_rejected(self) -> bool {
        self.rejection().is_some()
    }

    /// Describes the rejection, if this code is one.
    pub fn rejection(self) -> Option<&'static str> {
        match self.0 {
            4 => Some("rejected by manager"),
            5 => Some("rejected by funder"),
            6 => Some("accepted by funder, rejected by manager"),
            7 => Some("accepted by manager, rejected by funder"),
            8 => Some("rejected by manager and funder"),
            _ => None,
        }
    }
}

/// One way of a journey.
#[derive(Debug, Clone, PartialEq)]
pub struct Journey {
    pub date: NaiveDate,
    /// Hour of departure, as written in the source.
    pub start: String,
    /// Hour of arrival, as written in the source.
    pub stop: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transport {
    pub name: String,
    pub code: i32,
    pub label: String,
}

/// A typed, classified leg, candidate for becoming a mission.
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    pub id: i32,
    pub drafted: NaiveDateTime,
    pub org: String,
    pub group: String,
    pub departure: String,
    pub destination: String,
    pub object: String,
    pub kind: i16,
    pub transport: Transport,
    pub mode: TransportMode,
    pub outbound: Journey,
    pub inbound: Journey,
    pub comment: String,
    pub validity: ValidityCode,
    pub cost: Option<f64>,
    pub residence_familiale: i8,
    pub residence_return: Option<i64>,
    pub housing: String,
}

/// Outcome of normalizing one row.
#[derive(Debug)]
pub enum Normalized {
    Valid(Leg),
    /// Excluded by the approval workflow.
    Rejected { id: i32, validity: ValidityCode },
    /// Transport code could not be resolved.
    Unclassified { leg: Box<Leg>, error: EcoError },
}

fn parse_draft_date(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), DRAFT_DATE_FORMAT).map_err(|source| {
        EcoError::DateParse {
            field: "draft",
            value: value.to_string(),
            source,
        }
    })
}

fn parse_journey_date(field: &'static str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), JOURNEY_DATE_FORMAT).map_err(|source| {
        EcoError::DateParse {
            field,
            value: value.to_string(),
            source,
        }
    })
}

/// Converts a raw row into a classified leg.
///
/// A malformed date is an error and should abort the run. Rejected and
/// unclassifiable rows are reported through [`Normalized`]; rejected rows
/// are never classified.
pub fn normalize(raw: RawLeg, classifier: &TransportClassifier<'_>) -> Result<Normalized> {
    let drafted = parse_draft_date(&raw.date)?;
    let outbound = Journey {
        date: parse_journey_date("outbound", &raw.outbound_date)?,
        start: raw.outbound_start,
        stop: raw.outbound_stop,
    };
    let inbound = Journey {
        date: parse_journey_date("inbound", &raw.inbound_date)?,
        start: raw.inbound_start,
        stop: raw.inbound_stop,
    };

    let validity = ValidityCode(raw.valid);
    if validity.is_rejected() {
        return Ok(Normalized::Rejected { id: raw.id, validity });
    }

    let classified = classifier.classify(raw.transport_id, raw.id);

    let leg = Leg {
        id: raw.id,
        drafted,
        org: raw.org,
        group: raw.group,
        departure: raw.departure,
        destination: raw.destination,
        object: raw.object,
        kind: raw.kind,
        transport: Transport {
            name: raw.transport_name,
            code: raw.transport_id,
            label: raw.transport_label,
        },
        mode: TransportMode::Unknown,
        outbound,
        inbound,
        comment: raw.comment,
        validity,
        cost: raw.cost,
        residence_familiale: raw.residence_familiale,
        residence_return: raw.residence_return,
        housing: raw.housing,
    };

    match classified {
        Ok(mode) => Ok(Normalized::Valid(Leg { mode, ..leg })),
        Err(error) => Ok(Normalized::Unclassified {
            leg: Box::new(leg),
            error,
        }),
    }
}

/// Reads every row of a CSV export.
pub fn read_legs<R: Read>(reader: R) -> Result<Vec<RawLeg>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();

    for result in rdr.deserialize() {
        let record: RawLeg = result?;
        rows.push(record);
    }

    Ok(rows)
}

pub fn read_legs_from_path(path: impl AsRef<Path>) -> Result<Vec<RawLeg>> {
    let file = std::fs::File::open(path.as_ref())?;
    let rows = read_legs(file)?;
    debug!(path = %path.as_ref().display(), rows = rows.len(), "Read raw legs");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::code;
    use crate::fixups::TransportFixups;

    fn raw(id: i32, transport_id: i32, valid: i16) -> RawLeg {
        RawLeg {
            id,
            date: "2019-02-01 10:32:00".to_string(),
            destination: "Bd Bonne Nouvelle///Paris///France".to_string(),
            outbound_date: "2019-03-04".to_string(),
            inbound_date: "2019-03-06".to_string(),
            valid,
            transport_id,
            transport_label: "label".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_valid_leg() {
        let fixups = TransportFixups::default();
        let classifier = TransportClassifier::new(&fixups);
        match normalize(raw(3, code::TRAIN, 2), &classifier).unwrap() {
            Normalized::Valid(leg) => {
                assert_eq!(leg.id, 3);
                assert_eq!(leg.mode, TransportMode::Train);
                assert_eq!(leg.outbound.date, NaiveDate::from_ymd_opt(2019, 3, 4).unwrap());
                assert_eq!(leg.inbound.date, NaiveDate::from_ymd_opt(2019, 3, 6).unwrap());
                assert_eq!(leg.drafted.format("%H:%M").to_string(), "10:32");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_rejection_codes_are_filtered() {
        let fixups = TransportFixups::default();
        let classifier = TransportClassifier::new(&fixups);
        for valid in 4..=8 {
            let out = normalize(raw(3, code::BUS, valid), &classifier).unwrap();
            assert!(
                matches!(out, Normalized::Rejected { id: 3, validity } if validity.0 == valid),
                "validity {valid}"
            );
        }
        for valid in [0, 1, 2, 3, 9] {
            let out = normalize(raw(3, code::BUS, valid), &classifier).unwrap();
            assert!(matches!(out, Normalized::Valid(_)), "validity {valid}");
        }
    }

    #[test]
    fn test_unresolvable_catch_all_is_unclassified() {
        let fixups = TransportFixups::default();
        let classifier = TransportClassifier::new(&fixups);
        let out = normalize(raw(9, code::OTHER, 2), &classifier).unwrap();
        match out {
            Normalized::Unclassified { leg, error } => {
                assert_eq!(leg.id, 9);
                assert!(matches!(error, EcoError::MissingTransportFixup { id: 9, .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_rejected_catch_all_skips_classification() {
        let fixups = TransportFixups::default();
        let classifier = TransportClassifier::new(&fixups);
        let out = normalize(raw(5, code::OTHER, 6), &classifier).unwrap();
        assert!(matches!(out, Normalized::Rejected { id: 5, validity } if validity.0 == 6));
    }

    #[test]
    fn test_bad_dates_are_fatal() {
        let fixups = TransportFixups::default();
        let classifier = TransportClassifier::new(&fixups);

        let mut bad_draft = raw(1, code::BUS, 2);
        bad_draft.date = "2019-02-01".to_string();
        let err = normalize(bad_draft, &classifier).unwrap_err();
        assert!(matches!(err, EcoError::DateParse { field: "draft", .. }));

        let mut bad_journey = raw(1, code::BUS, 2);
        bad_journey.outbound_date = "04/03/2019".to_string();
        let err = normalize(bad_journey, &classifier).unwrap_err();
        assert!(matches!(err, EcoError::DateParse { field: "outbound", .. }));
    }

    #[test]
    fn test_read_legs_csv() {
        let data = "\
id,date,org,group,departure,destination,object,type,transport_name,outbound_date,outbound_start,outbound_stop,inbound_date,inbound_start,inbound_stop,comment,valid,cost,residence_familiale,residence_return,housing,transport_id,transport_label
42,2019-02-01 10:32:00,CNRS,ATLAS,Clermont,CERN///Meyrin///Suisse,meeting,1,train,2019-03-04,08:00,12:00,2019-03-06,14:00,18:00,,2,,0,,hotel,4,Train
43,2019-02-02 09:00:00,UCA,LHCb,Clermont,///Lyon///France,seminar,1,car,2019-04-01,08:00,10:00,2019-04-01,17:00,19:00,back same day,3,12.5,1,2,,5,Voiture
";
        let legs = read_legs(data.as_bytes()).unwrap();
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].id, 42);
        assert_eq!(legs[0].destination, "CERN///Meyrin///Suisse");
        assert_eq!(legs[0].cost, None);
        assert_eq!(legs[0].residence_return, None);
        assert_eq!(legs[1].cost, Some(12.5));
        assert_eq!(legs[1].residence_return, Some(2));
        assert_eq!(legs[1].kind, 1);
        assert_eq!(legs[1].transport_id, 5);
    }

    #[test]
    fn test_validity_descriptions() {
        assert_eq!(ValidityCode(4).rejection(), Some("rejected by manager"));
        assert_eq!(ValidityCode(2).rejection(), None);
    }
}
