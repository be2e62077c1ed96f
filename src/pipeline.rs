//! The ingestion pipeline: raw rows to canonical missions.
//!
//! Rows are normalized and classified one by one, grouped by mission id,
//! reduced to a single representative leg per id and finally resolved
//! against the geocoder, in ascending id order.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

use crate::classify::TransportClassifier;
use crate::error::{EcoError, Result};
use crate::fixups::FixupTables;
use crate::legs::select_leg;
use crate::mission::{Location, Mission};
use crate::parser::{Leg, Normalized, RawLeg, normalize};
use crate::resolve::DestinationResolver;
use crate::services::Geocoder;
use crate::stats::Summary;

/// What to do with a mission that cannot be classified or resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ErrorPolicy {
    /// Abort the run on the first failure.
    #[default]
    Strict,
    /// Record the failure and keep going.
    Lenient,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Rows with an id at or below this watermark are skipped.
    pub after_id: i32,
    pub policy: ErrorPolicy,
    /// Mission id whose raw rows are logged in full.
    pub trace_id: Option<i32>,
    pub verbose: bool,
}

/// Outcome of one pipeline run.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Resolved missions, in ascending id order.
    pub missions: Vec<Mission>,
    /// Rows at or below the watermark.
    pub skipped: usize,
    /// Rows excluded by their validity code.
    pub rejected: usize,
    /// Rows whose transport code could not be resolved.
    pub unclassified: usize,
    /// Mission ids logged as more than one leg.
    pub multi_legs: usize,
    /// Unclassifiable rows, plus resolution failures in lenient mode.
    pub failures: Vec<EcoError>,
    /// Running aggregate of `missions`.
    pub summary: Summary,
}

impl IngestReport {
    /// Rows that never became a mission candidate.
    pub fn invalid(&self) -> usize {
        self.rejected + self.unclassified
    }

    /// No row was unclassifiable and every candidate was resolved.
    pub fn all_good(&self) -> bool {
        self.unclassified == 0 && self.failures.is_empty()
    }

    pub fn log_counts(&self) {
        info!(
            missions = self.missions.len(),
            invalid = self.invalid(),
            rejected = self.rejected,
            unclassified = self.unclassified,
            skipped = self.skipped,
            multi_legs = self.multi_legs,
            failures = self.failures.len(),
            "Ingestion report"
        );
    }
}

/// Turns raw rows into missions.
pub struct Pipeline<'a, G> {
    classifier: TransportClassifier<'a>,
    resolver: DestinationResolver<'a, G>,
    options: PipelineOptions,
}

impl<'a, G: Geocoder> Pipeline<'a, G> {
    pub fn new(
        fixups: &'a FixupTables,
        geocoder: &'a G,
        origin: Location,
        options: PipelineOptions,
    ) -> Self {
        Self {
            classifier: TransportClassifier::new(&fixups.transport),
            resolver: DestinationResolver::new(geocoder, &fixups.destination, origin),
            options,
        }
    }

    /// Normalizes `rows` and groups the surviving legs by mission id.
    ///
    /// A malformed date aborts with an error. Unclassifiable rows are
    /// counted and recorded as failures under either policy.
    pub fn group(
        &self,
        rows: Vec<RawLeg>,
        report: &mut IngestReport,
    ) -> Result<BTreeMap<i32, Vec<Leg>>> {
        let mut groups: BTreeMap<i32, Vec<Leg>> = BTreeMap::new();
        let mut unclassified = Vec::new();

        for raw in rows {
            if self.options.trace_id == Some(raw.id) {
                info!(
                    mission_id = raw.id,
                    org = %raw.org,
                    group = %raw.group,
                    destination = %raw.destination,
                    transport_id = raw.transport_id,
                    transport_label = %raw.transport_label,
                    valid = raw.valid,
                    comment = %raw.comment,
                    "Traced raw leg"
                );
            }

            if raw.id <= self.options.after_id {
                report.skipped += 1;
                continue;
            }

            match normalize(raw, &self.classifier)? {
                Normalized::Valid(leg) => groups.entry(leg.id).or_default().push(leg),
                Normalized::Rejected { id, validity } => {
                    debug!(mission_id = id, validity = validity.0, "Rejected leg");
                    report.rejected += 1;
                }
                Normalized::Unclassified { leg, error } => {
                    warn!(
                        mission_id = leg.id,
                        org = %leg.org,
                        group = %leg.group,
                        destination = %leg.destination,
                        transport_id = leg.transport.code,
                        transport_label = %leg.transport.label,
                        valid = leg.validity.0,
                        outbound = %leg.outbound.date,
                        inbound = %leg.inbound.date,
                        "Invalid leg: {error}"
                    );
                    report.unclassified += 1;
                    unclassified.push(error);
                }
            }
        }

        report.multi_legs = groups.values().filter(|legs| legs.len() > 1).count();
        info!(
            missions = groups.len(),
            invalid = report.invalid(),
            multi_legs = report.multi_legs,
            "Legs grouped"
        );

        if !unclassified.is_empty() {
            warn!(
                unclassified = unclassified.len(),
                "Could not handle at least one mission, check the transport fixups"
            );
            report.failures.extend(unclassified);
        }

        Ok(groups)
    }

    /// Runs the whole pipeline over `rows`, aggregating as seen at `now`.
    #[tracing::instrument(skip_all, fields(rows = rows.len(), policy = ?self.options.policy))]
    pub async fn run(&self, rows: Vec<RawLeg>, now: DateTime<Utc>) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        let groups = self.group(rows, &mut report)?;

        if groups.is_empty() {
            info!("No new mission to process");
            return Ok(report);
        }

        for (id, legs) in groups {
            if self.options.verbose && legs.len() > 1 {
                let modes: Vec<String> = legs.iter().map(|leg| leg.mode.to_string()).collect();
                info!(mission_id = id, legs = ?modes, "Multi-leg mission");
            }

            let leg = select_leg(legs)?;
            if self.options.verbose {
                info!(
                    mission_id = leg.id,
                    transport = %leg.transport.label,
                    date = %leg.outbound.date,
                    dest = %leg.destination,
                    "Selected leg"
                );
            }

            match self.resolver.resolve(&leg).await {
                Ok(mission) => {
                    info!("{mission}");
                    report.summary.add(&mission, now);
                    report.missions.push(mission);
                }
                Err(e) if e.is_data_quality() => {
                    error!(mission_id = id, destination = %leg.destination, error = %e, "Could not resolve mission");
                    match self.options.policy {
                        ErrorPolicy::Strict => return Err(e),
                        ErrorPolicy::Lenient => report.failures.push(e),
                    }
                }
                Err(e) => return Err(e),
            }
        }

        report.log_counts();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::code;
    use crate::services::Place;
    use crate::transport::TransportMode;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct FakeGeocoder;

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn search(&self, query: &str) -> anyhow::Result<Vec<Place>> {
            Ok(match query {
                "Paris,France" => vec![Place::new("Paris, Île-de-France, France", 48.8566101, 2.3514992)],
                "Lyon,France" => vec![Place::new("Lyon, Métropole de Lyon, France", 45.7578137, 4.8320114)],
                _ => Vec::new(),
            })
        }
    }

    fn raw(id: i32, transport_id: i32, valid: i16, city: &str) -> RawLeg {
        RawLeg {
            id,
            date: "2019-02-01 10:32:00".to_string(),
            destination: format!("1 rue de la Paix///{city}///France"),
            outbound_date: "2019-03-04".to_string(),
            inbound_date: "2019-03-06".to_string(),
            valid,
            transport_id,
            ..Default::default()
        }
    }

    fn fixups() -> FixupTables {
        FixupTables::default()
    }

    fn origin() -> Location {
        Location::new("Clermont-Ferrand", 45.7774551, 3.0819427)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    fn options(policy: ErrorPolicy) -> PipelineOptions {
        PipelineOptions {
            policy,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_groups_and_selects_train_leg() {
        let fixups = fixups();
        let pipeline = Pipeline::new(&fixups, &FakeGeocoder, origin(), options(ErrorPolicy::Strict));
        let rows = vec![
            raw(42, code::BUS, 2, "Lyon"),
            raw(42, code::TRAIN, 2, "Paris"),
            raw(43, code::PLANE, 6, "Paris"),
        ];

        let report = pipeline.run(rows, now()).await.unwrap();
        assert_eq!(report.missions.len(), 1);
        let m = &report.missions[0];
        assert_eq!(m.id, 42);
        assert_eq!(m.mode, TransportMode::Train);
        assert!(m.dest.name.starts_with("Paris"));
        assert_eq!(report.multi_legs, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.invalid(), 1);
        assert!(report.all_good());
        assert_eq!(report.summary.executed.missions, 1);
    }

    #[tokio::test]
    async fn test_watermark_skips_rows() {
        let fixups = fixups();
        let opts = PipelineOptions {
            after_id: 10,
            ..Default::default()
        };
        let pipeline = Pipeline::new(&fixups, &FakeGeocoder, origin(), opts);
        let rows = vec![raw(9, code::TRAIN, 2, "Paris"), raw(11, code::CAR_RENTAL, 2, "Lyon")];

        let report = pipeline.run(rows, now()).await.unwrap();
        assert_eq!(report.skipped, 1);
        let ids: Vec<i32> = report.missions.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![11]);
        assert_eq!(report.missions[0].mode, TransportMode::Car);
    }

    #[tokio::test]
    async fn test_strict_skips_unclassified_row() {
        let fixups = fixups();
        let pipeline = Pipeline::new(&fixups, &FakeGeocoder, origin(), options(ErrorPolicy::Strict));
        let rows = vec![raw(1, code::TRAIN, 2, "Paris"), raw(2, code::OTHER, 2, "Paris")];

        let report = pipeline.run(rows, now()).await.unwrap();
        let ids: Vec<i32> = report.missions.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1]);
        assert_eq!(report.unclassified, 1);
        assert_eq!(report.invalid(), 1);
        assert!(matches!(report.failures[..], [EcoError::MissingTransportFixup { id: 2, .. }]));
        assert!(!report.all_good());
    }

    #[tokio::test]
    async fn test_rejected_catch_all_row_is_not_unclassified() {
        let fixups = fixups();
        let pipeline = Pipeline::new(&fixups, &FakeGeocoder, origin(), options(ErrorPolicy::Lenient));

        let report = pipeline.run(vec![raw(5, code::OTHER, 6, "Paris")], now()).await.unwrap();
        assert_eq!(report.rejected, 1);
        assert_eq!(report.unclassified, 0);
        assert!(report.failures.is_empty());
        assert!(report.all_good());
    }

    #[tokio::test]
    async fn test_lenient_collects_failures() {
        let fixups = fixups();
        let pipeline = Pipeline::new(&fixups, &FakeGeocoder, origin(), options(ErrorPolicy::Lenient));
        let rows = vec![
            raw(1, code::TRAIN, 2, "Paris"),
            raw(2, code::OTHER, 2, "Paris"),
            raw(3, code::TRAIN, 2, "Atlantis"),
            raw(4, code::BUS, 2, "Lyon"),
        ];

        let report = pipeline.run(rows, now()).await.unwrap();
        let ids: Vec<i32> = report.missions.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 4]);
        assert_eq!(report.unclassified, 1);
        assert_eq!(report.failures.len(), 2);
        assert!(matches!(report.failures[1], EcoError::NoPlace { id: 3, .. }));
        assert!(!report.all_good());
    }

    #[tokio::test]
    async fn test_strict_aborts_on_resolution_error() {
        let fixups = fixups();
        let pipeline = Pipeline::new(&fixups, &FakeGeocoder, origin(), options(ErrorPolicy::Strict));
        let rows = vec![raw(3, code::TRAIN, 2, "Atlantis"), raw(4, code::BUS, 2, "Lyon")];

        let err = pipeline.run(rows, now()).await.unwrap_err();
        assert!(matches!(err, EcoError::NoPlace { id: 3, .. }));
    }

    #[tokio::test]
    async fn test_malformed_date_is_fatal_in_lenient_mode() {
        let fixups = fixups();
        let pipeline = Pipeline::new(&fixups, &FakeGeocoder, origin(), options(ErrorPolicy::Lenient));
        let mut bad = raw(5, code::TRAIN, 2, "Paris");
        bad.outbound_date = "04/03/2019".to_string();

        let err = pipeline.run(vec![bad], now()).await.unwrap_err();
        assert!(matches!(err, EcoError::DateParse { .. }));
    }
}
