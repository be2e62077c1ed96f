//! Aggregation of stored missions into executed and planned statistics.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::mission::Mission;
use crate::transport::{TransportMode, co2_grams};

/// Mission counters of one population.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsBucket {
    pub missions: usize,
    #[serde(default)]
    pub transports: BTreeMap<TransportMode, usize>,
    /// Cumulative distance per mode, in kilometres.
    #[serde(default)]
    pub dists: BTreeMap<TransportMode, i64>,
}

impl StatsBucket {
    pub fn add(&mut self, m: &Mission) {
        self.missions += 1;
        *self.transports.entry(m.mode).or_default() += 1;
        *self.dists.entry(m.mode).or_default() += m.km();
    }

    pub fn count(&self, mode: TransportMode) -> usize {
        self.transports.get(&mode).copied().unwrap_or(0)
    }

    pub fn km(&self, mode: TransportMode) -> i64 {
        self.dists.get(&mode).copied().unwrap_or(0)
    }

    /// CO2 cost of `mode`, in kilograms.
    pub fn co2_kg(&self, mode: TransportMode) -> f64 {
        co2_grams(mode, self.km(mode)) / 1000.0
    }

    /// CO2 cost per mode, in kilograms.
    pub fn co2(&self) -> BTreeMap<TransportMode, f64> {
        self.dists
            .keys()
            .map(|&mode| (mode, self.co2_kg(mode)))
            .collect()
    }

    pub fn total_co2_kg(&self) -> f64 {
        self.dists.keys().map(|&mode| self.co2_kg(mode)).sum()
    }
}

/// Aggregated view of a set of missions, split into executed and planned
/// relative to the aggregation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Earliest non-future mission date.
    pub start: Option<NaiveDate>,
    /// Latest non-future mission date.
    pub stop: Option<NaiveDate>,
    #[serde(default)]
    pub cities: BTreeMap<String, usize>,
    #[serde(default)]
    pub countries: BTreeMap<String, usize>,
    pub executed: StatsBucket,
    pub planned: StatsBucket,
    pub all: StatsBucket,
}

/// Whether a mission dated `date` is still to come at `now`.
pub fn is_planned(date: NaiveDate, now: DateTime<Utc>) -> bool {
    now <= date.and_time(NaiveTime::MIN).and_utc()
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `missions` as seen at `now`.
    pub fn from_missions<'a, I>(missions: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a Mission>,
    {
        let mut summary = Self::new();
        for m in missions {
            summary.add(m, now);
        }
        summary
    }

    /// Adds one mission as seen at `now`.
    pub fn add(&mut self, m: &Mission, now: DateTime<Utc>) {
        let planned = is_planned(m.date, now);

        if !planned {
            if self.start.is_none_or(|start| m.date < start) {
                self.start = Some(m.date);
            }
            if self.stop.is_none_or(|stop| m.date > stop) {
                self.stop = Some(m.date);
            }
        }

        let (city, country) = place_names(&m.dest.name);
        *self.cities.entry(city.to_string()).or_default() += 1;
        *self.countries.entry(country.to_string()).or_default() += 1;

        if planned {
            self.planned.add(m);
        } else {
            self.executed.add(m);
        }
        self.all.add(m);
    }

    pub fn missions(&self) -> usize {
        self.all.missions
    }
}

/// City and country of a `city, …, country` display name.
fn place_names(display_name: &str) -> (&str, &str) {
    let mut toks = display_name.split(',').map(str::trim);
    let city = toks.next().unwrap_or_default();
    let country = toks.next_back().unwrap_or(city);
    (city, country)
}
