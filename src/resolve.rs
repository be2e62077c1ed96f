//! Destination resolution: free text to coordinates, distance and mission.

use tracing::debug;

use crate::error::{EcoError, Result};
use crate::fixups::DestinationFixups;
use crate::geo::haversine;
use crate::mission::{Location, Mission};
use crate::parser::Leg;
use crate::services::Geocoder;

/// Separator of the `address///city///country` destination field.
pub const DESTINATION_DELIMITER: &str = "///";

/// Round-trip distance recorded for missions resolving to the origin itself.
pub const INTRA_CITY_DISTANCE: f64 = 5000.0;

/// Turns selected legs into canonical missions.
pub struct DestinationResolver<'a, G> {
    geocoder: &'a G,
    fixups: &'a DestinationFixups,
    origin: Location,
}

impl<'a, G: Geocoder> DestinationResolver<'a, G> {
    pub fn new(geocoder: &'a G, fixups: &'a DestinationFixups, origin: Location) -> Self {
        Self {
            geocoder,
            fixups,
            origin,
        }
    }

    /// Normalized destination tokens of `leg`, fixup first.
    pub fn tokens(&self, leg: &Leg) -> Result<Vec<String>> {
        let raw: Vec<&str> = match self.fixups.get(leg.id) {
            Some(dest) => dest.iter().map(String::as_str).collect(),
            None => leg.destination.split(DESTINATION_DELIMITER).collect(),
        };
        normalize_tokens(leg.id, &leg.destination, &raw)
    }

    /// Geocoding query for `leg`: `city,country`.
    pub fn query(&self, leg: &Leg) -> Result<String> {
        let tokens = self.tokens(leg)?;
        Ok(format!("{},{}", tokens[1], tokens[2]))
    }

    /// Resolves the destination of `leg` and builds its mission.
    #[tracing::instrument(skip(self, leg), fields(mission_id = leg.id))]
    pub async fn resolve(&self, leg: &Leg) -> Result<Mission> {
        let query = self.query(leg)?;

        let places = self
            .geocoder
            .search(&query)
            .await
            .map_err(|e| EcoError::Geocoder {
                id: leg.id,
                query: query.clone(),
                reason: format!("{e:#}"),
            })?;
        debug!(query = %query, places = places.len(), "Geocoder answered");

        let place = places.into_iter().next().ok_or_else(|| EcoError::NoPlace {
            id: leg.id,
            query: query.clone(),
        })?;

        let lat = parse_coordinate(leg.id, "latitude", &place.lat)?;
        let lng = parse_coordinate(leg.id, "longitude", &place.lng)?;
        let dest = Location::new(place.display_name, lat, lng);

        Ok(Mission {
            id: leg.id,
            date: leg.outbound.date,
            distance: round_trip_distance(&self.origin, &dest),
            start: self.origin.clone(),
            dest,
            mode: leg.mode,
        })
    }
}

/// Twice the great-circle distance from `origin` to `dest`, in metres.
///
/// A destination at the origin itself is an intra-city mission and gets a
/// flat [`INTRA_CITY_DISTANCE`].
pub fn round_trip_distance(origin: &Location, dest: &Location) -> f64 {
    let distance = 2.0 * haversine(dest.point(), origin.point());
    if distance == 0.0 {
        INTRA_CITY_DISTANCE
    } else {
        distance
    }
}

fn parse_coordinate(id: i32, axis: &'static str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| EcoError::InvalidCoordinate {
            id,
            axis,
            value: value.to_string(),
        })
}

fn normalize_tokens(id: i32, destination: &str, raw: &[&str]) -> Result<Vec<String>> {
    if raw.len() < 3 {
        return Err(EcoError::MalformedDestination {
            id,
            destination: destination.to_string(),
            found: raw.len(),
        });
    }

    let tokens: Vec<String> = raw
        .iter()
        .map(|tok| title_case(&tok.trim().to_lowercase()))
        .collect();

    if let Some(index) = tokens.iter().position(String::is_empty) {
        return Err(EcoError::EmptyDestinationToken { id, index, tokens });
    }

    Ok(tokens)
}

/// Upper-cases the first letter of every word.
///
/// Words are delimited by ASCII characters other than letters, digits and
/// `_`, and by non-ASCII whitespace.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev = ' ';
    for c in s.chars() {
        if is_word_separator(prev) {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        prev = c;
    }
    out
}

fn is_word_separator(c: char) -> bool {
    if c.is_ascii() {
        return !(c.is_ascii_alphanumeric() || c == '_');
    }
    if c.is_alphanumeric() {
        return false;
    }
    c.is_whitespace()
}
