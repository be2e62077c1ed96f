//! Trait and types for place-name lookups.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A place returned by a geocoding service.
///
/// Coordinates are kept as the decimal strings the service answers with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(rename = "place_id", default)]
    pub id: i64,
    #[serde(rename = "place_rank", default)]
    pub rank: i64,
    #[serde(default)]
    pub licence: String,
    #[serde(default)]
    pub osm_type: String,
    #[serde(default)]
    pub osm_id: i64,
    #[serde(default)]
    pub boundingbox: Vec<String>,
    pub lat: String,
    #[serde(rename = "lon")]
    pub lng: String,
    pub display_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub importance: f64,
    #[serde(default)]
    pub address: Address,
}

/// Optional address details of a [`Place`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub city: String,
    pub state_district: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    pub country_code: String,
}

impl Place {
    /// A bare place, as far as distance computations are concerned.
    pub fn new(display_name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            lat: lat.to_string(),
            lng: lng.to_string(),
            display_name: display_name.into(),
            ..Default::default()
        }
    }
}

/// Abstraction over a geocoding provider (e.g., Nominatim).
///
/// Places are expected to be ranked by relevance, best first.
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<Place>>;
}
