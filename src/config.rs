//! Process settings read from the environment (and `.env`, via `dotenvy`).

use std::time::Duration;

use crate::error::{EcoError, Result};
use crate::mission::Location;

pub const DEFAULT_LOG_FILE_PATH: &str = "logs/eco_missions.log";
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_GEOCODER_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_ORIGIN_NAME: &str = "Clermont-Ferrand";
pub const DEFAULT_ORIGIN_LAT: f64 = 45.7774551;
pub const DEFAULT_ORIGIN_LNG: f64 = 3.0819427;

/// Default Nominatim `User-Agent`, e.g. `eco_missions/0.1.0`.
pub fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_NOMINATIM_URL.to_string(),
            user_agent: default_user_agent(),
            timeout: Duration::from_secs(DEFAULT_GEOCODER_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub log_file_path: String,
    pub geocoder: GeocoderConfig,
    /// Home of every mission.
    pub origin: Location,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_file_path: DEFAULT_LOG_FILE_PATH.to_string(),
            geocoder: GeocoderConfig::default(),
            origin: default_origin(),
        }
    }
}

pub fn default_origin() -> Location {
    Location::new(DEFAULT_ORIGIN_NAME, DEFAULT_ORIGIN_LAT, DEFAULT_ORIGIN_LNG)
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from `lookup`; unset or empty variables keep their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Settings::default();

        let timeout = match get("GEOCODER_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_var("GEOCODER_TIMEOUT_SECS", &v)?),
            None => defaults.geocoder.timeout,
        };

        let lat = match get("ECO_ORIGIN_LAT") {
            Some(v) => parse_var("ECO_ORIGIN_LAT", &v)?,
            None => defaults.origin.lat,
        };
        let lng = match get("ECO_ORIGIN_LNG") {
            Some(v) => parse_var("ECO_ORIGIN_LNG", &v)?,
            None => defaults.origin.lng,
        };
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(EcoError::Configuration {
                message: format!("origin ({lat}, {lng}) is not a valid coordinate"),
            });
        }

        Ok(Settings {
            log_file_path: get("LOG_FILE_PATH").unwrap_or(defaults.log_file_path),
            geocoder: GeocoderConfig {
                base_url: get("NOMINATIM_URL").unwrap_or(defaults.geocoder.base_url),
                user_agent: get("NOMINATIM_USER_AGENT").unwrap_or(defaults.geocoder.user_agent),
                timeout,
            },
            origin: Location::new(
                get("ECO_ORIGIN_NAME").unwrap_or(defaults.origin.name),
                lat,
                lng,
            ),
        })
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| EcoError::Configuration {
        message: format!("{key}={value:?}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.origin.name, "Clermont-Ferrand");
        assert_eq!(s.geocoder.timeout, Duration::from_secs(30));
        assert!(s.geocoder.user_agent.starts_with("eco_missions/"));
    }

    #[test]
    fn test_overrides() {
        let s = settings(&[
            ("NOMINATIM_URL", "http://localhost:8088"),
            ("GEOCODER_TIMEOUT_SECS", " 5 "),
            ("ECO_ORIGIN_NAME", "Lyon"),
            ("ECO_ORIGIN_LAT", "45.7578137"),
            ("ECO_ORIGIN_LNG", "4.8320114"),
            ("LOG_FILE_PATH", ""),
        ])
        .unwrap();
        assert_eq!(s.geocoder.base_url, "http://localhost:8088");
        assert_eq!(s.geocoder.timeout, Duration::from_secs(5));
        assert_eq!(s.origin, Location::new("Lyon", 45.7578137, 4.8320114));
        assert_eq!(s.log_file_path, DEFAULT_LOG_FILE_PATH);
    }

    #[test]
    fn test_invalid_values() {
        let err = settings(&[("GEOCODER_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(matches!(err, EcoError::Configuration { .. }));
        assert!(err.to_string().contains("GEOCODER_TIMEOUT_SECS"));

        assert!(settings(&[("ECO_ORIGIN_LAT", "123.0")]).is_err());
    }
}
