use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

use crate::config::GeocoderConfig;
use crate::fetch::{BasicClient, HttpClient, WithHeader, get_json};
use crate::services::geocoder::{Geocoder, Place};

/// Geocoder backed by the OpenStreetMap Nominatim search API.
pub struct NominatimClient<C = WithHeader<BasicClient>> {
    http: C,
    search_url: Url,
    address_details: bool,
    accept_languages: Vec<String>,
}

impl NominatimClient {
    /// Builds a client honoring the configured timeout and user agent.
    pub fn from_config(config: &GeocoderConfig) -> Result<Self> {
        let basic = BasicClient::with_timeout(config.timeout)
            .context("Failed to build geocoder HTTP client")?;
        let http = WithHeader::user_agent(basic, &config.user_agent)?;
        Self::with_client(http, &config.base_url)
    }
}

impl<C: HttpClient> NominatimClient<C> {
    pub fn with_client(http: C, base_url: &str) -> Result<Self> {
        let search_url = Url::parse(&format!("{}/search", base_url.trim_end_matches('/')))
            .with_context(|| format!("Invalid Nominatim URL '{base_url}'"))?;
        Ok(Self {
            http,
            search_url,
            address_details: false,
            accept_languages: Vec::new(),
        })
    }

    pub fn address_details(mut self, enabled: bool) -> Self {
        self.address_details = enabled;
        self
    }

    pub fn accept_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accept_languages = languages.into_iter().map(Into::into).collect();
        self
    }

    /// Full search URL for `query`.
    pub fn search_url(&self, query: &str) -> Url {
        let mut url = self.search_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("q", query)
                .append_pair("format", "jsonv2")
                .append_pair("addressdetails", if self.address_details { "1" } else { "0" });
            if !self.accept_languages.is_empty() {
                pairs.append_pair("accept-language", &self.accept_languages.join(","));
            }
        }
        url
    }
}

#[async_trait]
impl<C: HttpClient> Geocoder for NominatimClient<C> {
    async fn search(&self, query: &str) -> Result<Vec<Place>> {
        let url = self.search_url(query);
        debug!(url = %url, "Querying Nominatim");

        let places: Vec<Place> = get_json(&self.http, url)
            .await
            .with_context(|| format!("Nominatim search for '{query}' failed"))?;
        Ok(places)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> NominatimClient<BasicClient> {
        NominatimClient::with_client(BasicClient::new(), "https://nominatim.example.org/").unwrap()
    }

    #[test]
    fn test_search_url_defaults() {
        let url = client().search_url("Paris,France");
        assert_eq!(
            url.as_str(),
            "https://nominatim.example.org/search?q=Paris%2CFrance&format=jsonv2&addressdetails=0"
        );
    }

    #[test]
    fn test_search_url_with_details_and_languages() {
        let url = client()
            .address_details(true)
            .accept_languages(["fr", "en"])
            .search_url("Genève,Suisse");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("q".to_string(), "Genève,Suisse".to_string()),
                ("format".to_string(), "jsonv2".to_string()),
                ("addressdetails".to_string(), "1".to_string()),
                ("accept-language".to_string(), "fr,en".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(NominatimClient::with_client(BasicClient::new(), "not a url").is_err());
    }

    #[test]
    fn test_place_json() {
        let json = r#"[{
            "place_id": 88066702,
            "licence": "Data © OpenStreetMap contributors, ODbL 1.0.",
            "osm_type": "relation",
            "osm_id": 71525,
            "boundingbox": ["48.8155755", "48.9021560", "2.2241220", "2.4697602"],
            "lat": "48.8588897",
            "lon": "2.3200410",
            "display_name": "Paris, Île-de-France, France métropolitaine, France",
            "place_rank": 12,
            "category": "boundary",
            "type": "administrative",
            "importance": 0.9417,
            "address": {"city": "Paris", "country": "France", "country_code": "fr"}
        }]"#;
        let places: Vec<Place> = serde_json::from_str(json).unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].lat, "48.8588897");
        assert_eq!(places[0].lng, "2.3200410");
        assert_eq!(places[0].kind, "administrative");
        assert_eq!(places[0].address.country_code, "fr");
        assert_eq!(places[0].address.state, "");
    }
}
