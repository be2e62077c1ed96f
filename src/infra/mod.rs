//! Clients of the external services.
//!
//! [`nominatim::NominatimClient`] implements the [`Geocoder`](crate::services::Geocoder)
//! seam on top of OpenStreetMap Nominatim. [`eco::EcoClient`] talks to the
//! mission server.

pub mod eco;
pub mod nominatim;
