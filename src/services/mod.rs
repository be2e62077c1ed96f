pub mod geocoder;

pub use geocoder::{Address, Geocoder, Place};
