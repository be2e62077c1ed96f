mod client;

pub use client::{EcoClient, base_url};
