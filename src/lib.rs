pub mod classify;
pub mod config;
pub mod error;
pub mod fetch;
pub mod fixups;
pub mod geo;
pub mod infra;
pub mod legs;
pub mod mission;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod resolve;
pub mod server;
pub mod services;
pub mod stats;
pub mod store;
pub mod transport;
