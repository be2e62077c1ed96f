//! Error types for mission ingestion, storage and aggregation.
//!
//! Every variant belongs to one [`ErrorKind`]: malformed input that aborts a
//! run, per-mission data-quality problems that an operator fixes by extending
//! the fixup tables, persistence failures, and programmer-invariant
//! violations.

use thiserror::Error;

/// Coarse classification of an [`EcoError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed source data. Fatal for the whole run.
    Parse,
    /// A single record could not be resolved. Fatal or skipped per policy.
    DataQuality,
    /// Store, codec, network or I/O failure. Fatal for the run.
    Persistence,
    /// Broken internal invariant. Always fatal.
    Invariant,
}

#[derive(Error, Debug)]
pub enum EcoError {
    #[error("invalid {field} date {value:?}: {source}")]
    DateParse {
        field: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("no transport fixup for mission {id} (transport code {code})")]
    MissingTransportFixup { id: i32, code: i32 },

    #[error("unknown transport mode name {0:?}")]
    UnknownTransportName(String),

    #[error("mission {id}: destination {destination:?} has {found} token(s), need 3")]
    MalformedDestination {
        id: i32,
        destination: String,
        found: usize,
    },

    #[error("mission {id}: empty destination token #{index} in {tokens:?}")]
    EmptyDestinationToken {
        id: i32,
        index: usize,
        tokens: Vec<String>,
    },

    #[error("mission {id}: geocoder lookup for {query:?} failed: {reason}")]
    Geocoder {
        id: i32,
        query: String,
        reason: String,
    },

    #[error("mission {id}: no place found for {query:?}")]
    NoPlace { id: i32, query: String },

    #[error("mission {id}: invalid {axis} {value:?} returned by geocoder")]
    InvalidCoordinate {
        id: i32,
        axis: &'static str,
        value: String,
    },

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bitcode::Error),

    #[error("mission {id} cannot be stored: {reason}")]
    InvalidRecord { id: i32, reason: String },

    #[error("unsupported mission record format {0}")]
    RecordFormat(u8),

    #[error("unknown transport byte {0} in stored record")]
    TransportByte(u8),

    #[error("invalid record key of {0} byte(s)")]
    RecordKey(usize),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered {status}: {body}")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl EcoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EcoError::DateParse { .. } | EcoError::Csv(_) => ErrorKind::Parse,
            EcoError::MissingTransportFixup { .. }
            | EcoError::MalformedDestination { .. }
            | EcoError::EmptyDestinationToken { .. }
            | EcoError::Geocoder { .. }
            | EcoError::NoPlace { .. }
            | EcoError::InvalidCoordinate { .. } => ErrorKind::DataQuality,
            EcoError::Store(_)
            | EcoError::Codec(_)
            | EcoError::InvalidRecord { .. }
            | EcoError::RecordFormat(_)
            | EcoError::RecordKey(_)
            | EcoError::Json(_)
            | EcoError::Io(_)
            | EcoError::Http(_)
            | EcoError::HttpStatus { .. } => ErrorKind::Persistence,
            EcoError::UnknownTransportName(_) | EcoError::Configuration { .. } => {
                ErrorKind::Parse
            }
            EcoError::TransportByte(_) | EcoError::Invariant(_) => ErrorKind::Invariant,
        }
    }

    /// Whether the error only concerns one record and may be skipped.
    pub fn is_data_quality(&self) -> bool {
        self.kind() == ErrorKind::DataQuality
    }
}

pub type Result<T> = std::result::Result<T, EcoError>;
