//! Manually curated override tables.
//!
//! Both tables are plain JSON arrays on disk, loaded once per run and passed
//! by reference to the classifier and the resolver:
//!
//! ```json
//! [{"id": 1204, "tid": "train"}]
//! ```
//!
//! ```json
//! [{"id": 1377, "dest": ["CERN", "Meyrin", "Switzerland"]}]
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::error::{EcoError, Result};
use crate::transport::TransportMode;

/// Transport mode overrides for records using the catch-all transport code.
#[derive(Debug, Clone, Default)]
pub struct TransportFixups {
    entries: HashMap<i32, TransportMode>,
}

#[derive(Deserialize)]
struct RawTransportFixup {
    id: i32,
    tid: String,
}

impl TransportFixups {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let fixups = Self::from_json(&content)?;
        debug!(path = %path.as_ref().display(), entries = fixups.len(), "Loaded transport fixups");
        Ok(fixups)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let raw: Vec<RawTransportFixup> = serde_json::from_str(content)?;
        let entries = raw
            .into_iter()
            .map(|v| Ok((v.id, v.tid.parse::<TransportMode>()?)))
            .collect::<Result<HashMap<_, _>>>()?;
        Ok(Self { entries })
    }

    pub fn get(&self, id: i32) -> Option<TransportMode> {
        self.entries.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(i32, TransportMode)> for TransportFixups {
    fn from_iter<I: IntoIterator<Item = (i32, TransportMode)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Cleaned-up destination triples, `[address, city, country]`.
#[derive(Debug, Clone, Default)]
pub struct DestinationFixups {
    entries: HashMap<i32, Vec<String>>,
}

#[derive(Deserialize)]
struct RawDestinationFixup {
    id: i32,
    dest: Vec<String>,
}

impl DestinationFixups {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let fixups = Self::from_json(&content)?;
        debug!(path = %path.as_ref().display(), entries = fixups.len(), "Loaded destination fixups");
        Ok(fixups)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let raw: Vec<RawDestinationFixup> = serde_json::from_str(content)?;
        Ok(Self {
            entries: raw.into_iter().map(|v| (v.id, v.dest)).collect(),
        })
    }

    pub fn get(&self, id: i32) -> Option<&[String]> {
        self.entries.get(&id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(i32, Vec<String>)> for DestinationFixups {
    fn from_iter<I: IntoIterator<Item = (i32, Vec<String>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Both override tables of a run.
#[derive(Debug, Clone, Default)]
pub struct FixupTables {
    pub transport: TransportFixups,
    pub destination: DestinationFixups,
}

impl FixupTables {
    pub fn load(transport: impl AsRef<Path>, destination: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            transport: TransportFixups::load(transport)?,
            destination: DestinationFixups::load(destination)?,
        })
    }
}
