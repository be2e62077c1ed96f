//! Persistent mission storage.
//!
//! [`KvStore`] is the seam to the embedded key-value engine ([`SqliteKv`]).
//! [`MissionStore`] layers the mission codec and the last-id watermark on
//! top of it.

pub mod codec;
mod sqlite;

pub use sqlite::SqliteKv;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::Result;
use crate::mission::Mission;
use crate::stats::Summary;

/// Minimal key-value engine.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Writes every entry in a single transaction: all of them or none.
    fn put_batch(&self, entries: &[(Vec<u8>, Vec<u8>)]) -> Result<()>;

    /// Visits every entry; the first visitor error aborts the scan.
    fn for_each(&self, visit: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>) -> Result<()>;
}

/// Missions keyed by id, with the highest stored id as watermark.
pub struct MissionStore<S> {
    kv: S,
    last_id: i32,
}

impl<S: KvStore> MissionStore<S> {
    /// Wraps `kv` and recovers the watermark with a full scan.
    pub fn open(kv: S) -> Result<Self> {
        let mut last_id = 0;
        let mut count = 0usize;
        kv.for_each(&mut |key, _| {
            let id = codec::decode_key(key)?;
            last_id = last_id.max(id);
            count += 1;
            Ok(())
        })?;
        info!(missions = count, last_id, "Mission store ready");
        Ok(Self { kv, last_id })
    }

    /// Highest mission id stored, 0 when empty.
    pub fn last_id(&self) -> i32 {
        self.last_id
    }

    pub fn get(&self, id: i32) -> Result<Option<Mission>> {
        self.kv
            .get(&codec::encode_key(id))?
            .map(|bytes| codec::decode(&bytes))
            .transpose()
    }

    /// Stores `missions` atomically, replacing any mission with the same id,
    /// then advances the watermark.
    ///
    /// Every mission is encoded before the store is touched: one bad mission
    /// leaves the store unchanged.
    pub fn store_batch(&mut self, missions: &[Mission]) -> Result<usize> {
        if missions.is_empty() {
            return Ok(0);
        }

        let entries = missions
            .iter()
            .map(|m| Ok((codec::encode_key(m.id).to_vec(), codec::encode(m)?)))
            .collect::<Result<Vec<_>>>()?;

        self.kv.put_batch(&entries)?;

        let batch_max = missions.iter().map(|m| m.id).max().unwrap_or(self.last_id);
        self.last_id = self.last_id.max(batch_max);
        Ok(entries.len())
    }

    pub fn for_each_mission(&self, mut visit: impl FnMut(Mission) -> Result<()>) -> Result<()> {
        self.kv
            .for_each(&mut |_, value| visit(codec::decode(value)?))
    }

    /// Every stored mission, sorted by id.
    pub fn missions(&self) -> Result<Vec<Mission>> {
        let mut out = Vec::new();
        self.for_each_mission(|m| {
            out.push(m);
            Ok(())
        })?;
        out.sort_by_key(|m| m.id);
        Ok(out)
    }

    /// Aggregates every stored mission as seen at `now`.
    pub fn summary(&self, now: DateTime<Utc>) -> Result<Summary> {
        let mut summary = Summary::new();
        self.for_each_mission(|m| {
            summary.add(&m, now);
            Ok(())
        })?;
        Ok(summary)
    }
}

impl MissionStore<SqliteKv> {
    pub fn open_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::open(SqliteKv::open(path)?)
    }
}
