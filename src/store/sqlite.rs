//! SQLite-backed key-value store.
//!
//! Every operation opens its own connection on the WAL-journaled database
//! file, so readers never contend on a shared handle.

use rusqlite::{Connection, OpenFlags, OptionalExtension, TransactionBehavior, params};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use super::KvStore;
use crate::error::Result;

pub struct SqliteKv {
    path: PathBuf,
}

impl SqliteKv {
    /// Creates or opens the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Opening mission store");

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let kv = Self {
            path: path.to_path_buf(),
        };
        let conn = kv.connect()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS missions (
                key   BLOB PRIMARY KEY NOT NULL,
                value BLOB NOT NULL
            )",
        )?;

        Ok(kv)
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }
}

impl KvStore for SqliteKv {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let conn = self.connect()?;
        let value = conn
            .query_row(
                "SELECT value FROM missions WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put_batch(&self, entries: &[(Vec<u8>, Vec<u8>)]) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let mut stmt =
                tx.prepare("INSERT OR REPLACE INTO missions (key, value) VALUES (?1, ?2)")?;
            for (key, value) in entries {
                stmt.execute(params![key, value])?;
            }
        }
        tx.commit()?;
        debug!(entries = entries.len(), "Committed store transaction");
        Ok(())
    }

    fn for_each(&self, visit: &mut dyn FnMut(&[u8], &[u8]) -> Result<()>) -> Result<()> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT key, value FROM missions ORDER BY key")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let key: Vec<u8> = row.get(0)?;
            let value: Vec<u8> = row.get(1)?;
            visit(&key, &value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_for_each() {
        let dir = tempfile::tempdir().unwrap();
        let kv = SqliteKv::open(dir.path().join("eco.db")).unwrap();

        assert_eq!(kv.get(b"a").unwrap(), None);

        kv.put_batch(&[(b"a".to_vec(), b"1".to_vec()), (b"b".to_vec(), b"2".to_vec())])
            .unwrap();
        kv.put_batch(&[(b"a".to_vec(), b"3".to_vec())]).unwrap();

        assert_eq!(kv.get(b"a").unwrap(), Some(b"3".to_vec()));

        let mut seen = Vec::new();
        kv.for_each(&mut |k, v| {
            seen.push((k.to_vec(), v.to_vec()));
            Ok(())
        })
        .unwrap();
        assert_eq!(
            seen,
            vec![(b"a".to_vec(), b"3".to_vec()), (b"b".to_vec(), b"2".to_vec())]
        );
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("eco.db");
        SqliteKv::open(&path)
            .unwrap()
            .put_batch(&[(vec![1], vec![2])])
            .unwrap();

        let kv = SqliteKv::open(&path).unwrap();
        assert_eq!(kv.get(&[1]).unwrap(), Some(vec![2]));
    }

    #[test]
    fn test_visitor_error_stops_scan() {
        let dir = tempfile::tempdir().unwrap();
        let kv = SqliteKv::open(dir.path().join("eco.db")).unwrap();
        kv.put_batch(&[(vec![1], vec![1]), (vec![2], vec![2])]).unwrap();

        let mut visited = 0;
        let res = kv.for_each(&mut |_, _| {
            visited += 1;
            Err(crate::error::EcoError::Invariant("stop".into()))
        });
        assert!(res.is_err());
        assert_eq!(visited, 1);
    }
}
