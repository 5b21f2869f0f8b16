//! Durable offline queue for heartbeats awaiting transmission.
//!
//! A single-file embedded store holding one logical bucket of
//! `(fingerprint id, JSON heartbeat)` records. Keys begin with the
//! zero-padded heartbeat timestamp, so iteration in key order is
//! approximately chronological. Pushing an existing key overwrites it,
//! which makes requeueing after a racing successful send idempotent.

pub mod sync;

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags, TransactionBehavior};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config;
use crate::heartbeat::{Fallback, Heartbeat};

/// Default queue file name inside the resources directory.
pub const DB_FILENAME: &str = "offline_heartbeats.bdb";

/// Maximum heartbeats per API request (server-imposed).
pub const SEND_LIMIT: usize = 25;

/// Default bound on heartbeats synced per invocation.
pub const SYNC_MAX_DEFAULT: usize = 1000;

/// Default number of heartbeats printed by the inspection command.
pub const PRINT_MAX_DEFAULT: usize = 10;

/// Attempts before requeue-with-retry gives up and drops the batch.
const MAX_REQUEUE_ATTEMPTS: u32 = 3;

/// How long an open waits on another writer before failing.
const OPEN_TIMEOUT: Duration = Duration::from_secs(30);

/// Offline queue errors. A locked or unopenable store is its own variant
/// because the caller loses the inbound batch when it hits.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to open offline queue: {0}")]
    OpenDb(String),
    #[error("offline queue error: {0}")]
    Store(#[from] rusqlite::Error),
    #[error("failed to serialize heartbeat: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Handle on the queue file. Opening acquires the store; every operation
/// runs inside its own transaction.
pub struct Queue {
    conn: Connection,
}

impl Queue {
    /// Open (creating if missing) the queue file. Blocks up to 30 s on a
    /// concurrent writer, then fails with [`Error::OpenDb`].
    pub fn open(path: &Path) -> Result<Self, Error> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .map_err(|e| Error::OpenDb(format!("failed to create {:?}: {}", dir, e)))?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )
        .map_err(|e| Error::OpenDb(e.to_string()))?;

        conn.busy_timeout(OPEN_TIMEOUT)
            .map_err(|e| Error::OpenDb(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS heartbeats (
                id TEXT PRIMARY KEY,
                heartbeat TEXT NOT NULL
            )",
            [],
        )
        .map_err(Self::map_busy)?;

        Ok(Self { conn })
    }

    /// Number of queued heartbeats.
    pub fn count(&self) -> Result<usize, Error> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM heartbeats", [], |row| row.get(0))
            .map_err(Self::map_busy)?;

        Ok(count as usize)
    }

    /// Store heartbeats keyed by fingerprint, all-or-nothing. Existing keys
    /// are overwritten (last write wins).
    pub fn push_many(&mut self, hh: &[Heartbeat]) -> Result<(), Error> {
        if hh.is_empty() {
            return Ok(());
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Self::map_busy)?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO heartbeats (id, heartbeat) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET heartbeat = excluded.heartbeat",
            )?;

            for h in hh {
                let data = serde_json::to_string(h)?;
                stmt.execute(rusqlite::params![h.id(), data])?;
            }
        }

        tx.commit().map_err(Self::map_busy)?;

        Ok(())
    }

    /// Remove and return the first `limit` heartbeats in key order, within
    /// one write transaction.
    pub fn pop_many(&mut self, limit: usize) -> Result<Vec<Heartbeat>, Error> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Self::map_busy)?;

        let popped = {
            let mut stmt =
                tx.prepare("SELECT id, heartbeat FROM heartbeats ORDER BY id LIMIT ?1")?;

            let rows: Vec<(String, String)> = stmt
                .query_map([limit as i64], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<_, _>>()?;

            let mut heartbeats = Vec::with_capacity(rows.len());
            let mut delete = tx.prepare("DELETE FROM heartbeats WHERE id = ?1")?;

            for (id, data) in rows {
                let h: Heartbeat = serde_json::from_str(&data)?;
                delete.execute([&id])?;
                heartbeats.push(h);
            }

            heartbeats
        };

        tx.commit().map_err(Self::map_busy)?;

        Ok(popped)
    }

    /// Read up to `limit` heartbeats in key order without removing them.
    pub fn read_many(&self, limit: usize) -> Result<Vec<Heartbeat>, Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT heartbeat FROM heartbeats ORDER BY id LIMIT ?1")?;

        let rows: Vec<String> = stmt
            .query_map([limit as i64], |row| row.get(0))?
            .collect::<Result<_, _>>()?;

        let mut heartbeats = Vec::with_capacity(rows.len());
        for data in rows {
            heartbeats.push(serde_json::from_str(&data)?);
        }

        Ok(heartbeats)
    }

    fn map_busy(e: rusqlite::Error) -> Error {
        match &e {
            rusqlite::Error::SqliteFailure(inner, _)
                if inner.code == rusqlite::ErrorCode::DatabaseBusy
                    || inner.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                Error::OpenDb(e.to_string())
            }
            _ => Error::Store(e),
        }
    }
}

/// Path of the queue file: explicit override > resources dir > cwd.
pub fn queue_filepath(path: Option<&str>) -> PathBuf {
    if let Some(p) = path.map(str::trim).filter(|p| !p.is_empty()) {
        return PathBuf::from(config::expand_tilde(p));
    }

    match config::resources_dir() {
        Ok(dir) => dir.join(DB_FILENAME),
        Err(e) => {
            warn!("failed getting resource directory, defaulting to current directory: {}", e);
            PathBuf::from(DB_FILENAME)
        }
    }
}

/// Push with exponential backoff: up to 3 attempts sleeping 2^attempt
/// seconds. On final failure the serialised batch is logged and dropped;
/// losing data beats spinning forever on a broken disk.
pub fn push_with_retry(path: &Path, hh: &[Heartbeat]) -> Result<(), Error> {
    if hh.is_empty() {
        return Ok(());
    }

    let mut attempt: u32 = 0;

    loop {
        let err = match Queue::open(path).and_then(|mut q| q.push_many(hh)) {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };

        attempt += 1;

        if attempt >= MAX_REQUEUE_ATTEMPTS {
            match serde_json::to_string(hh) {
                Ok(serialized) => warn!(
                    "abort requeuing after {} unsuccessful attempts: {}. heartbeats: {}",
                    attempt, err, serialized
                ),
                Err(e) => warn!(
                    "abort requeuing after {} unsuccessful attempts: {}. serialization failed: {}",
                    attempt, err, e
                ),
            }

            return Err(err);
        }

        let sleep = Duration::from_secs(2u64.pow(attempt));
        debug!("requeue attempt {} failed: {}. retrying in {:?}", attempt, err, sleep);
        std::thread::sleep(sleep);
    }
}

/// Pipeline fallback persisting undeliverable heartbeats to the queue.
pub struct QueueFallback {
    path: PathBuf,
}

impl QueueFallback {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Fallback for QueueFallback {
    fn requeue(&self, hh: Vec<Heartbeat>) -> anyhow::Result<()> {
        push_with_retry(&self.path, &hh)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heartbeat::{Category, EntityType};

    fn heartbeat(entity: &str, time: f64) -> Heartbeat {
        Heartbeat {
            entity: entity.to_string(),
            entity_type: EntityType::File,
            category: Category::Coding,
            time,
            is_write: Some(true),
            user_agent: "wakatime/1.90.0".to_string(),
            ..Default::default()
        }
    }

    fn queue_in(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join(DB_FILENAME)
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Queue::open(&queue_in(&dir)).unwrap();
        assert_eq!(queue.count().unwrap(), 0);
        assert!(queue.read_many(10).unwrap().is_empty());
    }

    #[test]
    fn test_push_pop_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = queue_in(&dir);

        let hh = vec![heartbeat("/tmp/a.go", 1585598060.1), heartbeat("/tmp/b.go", 1585598061.2)];

        let mut queue = Queue::open(&path).unwrap();
        queue.push_many(&hh).unwrap();
        assert_eq!(queue.count().unwrap(), 2);

        let popped = queue.pop_many(10).unwrap();
        assert_eq!(popped, hh);
        assert_eq!(queue.count().unwrap(), 0);
    }

    #[test]
    fn test_pop_respects_limit_and_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = queue_in(&dir);

        let hh: Vec<_> = (0..5).map(|i| heartbeat(&format!("/tmp/{}.go", i), 1585598060.0 + i as f64)).collect();

        let mut queue = Queue::open(&path).unwrap();
        queue.push_many(&hh).unwrap();

        let first = queue.pop_many(2).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].entity, "/tmp/0.go");
        assert_eq!(first[1].entity, "/tmp/1.go");
        assert_eq!(queue.count().unwrap(), 3);
    }

    #[test]
    fn test_push_same_id_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = queue_in(&dir);

        let mut h = heartbeat("/tmp/a.go", 1585598060.1);
        let mut queue = Queue::open(&path).unwrap();
        queue.push_many(std::slice::from_ref(&h)).unwrap();

        h.language = Some("Go".to_string());
        queue.push_many(std::slice::from_ref(&h)).unwrap();

        assert_eq!(queue.count().unwrap(), 1);
        let popped = queue.pop_many(1).unwrap();
        assert_eq!(popped[0].language.as_deref(), Some("Go"));
    }

    #[test]
    fn test_read_many_is_non_destructive() {
        let dir = tempfile::tempdir().unwrap();
        let path = queue_in(&dir);

        let hh = vec![heartbeat("/tmp/a.go", 1585598060.1)];
        let mut queue = Queue::open(&path).unwrap();
        queue.push_many(&hh).unwrap();

        assert_eq!(queue.read_many(10).unwrap(), hh);
        assert_eq!(queue.count().unwrap(), 1);
    }

    #[test]
    fn test_pop_zero_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut queue = Queue::open(&queue_in(&dir)).unwrap();
        assert!(queue.pop_many(0).unwrap().is_empty());
    }

    #[test]
    fn test_queue_filepath_override_wins() {
        let path = queue_filepath(Some("/tmp/custom.bdb"));
        assert_eq!(path, PathBuf::from("/tmp/custom.bdb"));
    }
}
