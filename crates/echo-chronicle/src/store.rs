use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::Connection;
use tracing::{debug, info};

use echo_config::ChronicleConfig;
use echo_core::{EchoError, Result};

use crate::entry::LogEntry;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        user TEXT NOT NULL,
        message TEXT NOT NULL
    );
";

/// The Chronicle store. Sole owner of the SQLite file.
///
/// Every operation takes the connection lock with a bounded wait, so writes
/// are serialized and readers only ever see whole entries. Cloning is cheap
/// and shares the same connection.
#[derive(Clone)]
pub struct ChronicleStore {
    db: Arc<Mutex<Connection>>,
    lock_timeout: Duration,
}

impl ChronicleStore {
    /// Open or create the Chronicle at the given path and ensure the schema.
    pub fn open(path: &Path, lock_timeout: Duration) -> Result<Self> {
        info!(?path, "opening chronicle");

        let conn = Connection::open(path).map_err(store_err)?;

        conn.busy_timeout(lock_timeout).map_err(store_err)?;
        // WAL for concurrent readers; FULL so a commit is on disk before append returns
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")
            .map_err(store_err)?;
        conn.execute_batch(SCHEMA).map_err(store_err)?;

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            lock_timeout,
        })
    }

    /// Open the Chronicle described by the `[chronicle]` config section.
    pub fn from_config(config: &ChronicleConfig) -> Result<Self> {
        Self::open(&config.db_path, config.lock_timeout())
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        Self::open(Path::new(":memory:"), Duration::from_secs(5))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db
            .try_lock_for(self.lock_timeout)
            .ok_or(EchoError::StoreBusy(self.lock_timeout))
    }

    /// Durably record one entry and return it with its assigned id.
    ///
    /// Either the entry is committed before this returns, or an error is
    /// returned and nothing was written.
    pub fn append(&self, author: &str, message: &str, timestamp: DateTime<Utc>) -> Result<LogEntry> {
        if author.trim().is_empty() {
            return Err(EchoError::InvalidEntry("author is empty".into()));
        }
        if message.trim().is_empty() {
            return Err(EchoError::InvalidEntry("message is empty".into()));
        }
        let timestamp = timestamp.to_rfc3339_opts(SecondsFormat::Micros, true);

        let mut db = self.lock()?;
        let tx = db.transaction().map_err(store_err)?;
        tx.execute(
            "INSERT INTO logs (timestamp, user, message) VALUES (?1, ?2, ?3)",
            rusqlite::params![timestamp, author, message],
        )
        .map_err(store_err)?;
        let id = tx.last_insert_rowid();
        tx.commit().map_err(store_err)?;
        drop(db);

        debug!(id, author, "chronicle entry appended");
        Ok(LogEntry {
            id,
            timestamp,
            author: author.to_string(),
            message: message.to_string(),
        })
    }

    /// The `n` most recently appended entries, oldest first.
    pub fn recent(&self, n: usize) -> Result<Vec<LogEntry>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(n).unwrap_or(i64::MAX);

        let db = self.lock()?;
        let mut stmt = db
            .prepare(
                "SELECT id, timestamp, user, message FROM (
                     SELECT id, timestamp, user, message FROM logs
                     ORDER BY id DESC
                     LIMIT ?1
                 )
                 ORDER BY id ASC",
            )
            .map_err(store_err)?;

        let entries = stmt
            .query_map(rusqlite::params![limit], |row| {
                Ok(LogEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    author: row.get(2)?,
                    message: row.get(3)?,
                })
            })
            .map_err(store_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(store_err)?;

        Ok(entries)
    }

    /// Number of entries ever appended.
    pub fn count(&self) -> Result<u64> {
        let db = self.lock()?;
        let count: i64 = db
            .query_row("SELECT COUNT(*) FROM logs", [], |row| row.get(0))
            .map_err(store_err)?;
        Ok(count as u64)
    }

    /// [`append`](Self::append) on the blocking thread pool.
    ///
    /// A write that has started runs to completion even if the caller is
    /// dropped.
    pub async fn append_async(
        &self,
        author: String,
        message: String,
        timestamp: DateTime<Utc>,
    ) -> Result<LogEntry> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.append(&author, &message, timestamp))
            .await
            .map_err(|e| EchoError::Store(format!("append task failed: {e}")))?
    }

    /// [`recent`](Self::recent) on the blocking thread pool.
    pub async fn recent_async(&self, n: usize) -> Result<Vec<LogEntry>> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.recent(n))
            .await
            .map_err(|e| EchoError::Store(format!("recall task failed: {e}")))?
    }
}

fn store_err(e: rusqlite::Error) -> EchoError {
    EchoError::Store(e.to_string())
}
