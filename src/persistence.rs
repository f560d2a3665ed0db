//! Query history persistence
//!
//! Every lookup leaves one row in `wallet_queries`. Rows are never updated and are
//! read back in primary key order, which is also insertion order.

use crate::error::{Result, WatchError};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;

/// How long a session waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletQuery {
    pub id: i64,
    pub wallet_address: String,
    pub timestamp: DateTime<Utc>,
}

/// Abstraction over history backends. Methods block; async callers should run
/// them on the blocking pool.
pub trait QueryHistory: Send + Sync {
    /// Insert one row and return its id. A `None` address is a constraint error.
    fn record(&self, address: Option<&str>, at: DateTime<Utc>) -> Result<i64>;
    /// Rows in insertion order, skipping `skip` and returning at most `limit`.
    fn list(&self, skip: u64, limit: u64) -> Result<Vec<WalletQuery>>;
    fn find_by_address(&self, address: &str) -> Result<Vec<WalletQuery>>;
    fn count(&self) -> Result<u64>;
}

/// SQLite-backed history. Holds only the path; every operation opens its own
/// connection and closes it when the operation returns.
#[derive(Debug, Clone)]
pub struct Database {
    path: String,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let db = Database {
            path: path.to_string(),
        };

        db.with_session(|conn| {
            let mode: String =
                conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
            tracing::debug!(path = %db.path, journal_mode = %mode, "store.open");

            conn.execute(
                "CREATE TABLE IF NOT EXISTS wallet_queries (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    wallet_address TEXT NOT NULL,
                    timestamp TEXT NOT NULL
                )",
                [],
            )
            .map_err(|e| {
                WatchError::Database(format!("Failed to create wallet_queries table: {}", e))
            })?;

            conn.execute(
                "CREATE INDEX IF NOT EXISTS ix_wallet_queries_wallet_address
                 ON wallet_queries (wallet_address)",
                [],
            )
            .map_err(|e| WatchError::Database(format!("Failed to create index: {}", e)))?;

            Ok(())
        })?;

        Ok(db)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Run `f` against a fresh connection. The connection is dropped, and so
    /// closed, on every exit path.
    fn with_session<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn = Connection::open(&self.path)
            .map_err(|e| WatchError::Database(format!("Failed to open database: {}", e)))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        tracing::trace!(path = %self.path, "store.session.acquire");

        let result = f(&mut conn);

        drop(conn);
        tracing::trace!(path = %self.path, ok = result.is_ok(), "store.session.release");
        result
    }
}

fn row_to_query(row: &rusqlite::Row<'_>) -> rusqlite::Result<WalletQuery> {
    Ok(WalletQuery {
        id: row.get(0)?,
        wallet_address: row.get(1)?,
        timestamp: row.get(2)?,
    })
}

impl QueryHistory for Database {
    fn record(&self, address: Option<&str>, at: DateTime<Utc>) -> Result<i64> {
        self.with_session(|conn| {
            // Dropping an uncommitted transaction rolls it back.
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO wallet_queries (wallet_address, timestamp) VALUES (?1, ?2)",
                params![address, at],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;

            tracing::debug!(id, address = ?address, "store.record");
            Ok(id)
        })
    }

    fn list(&self, skip: u64, limit: u64) -> Result<Vec<WalletQuery>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let skip = i64::try_from(skip).unwrap_or(i64::MAX);

        self.with_session(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, wallet_address, timestamp FROM wallet_queries
                 ORDER BY id ASC LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt.query_map(params![limit, skip], row_to_query)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(WatchError::from)
        })
    }

    fn find_by_address(&self, address: &str) -> Result<Vec<WalletQuery>> {
        self.with_session(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, wallet_address, timestamp FROM wallet_queries
                 WHERE wallet_address = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![address], row_to_query)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(WatchError::from)
        })
    }

    fn count(&self) -> Result<u64> {
        self.with_session(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM wallet_queries", [], |row| {
                row.get(0)
            })?;
            Ok(n as u64)
        })
    }
}

/// In-memory history with the same semantics as [`Database`], for tests and
/// ephemeral runs.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    rows: Mutex<Vec<WalletQuery>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&self) -> Result<std::sync::MutexGuard<'_, Vec<WalletQuery>>> {
        self.rows
            .lock()
            .map_err(|_| WatchError::Database("Mutex poisoned".to_string()))
    }
}

impl QueryHistory for InMemoryHistory {
    fn record(&self, address: Option<&str>, at: DateTime<Utc>) -> Result<i64> {
        let address = address.ok_or_else(|| {
            WatchError::Constraint("NOT NULL constraint failed: wallet_queries.wallet_address".to_string())
        })?;

        let mut rows = self.rows()?;
        let id = rows.last().map(|q| q.id + 1).unwrap_or(1);
        rows.push(WalletQuery {
            id,
            wallet_address: address.to_string(),
            timestamp: at,
        });
        Ok(id)
    }

    fn list(&self, skip: u64, limit: u64) -> Result<Vec<WalletQuery>> {
        let rows = self.rows()?;
        Ok(rows
            .iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    fn find_by_address(&self, address: &str) -> Result<Vec<WalletQuery>> {
        let rows = self.rows()?;
        Ok(rows
            .iter()
            .filter(|q| q.wallet_address == address)
            .cloned()
            .collect())
    }

    fn count(&self) -> Result<u64> {
        Ok(self.rows()?.len() as u64)
    }
}
