//! Durable store for queued mutations
//!
//! A mutation that could not reach the network is parked here until a later
//! drain replays it. Items are append-only: replay resubmits and deletes on
//! success, never edits in place.

use chrono::Utc;
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::net::{HttpRequest, Method};

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 1;

type Result<T> = std::result::Result<T, StoreError>;

/// A pending mutation awaiting replay.
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub id: i64,
    pub url: String,
    pub method: String,
    pub body: Option<Vec<u8>>,
    pub content_type: Option<String>,
    pub category: String,
    pub enqueued_at: i64,
}

impl QueueItem {
    /// Rebuild the original HTTP request for resubmission
    pub fn to_request(&self) -> Result<HttpRequest> {
        let method = Method::from_bytes(self.method.as_bytes())
            .map_err(|_| StoreError::InvalidMethod(self.id))?;

        Ok(match &self.body {
            Some(body) => HttpRequest::with_body(
                method,
                self.url.clone(),
                body.clone(),
                self.content_type.as_deref(),
            ),
            None => HttpRequest {
                method,
                url: self.url.clone(),
                headers: Vec::new(),
                body: None,
            },
        })
    }
}

/// A mutation about to be queued.
#[derive(Debug, Clone)]
pub struct NewQueueItem {
    pub url: String,
    pub method: Method,
    pub body: Option<Vec<u8>>,
    pub content_type: Option<String>,
    pub category: String,
}

/// SQLite-backed offline action queue.
pub struct QueueStorage {
    conn: Connection,
}

impl QueueStorage {
    /// Open or create queue storage at the default platform location
    pub fn open() -> Result<Self> {
        let base = dirs::cache_dir().ok_or(StoreError::NoHome)?;
        Self::open_at(&base.join("cartrace"))
    }

    /// Open queue storage at a specific directory (for testing)
    pub fn open_at(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| StoreError::Io(format!("Failed to create queue dir: {}", e)))?;

        let db_path = dir.join("queue.db");
        let conn = Connection::open(&db_path)?;

        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Queue schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            Self::nuke(&db_path)?;
            return Self::open_at(dir);
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS queue_items (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                url          TEXT NOT NULL,
                method       TEXT NOT NULL,
                body         BLOB,
                content_type TEXT,
                category     TEXT NOT NULL,
                enqueued_at  INTEGER NOT NULL,
                in_flight    INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_queue_category ON queue_items(category);
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        // Claims left behind by an interrupted drain are stale by definition
        conn.execute("UPDATE queue_items SET in_flight = 0 WHERE in_flight = 1", [])?;

        Ok(Self { conn })
    }

    /// Append a pending mutation, returning its id
    pub fn enqueue(&self, item: NewQueueItem) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO queue_items (url, method, body, content_type, category, enqueued_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                item.url,
                item.method.as_str(),
                item.body,
                item.content_type,
                item.category,
                Utc::now().timestamp(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Categories with unclaimed items, ordered by their oldest item
    pub fn categories(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT category FROM queue_items WHERE in_flight = 0
             GROUP BY category ORDER BY MIN(id)",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Unclaimed items in a category, in enqueue order
    pub fn pending_in(&self, category: &str) -> Result<Vec<QueueItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, url, method, body, content_type, category, enqueued_at
             FROM queue_items WHERE category = ?1 AND in_flight = 0 ORDER BY id",
        )?;
        let items = stmt
            .query_map(params![category], |row| {
                Ok(QueueItem {
                    id: row.get(0)?,
                    url: row.get(1)?,
                    method: row.get(2)?,
                    body: row.get(3)?,
                    content_type: row.get(4)?,
                    category: row.get(5)?,
                    enqueued_at: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Atomically claim an item for replay.
    ///
    /// Returns false when another drain already holds it; the atomic update
    /// is what keeps concurrent drains from double-submitting.
    pub fn claim(&self, id: i64) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE queue_items SET in_flight = 1 WHERE id = ?1 AND in_flight = 0",
            params![id],
        )?;
        Ok(updated > 0)
    }

    /// Return a claimed item to the queue after a failed replay
    pub fn release(&self, id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE queue_items SET in_flight = 0 WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    /// Remove an item after successful replay
    pub fn delete(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM queue_items WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Total number of queued items (claimed or not)
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM queue_items", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Pending counts grouped by category
    pub fn pending_by_category(&self) -> Result<Vec<(String, usize)>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, COUNT(*) FROM queue_items GROUP BY category ORDER BY category",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Manually clear the queue, returning the number of items removed
    pub fn clear(&self) -> Result<usize> {
        let deleted = self.conn.execute("DELETE FROM queue_items", [])?;
        Ok(deleted)
    }

    /// The database path for a given directory
    pub fn db_path(dir: &Path) -> PathBuf {
        dir.join("queue.db")
    }

    fn nuke(db_path: &Path) -> Result<()> {
        if db_path.exists() {
            std::fs::remove_file(db_path)
                .map_err(|e| StoreError::Io(format!("Failed to remove queue DB: {}", e)))?;
        }
        Ok(())
    }
}
