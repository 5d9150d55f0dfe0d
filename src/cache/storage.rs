//! SQLite-backed cache of HTTP response snapshots
//!
//! Entries live in named, versioned namespaces; one generation of static and
//! API caches is live at a time and stale generations are dropped wholesale
//! on activation.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};

use super::key::RequestKey;
use crate::error::StoreError;
use crate::net::HttpResponse;

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 1;

type Result<T> = std::result::Result<T, StoreError>;

/// A stored response snapshot.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub captured_at: i64,
}

impl CacheEntry {
    /// Rehydrate the snapshot into a response
    pub fn into_response(self) -> HttpResponse {
        HttpResponse {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

/// SQLite-backed cache storage.
pub struct CacheStorage {
    conn: Connection,
}

impl CacheStorage {
    /// Open or create cache storage at the default platform cache location
    pub fn open() -> Result<Self> {
        Self::open_at(&Self::default_dir()?)
    }

    /// The default cache directory (~/.cache/cartrace on Linux)
    pub fn default_dir() -> Result<PathBuf> {
        let base = dirs::cache_dir().ok_or(StoreError::NoHome)?;
        Ok(base.join("cartrace"))
    }

    /// Open cache storage at a specific directory (for testing)
    pub fn open_at(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| StoreError::Io(format!("Failed to create cache dir: {}", e)))?;

        let db_path = dir.join("cache.db");
        let conn = Connection::open(&db_path)?;

        // Check schema version - nuke if mismatched
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Cache schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            std::fs::remove_file(&db_path)
                .map_err(|e| StoreError::Io(format!("Failed to remove cache DB: {}", e)))?;
            return Self::open_at(dir);
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                namespace   TEXT NOT NULL,
                request_key TEXT NOT NULL,
                method      TEXT NOT NULL,
                url         TEXT NOT NULL,
                status      INTEGER NOT NULL,
                headers     TEXT NOT NULL,
                body        BLOB NOT NULL,
                captured_at INTEGER NOT NULL,
                PRIMARY KEY (namespace, request_key)
            );

            CREATE INDEX IF NOT EXISTS idx_cache_namespace ON cache_entries(namespace);
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        Ok(Self { conn })
    }

    /// Look up a snapshot by namespace and request key
    pub fn get(&self, namespace: &str, key: &RequestKey) -> Result<Option<CacheEntry>> {
        let row: Option<(u16, String, Vec<u8>, i64)> = self
            .conn
            .query_row(
                "SELECT status, headers, body, captured_at FROM cache_entries
                 WHERE namespace = ?1 AND request_key = ?2",
                params![namespace, key.digest()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        match row {
            Some((status, headers_json, body, captured_at)) => {
                let headers: Vec<(String, String)> =
                    serde_json::from_str(&headers_json).unwrap_or_default();
                Ok(Some(CacheEntry {
                    status,
                    headers,
                    body,
                    captured_at,
                }))
            }
            None => Ok(None),
        }
    }

    /// Store a response snapshot, overwriting any previous entry for the key.
    ///
    /// Only success-status responses are persisted; anything else is refused
    /// so stale good data is never clobbered by an error page.
    pub fn put(&self, namespace: &str, key: &RequestKey, response: &HttpResponse) -> Result<()> {
        if !response.is_success() {
            return Err(StoreError::NotCacheable(response.status));
        }

        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| StoreError::Io(format!("Failed to serialize headers: {}", e)))?;

        self.conn.execute(
            "INSERT OR REPLACE INTO cache_entries
             (namespace, request_key, method, url, status, headers, body, captured_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                namespace,
                key.digest(),
                key.method(),
                key.canonical_url(),
                response.status,
                headers_json,
                response.body,
                Utc::now().timestamp(),
            ],
        )?;
        Ok(())
    }

    /// All namespaces that currently hold at least one entry
    pub fn namespaces(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT namespace FROM cache_entries ORDER BY namespace")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Delete every entry in a namespace, returning the number removed
    pub fn delete_namespace(&self, namespace: &str) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM cache_entries WHERE namespace = ?1",
            params![namespace],
        )?;
        Ok(deleted)
    }

    /// Get cache statistics for a namespace
    pub fn stats(&self, namespace: &str) -> Result<CacheStats> {
        let (entries, total_size): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(LENGTH(body)), 0) FROM cache_entries
             WHERE namespace = ?1",
            params![namespace],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        let oldest: Option<i64> = self
            .conn
            .query_row(
                "SELECT MIN(captured_at) FROM cache_entries WHERE namespace = ?1",
                params![namespace],
                |r| r.get(0),
            )
            .optional()?
            .flatten();

        Ok(CacheStats {
            entries: entries as usize,
            total_size_bytes: total_size as usize,
            oldest_entry: oldest,
        })
    }
}

/// Statistics about one namespace
#[derive(Debug)]
pub struct CacheStats {
    pub entries: usize,
    pub total_size_bytes: usize,
    pub oldest_entry: Option<i64>,
}
