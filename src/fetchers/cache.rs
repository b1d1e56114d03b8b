//! Page cache keyed by normalized request URL.
//!
//! The cache never evicts; the fetcher decides freshness from `fetched_at_ms`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// A stored fetch result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,
    pub fetched_at_ms: i64,
    pub resolved_url: String,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Storage contract for fetched pages.
#[async_trait]
pub trait PageCache: Send + Sync {
    async fn get(&self, url: &str) -> Result<Option<CacheEntry>, CacheError>;
    async fn set(&self, entry: &CacheEntry) -> Result<(), CacheError>;
}

const MEMORY_PATH: &str = ":memory:";

/// SQLite-backed page cache, safe to share between concurrent CLI processes.
pub struct SqlitePageCache {
    conn: Mutex<Connection>,
}

impl SqlitePageCache {
    /// Open (or create) the cache database at `path`.
    ///
    /// The busy timeout and WAL journal are best-effort; failing to enable
    /// them never fails construction.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref();
        let in_memory = path.as_os_str() == MEMORY_PATH;

        if !in_memory {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        if let Err(e) = conn.busy_timeout(Duration::from_secs(5)) {
            debug!("Could not set cache busy timeout: {}", e);
        }
        if !in_memory {
            if let Err(e) =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })
            {
                debug!("Could not enable WAL journal for cache: {}", e);
            }
        }

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS page_cache (
                url           TEXT PRIMARY KEY,
                fetched_at_ms INTEGER NOT NULL,
                resolved_url  TEXT NOT NULL,
                status        INTEGER NOT NULL,
                headers_json  TEXT NOT NULL,
                body          TEXT NOT NULL
            );",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, CacheError> {
        Self::open(MEMORY_PATH)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::Poisoned)
    }
}

#[async_trait]
impl PageCache for SqlitePageCache {
    async fn get(&self, url: &str) -> Result<Option<CacheEntry>, CacheError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT url, fetched_at_ms, resolved_url, status, headers_json, body
                 FROM page_cache WHERE url = ?1",
                params![url],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, u16>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        Ok(row.map(
            |(url, fetched_at_ms, resolved_url, status, headers_json, body)| CacheEntry {
                url,
                fetched_at_ms,
                resolved_url,
                status,
                headers: serde_json::from_str(&headers_json).unwrap_or_default(),
                body,
            },
        ))
    }

    async fn set(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let headers_json = serde_json::to_string(&entry.headers).unwrap_or_else(|_| "{}".into());
        self.lock()?.execute(
            "INSERT OR REPLACE INTO page_cache
                (url, fetched_at_ms, resolved_url, status, headers_json, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.url,
                entry.fetched_at_ms,
                entry.resolved_url,
                entry.status,
                headers_json,
                entry.body
            ],
        )?;
        Ok(())
    }
}
