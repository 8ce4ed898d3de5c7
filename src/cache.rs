//! On-disk HTTP response cache backed by SQLite.
//!
//! Upstream lookups (BibTeX records, reference lists, journal abbreviations)
//! rarely change, so successful responses are kept for a configurable period
//! (30 days by default) and served without touching the network.
//!
//! # Example
//!
//! ```no_run
//! use bibfetch_core::ResponseCache;
//! use std::path::Path;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = ResponseCache::open(Path::new("http_cache.db"), Duration::from_secs(3600)).await?;
//! let key = ResponseCache::cache_key("application/x-bibtex", "https://api.crossref.org/works/10.1/x");
//! if let Some(hit) = cache.get(&key).await? {
//!     println!("cached status {}", hit.status);
//! }
//! # Ok(())
//! # }
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, instrument};

/// Responses older than this are ignored unless configured otherwise.
pub const DEFAULT_CACHE_EXPIRY: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Only these statuses are stored. 400 is Crossref's answer for malformed
/// DOIs, which will not start resolving later.
pub const CACHEABLE_STATUSES: [u16; 2] = [200, 400];

/// Kept low for SQLite since it uses file-level locking.
const DEFAULT_MAX_CONNECTIONS: u32 = 2;

/// SQLite busy timeout in milliseconds.
const BUSY_TIMEOUT_MS: u32 = 5000;

/// Cache-related errors.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Failed to connect to or query the database.
    #[error("response cache database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failed to run migrations.
    #[error("failed to run response cache migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Failed to create the cache directory.
    #[error("failed to create cache directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A response served from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub body: String,
}

/// SQLite-backed response cache with time-based expiry.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    pool: SqlitePool,
    expire_after: Duration,
}

impl ResponseCache {
    /// Opens (creating if needed) the cache database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the directory cannot be created, the
    /// connection fails, or migrations fail.
    #[instrument(skip(path), fields(path = %path.display()))]
    pub async fn open(path: &Path, expire_after: Duration) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_millis(u64::from(BUSY_TIMEOUT_MS)));
        let pool = SqlitePoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool, expire_after })
    }

    /// Creates an in-memory cache, mainly for tests.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the connection or migrations fail.
    #[instrument]
    pub async fn in_memory(expire_after: Duration) -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool, expire_after })
    }

    /// Derives the cache key for a request: SHA-256 of `accept` and `url`.
    #[must_use]
    pub fn cache_key(accept: &str, url: &str) -> String {
        let digest = Sha256::new()
            .chain_update(accept.as_bytes())
            .chain_update(b"\n")
            .chain_update(url.as_bytes())
            .finalize();
        digest.iter().map(|byte| format!("{byte:02x}")).collect()
    }

    /// Whether a response with `status` may be stored.
    #[must_use]
    pub fn is_cacheable(status: u16) -> bool {
        CACHEABLE_STATUSES.contains(&status)
    }

    /// Returns a fresh cached response for `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Database`] if the query fails.
    pub async fn get(&self, key: &str) -> Result<Option<CachedResponse>, CacheError> {
        self.get_at(key, unix_now()).await
    }

    /// Stores a response, replacing any previous one for `key`.
    /// Statuses outside [`CACHEABLE_STATUSES`] are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Database`] if the insert fails.
    pub async fn store(
        &self,
        key: &str,
        url: &str,
        status: u16,
        body: &str,
    ) -> Result<(), CacheError> {
        self.store_at(key, url, status, body, unix_now()).await
    }

    /// Deletes expired responses and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Database`] if the delete fails.
    pub async fn purge_expired(&self) -> Result<u64, CacheError> {
        let cutoff = unix_now() - self.expiry_secs();
        let result = sqlx::query("DELETE FROM http_cache WHERE fetched_at < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Gracefully closes all connections in the pool.
    #[instrument(skip(self))]
    pub async fn close(self) {
        self.pool.close().await;
    }

    pub(crate) async fn get_at(
        &self,
        key: &str,
        now: i64,
    ) -> Result<Option<CachedResponse>, CacheError> {
        let row: Option<(i64, String, i64)> =
            sqlx::query_as("SELECT status, body, fetched_at FROM http_cache WHERE cache_key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        let Some((status, body, fetched_at)) = row else {
            return Ok(None);
        };
        if now - fetched_at > self.expiry_secs() {
            debug!(key, "Cached response expired");
            return Ok(None);
        }
        let Ok(status) = u16::try_from(status) else {
            return Ok(None);
        };
        Ok(Some(CachedResponse { status, body }))
    }

    pub(crate) async fn store_at(
        &self,
        key: &str,
        url: &str,
        status: u16,
        body: &str,
        now: i64,
    ) -> Result<(), CacheError> {
        if !Self::is_cacheable(status) {
            return Ok(());
        }
        sqlx::query(
            "INSERT INTO http_cache (cache_key, url, status, body, fetched_at) VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(cache_key) DO UPDATE SET url = excluded.url, status = excluded.status, \
             body = excluded.body, fetched_at = excluded.fetched_at",
        )
        .bind(key)
        .bind(url)
        .bind(i64::from(status))
        .bind(body)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn expiry_secs(&self) -> i64 {
        i64::try_from(self.expire_after.as_secs()).unwrap_or(i64::MAX)
    }
}

/// Resolves the default cache database path.
///
/// Priority:
/// 1. `$XDG_CACHE_HOME/bibfetch/http_cache.db`
/// 2. `$HOME/.cache/bibfetch/http_cache.db`
#[must_use]
pub fn resolve_default_cache_path() -> Option<PathBuf> {
    if let Some(xdg_cache_home) = env_var_non_empty_os("XDG_CACHE_HOME") {
        return Some(
            PathBuf::from(xdg_cache_home)
                .join("bibfetch")
                .join("http_cache.db"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".cache")
            .join("bibfetch")
            .join("http_cache.db"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
