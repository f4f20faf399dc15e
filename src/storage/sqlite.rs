//! # SQLite Key/Value Store
//!
//! Durable [`KeyValueStore`] on a single `entries` table. Connection pool
//! setup follows the usual WAL + busy-timeout recipe so concurrent request
//! workers do not trip over each other's writes.

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{str::FromStr, time::Duration};

use super::{list_children, KeyValueStore};
use crate::errors::{Error, Result};

const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_ENTRIES_TABLE: &str = "CREATE TABLE IF NOT EXISTS entries (
    key TEXT PRIMARY KEY NOT NULL,
    value BLOB NOT NULL
)";

/// Pool settings for [`SqliteStore`]
#[derive(Debug, Clone)]
pub struct SqliteStoreConfig {
    /// `sqlite://path/to/file.db` or `sqlite::memory:`
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout: Duration,
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/hcp-secrets.db".to_string(),
            max_connections: 5,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// SQLite-backed store
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if missing) the database and ensure the schema exists.
    pub async fn connect(config: &SqliteStoreConfig) -> Result<Self> {
        validate_config(config)?;

        let connect_options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| {
                Error::storage_with_source(
                    format!("Invalid SQLite connection string: {}", config.url),
                    e,
                )
            })?
            .create_if_missing(true)
            .busy_timeout(SQLITE_BUSY_TIMEOUT)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    url = %config.url,
                    busy_timeout_ms = SQLITE_BUSY_TIMEOUT.as_millis(),
                    "Failed to create SQLite pool"
                );
                Error::storage_with_source(format!("Failed to connect to {}", config.url), e)
            })?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the `entries` table if needed.
    pub async fn from_pool(pool: Pool<Sqlite>) -> Result<Self> {
        sqlx::query(CREATE_ENTRIES_TABLE)
            .execute(&pool)
            .await
            .map_err(|e| Error::storage_with_source("Failed to create entries table", e))?;

        tracing::info!(max_connections = pool.options().get_max_connections(), "SQLite store ready");

        Ok(Self { pool })
    }
}

fn validate_config(config: &SqliteStoreConfig) -> Result<()> {
    if config.max_connections == 0 {
        return Err(Error::validation("max_connections must be greater than 0"));
    }

    if !config.url.starts_with("sqlite:") {
        return Err(Error::validation("storage URL must start with 'sqlite:'"));
    }

    Ok(())
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let row = sqlx::query("SELECT value FROM entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::storage_with_source(format!("Failed to read '{}'", key), e))?;

        Ok(row.map(|r| r.get::<Vec<u8>, _>("value")))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        sqlx::query(
            "INSERT INTO entries (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage_with_source(format!("Failed to write '{}'", key), e))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::storage_with_source(format!("Failed to delete '{}'", key), e))?;

        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT key FROM entries WHERE substr(key, 1, ?) = ? ORDER BY key")
            .bind(prefix.chars().count() as i64)
            .bind(prefix)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::storage_with_source(format!("Failed to list '{}'", prefix), e))?;

        let keys: Vec<String> = rows.iter().map(|r| r.get::<String, _>("key")).collect();
        Ok(list_children(prefix, keys.iter().map(String::as_str)))
    }
}
