#![cfg(feature = "sqlite")]

use crate::storage_traits::{BatchOp, KeyValueStore, WriteBatch};
use anyhow::Context;
use camino_core::error::StorageError;
use log;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};
use tokio::runtime::Runtime;

mod sql {
    pub const CREATE_KV: &str = "CREATE TABLE IF NOT EXISTS kv (
        key BLOB PRIMARY KEY,
        value BLOB NOT NULL
    )";
    pub const GET: &str = "SELECT value FROM kv WHERE key = ?";
    pub const SCAN_FROM: &str = "SELECT key, value FROM kv WHERE key >= ? ORDER BY key LIMIT ?";
    pub const SCAN_AFTER: &str = "SELECT key, value FROM kv WHERE key > ? ORDER BY key LIMIT ?";
    pub const UPSERT: &str = "INSERT OR REPLACE INTO kv (key, value) VALUES (?, ?)";
    pub const DELETE: &str = "DELETE FROM kv WHERE key = ?";
}

/// A SQLite-backed key/value store using sqlx.
pub struct SqliteStore {
    pool: SqlitePool,
    rt: Arc<Runtime>,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db_path = path.as_ref().to_path_buf();
        let db_url = format!("sqlite:{}", db_path.to_string_lossy());

        // Create a runtime for async operations
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create runtime")?;
        let rt = Arc::new(rt);

        let options = SqliteConnectOptions::from_str(&db_url)
            .with_context(|| format!("Invalid database URL: {}", db_url))?
            .create_if_missing(true);

        let pool = rt
            .block_on(async {
                SqlitePoolOptions::new()
                    .max_connections(5)
                    .connect_with(options)
                    .await
            })
            .with_context(|| format!("Failed to connect to database at {:?}", db_path))?;

        rt.block_on(Self::initialize_schema(&pool))
            .context("Failed to initialize database schema")?;

        log::debug!("opened sqlite store at {:?}", db_path);
        Ok(Self { pool, rt, db_path })
    }

    async fn initialize_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(sql::CREATE_KV).execute(pool).await?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let row = self.rt.block_on(async {
            sqlx::query(sql::GET)
                .bind(key)
                .fetch_optional(&self.pool)
                .await
        })?;
        match row {
            Some(row) => Ok(Some(row.try_get::<Vec<u8>, _>("value")?)),
            None => Ok(None),
        }
    }

    fn scan_prefix(
        &self,
        prefix: &[u8],
        after: Option<&[u8]>,
        limit: Option<usize>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        // SQLite treats a negative LIMIT as unbounded
        let sql_limit = limit.map(|l| l as i64).unwrap_or(-1);
        let (query, start) = match after {
            Some(key) if key >= prefix => (sql::SCAN_AFTER, key),
            _ => (sql::SCAN_FROM, prefix),
        };

        let rows = self.rt.block_on(async {
            sqlx::query(query)
                .bind(start)
                .bind(sql_limit)
                .fetch_all(&self.pool)
                .await
        })?;

        // Blobs compare bytewise, so the first row past the prefix ends it
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let key: Vec<u8> = row.try_get("key")?;
            if !key.starts_with(prefix) {
                break;
            }
            let value: Vec<u8> = row.try_get("value")?;
            out.push((key, value));
        }
        Ok(out)
    }

    fn commit_batch(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let count = batch.len();
        self.rt
            .block_on(async {
                let mut tx = self.pool.begin().await?;
                for op in batch.into_ops() {
                    match op {
                        BatchOp::Put(key, value) => {
                            sqlx::query(sql::UPSERT)
                                .bind(key)
                                .bind(value)
                                .execute(&mut *tx)
                                .await?;
                        }
                        BatchOp::Delete(key) => {
                            sqlx::query(sql::DELETE).bind(key).execute(&mut *tx).await?;
                        }
                    }
                }
                tx.commit().await
            })
            .map_err(|e| StorageError::Database(format!("Failed to commit batch: {}", e)))?;
        log::trace!("committed batch of {} operations", count);
        Ok(())
    }
}
