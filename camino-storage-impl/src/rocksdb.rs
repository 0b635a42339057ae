#![cfg(feature = "rocksdb")]

use crate::storage_traits::{BatchOp, KeyValueStore, WriteBatch};
use camino_core::error::StorageError;
use log;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, DB};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

// Column family holding every chain-state key
const CF_STATE: &str = "state";

/// RocksDB-backed key/value store
pub struct RocksDbStore {
    db: Arc<DB>,
    db_path: PathBuf,
}

impl RocksDbStore {
    /// Creates or opens a RocksDB store at the specified path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db_path = path.as_ref().to_path_buf();

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_state = ColumnFamilyDescriptor::new(CF_STATE, Options::default());
        let db = DB::open_cf_descriptors(&opts, &db_path, vec![cf_state])?;

        log::debug!("opened rocksdb store at {:?}", db_path);
        Ok(Self {
            db: Arc::new(db),
            db_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn cf(&self) -> Result<&ColumnFamily, StorageError> {
        self.db
            .cf_handle(CF_STATE)
            .ok_or_else(|| StorageError::Database(format!("missing column family {}", CF_STATE)))
    }
}

impl KeyValueStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.db.get_cf(self.cf()?, key)?)
    }

    fn scan_prefix(
        &self,
        prefix: &[u8],
        after: Option<&[u8]>,
        limit: Option<usize>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let start = match after {
            Some(key) if key >= prefix => key,
            _ => prefix,
        };
        let limit = limit.unwrap_or(usize::MAX);

        // Collect eagerly to avoid iterator lifetime issues
        let mut out = Vec::new();
        let iter = self
            .db
            .iterator_cf(self.cf()?, IteratorMode::From(start, Direction::Forward));
        for item in iter {
            if out.len() >= limit {
                break;
            }
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            if after == Some(&key[..]) {
                continue;
            }
            out.push((key.to_vec(), value.to_vec()));
        }
        Ok(out)
    }

    fn commit_batch(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let cf = self.cf()?;
        let mut wb = rocksdb::WriteBatch::default();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put(key, value) => wb.put_cf(cf, key, value),
                BatchOp::Delete(key) => wb.delete_cf(cf, key),
            }
        }
        self.db.write(wb)?;
        Ok(())
    }
}
