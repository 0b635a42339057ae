use camino_core::error::StorageError;
use std::sync::Arc;

/// One mutation inside a [`WriteBatch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

/// Ordered set of mutations applied atomically by
/// [`KeyValueStore::commit_batch`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push(BatchOp::Put(key, value));
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.ops.push(BatchOp::Delete(key));
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// Ordered byte-keyed storage backing the chain state.
///
/// Keys compare lexicographically. Every backend must make
/// `commit_batch` all-or-nothing.
pub trait KeyValueStore: Send + Sync {
    /// Get the value stored under a key
    ///
    /// # Parameters
    /// * `key` - The key to look up
    ///
    /// # Returns
    /// Some(value) if the key exists, None otherwise
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// List entries whose key starts with `prefix`, in ascending key order
    ///
    /// # Parameters
    /// * `prefix` - The key prefix to scan
    /// * `after` - If set, only keys strictly greater than this full key are returned
    /// * `limit` - Maximum number of entries to return, None for all
    ///
    /// # Returns
    /// The matching (key, value) pairs
    fn scan_prefix(
        &self,
        prefix: &[u8],
        after: Option<&[u8]>,
        limit: Option<usize>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError>;

    /// Apply every operation of `batch` atomically
    ///
    /// # Parameters
    /// * `batch` - The operations to apply, in order
    ///
    /// # Returns
    /// Ok(()) if every operation was applied, Err if none were
    fn commit_batch(&self, batch: WriteBatch) -> Result<(), StorageError>;

    /// Store a single value
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let mut batch = WriteBatch::new();
        batch.put(key.to_vec(), value.to_vec());
        self.commit_batch(batch)
    }

    /// Remove a single key; removing a missing key is not an error
    fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        let mut batch = WriteBatch::new();
        batch.delete(key.to_vec());
        self.commit_batch(batch)
    }

    fn has(&self, key: &[u8]) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }
}

impl<K: KeyValueStore + ?Sized> KeyValueStore for Arc<K> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(key)
    }

    fn scan_prefix(
        &self,
        prefix: &[u8],
        after: Option<&[u8]>,
        limit: Option<usize>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        (**self).scan_prefix(prefix, after, limit)
    }

    fn commit_batch(&self, batch: WriteBatch) -> Result<(), StorageError> {
        (**self).commit_batch(batch)
    }
}
