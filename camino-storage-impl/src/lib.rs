pub mod chain;
pub mod diff;
pub mod memory;
pub mod state;
pub mod storage_traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "rocksdb")]
pub mod rocksdb;

// Re-export the main types for convenience
pub use chain::{all_utxo_ids, get_all_utxos, locked_utxos, Chain, ChainReader, Versions};
pub use diff::Diff;
pub use memory::MemoryStore;
pub use state::{keys, SharedState, State};
pub use storage_traits::{BatchOp, KeyValueStore, WriteBatch};

// Re-export the storage implementations
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

#[cfg(feature = "rocksdb")]
pub use rocksdb::RocksDbStore;
