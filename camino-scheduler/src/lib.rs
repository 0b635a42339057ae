pub mod block;
pub mod chain_manager;
pub mod conflict;
pub mod error;
pub mod mempool;

// Re-export the main types for convenience
pub use block::Block;
pub use chain_manager::{CancelToken, ChainConfig, ChainManager};
pub use conflict::{BasicConflictChecker, ConflictChecker, ConflictResult};
pub use error::ChainError;
pub use mempool::{DroppedTx, Mempool};
