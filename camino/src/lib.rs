//! Camino lock-mode UTXO engine
//!
//! This crate re-exports all the components of the engine. The core
//! primitives are available at the top level, the other crates under
//! their own module names.

pub use camino_core::*;

pub use camino_node as node;
pub use camino_runtime as runtime;
pub use camino_scheduler as scheduler;
pub use camino_storage_impl as storage;
pub use camino_transaction as transaction;

pub use camino_node::{Genesis, Node, NodeConfig};
pub use camino_runtime::{Executor, Keychain, Secp256k1Fx};
pub use camino_scheduler::{Block, ChainManager};
pub use camino_storage_impl::{KeyValueStore, MemoryStore, State};
pub use camino_transaction::{SignedTx, UnsignedTx};
