use camino_core::error::{ErrorKind, StorageError, TxError};
use camino_core::id::Id;
use thiserror::Error;

/// Errors from admission and block processing
#[derive(Error, Debug)]
pub enum ChainError {
    #[error(transparent)]
    Tx(#[from] TxError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("tx {tx} conflicts with pending txs {conflicts:?}")]
    Conflict { tx: Id, conflicts: Vec<Id> },

    #[error("tx {0} is already pending")]
    Duplicate(Id),

    #[error("admission of tx {0} was cancelled")]
    Cancelled(Id),

    #[error("mempool is full ({0} txs)")]
    MempoolFull(usize),

    #[error("unknown block {0}")]
    UnknownBlock(Id),

    #[error("invalid block {id}: {reason}")]
    InvalidBlock { id: Id, reason: String },
}

impl ChainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChainError::Tx(e) => e.kind(),
            ChainError::Storage(e) => e.kind(),
            ChainError::Conflict { .. } | ChainError::Duplicate(_) => ErrorKind::Conflict,
            ChainError::Cancelled(_) | ChainError::MempoolFull(_) => ErrorKind::PreconditionFailed,
            ChainError::UnknownBlock(_) => ErrorKind::NotFound,
            ChainError::InvalidBlock { .. } => ErrorKind::InvalidArgument,
        }
    }

    /// Whether block processing must stop
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}
