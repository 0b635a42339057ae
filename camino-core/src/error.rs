use crate::id::{Id, ShortId};
use crate::lock::LockState;
use std::io;
use thiserror::Error;

/// Coarse classification shared by every error in the engine.
///
/// Callers (the mempool, the admin service) branch on the kind rather than
/// on concrete variants; `Fatal` aborts block processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Conflict,
    PreconditionFailed,
    PermissionDenied,
    Fatal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::NotFound => "not found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::PreconditionFailed => "precondition failed",
            ErrorKind::PermissionDenied => "permission denied",
            ErrorKind::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// Failure to parse an identifier from bytes or hex
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdParseError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Represents all possible errors that can occur when interacting with the UTXO store
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO errors that occur when reading/writing files
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Database errors that occur with the underlying storage backend
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Errors related to missing or invalid data
    #[error("Not found: {0}")]
    NotFound(String),

    /// A diff was read after its parent state left the version set
    #[error("missing parent state {0}")]
    MissingParentState(Id),

    /// A different UTXO is already stored under the same ID
    #[error("utxo {0} already stored with different contents")]
    DuplicateUtxo(Id),

    /// A lock around shared state was poisoned
    #[error("Failed to acquire lock: {0}")]
    Lock(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Generic errors that don't fit in other categories
    #[error("Other error: {0}")]
    Other(String),

    /// Anyhow error wrapper for error context
    #[error(transparent)]
    Context(#[from] anyhow::Error),
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::NotFound(_) => ErrorKind::NotFound,
            StorageError::DuplicateUtxo(_) => ErrorKind::Conflict,
            StorageError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            _ => ErrorKind::Fatal,
        }
    }
}

// Additional From conversions for common error types

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

#[cfg(feature = "rocksdb")]
impl From<rocksdb::Error> for StorageError {
    fn from(err: rocksdb::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StorageError::NotFound("Row not found".to_string()),
            _ => StorageError::Database(err.to_string()),
        }
    }
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        StorageError::Other(err)
    }
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        StorageError::Other(err.to_string())
    }
}

/// Errors surfaced by the lock and unlock planners
#[derive(Error, Debug)]
pub enum LockError {
    #[error("invalid target lock state: {0}")]
    InvalidTargetLockState(LockState),

    #[error(
        "insufficient balance: wanted to lock {to_lock} and burn {to_burn}, \
         could lock {locked} and burn {burned}"
    )]
    InsufficientBalance {
        to_lock: u64,
        to_burn: u64,
        locked: u64,
        burned: u64,
    },

    #[error("cannot spend: {0}")]
    CannotSpend(String),

    #[error("not enough locked funds: requested {requested}, available {available}")]
    NotEnoughLockedFunds { requested: u64, available: u64 },

    #[error("arithmetic overflow while {0}")]
    Overflow(&'static str),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl LockError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LockError::InvalidTargetLockState(_) | LockError::Overflow(_) => {
                ErrorKind::InvalidArgument
            }
            LockError::InsufficientBalance { .. } | LockError::NotEnoughLockedFunds { .. } => {
                ErrorKind::PreconditionFailed
            }
            LockError::CannotSpend(_) | LockError::Signing(_) => ErrorKind::PermissionDenied,
            LockError::Storage(e) => e.kind(),
        }
    }
}

/// Errors from the transition verifier and structural checks on values
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("number of inputs ({inputs}) differs from number of credentials ({credentials})")]
    CredentialCountMismatch { inputs: usize, credentials: usize },

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("utxo {0} not found")]
    MissingUtxo(Id),

    #[error("asset mismatch on utxo {utxo}: expected {expected}, got {actual}")]
    AssetMismatch { utxo: Id, expected: Id, actual: Id },

    #[error("nested lock")]
    NestedLock,

    #[error("pre-lock-era stakeable output is not spendable here")]
    StakeableOutput,

    #[error("invalid lock state {0:#04x}")]
    InvalidLockState(u8),

    #[error("input lock ids differ from those of utxo {0}")]
    LockIdsMismatch(Id),

    #[error("locking already-locked utxo {0}")]
    LockingLockedUtxo(Id),

    #[error("locked utxo {0} cannot be consumed by an unlocked transfer")]
    LockedInputInTransfer(Id),

    #[error("input amount {input} differs from utxo amount {utxo}")]
    AmountMismatch { input: u64, utxo: u64 },

    #[error("self reference {0} is not allowed in this transition")]
    UnexpectedSelfReference(LockState),

    #[error("locked value is not conserved under lock ids {0}")]
    LockedValueNotConserved(String),

    #[error("insufficient unlocked funds: consumed {consumed}, produced {produced}, burn {burned}")]
    InsufficientUnlockedFunds {
        consumed: u64,
        produced: u64,
        burned: u64,
    },

    #[error("unlock accounting mismatch: {0}")]
    UnlockMismatch(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("locktime {locktime} not reached at {now}")]
    LocktimeNotReached { locktime: u64, now: u64 },

    #[error("invalid output: {0}")]
    InvalidOutput(String),

    #[error("arithmetic overflow while {0}")]
    Overflow(&'static str),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl VerifyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VerifyError::MissingUtxo(_) => ErrorKind::NotFound,
            VerifyError::CredentialCountMismatch { .. }
            | VerifyError::InvalidCredential(_)
            | VerifyError::AssetMismatch { .. }
            | VerifyError::NestedLock
            | VerifyError::StakeableOutput
            | VerifyError::InvalidLockState(_)
            | VerifyError::UnexpectedSelfReference(_)
            | VerifyError::InvalidOutput(_)
            | VerifyError::Overflow(_) => ErrorKind::InvalidArgument,
            VerifyError::Unauthorized(_) => ErrorKind::PermissionDenied,
            VerifyError::Storage(e) => e.kind(),
            _ => ErrorKind::PreconditionFailed,
        }
    }
}

/// Errors from the chequebook state machine
#[derive(Error, Debug)]
pub enum ChequeError {
    #[error("stale serial: last accepted {last}, got {got}")]
    StaleSerial { last: u64, got: u64 },

    #[error("amount < last: last accepted {last}, got {got}")]
    AmountBelowLast { last: u64, got: u64 },

    #[error("payout mismatch: cheque releases {expected}, outputs pay {actual}")]
    PayoutMismatch { expected: u64, actual: u64 },

    #[error("bad cheque signature: {0}")]
    BadSignature(String),

    #[error("paid-out ledger overflow")]
    LedgerOverflow,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ChequeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChequeError::StaleSerial { .. } => ErrorKind::Conflict,
            ChequeError::AmountBelowLast { .. } | ChequeError::PayoutMismatch { .. } => {
                ErrorKind::PreconditionFailed
            }
            ChequeError::BadSignature(_) => ErrorKind::PermissionDenied,
            ChequeError::LedgerOverflow => ErrorKind::InvalidArgument,
            ChequeError::Storage(e) => e.kind(),
        }
    }
}

/// Errors from executing a transaction against a chain view
#[derive(Error, Debug)]
pub enum TxError {
    #[error("invalid tx: {0}")]
    Syntactic(String),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error(transparent)]
    Cheque(#[from] ChequeError),

    #[error("address {address} lacks a role allowed to change role bit {bit}")]
    MissingRole { address: ShortId, bit: u8 },

    #[error("unknown role bit {0}")]
    InvalidRoleBit(u8),

    #[error("invalid multisig alias: {0}")]
    InvalidAlias(String),

    #[error("lock amount mismatch: tx requests {expected}, outputs lock {actual}")]
    LockAmountMismatch { expected: u64, actual: u64 },

    #[error("utxo {0} is consumed twice")]
    DoubleSpend(Id),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl TxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TxError::Syntactic(_) | TxError::InvalidRoleBit(_) | TxError::InvalidAlias(_) => {
                ErrorKind::InvalidArgument
            }
            TxError::Verify(e) => e.kind(),
            TxError::Cheque(e) => e.kind(),
            TxError::MissingRole { .. } => ErrorKind::PermissionDenied,
            TxError::LockAmountMismatch { .. } => ErrorKind::PreconditionFailed,
            TxError::DoubleSpend(_) => ErrorKind::Conflict,
            TxError::Storage(e) => e.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_kinds() {
        assert_eq!(StorageError::MissingParentState(Id::EMPTY).kind(), ErrorKind::Fatal);
        assert_eq!(StorageError::DuplicateUtxo(Id::EMPTY).kind(), ErrorKind::Conflict);
        assert_eq!(StorageError::NotFound("x".into()).kind(), ErrorKind::NotFound);
        assert!(StorageError::MissingParentState(Id::EMPTY)
            .to_string()
            .contains("missing parent state"));
    }

    #[test]
    fn test_nested_kinds_propagate() {
        let err = TxError::Verify(VerifyError::Storage(StorageError::MissingParentState(
            Id::EMPTY,
        )));
        assert_eq!(err.kind(), ErrorKind::Fatal);

        let err = TxError::Cheque(ChequeError::StaleSerial { last: 7, got: 6 });
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("stale serial"));
    }

    #[test]
    fn test_messages_carry_contract_text() {
        assert!(LockError::InvalidTargetLockState(LockState::BONDED_DEPOSITED)
            .to_string()
            .contains("invalid target lock state"));
        assert!(LockError::InsufficientBalance { to_lock: 1, to_burn: 0, locked: 0, burned: 0 }
            .to_string()
            .contains("insufficient balance"));
        assert!(VerifyError::LockingLockedUtxo(Id::EMPTY)
            .to_string()
            .contains("locking already-locked utxo"));
        assert!(ChequeError::AmountBelowLast { last: 5, got: 4 }
            .to_string()
            .contains("amount < last"));
    }
}
