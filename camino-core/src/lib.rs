pub mod cheque;
pub mod codec;
pub mod components;
pub mod error;
pub mod id;
pub mod lock;
pub mod owner;
pub mod roles;
pub mod utxo;

// Re-export the main types for convenience
pub use cheque::{ChequeKey, ChequeRecord};
pub use components::{
    Input, LockIdentity, LockedInput, LockedOutput, Output, StakeableLockIn, StakeableLockOut,
    StoredOutput, TransferInput, TransferOutput, TxOutput,
};
pub use error::{
    ChequeError, ErrorKind, IdParseError, LockError, StorageError, TxError, VerifyError,
};
pub use id::{Id, ShortId};
pub use lock::{LockIds, LockState, PendingLockIds};
pub use owner::{MultisigAlias, OutputOwners, MAX_ALIAS_DEPTH};
pub use roles::{AddressRole, AddressRoles};
pub use utxo::{Utxo, UtxoId};
