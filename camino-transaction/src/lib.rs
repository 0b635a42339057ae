pub mod cheque;
pub mod credential;
pub mod tx;

// Re-export the main types for convenience
pub use cheque::Cheque;
pub use credential::{Credential, SIGNATURE_LEN};
pub use tx::{
    sort_inputs_with_signers, sort_outputs, AddressStateTx, BaseTx, BondTx, CashOutTx, DepositTx,
    RegisterMultisigAliasTx, SignedTx, TransferableInput, TransferableOutput, TxStatus, UnlockTx,
    UnsignedTx, MAX_MEMO_SIZE,
};
