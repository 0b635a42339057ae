//! Output and input values, plain and lock-wrapped.
//!
//! Outputs are generic over their lock identity: stored UTXOs use
//! [`LockIds`], tx outputs use [`PendingLockIds`]. Nesting is representable
//! so that decoded values can be rejected with "nested lock".

use crate::error::VerifyError;
use crate::id::Id;
use crate::lock::{LockIds, LockState, PendingLockIds};
use crate::owner::OutputOwners;
use serde::{Deserialize, Serialize};

/// Lock identity carried by a locked output
pub trait LockIdentity: Copy + Eq + std::fmt::Debug + std::fmt::Display {
    fn lock_state(&self) -> LockState;

    /// Whether a lock of `state` was created by the enclosing tx
    fn is_newly_locked_with(&self, state: LockState) -> bool;

    fn verify(&self) -> Result<(), VerifyError>;
}

impl LockIdentity for LockIds {
    fn lock_state(&self) -> LockState {
        LockIds::lock_state(self)
    }

    fn is_newly_locked_with(&self, _state: LockState) -> bool {
        false
    }

    fn verify(&self) -> Result<(), VerifyError> {
        Ok(())
    }
}

impl LockIdentity for PendingLockIds {
    fn lock_state(&self) -> LockState {
        PendingLockIds::lock_state(self)
    }

    fn is_newly_locked_with(&self, state: LockState) -> bool {
        PendingLockIds::is_newly_locked_with(self, state)
    }

    fn verify(&self) -> Result<(), VerifyError> {
        PendingLockIds::verify(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutput {
    pub amount: u64,
    pub owners: OutputOwners,
}

impl TransferOutput {
    pub fn new(amount: u64, owners: OutputOwners) -> Self {
        Self { amount, owners }
    }

    pub fn verify(&self) -> Result<(), VerifyError> {
        if self.amount == 0 {
            return Err(VerifyError::InvalidOutput("zero amount".to_string()));
        }
        self.owners.verify()
    }
}

/// Output of the stakeable-lock era. Decodes, but is never spendable by
/// the lock-mode engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeableLockOut {
    pub locktime: u64,
    pub inner: TransferOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedOutput<L> {
    pub ids: L,
    pub inner: Box<Output<L>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Output<L> {
    Transfer(TransferOutput),
    Locked(LockedOutput<L>),
    Stakeable(StakeableLockOut),
}

/// Output as stored in a UTXO
pub type StoredOutput = Output<LockIds>;

/// Output as carried by a transaction
pub type TxOutput = Output<PendingLockIds>;

impl<L: LockIdentity> Output<L> {
    pub fn transfer(amount: u64, owners: OutputOwners) -> Self {
        Output::Transfer(TransferOutput::new(amount, owners))
    }

    /// Wrap a transfer output in a lock. An unlocked identity yields the
    /// plain output.
    pub fn locked(ids: L, inner: TransferOutput) -> Self {
        if ids.lock_state().is_locked() {
            Output::Locked(LockedOutput {
                ids,
                inner: Box::new(Output::Transfer(inner)),
            })
        } else {
            Output::Transfer(inner)
        }
    }

    pub fn lock_ids(&self) -> Option<&L> {
        match self {
            Output::Locked(locked) => Some(&locked.ids),
            _ => None,
        }
    }

    pub fn effective_lock_state(&self) -> LockState {
        self.lock_ids()
            .map(|ids| ids.lock_state())
            .unwrap_or(LockState::UNLOCKED)
    }

    pub fn is_locked_with(&self, state: LockState) -> bool {
        state.is_locked() && self.effective_lock_state().contains(state)
    }

    pub fn is_newly_locked_with(&self, state: LockState) -> bool {
        self.lock_ids()
            .map(|ids| ids.is_newly_locked_with(state))
            .unwrap_or(false)
    }

    /// The transfer output under at most one lock wrapper
    pub fn transfer_output(&self) -> Result<&TransferOutput, VerifyError> {
        match self {
            Output::Transfer(out) => Ok(out),
            Output::Locked(locked) => match locked.inner.as_ref() {
                Output::Transfer(out) => Ok(out),
                Output::Locked(_) => Err(VerifyError::NestedLock),
                Output::Stakeable(_) => Err(VerifyError::StakeableOutput),
            },
            Output::Stakeable(_) => Err(VerifyError::StakeableOutput),
        }
    }

    pub fn amount(&self) -> Result<u64, VerifyError> {
        Ok(self.transfer_output()?.amount)
    }

    pub fn owners(&self) -> Result<&OutputOwners, VerifyError> {
        Ok(&self.transfer_output()?.owners)
    }

    pub fn verify(&self) -> Result<(), VerifyError> {
        if let Some(ids) = self.lock_ids() {
            ids.verify()?;
            if !ids.lock_state().is_locked() {
                return Err(VerifyError::InvalidOutput(
                    "lock wrapper without lock ids".to_string(),
                ));
            }
        }
        self.transfer_output()?.verify()
    }
}

impl TxOutput {
    /// The stored form of this output once the tx ID is known
    pub fn finalize(&self, tx_id: Id) -> StoredOutput {
        match self {
            Output::Transfer(out) => Output::Transfer(out.clone()),
            Output::Locked(locked) => Output::Locked(LockedOutput {
                ids: locked.ids.finalize(tx_id),
                inner: Box::new(locked.inner.finalize(tx_id)),
            }),
            Output::Stakeable(out) => Output::Stakeable(out.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferInput {
    pub amount: u64,
    /// Indices into the owner addresses whose authority this input uses
    pub sig_indices: Vec<u32>,
}

impl TransferInput {
    pub fn verify(&self) -> Result<(), VerifyError> {
        if self.amount == 0 {
            return Err(VerifyError::InvalidOutput("zero input amount".to_string()));
        }
        if self.sig_indices.windows(2).any(|w| w[0] >= w[1]) {
            return Err(VerifyError::InvalidCredential(
                "signature indices not sorted and unique".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeableLockIn {
    pub locktime: u64,
    pub inner: TransferInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedInput {
    pub ids: LockIds,
    pub inner: Box<Input>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Input {
    Transfer(TransferInput),
    Locked(LockedInput),
    Stakeable(StakeableLockIn),
}

impl Input {
    pub fn locked(ids: LockIds, inner: TransferInput) -> Self {
        if ids.is_locked() {
            Input::Locked(LockedInput {
                ids,
                inner: Box::new(Input::Transfer(inner)),
            })
        } else {
            Input::Transfer(inner)
        }
    }

    /// Lock IDs claimed by this input; unlocked for a plain input
    pub fn lock_ids(&self) -> LockIds {
        match self {
            Input::Locked(locked) => locked.ids,
            _ => LockIds::UNLOCKED,
        }
    }

    pub fn transfer_input(&self) -> Result<&TransferInput, VerifyError> {
        match self {
            Input::Transfer(input) => Ok(input),
            Input::Locked(locked) => match locked.inner.as_ref() {
                Input::Transfer(input) => Ok(input),
                Input::Locked(_) => Err(VerifyError::NestedLock),
                Input::Stakeable(_) => Err(VerifyError::StakeableOutput),
            },
            Input::Stakeable(_) => Err(VerifyError::StakeableOutput),
        }
    }

    pub fn amount(&self) -> Result<u64, VerifyError> {
        Ok(self.transfer_input()?.amount)
    }

    pub fn verify(&self) -> Result<(), VerifyError> {
        if let Input::Locked(locked) = self {
            if !locked.ids.is_locked() {
                return Err(VerifyError::InvalidOutput(
                    "lock wrapper without lock ids".to_string(),
                ));
            }
        }
        self.transfer_input()?.verify()
    }
}
