//! Lock arithmetic: the two-bit lock state and the lock identities carried by
//! locked outputs.
//!
//! Stored UTXOs carry [`LockIds`]. Outputs of a transaction under construction
//! (and on the tx itself) carry [`PendingLockIds`], which can additionally
//! mark a lock slot as referring to the enclosing transaction. That reference
//! is resolved by [`PendingLockIds::finalize`] once the tx ID is known, so a
//! stored UTXO can never hold an unresolved self reference.

use crate::error::VerifyError;
use crate::id::Id;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Set over {Bonded, Deposited}, partially ordered by inclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LockState(u8);

impl LockState {
    pub const UNLOCKED: LockState = LockState(0b00);
    pub const BONDED: LockState = LockState(0b01);
    pub const DEPOSITED: LockState = LockState(0b10);
    pub const BONDED_DEPOSITED: LockState = LockState(0b11);

    /// Construct from raw bits, rejecting anything outside the two-bit set
    pub fn from_bits(bits: u8) -> Result<Self, VerifyError> {
        let state = LockState(bits);
        state.verify()?;
        Ok(state)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn verify(&self) -> Result<(), VerifyError> {
        if self.0 & !Self::BONDED_DEPOSITED.0 != 0 {
            return Err(VerifyError::InvalidLockState(self.0));
        }
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        self.0 != 0
    }

    /// True if every bit of `other` is set in `self`
    pub fn contains(&self, other: LockState) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(&self, other: LockState) -> LockState {
        LockState(self.0 | other.0)
    }

    pub fn without(&self, other: LockState) -> LockState {
        LockState(self.0 & !other.0)
    }

    /// True if the two states share a bit
    pub fn intersects(&self, other: LockState) -> bool {
        self.0 & other.0 != 0
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            LockState::UNLOCKED => f.write_str("unlocked"),
            LockState::BONDED => f.write_str("bonded"),
            LockState::DEPOSITED => f.write_str("deposited"),
            LockState::BONDED_DEPOSITED => f.write_str("bonded+deposited"),
            LockState(bits) => write!(f, "invalid({:#04x})", bits),
        }
    }
}

/// The tx IDs that created the deposit and the bond locking an output.
/// An empty slot means the output is not locked in that way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct LockIds {
    pub bond_tx_id: Id,
    pub deposit_tx_id: Id,
}

impl fmt::Display for LockIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(bond {}, deposit {})", self.bond_tx_id, self.deposit_tx_id)
    }
}

impl LockIds {
    pub const UNLOCKED: LockIds = LockIds {
        bond_tx_id: Id::EMPTY,
        deposit_tx_id: Id::EMPTY,
    };

    pub fn new(bond_tx_id: Id, deposit_tx_id: Id) -> Self {
        Self {
            bond_tx_id,
            deposit_tx_id,
        }
    }

    pub fn bonded(bond_tx_id: Id) -> Self {
        Self::new(bond_tx_id, Id::EMPTY)
    }

    pub fn deposited(deposit_tx_id: Id) -> Self {
        Self::new(Id::EMPTY, deposit_tx_id)
    }

    pub fn lock_state(&self) -> LockState {
        let mut state = LockState::UNLOCKED;
        if !self.bond_tx_id.is_empty() {
            state = state.union(LockState::BONDED);
        }
        if !self.deposit_tx_id.is_empty() {
            state = state.union(LockState::DEPOSITED);
        }
        state
    }

    pub fn is_locked(&self) -> bool {
        self.lock_state().is_locked()
    }

    /// Whether every bit of a non-empty `state` has a non-empty ID here
    pub fn is_locked_with(&self, state: LockState) -> bool {
        state.is_locked() && self.lock_state().contains(state)
    }

    /// Copy of these IDs with the slots of `state` cleared
    pub fn unlock(&self, state: LockState) -> LockIds {
        let mut ids = *self;
        if state.contains(LockState::BONDED) {
            ids.bond_tx_id = Id::EMPTY;
        }
        if state.contains(LockState::DEPOSITED) {
            ids.deposit_tx_id = Id::EMPTY;
        }
        ids
    }
}

/// Lock identities on an output of a transaction being built or verified.
///
/// `self_ref` marks slots that point at the enclosing transaction; those
/// slots are empty in `ids` until [`finalize`](Self::finalize) fills them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PendingLockIds {
    pub ids: LockIds,
    pub self_ref: LockState,
}

impl fmt::Display for PendingLockIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.self_ref.is_locked() {
            write!(f, "{} + this tx as {}", self.ids, self.self_ref)
        } else {
            write!(f, "{}", self.ids)
        }
    }
}

impl From<LockIds> for PendingLockIds {
    fn from(ids: LockIds) -> Self {
        PendingLockIds {
            ids,
            self_ref: LockState::UNLOCKED,
        }
    }
}

impl PendingLockIds {
    /// Existing lock IDs extended by a new lock of `state` created by this tx.
    /// Unlocked leaves `prior` untouched.
    pub fn lock(prior: LockIds, state: LockState) -> Self {
        PendingLockIds {
            ids: prior.unlock(state),
            self_ref: state,
        }
    }

    pub fn lock_state(&self) -> LockState {
        self.ids.lock_state().union(self.self_ref)
    }

    pub fn is_locked(&self) -> bool {
        self.lock_state().is_locked()
    }

    pub fn is_locked_with(&self, state: LockState) -> bool {
        state.is_locked() && self.lock_state().contains(state)
    }

    /// Whether a non-empty `state` is locked by the enclosing tx itself
    pub fn is_newly_locked_with(&self, state: LockState) -> bool {
        state.is_locked() && self.self_ref.contains(state)
    }

    /// The lock identities this output carried before the tx added its own
    pub fn prior(&self) -> LockIds {
        self.ids
    }

    pub fn verify(&self) -> Result<(), VerifyError> {
        self.self_ref.verify()?;
        if self.ids.lock_state().intersects(self.self_ref) {
            return Err(VerifyError::InvalidOutput(format!(
                "self reference {} overlaps existing lock ids {}",
                self.self_ref, self.ids
            )));
        }
        Ok(())
    }

    /// Resolve self references to the real tx ID
    pub fn finalize(&self, tx_id: Id) -> LockIds {
        let mut ids = self.ids;
        if self.self_ref.contains(LockState::BONDED) {
            ids.bond_tx_id = tx_id;
        }
        if self.self_ref.contains(LockState::DEPOSITED) {
            ids.deposit_tx_id = tx_id;
        }
        ids
    }
}

// Canonical order for tx outputs: locked before unlocked, newer locks
// (more self-referencing bits) first, then by the raw IDs.
impl Ord for PendingLockIds {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .is_locked()
            .cmp(&self.is_locked())
            .then_with(|| other.self_ref.bits().cmp(&self.self_ref.bits()))
            .then_with(|| self.ids.cmp(&other.ids))
    }
}

impl PartialOrd for PendingLockIds {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(n: u8) -> Id {
        Id::new([n; 32])
    }

    #[test]
    fn test_lock_state_verify() {
        assert!(LockState::from_bits(0).is_ok());
        assert!(LockState::from_bits(3).is_ok());
        assert!(matches!(
            LockState::from_bits(4),
            Err(VerifyError::InvalidLockState(4))
        ));
    }

    #[test]
    fn test_lock_state_order() {
        assert!(LockState::BONDED_DEPOSITED.contains(LockState::BONDED));
        assert!(LockState::BONDED_DEPOSITED.contains(LockState::DEPOSITED));
        assert!(!LockState::BONDED.contains(LockState::DEPOSITED));
        assert!(LockState::BONDED.contains(LockState::UNLOCKED));
        assert_eq!(
            LockState::BONDED.union(LockState::DEPOSITED),
            LockState::BONDED_DEPOSITED
        );
    }

    #[test]
    fn test_lock_ids_state() {
        assert!(!LockIds::UNLOCKED.is_locked());
        let ids = LockIds::deposited(tx(1));
        assert_eq!(ids.lock_state(), LockState::DEPOSITED);
        assert!(ids.is_locked_with(LockState::DEPOSITED));
        assert!(!ids.is_locked_with(LockState::BONDED));
        assert!(!ids.is_locked_with(LockState::UNLOCKED));

        let both = LockIds::new(tx(2), tx(1));
        assert!(both.is_locked_with(LockState::BONDED_DEPOSITED));
        assert_eq!(both.unlock(LockState::BONDED), ids);
    }

    #[test]
    fn test_pending_finalize() {
        let pending = PendingLockIds::lock(LockIds::deposited(tx(1)), LockState::BONDED);
        assert!(pending.is_newly_locked_with(LockState::BONDED));
        assert!(!pending.is_newly_locked_with(LockState::DEPOSITED));
        assert!(pending.is_locked_with(LockState::BONDED_DEPOSITED));
        assert!(pending.verify().is_ok());

        let done = pending.finalize(tx(9));
        assert_eq!(done, LockIds::new(tx(9), tx(1)));

        let plain: PendingLockIds = LockIds::bonded(tx(3)).into();
        assert_eq!(plain.finalize(tx(9)), LockIds::bonded(tx(3)));
    }

    #[test]
    fn test_pending_verify_rejects_overlap() {
        let bad = PendingLockIds {
            ids: LockIds::bonded(tx(1)),
            self_ref: LockState::BONDED,
        };
        assert!(bad.verify().is_err());
    }

    #[test]
    fn test_pending_order_puts_locked_first() {
        let unlocked = PendingLockIds::default();
        let fresh = PendingLockIds::lock(LockIds::UNLOCKED, LockState::BONDED);
        let old: PendingLockIds = LockIds::bonded(tx(4)).into();
        let mut all = vec![unlocked, old, fresh];
        all.sort();
        assert_eq!(all, vec![fresh, old, unlocked]);
    }
}
