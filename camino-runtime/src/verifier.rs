//! Value-conservation and authorization checks for lock, transfer and
//! unlock transitions.

use crate::fx::Fx;
use camino_core::components::TransferOutput;
use camino_core::error::VerifyError;
use camino_core::id::Id;
use camino_core::lock::{LockIds, LockState};
use camino_storage_impl::ChainReader;
use camino_transaction::{Credential, TransferableInput, TransferableOutput};
use std::collections::BTreeMap;

fn add(total: &mut u64, amount: u64) -> Result<(), VerifyError> {
    *total = total
        .checked_add(amount)
        .ok_or(VerifyError::Overflow("summing amounts"))?;
    Ok(())
}

/// A consumed UTXO after its input has been checked against it
struct Consumed {
    ids: LockIds,
    out: TransferOutput,
}

/// Verifier for the value flow of a tx against a chain view
pub struct TransitionVerifier<'a> {
    /// Signature scheme used to check credentials
    fx: &'a dyn Fx,
}

impl<'a> TransitionVerifier<'a> {
    pub fn new(fx: &'a dyn Fx) -> Self {
        Self { fx }
    }

    fn check_credentials(
        &self,
        ins: &[TransferableInput],
        creds: &[Credential],
    ) -> Result<(), VerifyError> {
        if ins.len() != creds.len() {
            return Err(VerifyError::CredentialCountMismatch {
                inputs: ins.len(),
                credentials: creds.len(),
            });
        }
        for cred in creds {
            self.fx.verify_credential(cred)?;
        }
        Ok(())
    }

    /// Check one input against the UTXO it consumes: existence, asset,
    /// nesting, claimed lock IDs, amount. The lock-state rule of the
    /// transition runs in `check_lock` before the signature check.
    #[allow(clippy::too_many_arguments)]
    fn consume(
        &self,
        chain: &dyn ChainReader,
        tx_hash: &Id,
        input: &TransferableInput,
        cred: &Credential,
        asset_id: Id,
        now: u64,
        check_lock: impl Fn(&Id, LockIds) -> Result<(), VerifyError>,
    ) -> Result<Consumed, VerifyError> {
        let utxo_id = input.input_id();
        let utxo = chain
            .get_utxo(&utxo_id)?
            .ok_or(VerifyError::MissingUtxo(utxo_id))?;
        for actual in [utxo.asset_id, input.asset_id] {
            if actual != asset_id {
                return Err(VerifyError::AssetMismatch {
                    utxo: utxo_id,
                    expected: asset_id,
                    actual,
                });
            }
        }

        let out = utxo.out.transfer_output()?;
        let transfer_in = input.input.transfer_input()?;
        let ids = utxo.out.lock_ids().copied().unwrap_or_default();
        if input.input.lock_ids() != ids {
            return Err(VerifyError::LockIdsMismatch(utxo_id));
        }
        check_lock(&utxo_id, ids)?;

        self.fx
            .verify_transfer(chain, tx_hash, transfer_in, cred, &out.owners, now)?;
        if transfer_in.amount != out.amount {
            return Err(VerifyError::AmountMismatch {
                input: transfer_in.amount,
                utxo: out.amount,
            });
        }
        Ok(Consumed {
            ids,
            out: out.clone(),
        })
    }

    /// Verify a transition that locks value with `applied` (or, with
    /// `UNLOCKED`, moves unlocked value) and burns `burned`.
    ///
    /// Value consumed under locked IDs must be produced under the same IDs,
    /// or under them extended by this tx's own lock of `applied`. Unlocked
    /// value must cover produced unlocked and newly locked value plus the
    /// burn; `minted` adds to the unlocked side.
    ///
    /// # Parameters
    /// * `chain` - State the inputs are read from
    /// * `tx_hash` - Hash of the unsigned tx the credentials sign
    /// * `ins` / `outs` - The tx's inputs and outputs
    /// * `creds` - One credential per input
    /// * `minted` - Unlocked value created from nothing
    /// * `burned` - Unlocked value that must be destroyed
    /// * `asset_id` - The only asset the tx may move
    /// * `applied` - The lock the tx adds
    #[allow(clippy::too_many_arguments)]
    pub fn verify_lock(
        &self,
        chain: &dyn ChainReader,
        tx_hash: &Id,
        ins: &[TransferableInput],
        outs: &[TransferableOutput],
        creds: &[Credential],
        minted: u64,
        burned: u64,
        asset_id: Id,
        applied: LockState,
    ) -> Result<(), VerifyError> {
        if applied != LockState::UNLOCKED
            && applied != LockState::BONDED
            && applied != LockState::DEPOSITED
        {
            return Err(VerifyError::InvalidLockState(applied.bits()));
        }
        self.check_credentials(ins, creds)?;

        let now = chain.timestamp()?;
        let mut consumed: BTreeMap<LockIds, u64> = BTreeMap::new();
        for (input, cred) in ins.iter().zip(creds) {
            let spent = self.consume(chain, tx_hash, input, cred, asset_id, now, |utxo_id, ids| {
                if applied.is_locked() && ids.is_locked_with(applied) {
                    return Err(VerifyError::LockingLockedUtxo(*utxo_id));
                }
                if !applied.is_locked() && ids.is_locked() {
                    return Err(VerifyError::LockedInputInTransfer(*utxo_id));
                }
                Ok(())
            })?;
            add(consumed.entry(spent.ids).or_default(), spent.out.amount)?;
        }

        let mut produced: BTreeMap<LockIds, u64> = BTreeMap::new();
        for output in outs {
            if output.asset_id != asset_id {
                return Err(VerifyError::InvalidOutput(format!(
                    "output asset {} differs from {}",
                    output.asset_id, asset_id
                )));
            }
            let out = output.out.transfer_output()?;
            let ids = output.out.lock_ids().copied().unwrap_or_default();
            ids.verify()?;
            if ids.self_ref.without(applied).is_locked() {
                return Err(VerifyError::UnexpectedSelfReference(ids.self_ref));
            }
            add(produced.entry(ids.prior()).or_default(), out.amount)?;
        }

        for (ids, amount) in consumed.iter().filter(|(ids, _)| ids.is_locked()) {
            if produced.get(ids) != Some(amount) {
                return Err(VerifyError::LockedValueNotConserved(ids.to_string()));
            }
        }
        for (ids, amount) in produced.iter().filter(|(ids, _)| ids.is_locked()) {
            if consumed.get(ids) != Some(amount) {
                return Err(VerifyError::LockedValueNotConserved(ids.to_string()));
            }
        }

        let mut consumed_unlocked = consumed.get(&LockIds::UNLOCKED).copied().unwrap_or(0);
        add(&mut consumed_unlocked, minted)?;
        let produced_unlocked = produced.get(&LockIds::UNLOCKED).copied().unwrap_or(0);
        let insufficient = || VerifyError::InsufficientUnlockedFunds {
            consumed: consumed_unlocked,
            produced: produced_unlocked,
            burned,
        };
        let spare = consumed_unlocked
            .checked_sub(produced_unlocked)
            .ok_or_else(insufficient)?;
        if spare < burned {
            return Err(insufficient());
        }
        Ok(())
    }

    /// Verify a transition that releases `amount` of locked value.
    ///
    /// Locked value produced under each (lock IDs, owner) must not exceed
    /// what was consumed under it, exactly `amount` must be released, all of
    /// it as unlocked outputs to the owners it was released from, and the
    /// unlocked inputs must equal `burned`.
    #[allow(clippy::too_many_arguments)]
    pub fn verify_unlock(
        &self,
        chain: &dyn ChainReader,
        tx_hash: &Id,
        ins: &[TransferableInput],
        outs: &[TransferableOutput],
        creds: &[Credential],
        burned: u64,
        asset_id: Id,
        amount: u64,
    ) -> Result<(), VerifyError> {
        self.check_credentials(ins, creds)?;

        let now = chain.timestamp()?;
        let mut consumed_locked: BTreeMap<(LockIds, Id), u64> = BTreeMap::new();
        let mut consumed_unlocked = 0u64;
        for (input, cred) in ins.iter().zip(creds) {
            let spent = self.consume(chain, tx_hash, input, cred, asset_id, now, |_, _| Ok(()))?;
            if spent.ids.is_locked() {
                let key = (spent.ids, spent.out.owners.owner_id());
                add(consumed_locked.entry(key).or_default(), spent.out.amount)?;
            } else {
                add(&mut consumed_unlocked, spent.out.amount)?;
            }
        }

        let mut produced_locked: BTreeMap<(LockIds, Id), u64> = BTreeMap::new();
        let mut produced_unlocked: BTreeMap<Id, u64> = BTreeMap::new();
        for output in outs {
            if output.asset_id != asset_id {
                return Err(VerifyError::InvalidOutput(format!(
                    "output asset {} differs from {}",
                    output.asset_id, asset_id
                )));
            }
            let out = output.out.transfer_output()?;
            let ids = output.out.lock_ids().copied().unwrap_or_default();
            if ids.self_ref.is_locked() {
                return Err(VerifyError::UnexpectedSelfReference(ids.self_ref));
            }
            if ids.ids.is_locked() {
                let key = (ids.ids, out.owners.owner_id());
                add(produced_locked.entry(key).or_default(), out.amount)?;
            } else {
                add(produced_unlocked.entry(out.owners.owner_id()).or_default(), out.amount)?;
            }
        }

        let mut released: BTreeMap<Id, u64> = BTreeMap::new();
        let mut total_released = 0u64;
        for ((ids, owner), consumed) in &consumed_locked {
            let kept = produced_locked.get(&(*ids, *owner)).copied().unwrap_or(0);
            let freed = consumed
                .checked_sub(kept)
                .ok_or_else(|| VerifyError::LockedValueNotConserved(ids.to_string()))?;
            add(released.entry(*owner).or_default(), freed)?;
            add(&mut total_released, freed)?;
        }
        for key in produced_locked.keys() {
            if !consumed_locked.contains_key(key) {
                return Err(VerifyError::UnlockMismatch(format!(
                    "locked value under {} moved to another owner",
                    key.0
                )));
            }
        }

        if total_released != amount {
            return Err(VerifyError::UnlockMismatch(format!(
                "released {} but tx unlocks {}",
                total_released, amount
            )));
        }
        let total_unlocked: u64 = produced_unlocked.values().try_fold(0u64, |sum, v| {
            sum.checked_add(*v).ok_or(VerifyError::Overflow("summing amounts"))
        })?;
        if total_unlocked != amount {
            return Err(VerifyError::UnlockMismatch(format!(
                "unlocked outputs pay {} but tx unlocks {}",
                total_unlocked, amount
            )));
        }
        for (owner, paid) in &produced_unlocked {
            if released.get(owner).copied().unwrap_or(0) < *paid {
                return Err(VerifyError::UnlockMismatch(format!(
                    "owner {} receives more than was released from its locks",
                    owner
                )));
            }
        }
        if consumed_unlocked != burned {
            return Err(VerifyError::UnlockMismatch(format!(
                "unlocked inputs {} differ from burn {}",
                consumed_unlocked, burned
            )));
        }
        Ok(())
    }
}
