//! Selection of UTXOs that lock, burn and transfer value.

use crate::keychain::Keychain;
use camino_core::components::{Input, TransferInput, TransferOutput, TxOutput};
use camino_core::error::{LockError, StorageError};
use camino_core::id::{Id, ShortId};
use camino_core::lock::{LockIds, LockState, PendingLockIds};
use camino_core::owner::OutputOwners;
use camino_core::utxo::Utxo;
use camino_storage_impl::{get_all_utxos, ChainReader};
use camino_transaction::{
    sort_inputs_with_signers, sort_outputs, TransferableInput, TransferableOutput,
};
use log::debug;
use std::collections::BTreeMap;

/// What a caller wants locked and burned
#[derive(Debug, Clone)]
pub struct LockRequest {
    /// Only UTXOs of this asset are consumed
    pub asset_id: Id,
    pub total_to_lock: u64,
    pub total_to_burn: u64,
    /// `BONDED`, `DEPOSITED`, or `UNLOCKED` for a plain transfer
    pub applied_lock_state: LockState,
    /// Receiver of the locked (or, for a transfer, sent) value; the owner of
    /// each consumed UTXO when unset
    pub to: Option<OutputOwners>,
    /// Receiver of unlocked remainders; the owner of each consumed UTXO when
    /// unset
    pub change: Option<OutputOwners>,
    /// Time used for locktime checks
    pub as_of: u64,
    /// Multisig alias addresses whose UTXOs may be spent as well
    pub from_aliases: Vec<ShortId>,
}

impl LockRequest {
    pub fn new(asset_id: Id, total_to_lock: u64, total_to_burn: u64, applied: LockState) -> Self {
        Self {
            asset_id,
            total_to_lock,
            total_to_burn,
            applied_lock_state: applied,
            to: None,
            change: None,
            as_of: 0,
            from_aliases: Vec::new(),
        }
    }
}

/// Inputs, outputs and signers of a planned tx.
///
/// `signers[i]` lists the addresses whose keys sign input `i`; inputs and
/// outputs are in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpendPlan {
    pub ins: Vec<TransferableInput>,
    pub outs: Vec<TransferableOutput>,
    pub signers: Vec<Vec<ShortId>>,
    /// Owners of the UTXO consumed by each input
    pub owners: Vec<OutputOwners>,
}

impl SpendPlan {
    pub(crate) fn push_input(
        &mut self,
        utxo: &Utxo,
        ids: LockIds,
        amount: u64,
        sig_indices: Vec<u32>,
        signers: Vec<ShortId>,
        owners: OutputOwners,
    ) {
        self.ins.push(TransferableInput {
            utxo_id: utxo.utxo_id,
            asset_id: utxo.asset_id,
            input: Input::locked(ids, TransferInput { amount, sig_indices }),
        });
        self.signers.push(signers);
        self.owners.push(owners);
    }

    /// Sort inputs by UTXO ID with their signers and owners, and outputs
    /// canonically
    pub(crate) fn finish(mut self, outputs: OutputSet) -> Self {
        let mut paired: Vec<(Vec<ShortId>, OutputOwners)> =
            self.signers.drain(..).zip(self.owners.drain(..)).collect();
        sort_inputs_with_signers(&mut self.ins, &mut paired);
        let (signers, owners) = paired.into_iter().unzip();
        self.signers = signers;
        self.owners = owners;
        self.outs = outputs.into_outputs();
        sort_outputs(&mut self.outs);
        self
    }

    /// Sum of output amounts locked with `state` by this tx
    pub fn newly_locked(&self, state: LockState) -> u64 {
        self.outs
            .iter()
            .filter(|out| out.out.is_newly_locked_with(state))
            .filter_map(|out| out.out.amount().ok())
            .sum()
    }
}

/// Outputs coalesced per (owner, lock ids)
pub(crate) struct OutputSet {
    asset_id: Id,
    entries: BTreeMap<(Id, PendingLockIds), (OutputOwners, u64)>,
}

impl OutputSet {
    pub(crate) fn new(asset_id: Id) -> Self {
        Self {
            asset_id,
            entries: BTreeMap::new(),
        }
    }

    pub(crate) fn add(
        &mut self,
        owners: &OutputOwners,
        ids: PendingLockIds,
        amount: u64,
    ) -> Result<(), LockError> {
        let entry = self
            .entries
            .entry((owners.owner_id(), ids))
            .or_insert_with(|| (owners.clone(), 0));
        entry.1 = entry
            .1
            .checked_add(amount)
            .ok_or(LockError::Overflow("coalescing outputs"))?;
        Ok(())
    }

    fn into_outputs(self) -> Vec<TransferableOutput> {
        let asset_id = self.asset_id;
        self.entries
            .into_iter()
            .map(|((_, ids), (owners, amount))| TransferableOutput {
                asset_id,
                out: TxOutput::locked(ids, TransferOutput::new(amount, owners)),
            })
            .collect()
    }
}

fn is_alias_owned<R: ChainReader + ?Sized>(
    chain: &R,
    owners: &OutputOwners,
) -> Result<bool, StorageError> {
    for address in &owners.addrs {
        if chain.multisig_alias(address)?.is_some() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Plan a tx that locks `total_to_lock` with the applied state and burns
/// `total_to_burn` from the keychain's UTXOs.
///
/// UTXOs of the requested asset come first, then UTXOs that are locked but
/// may take the applied lock on top, then ascending amount. Burned value is
/// always taken from unlocked UTXOs. UTXOs the keychain cannot spend are
/// skipped.
///
/// # Returns
/// The planned inputs and outputs in canonical order, with the signers of
/// each input
pub fn lock<R: ChainReader + ?Sized>(
    chain: &R,
    keychain: &Keychain,
    req: &LockRequest,
) -> Result<SpendPlan, LockError> {
    let applied = req.applied_lock_state;
    if applied != LockState::BONDED
        && applied != LockState::DEPOSITED
        && applied != LockState::UNLOCKED
    {
        return Err(LockError::InvalidTargetLockState(applied));
    }

    let mut addresses = keychain.addresses();
    addresses.extend(req.from_aliases.iter().copied());
    let mut utxos = get_all_utxos(chain, &addresses)?;

    // Locked UTXOs that can take the applied lock, ahead of unlocked ones
    let lockable = |utxo: &Utxo| {
        let state = utxo.out.effective_lock_state();
        state.is_locked() && applied.is_locked() && !state.contains(applied)
    };
    utxos.sort_by_key(|utxo| {
        (
            utxo.asset_id != req.asset_id,
            !lockable(utxo),
            utxo.out.amount().unwrap_or(u64::MAX),
            utxo.id(),
        )
    });

    let mut plan = SpendPlan::default();
    let mut outputs = OutputSet::new(req.asset_id);
    let mut locked = 0u64;
    let mut burned = 0u64;

    for utxo in &utxos {
        if locked == req.total_to_lock && burned == req.total_to_burn {
            break;
        }
        if utxo.asset_id != req.asset_id {
            continue;
        }
        let inner = match utxo.out.transfer_output() {
            Ok(inner) => inner,
            Err(e) => {
                debug!("skipping utxo {}: {}", utxo.id(), e);
                continue;
            }
        };
        let ids = utxo.out.lock_ids().copied().unwrap_or_default();
        if ids.is_locked() {
            // Locked value can neither pay the burn nor move while unlocked
            if !applied.is_locked() || ids.lock_state().contains(applied) {
                continue;
            }
            if locked == req.total_to_lock {
                continue;
            }
        }

        let (sig_indices, signers) = match keychain.spend_multisig(&inner.owners, req.as_of, chain) {
            Ok(spend) => spend,
            Err(LockError::CannotSpend(reason)) => {
                debug!("skipping utxo {}: {}", utxo.id(), reason);
                continue;
            }
            Err(e) => return Err(e),
        };
        plan.push_input(utxo, ids, inner.amount, sig_indices, signers, inner.owners.clone());

        let mut remaining = inner.amount;
        if !ids.is_locked() {
            let burn = remaining.min(req.total_to_burn - burned);
            burned += burn;
            remaining -= burn;
        }

        let lock = remaining.min(req.total_to_lock - locked);
        if lock > 0 {
            locked += lock;
            remaining -= lock;
            let owners = req.to.as_ref().unwrap_or(&inner.owners);
            outputs.add(owners, PendingLockIds::lock(ids, applied), lock)?;
        }

        if remaining > 0 {
            let owners = if ids.is_locked() || is_alias_owned(chain, &inner.owners)? {
                &inner.owners
            } else {
                req.change.as_ref().unwrap_or(&inner.owners)
            };
            outputs.add(owners, PendingLockIds::from(ids), remaining)?;
        }
    }

    if locked < req.total_to_lock || burned < req.total_to_burn {
        return Err(LockError::InsufficientBalance {
            to_lock: req.total_to_lock,
            to_burn: req.total_to_burn,
            locked,
            burned,
        });
    }

    debug!(
        "planned {} inputs locking {} as {} and burning {}",
        plan.ins.len(),
        locked,
        applied,
        burned
    );
    Ok(plan.finish(outputs))
}
