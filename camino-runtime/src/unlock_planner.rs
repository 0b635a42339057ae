use crate::keychain::Keychain;
use crate::lock_planner::{OutputSet, SpendPlan};
use camino_core::error::LockError;
use camino_core::id::{Id, ShortId};
use camino_core::lock::PendingLockIds;
use camino_storage_impl::{locked_utxos, ChainReader};
use log::debug;

/// Plan a tx releasing `amount` of the locked value held by `address`.
///
/// Locked UTXOs are consumed in ascending ID order. The last one consumed
/// may be split: the released part becomes an unlocked output and the rest
/// stays locked with the same lock IDs and owner. Nothing is burned.
pub fn unlock<R: ChainReader + ?Sized>(
    chain: &R,
    keychain: &Keychain,
    asset_id: Id,
    address: &ShortId,
    amount: u64,
    as_of: u64,
) -> Result<SpendPlan, LockError> {
    let mut spendable = Vec::new();
    let mut available = 0u64;
    for utxo in locked_utxos(chain, address)? {
        if utxo.asset_id != asset_id {
            continue;
        }
        let Ok(inner) = utxo.out.transfer_output() else {
            continue;
        };
        match keychain.spend_multisig(&inner.owners, as_of, chain) {
            Ok(spend) => {
                available = available
                    .checked_add(inner.amount)
                    .ok_or(LockError::Overflow("summing locked funds"))?;
                let inner = inner.clone();
                spendable.push((utxo, inner, spend));
            }
            Err(LockError::CannotSpend(reason)) => {
                debug!("skipping locked utxo {}: {}", utxo.id(), reason);
            }
            Err(e) => return Err(e),
        }
    }
    if available < amount {
        return Err(LockError::NotEnoughLockedFunds {
            requested: amount,
            available,
        });
    }

    let mut plan = SpendPlan::default();
    let mut outputs = OutputSet::new(asset_id);
    let mut remaining = amount;
    for (utxo, inner, (sig_indices, signers)) in spendable {
        if remaining == 0 {
            break;
        }
        let ids = utxo.out.lock_ids().copied().unwrap_or_default();
        plan.push_input(&utxo, ids, inner.amount, sig_indices, signers, inner.owners.clone());

        let release = remaining.min(inner.amount);
        remaining -= release;
        outputs.add(&inner.owners, PendingLockIds::default(), release)?;
        if inner.amount > release {
            outputs.add(&inner.owners, PendingLockIds::from(ids), inner.amount - release)?;
        }
    }

    debug!("planned unlock of {} from {} inputs", amount, plan.ins.len());
    Ok(plan.finish(outputs))
}
