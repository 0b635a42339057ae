//! Typed views over chain state shared by the persistent [`State`] and the
//! in-memory [`Diff`] overlay.
//!
//! [`State`]: crate::state::State
//! [`Diff`]: crate::diff::Diff

use camino_core::cheque::{ChequeKey, ChequeRecord};
use camino_core::error::StorageError;
use camino_core::id::{Id, ShortId};
use camino_core::owner::MultisigAlias;
use camino_core::roles::AddressRoles;
use camino_core::utxo::Utxo;
use camino_transaction::{SignedTx, TxStatus};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Page size used when a caller needs every UTXO of an address
pub const UTXO_PAGE_SIZE: usize = 1024;

/// Read access to chain state
pub trait ChainReader: Send + Sync {
    /// Chain time in unix seconds
    fn timestamp(&self) -> Result<u64, StorageError>;

    fn get_utxo(&self, utxo_id: &Id) -> Result<Option<Utxo>, StorageError>;

    /// UTXO IDs indexed under an address, ascending
    ///
    /// # Parameters
    /// * `address` - The owning address
    /// * `after` - Only IDs strictly greater than this one are returned
    /// * `limit` - Maximum number of IDs to return
    ///
    /// # Returns
    /// The IDs and, when the page is full, the ID to resume after
    fn utxo_ids_by_address(
        &self,
        address: &ShortId,
        after: Option<Id>,
        limit: usize,
    ) -> Result<(Vec<Id>, Option<Id>), StorageError>;

    fn get_tx(&self, tx_id: &Id) -> Result<Option<(SignedTx, TxStatus)>, StorageError>;

    /// Cumulative amount the issuer has paid out to the beneficiary
    fn paid_out(&self, issuer: &ShortId, beneficiary: &ShortId) -> Result<u64, StorageError>;

    fn cheque(&self, key: &ChequeKey) -> Result<Option<ChequeRecord>, StorageError>;

    fn address_roles(&self, address: &ShortId) -> Result<AddressRoles, StorageError>;

    fn multisig_alias(&self, address: &ShortId) -> Result<Option<MultisigAlias>, StorageError>;
}

/// Write access to chain state
pub trait Chain: ChainReader {
    fn set_timestamp(&mut self, timestamp: u64);

    /// Add a UTXO. Re-adding an identical UTXO is a no-op where the
    /// implementation can see the existing one.
    fn add_utxo(&mut self, utxo: Utxo) -> Result<(), StorageError>;

    fn delete_utxo(&mut self, utxo_id: &Id) -> Result<(), StorageError>;

    fn set_paid_out(&mut self, issuer: ShortId, beneficiary: ShortId, amount: u64);

    fn set_cheque(&mut self, key: ChequeKey, record: ChequeRecord);

    fn set_address_roles(&mut self, address: ShortId, roles: AddressRoles);

    fn set_multisig_alias(&mut self, alias: MultisigAlias);

    fn add_tx(&mut self, tx: SignedTx, status: TxStatus);
}

/// Chain states addressable by the block that produced them
pub trait Versions: Send + Sync {
    fn get_state(&self, block_id: &Id) -> Option<Arc<dyn ChainReader>>;
}

/// Merge a sorted base page with overlay changes and paginate
pub(crate) fn paginate(ids: BTreeSet<Id>, after: Option<Id>, limit: usize) -> (Vec<Id>, Option<Id>) {
    let page: Vec<Id> = ids
        .into_iter()
        .filter(|id| after.map_or(true, |a| *id > a))
        .take(limit)
        .collect();
    let next = if limit > 0 && page.len() == limit {
        page.last().copied()
    } else {
        None
    };
    (page, next)
}

/// Every UTXO ID indexed under `address`
pub fn all_utxo_ids<R: ChainReader + ?Sized>(
    reader: &R,
    address: &ShortId,
) -> Result<Vec<Id>, StorageError> {
    let mut ids = Vec::new();
    let mut after = None;
    loop {
        let (page, next) = reader.utxo_ids_by_address(address, after, UTXO_PAGE_SIZE)?;
        ids.extend(page);
        match next {
            Some(next) => after = Some(next),
            None => return Ok(ids),
        }
    }
}

/// Every UTXO owned by any of `addresses`, deduplicated, ascending by ID
pub fn get_all_utxos<R: ChainReader + ?Sized>(
    reader: &R,
    addresses: &[ShortId],
) -> Result<Vec<Utxo>, StorageError> {
    let mut ids = BTreeSet::new();
    for address in addresses {
        ids.extend(all_utxo_ids(reader, address)?);
    }
    let mut utxos = Vec::with_capacity(ids.len());
    for id in ids {
        match reader.get_utxo(&id)? {
            Some(utxo) => utxos.push(utxo),
            None => {
                return Err(StorageError::NotFound(format!(
                    "indexed utxo {} has no record",
                    id
                )))
            }
        }
    }
    Ok(utxos)
}

/// UTXOs of `address` carrying any lock
pub fn locked_utxos<R: ChainReader + ?Sized>(
    reader: &R,
    address: &ShortId,
) -> Result<Vec<Utxo>, StorageError> {
    Ok(get_all_utxos(reader, &[*address])?
        .into_iter()
        .filter(|utxo| utxo.out.effective_lock_state().is_locked())
        .collect())
}
