use crate::chain::{all_utxo_ids, paginate, Chain, ChainReader, Versions};
use camino_core::cheque::{ChequeKey, ChequeRecord};
use camino_core::error::StorageError;
use camino_core::id::{Id, ShortId};
use camino_core::owner::MultisigAlias;
use camino_core::roles::AddressRoles;
use camino_core::utxo::Utxo;
use camino_transaction::{SignedTx, TxStatus};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Overlay of state changes on top of the state produced by `parent_id`.
///
/// Reads fall through to the parent state looked up in `versions` on every
/// call; if the parent has left the version set they fail with
/// [`StorageError::MissingParentState`]. All maps are ordered, so `apply`
/// writes in a deterministic order.
pub struct Diff {
    parent_id: Id,
    versions: Arc<dyn Versions>,
    timestamp: Option<u64>,
    modified_utxos: BTreeMap<Id, Option<Utxo>>,
    modified_paid_out: BTreeMap<(ShortId, ShortId), u64>,
    modified_cheques: BTreeMap<ChequeKey, ChequeRecord>,
    modified_roles: BTreeMap<ShortId, AddressRoles>,
    modified_aliases: BTreeMap<ShortId, MultisigAlias>,
    added_txs: BTreeMap<Id, (SignedTx, TxStatus)>,
}

impl std::fmt::Debug for Diff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diff")
            .field("parent_id", &self.parent_id)
            .field("timestamp", &self.timestamp)
            .field("modified_utxos", &self.modified_utxos.len())
            .field("added_txs", &self.added_txs.len())
            .finish()
    }
}

impl Diff {
    /// A new empty diff over the state of `parent_id`
    pub fn new(parent_id: Id, versions: Arc<dyn Versions>) -> Result<Self, StorageError> {
        if versions.get_state(&parent_id).is_none() {
            return Err(StorageError::MissingParentState(parent_id));
        }
        Ok(Self {
            parent_id,
            versions,
            timestamp: None,
            modified_utxos: BTreeMap::new(),
            modified_paid_out: BTreeMap::new(),
            modified_cheques: BTreeMap::new(),
            modified_roles: BTreeMap::new(),
            modified_aliases: BTreeMap::new(),
            added_txs: BTreeMap::new(),
        })
    }

    pub fn parent_id(&self) -> Id {
        self.parent_id
    }

    fn parent(&self) -> Result<Arc<dyn ChainReader>, StorageError> {
        self.versions
            .get_state(&self.parent_id)
            .ok_or(StorageError::MissingParentState(self.parent_id))
    }

    /// IDs of the txs added by this diff, ascending
    pub fn added_tx_ids(&self) -> Vec<Id> {
        self.added_txs.keys().copied().collect()
    }

    /// IDs of UTXOs this diff deletes
    pub fn consumed_utxo_ids(&self) -> Vec<Id> {
        self.modified_utxos
            .iter()
            .filter(|(_, utxo)| utxo.is_none())
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamp.is_none()
            && self.modified_utxos.is_empty()
            && self.modified_paid_out.is_empty()
            && self.modified_cheques.is_empty()
            && self.modified_roles.is_empty()
            && self.modified_aliases.is_empty()
            && self.added_txs.is_empty()
    }

    /// Write every change into `base`: UTXOs, paid-out ledger, cheques,
    /// address roles, aliases, txs, then the timestamp.
    pub fn apply(&self, base: &mut dyn Chain) -> Result<(), StorageError> {
        for (id, utxo) in &self.modified_utxos {
            match utxo {
                Some(utxo) => base.add_utxo(utxo.clone())?,
                None => base.delete_utxo(id)?,
            }
        }
        for ((issuer, beneficiary), amount) in &self.modified_paid_out {
            base.set_paid_out(*issuer, *beneficiary, *amount);
        }
        for (key, record) in &self.modified_cheques {
            base.set_cheque(*key, *record);
        }
        for (address, roles) in &self.modified_roles {
            base.set_address_roles(*address, *roles);
        }
        for alias in self.modified_aliases.values() {
            base.set_multisig_alias(alias.clone());
        }
        for (tx, status) in self.added_txs.values() {
            base.add_tx(tx.clone(), *status);
        }
        if let Some(timestamp) = self.timestamp {
            base.set_timestamp(timestamp);
        }
        Ok(())
    }

    /// Layer `second` over `first`. `second` must have been built on the
    /// state `first` produces; the result sits on `first`'s parent.
    pub fn merge(first: Diff, second: Diff) -> Diff {
        let mut merged = first;
        merged.modified_utxos.extend(second.modified_utxos);
        merged.modified_paid_out.extend(second.modified_paid_out);
        merged.modified_cheques.extend(second.modified_cheques);
        merged.modified_roles.extend(second.modified_roles);
        merged.modified_aliases.extend(second.modified_aliases);
        merged.added_txs.extend(second.added_txs);
        if second.timestamp.is_some() {
            merged.timestamp = second.timestamp;
        }
        merged
    }
}

impl ChainReader for Diff {
    fn timestamp(&self) -> Result<u64, StorageError> {
        match self.timestamp {
            Some(timestamp) => Ok(timestamp),
            None => self.parent()?.timestamp(),
        }
    }

    fn get_utxo(&self, utxo_id: &Id) -> Result<Option<Utxo>, StorageError> {
        match self.modified_utxos.get(utxo_id) {
            Some(utxo) => Ok(utxo.clone()),
            None => self.parent()?.get_utxo(utxo_id),
        }
    }

    fn utxo_ids_by_address(
        &self,
        address: &ShortId,
        after: Option<Id>,
        limit: usize,
    ) -> Result<(Vec<Id>, Option<Id>), StorageError> {
        let parent = self.parent()?;
        let mut ids: BTreeSet<Id> = all_utxo_ids(parent.as_ref(), address)?
            .into_iter()
            .filter(|id| !matches!(self.modified_utxos.get(id), Some(None)))
            .collect();
        for (id, utxo) in &self.modified_utxos {
            if let Some(utxo) = utxo {
                if utxo.addresses().contains(address) {
                    ids.insert(*id);
                }
            }
        }
        Ok(paginate(ids, after, limit))
    }

    fn get_tx(&self, tx_id: &Id) -> Result<Option<(SignedTx, TxStatus)>, StorageError> {
        match self.added_txs.get(tx_id) {
            Some(entry) => Ok(Some(entry.clone())),
            None => self.parent()?.get_tx(tx_id),
        }
    }

    fn paid_out(&self, issuer: &ShortId, beneficiary: &ShortId) -> Result<u64, StorageError> {
        match self.modified_paid_out.get(&(*issuer, *beneficiary)) {
            Some(amount) => Ok(*amount),
            None => self.parent()?.paid_out(issuer, beneficiary),
        }
    }

    fn cheque(&self, key: &ChequeKey) -> Result<Option<ChequeRecord>, StorageError> {
        match self.modified_cheques.get(key) {
            Some(record) => Ok(Some(*record)),
            None => self.parent()?.cheque(key),
        }
    }

    fn address_roles(&self, address: &ShortId) -> Result<AddressRoles, StorageError> {
        match self.modified_roles.get(address) {
            Some(roles) => Ok(*roles),
            None => self.parent()?.address_roles(address),
        }
    }

    fn multisig_alias(&self, address: &ShortId) -> Result<Option<MultisigAlias>, StorageError> {
        match self.modified_aliases.get(address) {
            Some(alias) => Ok(Some(alias.clone())),
            None => self.parent()?.multisig_alias(address),
        }
    }
}

impl Chain for Diff {
    fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = Some(timestamp);
    }

    fn add_utxo(&mut self, utxo: Utxo) -> Result<(), StorageError> {
        self.modified_utxos.insert(utxo.id(), Some(utxo));
        Ok(())
    }

    fn delete_utxo(&mut self, utxo_id: &Id) -> Result<(), StorageError> {
        self.modified_utxos.insert(*utxo_id, None);
        Ok(())
    }

    fn set_paid_out(&mut self, issuer: ShortId, beneficiary: ShortId, amount: u64) {
        self.modified_paid_out.insert((issuer, beneficiary), amount);
    }

    fn set_cheque(&mut self, key: ChequeKey, record: ChequeRecord) {
        self.modified_cheques.insert(key, record);
    }

    fn set_address_roles(&mut self, address: ShortId, roles: AddressRoles) {
        self.modified_roles.insert(address, roles);
    }

    fn set_multisig_alias(&mut self, alias: MultisigAlias) {
        self.modified_aliases.insert(alias.id, alias);
    }

    fn add_tx(&mut self, tx: SignedTx, status: TxStatus) {
        self.added_txs.insert(tx.id(), (tx, status));
    }
}
