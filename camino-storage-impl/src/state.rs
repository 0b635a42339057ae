use crate::chain::{paginate, Chain, ChainReader};
use crate::storage_traits::{KeyValueStore, WriteBatch};
use camino_core::cheque::{ChequeKey, ChequeRecord};
use camino_core::codec;
use camino_core::error::StorageError;
use camino_core::id::{Id, ShortId};
use camino_core::owner::MultisigAlias;
use camino_core::roles::AddressRoles;
use camino_core::utxo::Utxo;
use camino_transaction::{SignedTx, TxStatus};
use log;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Persistent key layout
pub mod keys {
    use camino_core::cheque::ChequeKey;
    use camino_core::id::{Id, ShortId};

    pub const SINGLETON: &[u8] = b"singleton/";
    pub const BLOCK: &[u8] = b"block/";
    pub const TX: &[u8] = b"tx/";
    pub const UTXO: &[u8] = b"utxo/o/";
    pub const UTXO_BY_ADDRESS: &[u8] = b"utxo/a/";
    pub const ADDRESS_STATE: &[u8] = b"addressState/";
    pub const MULTISIG_ALIAS: &[u8] = b"multisigAliases/";
    pub const CHEQUE: &[u8] = b"chequebook/c/";
    pub const PAID_OUT: &[u8] = b"chequebook/p/";

    pub const TIMESTAMP: &[u8] = b"singleton/timestamp";
    pub const LAST_ACCEPTED: &[u8] = b"singleton/lastAccepted";
    pub const INITIALIZED: &[u8] = b"singleton/initialized";

    pub fn join(prefix: &[u8], parts: &[&[u8]]) -> Vec<u8> {
        let len = prefix.len() + parts.iter().map(|p| p.len()).sum::<usize>();
        let mut key = Vec::with_capacity(len);
        key.extend_from_slice(prefix);
        for part in parts {
            key.extend_from_slice(part);
        }
        key
    }

    pub fn utxo(id: &Id) -> Vec<u8> {
        join(UTXO, &[id.bytes()])
    }

    pub fn utxo_index(address: &ShortId, id: &Id) -> Vec<u8> {
        join(UTXO_BY_ADDRESS, &[address.bytes(), id.bytes()])
    }

    pub fn tx(id: &Id) -> Vec<u8> {
        join(TX, &[id.bytes()])
    }

    pub fn block(id: &Id) -> Vec<u8> {
        join(BLOCK, &[id.bytes()])
    }

    pub fn address_state(address: &ShortId) -> Vec<u8> {
        join(ADDRESS_STATE, &[address.bytes()])
    }

    pub fn multisig_alias(address: &ShortId) -> Vec<u8> {
        join(MULTISIG_ALIAS, &[address.bytes()])
    }

    pub fn cheque(key: &ChequeKey) -> Vec<u8> {
        join(
            CHEQUE,
            &[key.issuer.bytes(), key.agent.bytes(), key.beneficiary.bytes()],
        )
    }

    pub fn paid_out(issuer: &ShortId, beneficiary: &ShortId) -> Vec<u8> {
        join(PAID_OUT, &[issuer.bytes(), beneficiary.bytes()])
    }
}

#[derive(Serialize, Deserialize)]
struct TxRecord {
    tx: Vec<u8>,
    status: TxStatus,
}

/// Writes accepted but not yet committed to the backend
#[derive(Default)]
struct PendingWrites {
    timestamp: Option<u64>,
    last_accepted: Option<Id>,
    initialized: bool,
    utxos: BTreeMap<Id, Option<Utxo>>,
    /// Index entries of stored UTXOs deleted in this batch
    stale_index: BTreeMap<Id, Vec<ShortId>>,
    paid_out: BTreeMap<(ShortId, ShortId), u64>,
    cheques: BTreeMap<ChequeKey, ChequeRecord>,
    roles: BTreeMap<ShortId, AddressRoles>,
    aliases: BTreeMap<ShortId, MultisigAlias>,
    txs: BTreeMap<Id, (SignedTx, TxStatus)>,
    blocks: BTreeMap<Id, Vec<u8>>,
}

impl PendingWrites {
    fn is_empty(&self) -> bool {
        self.timestamp.is_none()
            && self.last_accepted.is_none()
            && !self.initialized
            && self.utxos.is_empty()
            && self.paid_out.is_empty()
            && self.cheques.is_empty()
            && self.roles.is_empty()
            && self.aliases.is_empty()
            && self.txs.is_empty()
            && self.blocks.is_empty()
    }
}

/// Chain state persisted in a [`KeyValueStore`], with a write-through
/// in-memory layer. Writes become durable on [`commit`](Self::commit), all in
/// one batch.
pub struct State<K: KeyValueStore> {
    db: K,
    timestamp: u64,
    last_accepted: Id,
    pending: PendingWrites,
}

impl<K: KeyValueStore> State<K> {
    /// Open the state stored in `db`, loading the singletons
    pub fn open(db: K) -> Result<Self, StorageError> {
        let timestamp = match db.get(keys::TIMESTAMP)? {
            Some(bytes) => codec::unmarshal(&bytes)?,
            None => 0,
        };
        let last_accepted = match db.get(keys::LAST_ACCEPTED)? {
            Some(bytes) => codec::unmarshal(&bytes)?,
            None => Id::EMPTY,
        };
        Ok(Self {
            db,
            timestamp,
            last_accepted,
            pending: PendingWrites::default(),
        })
    }

    pub fn db(&self) -> &K {
        &self.db
    }

    /// Whether genesis has been written
    pub fn is_initialized(&self) -> Result<bool, StorageError> {
        Ok(self.pending.initialized || self.db.has(keys::INITIALIZED)?)
    }

    pub fn set_initialized(&mut self) {
        self.pending.initialized = true;
    }

    pub fn last_accepted(&self) -> Id {
        self.pending.last_accepted.unwrap_or(self.last_accepted)
    }

    pub fn set_last_accepted(&mut self, block_id: Id) {
        self.pending.last_accepted = Some(block_id);
    }

    pub fn add_block(&mut self, block_id: Id, bytes: Vec<u8>) {
        self.pending.blocks.insert(block_id, bytes);
    }

    pub fn get_block(&self, block_id: &Id) -> Result<Option<Vec<u8>>, StorageError> {
        if let Some(bytes) = self.pending.blocks.get(block_id) {
            return Ok(Some(bytes.clone()));
        }
        self.db.get(&keys::block(block_id))
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drop every uncommitted write
    pub fn abort(&mut self) {
        self.pending = PendingWrites::default();
    }

    /// Write every pending change to the backend atomically
    pub fn commit(&mut self) -> Result<(), StorageError> {
        let batch = self.write_batch()?;
        let ops = batch.len();
        self.db.commit_batch(batch)?;

        if let Some(timestamp) = self.pending.timestamp {
            self.timestamp = timestamp;
        }
        if let Some(last_accepted) = self.pending.last_accepted {
            self.last_accepted = last_accepted;
        }
        self.pending = PendingWrites::default();
        log::debug!("committed {} state writes", ops);
        Ok(())
    }

    fn write_batch(&self) -> Result<WriteBatch, StorageError> {
        let mut batch = WriteBatch::new();

        for (id, addresses) in &self.pending.stale_index {
            for address in addresses {
                batch.delete(keys::utxo_index(address, id));
            }
        }
        for (id, utxo) in &self.pending.utxos {
            match utxo {
                Some(utxo) => {
                    batch.put(keys::utxo(id), codec::marshal(utxo)?);
                    for address in utxo.addresses() {
                        batch.put(keys::utxo_index(&address, id), Vec::new());
                    }
                }
                None => batch.delete(keys::utxo(id)),
            }
        }
        for ((issuer, beneficiary), amount) in &self.pending.paid_out {
            batch.put(keys::paid_out(issuer, beneficiary), codec::marshal(amount)?);
        }
        for (key, record) in &self.pending.cheques {
            batch.put(keys::cheque(key), codec::marshal(record)?);
        }
        for (address, roles) in &self.pending.roles {
            batch.put(keys::address_state(address), codec::marshal(roles)?);
        }
        for (address, alias) in &self.pending.aliases {
            batch.put(keys::multisig_alias(address), codec::marshal(alias)?);
        }
        for (id, (tx, status)) in &self.pending.txs {
            let record = TxRecord {
                tx: tx.bytes().to_vec(),
                status: *status,
            };
            batch.put(keys::tx(id), codec::marshal(&record)?);
        }
        for (id, bytes) in &self.pending.blocks {
            batch.put(keys::block(id), bytes.clone());
        }
        if let Some(timestamp) = self.pending.timestamp {
            batch.put(keys::TIMESTAMP.to_vec(), codec::marshal(&timestamp)?);
        }
        if let Some(last_accepted) = self.pending.last_accepted {
            batch.put(keys::LAST_ACCEPTED.to_vec(), codec::marshal(&last_accepted)?);
        }
        if self.pending.initialized {
            batch.put(keys::INITIALIZED.to_vec(), Vec::new());
        }
        Ok(batch)
    }

    fn load<T: serde::de::DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>, StorageError> {
        match self.db.get(key)? {
            Some(bytes) => Ok(Some(codec::unmarshal(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl<K: KeyValueStore> ChainReader for State<K> {
    fn timestamp(&self) -> Result<u64, StorageError> {
        Ok(self.pending.timestamp.unwrap_or(self.timestamp))
    }

    fn get_utxo(&self, utxo_id: &Id) -> Result<Option<Utxo>, StorageError> {
        if let Some(utxo) = self.pending.utxos.get(utxo_id) {
            return Ok(utxo.clone());
        }
        self.load(&keys::utxo(utxo_id))
    }

    fn utxo_ids_by_address(
        &self,
        address: &ShortId,
        after: Option<Id>,
        limit: usize,
    ) -> Result<(Vec<Id>, Option<Id>), StorageError> {
        let prefix = keys::join(keys::UTXO_BY_ADDRESS, &[address.bytes()]);
        let after_key = after.map(|id| keys::utxo_index(address, &id));

        // Deleted-but-uncommitted entries may hide rows, so over-fetch
        let deleted = self.pending.utxos.values().filter(|u| u.is_none()).count();
        let entries = self.db.scan_prefix(
            &prefix,
            after_key.as_deref(),
            Some(limit.saturating_add(deleted)),
        )?;

        let mut ids = BTreeSet::new();
        for (key, _) in entries {
            let id = Id::from_slice(&key[prefix.len()..])
                .map_err(|e| StorageError::Serialization(format!("bad index key: {}", e)))?;
            if !matches!(self.pending.utxos.get(&id), Some(None)) {
                ids.insert(id);
            }
        }
        for (id, utxo) in &self.pending.utxos {
            if let Some(utxo) = utxo {
                if utxo.addresses().contains(address) {
                    ids.insert(*id);
                }
            }
        }
        Ok(paginate(ids, after, limit))
    }

    fn get_tx(&self, tx_id: &Id) -> Result<Option<(SignedTx, TxStatus)>, StorageError> {
        if let Some(entry) = self.pending.txs.get(tx_id) {
            return Ok(Some(entry.clone()));
        }
        match self.load::<TxRecord>(&keys::tx(tx_id))? {
            Some(record) => Ok(Some((SignedTx::from_bytes(&record.tx)?, record.status))),
            None => Ok(None),
        }
    }

    fn paid_out(&self, issuer: &ShortId, beneficiary: &ShortId) -> Result<u64, StorageError> {
        if let Some(amount) = self.pending.paid_out.get(&(*issuer, *beneficiary)) {
            return Ok(*amount);
        }
        Ok(self.load(&keys::paid_out(issuer, beneficiary))?.unwrap_or(0))
    }

    fn cheque(&self, key: &ChequeKey) -> Result<Option<ChequeRecord>, StorageError> {
        if let Some(record) = self.pending.cheques.get(key) {
            return Ok(Some(*record));
        }
        self.load(&keys::cheque(key))
    }

    fn address_roles(&self, address: &ShortId) -> Result<AddressRoles, StorageError> {
        if let Some(roles) = self.pending.roles.get(address) {
            return Ok(*roles);
        }
        Ok(self.load(&keys::address_state(address))?.unwrap_or_default())
    }

    fn multisig_alias(&self, address: &ShortId) -> Result<Option<MultisigAlias>, StorageError> {
        if let Some(alias) = self.pending.aliases.get(address) {
            return Ok(Some(alias.clone()));
        }
        self.load(&keys::multisig_alias(address))
    }
}

impl<K: KeyValueStore> Chain for State<K> {
    fn set_timestamp(&mut self, timestamp: u64) {
        self.pending.timestamp = Some(timestamp);
    }

    fn add_utxo(&mut self, utxo: Utxo) -> Result<(), StorageError> {
        let id = utxo.id();
        match self.get_utxo(&id)? {
            Some(existing) if existing == utxo => Ok(()),
            Some(_) => Err(StorageError::DuplicateUtxo(id)),
            None => {
                self.pending.utxos.insert(id, Some(utxo));
                Ok(())
            }
        }
    }

    fn delete_utxo(&mut self, utxo_id: &Id) -> Result<(), StorageError> {
        if let Some(stored) = self.load::<Utxo>(&keys::utxo(utxo_id))? {
            self.pending.stale_index.insert(*utxo_id, stored.addresses());
        }
        self.pending.utxos.insert(*utxo_id, None);
        Ok(())
    }

    fn set_paid_out(&mut self, issuer: ShortId, beneficiary: ShortId, amount: u64) {
        self.pending.paid_out.insert((issuer, beneficiary), amount);
    }

    fn set_cheque(&mut self, key: ChequeKey, record: ChequeRecord) {
        self.pending.cheques.insert(key, record);
    }

    fn set_address_roles(&mut self, address: ShortId, roles: AddressRoles) {
        self.pending.roles.insert(address, roles);
    }

    fn set_multisig_alias(&mut self, alias: MultisigAlias) {
        self.pending.aliases.insert(alias.id, alias);
    }

    fn add_tx(&mut self, tx: SignedTx, status: TxStatus) {
        self.pending.txs.insert(tx.id(), (tx, status));
    }
}

/// A [`State`] shared between the pipeline (writer) and diff reads
pub struct SharedState<K: KeyValueStore> {
    inner: Arc<RwLock<State<K>>>,
}

impl<K: KeyValueStore> Clone for SharedState<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: KeyValueStore> SharedState<K> {
    pub fn new(state: State<K>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, State<K>>, StorageError> {
        self.inner
            .read()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, State<K>>, StorageError> {
        self.inner
            .write()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }
}

impl<K: KeyValueStore> ChainReader for SharedState<K> {
    fn timestamp(&self) -> Result<u64, StorageError> {
        self.read()?.timestamp()
    }

    fn get_utxo(&self, utxo_id: &Id) -> Result<Option<Utxo>, StorageError> {
        self.read()?.get_utxo(utxo_id)
    }

    fn utxo_ids_by_address(
        &self,
        address: &ShortId,
        after: Option<Id>,
        limit: usize,
    ) -> Result<(Vec<Id>, Option<Id>), StorageError> {
        self.read()?.utxo_ids_by_address(address, after, limit)
    }

    fn get_tx(&self, tx_id: &Id) -> Result<Option<(SignedTx, TxStatus)>, StorageError> {
        self.read()?.get_tx(tx_id)
    }

    fn paid_out(&self, issuer: &ShortId, beneficiary: &ShortId) -> Result<u64, StorageError> {
        self.read()?.paid_out(issuer, beneficiary)
    }

    fn cheque(&self, key: &ChequeKey) -> Result<Option<ChequeRecord>, StorageError> {
        self.read()?.cheque(key)
    }

    fn address_roles(&self, address: &ShortId) -> Result<AddressRoles, StorageError> {
        self.read()?.address_roles(address)
    }

    fn multisig_alias(&self, address: &ShortId) -> Result<Option<MultisigAlias>, StorageError> {
        self.read()?.multisig_alias(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{all_utxo_ids, locked_utxos};
    use crate::memory::MemoryStore;
    use camino_core::components::{StoredOutput, TransferOutput};
    use camino_core::lock::LockIds;
    use camino_core::owner::OutputOwners;
    use camino_core::utxo::UtxoId;

    fn addr(n: u8) -> ShortId {
        ShortId::new([n; 20])
    }

    fn utxo(tx: u8, index: u32, owner: u8, amount: u64) -> Utxo {
        Utxo {
            utxo_id: UtxoId::new(Id::new([tx; 32]), index),
            asset_id: Id::EMPTY,
            out: StoredOutput::transfer(amount, OutputOwners::single(addr(owner))),
        }
    }

    #[test]
    fn test_put_is_idempotent_and_detects_conflicts() {
        let mut state = State::open(MemoryStore::new()).unwrap();
        let u = utxo(1, 0, 1, 10);
        state.add_utxo(u.clone()).unwrap();
        state.add_utxo(u.clone()).unwrap();
        state.commit().unwrap();
        state.add_utxo(u.clone()).unwrap();

        let mut changed = u.clone();
        changed.out = StoredOutput::transfer(11, OutputOwners::single(addr(1)));
        assert!(matches!(
            state.add_utxo(changed),
            Err(StorageError::DuplicateUtxo(id)) if id == u.id()
        ));
    }

    #[test]
    fn test_commit_persists_and_abort_discards() {
        let db = Arc::new(MemoryStore::new());
        let mut state = State::open(Arc::clone(&db)).unwrap();
        state.add_utxo(utxo(1, 0, 1, 10)).unwrap();
        state.set_timestamp(42);
        state.set_last_accepted(Id::new([9; 32]));
        state.commit().unwrap();

        state.add_utxo(utxo(2, 0, 1, 20)).unwrap();
        assert!(state.has_pending_writes());
        state.abort();
        assert!(!state.has_pending_writes());

        let reopened = State::open(db).unwrap();
        assert_eq!(reopened.timestamp().unwrap(), 42);
        assert_eq!(reopened.last_accepted(), Id::new([9; 32]));
        assert!(reopened.get_utxo(&utxo(1, 0, 1, 10).id()).unwrap().is_some());
        assert!(reopened.get_utxo(&utxo(2, 0, 1, 20).id()).unwrap().is_none());
    }

    #[test]
    fn test_address_index_pagination() {
        let mut state = State::open(MemoryStore::new()).unwrap();
        for i in 0..5 {
            state.add_utxo(utxo(1, i, 1, 10)).unwrap();
        }
        state.add_utxo(utxo(2, 0, 2, 10)).unwrap();
        state.commit().unwrap();

        // one deleted and one added without committing
        let deleted = utxo(1, 2, 1, 10).id();
        state.delete_utxo(&deleted).unwrap();
        state.add_utxo(utxo(3, 0, 1, 10)).unwrap();

        let (first, next) = state.utxo_ids_by_address(&addr(1), None, 3).unwrap();
        assert_eq!(first.len(), 3);
        assert!(next.is_some());
        let (rest, end) = state.utxo_ids_by_address(&addr(1), next, 3).unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(end, None);

        let mut all: Vec<Id> = first.into_iter().chain(rest).collect();
        assert!(all.windows(2).all(|w| w[0] < w[1]));
        assert!(!all.contains(&deleted));

        state.commit().unwrap();
        all.sort();
        assert_eq!(all_utxo_ids(&state, &addr(1)).unwrap(), all);
        assert_eq!(all_utxo_ids(&state, &addr(2)).unwrap().len(), 1);
    }

    #[test]
    fn test_locked_utxos_filters_unlocked() {
        let mut state = State::open(MemoryStore::new()).unwrap();
        state.add_utxo(utxo(1, 0, 1, 10)).unwrap();
        let mut locked = utxo(1, 1, 1, 30);
        locked.out = StoredOutput::locked(
            LockIds::bonded(Id::new([7; 32])),
            TransferOutput::new(30, OutputOwners::single(addr(1))),
        );
        state.add_utxo(locked.clone()).unwrap();

        assert_eq!(locked_utxos(&state, &addr(1)).unwrap(), vec![locked]);
    }

    #[test]
    fn test_ledgers_default_and_persist() {
        let db = Arc::new(MemoryStore::new());
        let mut state = State::open(Arc::clone(&db)).unwrap();
        let key = ChequeKey::new(addr(1), addr(2), addr(3));
        assert_eq!(state.paid_out(&addr(1), &addr(3)).unwrap(), 0);
        assert_eq!(state.cheque(&key).unwrap(), None);
        assert_eq!(state.address_roles(&addr(1)).unwrap(), AddressRoles::NONE);

        state.set_paid_out(addr(1), addr(3), 500);
        state.set_cheque(key, ChequeRecord { amount: 500, serial: 7 });
        state.set_initialized();
        state.commit().unwrap();

        let reopened = State::open(db).unwrap();
        assert!(reopened.is_initialized().unwrap());
        assert_eq!(reopened.paid_out(&addr(1), &addr(3)).unwrap(), 500);
        assert_eq!(
            reopened.cheque(&key).unwrap(),
            Some(ChequeRecord { amount: 500, serial: 7 })
        );
    }

    #[test]
    fn test_shared_state_reads_through_lock() {
        let mut state = State::open(MemoryStore::new()).unwrap();
        state.add_utxo(utxo(1, 0, 1, 10)).unwrap();
        let shared = SharedState::new(state);
        let reader: Arc<dyn ChainReader> = Arc::new(shared.clone());
        assert!(reader.get_utxo(&utxo(1, 0, 1, 10).id()).unwrap().is_some());

        shared.write().unwrap().set_timestamp(5);
        assert_eq!(reader.timestamp().unwrap(), 5);
    }
}
