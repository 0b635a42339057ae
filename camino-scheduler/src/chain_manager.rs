use crate::block::Block;
use crate::conflict::BasicConflictChecker;
use crate::error::ChainError;
use crate::mempool::{DroppedTx, Mempool};
use camino_core::error::{ErrorKind, StorageError};
use camino_core::id::Id;
use camino_runtime::{ExecutionConfig, Executor, Fx};
use camino_storage_impl::{Chain, ChainReader, Diff, KeyValueStore, SharedState, State, Versions};
use camino_transaction::SignedTx;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Pipeline limits and the execution parameters txs are checked with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub execution: ExecutionConfig,
    pub max_mempool_txs: usize,
    pub max_block_txs: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            execution: ExecutionConfig::default(),
            max_mempool_txs: 4096,
            max_block_txs: 256,
        }
    }
}

/// Cancels an in-flight admission. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// States by block ID: the base store for the last accepted block and one
/// diff per processing block.
struct StateVersions<K: KeyValueStore> {
    base: SharedState<K>,
    last_accepted: RwLock<Id>,
    processing: RwLock<HashMap<Id, Arc<Diff>>>,
}

impl<K: KeyValueStore + 'static> Versions for StateVersions<K> {
    fn get_state(&self, block_id: &Id) -> Option<Arc<dyn ChainReader>> {
        if *self.last_accepted.read().ok()? == *block_id {
            return Some(Arc::new(self.base.clone()));
        }
        let processing = self.processing.read().ok()?;
        processing
            .get(block_id)
            .map(|diff| Arc::clone(diff) as Arc<dyn ChainReader>)
    }
}

/// Blocks verified but not yet decided, and the tip new work builds on
struct Pipeline {
    preferred: Id,
    last_accepted: Id,
    last_accepted_height: u64,
    blocks: HashMap<Id, Block>,
}

impl Pipeline {
    fn height_of(&self, block_id: &Id) -> Option<u64> {
        if *block_id == self.last_accepted {
            return Some(self.last_accepted_height);
        }
        self.blocks.get(block_id).map(Block::height)
    }

    fn is_known(&self, block_id: &Id) -> bool {
        *block_id == self.last_accepted || self.blocks.contains_key(block_id)
    }

    /// `root` followed by every processing block built on it, parents first
    fn branch(&self, root: Id) -> Vec<Id> {
        let mut branch = vec![root];
        let mut next = 0;
        while next < branch.len() {
            let parent = branch[next];
            let mut children: Vec<Id> = self
                .blocks
                .values()
                .filter(|block| block.parent_id() == parent)
                .map(Block::id)
                .collect();
            children.sort();
            branch.extend(children);
            next += 1;
        }
        branch
    }
}

fn poisoned<T>(err: PoisonError<T>) -> ChainError {
    ChainError::Storage(StorageError::Lock(err.to_string()))
}

/// Drives txs from admission to accepted blocks.
///
/// A coarse reader/writer lock over the pipeline orders everything: admission
/// and block building hold it for reading, block verification, acceptance
/// and rejection hold it for writing. Block building additionally holds the
/// builder lock so only one block is sealed at a time.
pub struct ChainManager<K: KeyValueStore + 'static> {
    config: ChainConfig,
    fx: Box<dyn Fx>,
    versions: Arc<StateVersions<K>>,
    mempool: RwLock<Mempool>,
    builder: Mutex<()>,
    pipeline: RwLock<Pipeline>,
}

impl<K: KeyValueStore + 'static> ChainManager<K> {
    /// Resume from the last accepted block recorded in `state`
    pub fn new(state: State<K>, config: ChainConfig, fx: Box<dyn Fx>) -> Result<Self, ChainError> {
        let last_accepted = state.last_accepted();
        let bytes = state
            .get_block(&last_accepted)?
            .ok_or(ChainError::UnknownBlock(last_accepted))?;
        let height = Block::from_bytes(&bytes)?.height();
        info!("chain resumed at block {} (height {})", last_accepted, height);

        let mempool = Mempool::new(Box::new(BasicConflictChecker::new()), config.max_mempool_txs);
        Ok(Self {
            config,
            fx,
            versions: Arc::new(StateVersions {
                base: SharedState::new(state),
                last_accepted: RwLock::new(last_accepted),
                processing: RwLock::new(HashMap::new()),
            }),
            mempool: RwLock::new(mempool),
            builder: Mutex::new(()),
            pipeline: RwLock::new(Pipeline {
                preferred: last_accepted,
                last_accepted,
                last_accepted_height: height,
                blocks: HashMap::new(),
            }),
        })
    }

    fn executor(&self) -> Executor<'_> {
        Executor::new(&self.config.execution, self.fx.as_ref())
    }

    fn new_diff(&self, parent_id: Id) -> Result<Diff, ChainError> {
        let versions: Arc<dyn Versions> = self.versions.clone();
        Ok(Diff::new(parent_id, versions)?)
    }

    /// The committed store
    pub fn state(&self) -> SharedState<K> {
        self.versions.base.clone()
    }

    pub fn last_accepted(&self) -> Result<Id, ChainError> {
        Ok(self.pipeline.read().map_err(poisoned)?.last_accepted)
    }

    pub fn preferred(&self) -> Result<Id, ChainError> {
        Ok(self.pipeline.read().map_err(poisoned)?.preferred)
    }

    /// The state new txs are checked against
    pub fn preferred_state(&self) -> Result<Arc<dyn ChainReader>, ChainError> {
        let preferred = self.preferred()?;
        self.versions
            .get_state(&preferred)
            .ok_or(ChainError::Storage(StorageError::MissingParentState(preferred)))
    }

    /// A processing or accepted block
    pub fn get_block(&self, block_id: &Id) -> Result<Option<Block>, ChainError> {
        if let Some(block) = self.pipeline.read().map_err(poisoned)?.blocks.get(block_id) {
            return Ok(Some(block.clone()));
        }
        match self.versions.base.read()?.get_block(block_id)? {
            Some(bytes) => Ok(Some(Block::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn is_pending(&self, tx_id: &Id) -> Result<bool, ChainError> {
        Ok(self.mempool.read().map_err(poisoned)?.contains(tx_id))
    }

    pub fn pending_count(&self) -> Result<usize, ChainError> {
        Ok(self.mempool.read().map_err(poisoned)?.len())
    }

    /// Why a tx was dropped, if it was
    pub fn dropped(&self, tx_id: &Id) -> Result<Option<DroppedTx>, ChainError> {
        Ok(self.mempool.read().map_err(poisoned)?.get_dropped(tx_id).cloned())
    }

    /// Verify `tx` against the preferred tip and queue it.
    ///
    /// Verification runs on a throwaway diff. Txs that fail are recorded as
    /// dropped with the error kind and message; a cancelled admission leaves
    /// no trace.
    ///
    /// # Parameters
    /// * `tx` - The signed transaction to admit
    /// * `cancel` - Checked before and after verification
    ///
    /// # Returns
    /// The tx ID once the tx is in the mempool
    pub fn admit(&self, tx: SignedTx, cancel: &CancelToken) -> Result<Id, ChainError> {
        let tx_id = tx.id();
        if cancel.is_cancelled() {
            return Err(ChainError::Cancelled(tx_id));
        }
        let pipeline = self.pipeline.read().map_err(poisoned)?;

        let mut diff = self.new_diff(pipeline.preferred)?;
        let result = self.executor().execute(&mut diff, &tx);
        drop(diff);

        if cancel.is_cancelled() {
            debug!("admission of tx {} cancelled", tx_id);
            return Err(ChainError::Cancelled(tx_id));
        }
        if let Err(err) = result {
            if err.kind() != ErrorKind::Fatal {
                warn!("dropping tx {}: {}", tx_id, err);
                self.mempool
                    .write()
                    .map_err(poisoned)?
                    .mark_dropped(tx_id, err.kind(), err.to_string());
            }
            return Err(err.into());
        }

        self.mempool.write().map_err(poisoned)?.add(tx)?;
        debug!("admitted tx {}", tx_id);
        Ok(tx_id)
    }

    /// Seal the pending txs that still verify, in admission order, into a
    /// block on the preferred tip. Txs that no longer verify are dropped.
    ///
    /// Returns `None` when no pending tx verifies.
    pub fn build_block(&self, timestamp: u64) -> Result<Option<Block>, ChainError> {
        let _builder = self.builder.lock().map_err(poisoned)?;
        let pipeline = self.pipeline.read().map_err(poisoned)?;
        let parent_id = pipeline.preferred;
        let parent_height = pipeline
            .height_of(&parent_id)
            .ok_or(ChainError::UnknownBlock(parent_id))?;

        let mut diff = self.new_diff(parent_id)?;
        let timestamp = timestamp.max(diff.timestamp()?);
        diff.set_timestamp(timestamp);

        let candidates = self.mempool.read().map_err(poisoned)?.pending();
        let executor = self.executor();
        let mut txs = Vec::new();
        for tx in candidates {
            if txs.len() >= self.config.max_block_txs {
                break;
            }
            match executor.execute(&mut diff, &tx) {
                Ok(()) => txs.push(tx),
                Err(err) if err.kind() == ErrorKind::Fatal => return Err(err.into()),
                Err(err) => {
                    warn!("dropping tx {} while building: {}", tx.id(), err);
                    self.mempool
                        .write()
                        .map_err(poisoned)?
                        .mark_dropped(tx.id(), err.kind(), err.to_string());
                }
            }
        }

        if txs.is_empty() {
            return Ok(None);
        }
        let block = Block::new(parent_id, parent_height + 1, timestamp, txs)?;
        debug!("built block {} with {} txs", block.id(), block.txs().len());
        Ok(Some(block))
    }

    /// Execute every tx of `block` in order on top of its parent and keep the
    /// result as a processing block. The block becomes the preferred tip.
    pub fn verify_block(&self, block: Block) -> Result<(), ChainError> {
        let mut pipeline = self.pipeline.write().map_err(poisoned)?;
        let block_id = block.id();
        if pipeline.blocks.contains_key(&block_id) {
            return Ok(());
        }
        let invalid = |reason: String| ChainError::InvalidBlock {
            id: block_id,
            reason,
        };

        let parent_id = block.parent_id();
        let parent_height = pipeline
            .height_of(&parent_id)
            .ok_or(ChainError::UnknownBlock(parent_id))?;
        if block.height() != parent_height + 1 {
            return Err(invalid(format!(
                "height {} does not follow parent height {}",
                block.height(),
                parent_height
            )));
        }
        if block.txs().is_empty() {
            return Err(invalid("no txs".to_string()));
        }

        let mut diff = self.new_diff(parent_id)?;
        let parent_timestamp = diff.timestamp()?;
        if block.timestamp() < parent_timestamp {
            return Err(invalid(format!(
                "timestamp {} is before parent timestamp {}",
                block.timestamp(),
                parent_timestamp
            )));
        }
        diff.set_timestamp(block.timestamp());

        let executor = self.executor();
        for tx in block.txs() {
            executor.execute(&mut diff, tx).map_err(|err| {
                if err.kind() == ErrorKind::Fatal {
                    ChainError::from(err)
                } else {
                    invalid(format!("tx {}: {}", tx.id(), err))
                }
            })?;
        }

        self.versions
            .processing
            .write()
            .map_err(poisoned)?
            .insert(block_id, Arc::new(diff));
        self.mempool.write().map_err(poisoned)?.remove(&block.tx_ids());
        info!(
            "verified block {} at height {} with {} txs",
            block_id,
            block.height(),
            block.txs().len()
        );
        pipeline.blocks.insert(block_id, block);
        pipeline.preferred = block_id;
        Ok(())
    }

    /// Apply a processing block to the store in one atomic commit.
    ///
    /// The block's parent must be the last accepted block. Competing blocks on
    /// the same parent are rejected.
    pub fn accept(&self, block_id: &Id) -> Result<(), ChainError> {
        let mut pipeline = self.pipeline.write().map_err(poisoned)?;
        let block = pipeline
            .blocks
            .get(block_id)
            .cloned()
            .ok_or(ChainError::UnknownBlock(*block_id))?;
        if block.parent_id() != pipeline.last_accepted {
            return Err(ChainError::InvalidBlock {
                id: *block_id,
                reason: format!("parent {} is not the last accepted block", block.parent_id()),
            });
        }
        let diff = self
            .versions
            .processing
            .read()
            .map_err(poisoned)?
            .get(block_id)
            .cloned()
            .ok_or(ChainError::UnknownBlock(*block_id))?;

        {
            let mut base = self.versions.base.write()?;
            let result = diff.apply(&mut *base).and_then(|()| {
                base.add_block(*block_id, block.bytes().to_vec());
                base.set_last_accepted(*block_id);
                base.commit()
            });
            if let Err(err) = result {
                base.abort();
                return Err(err.into());
            }
        }

        *self.versions.last_accepted.write().map_err(poisoned)? = *block_id;
        self.versions.processing.write().map_err(poisoned)?.remove(block_id);
        pipeline.blocks.remove(block_id);
        pipeline.last_accepted = *block_id;
        pipeline.last_accepted_height = block.height();
        info!("accepted block {} at height {}", block_id, block.height());

        let mut siblings: Vec<Id> = pipeline
            .blocks
            .values()
            .filter(|other| other.parent_id() == block.parent_id())
            .map(Block::id)
            .collect();
        siblings.sort();
        for sibling in siblings {
            self.discard(&mut pipeline, sibling)?;
        }
        if !pipeline.is_known(&pipeline.preferred) {
            pipeline.preferred = pipeline.last_accepted;
        }
        Ok(())
    }

    /// Drop a processing block and everything built on it. Their txs return
    /// to the mempool.
    pub fn reject(&self, block_id: &Id) -> Result<(), ChainError> {
        let mut pipeline = self.pipeline.write().map_err(poisoned)?;
        let parent_id = pipeline
            .blocks
            .get(block_id)
            .map(Block::parent_id)
            .ok_or(ChainError::UnknownBlock(*block_id))?;
        self.discard(&mut pipeline, *block_id)?;
        if !pipeline.is_known(&pipeline.preferred) {
            pipeline.preferred = if pipeline.is_known(&parent_id) {
                parent_id
            } else {
                pipeline.last_accepted
            };
        }
        Ok(())
    }

    fn discard(&self, pipeline: &mut Pipeline, root: Id) -> Result<(), ChainError> {
        for block_id in pipeline.branch(root) {
            let Some(block) = pipeline.blocks.remove(&block_id) else {
                continue;
            };
            self.versions.processing.write().map_err(poisoned)?.remove(&block_id);
            info!("rejected block {}", block_id);

            let mut mempool = self.mempool.write().map_err(poisoned)?;
            for tx in block.txs() {
                if let Err(err) = mempool.add(tx.clone()) {
                    debug!("tx {} of rejected block not requeued: {}", tx.id(), err);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_core::components::StoredOutput;
    use camino_core::id::ShortId;
    use camino_core::lock::{LockIds, LockState};
    use camino_core::owner::OutputOwners;
    use camino_core::utxo::{Utxo, UtxoId};
    use camino_runtime::{address_of, lock, Keychain, LockRequest, Secp256k1Fx, SpendPlan};
    use camino_storage_impl::MemoryStore;
    use camino_transaction::{BaseTx, BondTx, UnsignedTx};
    use secp256k1::{Secp256k1, SecretKey};

    const ASSET: Id = Id::new([0xa5; 32]);
    const NETWORK: u32 = 5;
    const GENESIS_TIME: u64 = 1_000;

    fn secret(n: u8) -> SecretKey {
        let mut bytes = [0u8; 32];
        bytes[31] = n;
        SecretKey::from_slice(&bytes).unwrap()
    }

    fn address(n: u8) -> ShortId {
        address_of(&Secp256k1::new(), &secret(n))
    }

    fn config() -> ChainConfig {
        ChainConfig {
            execution: ExecutionConfig {
                network_id: NETWORK,
                asset_id: ASSET,
                tx_fee: 1,
                multisig_alias_fee: 1,
            },
            max_mempool_txs: 16,
            max_block_txs: 8,
        }
    }

    /// Genesis state where key `n` owns one unlocked UTXO of `amount`
    fn genesis_state<K: KeyValueStore>(store: K, funds: &[(u8, u64)]) -> State<K> {
        let mut state = State::open(store).unwrap();
        for (seed, (key, amount)) in funds.iter().enumerate() {
            state
                .add_utxo(Utxo {
                    utxo_id: UtxoId::new(Id::hash(&[seed as u8]), 0),
                    asset_id: ASSET,
                    out: StoredOutput::transfer(*amount, OutputOwners::single(address(*key))),
                })
                .unwrap();
        }
        let genesis = Block::genesis(GENESIS_TIME).unwrap();
        state.set_timestamp(GENESIS_TIME);
        state.add_block(genesis.id(), genesis.bytes().to_vec());
        state.set_last_accepted(genesis.id());
        state.set_initialized();
        state.commit().unwrap();
        state
    }

    fn manager<K: KeyValueStore + 'static>(state: State<K>) -> ChainManager<K> {
        ChainManager::new(state, config(), Box::new(Secp256k1Fx::new())).unwrap()
    }

    fn base(plan: &SpendPlan) -> BaseTx {
        BaseTx {
            network_id: NETWORK,
            ins: plan.ins.clone(),
            outs: plan.outs.clone(),
            ..Default::default()
        }
    }

    fn bond<R: ChainReader + ?Sized>(view: &R, key: u8, amount: u64) -> SignedTx {
        let keys = Keychain::from_keys([secret(key)]);
        let plan = lock(view, &keys, &LockRequest::new(ASSET, amount, 1, LockState::BONDED)).unwrap();
        let tx = UnsignedTx::Bond(BondTx {
            base: base(&plan),
            node_id: ShortId::new([0x0d; 20]),
            amount,
            reward_owner: OutputOwners::single(address(key)),
        });
        keys.sign_tx(tx, &plan.signers).unwrap()
    }

    fn transfer<R: ChainReader + ?Sized>(view: &R, key: u8, to: u8, amount: u64) -> SignedTx {
        let keys = Keychain::from_keys([secret(key)]);
        let mut req = LockRequest::new(ASSET, amount, 1, LockState::UNLOCKED);
        req.to = Some(OutputOwners::single(address(to)));
        let plan = lock(view, &keys, &req).unwrap();
        keys.sign_tx(UnsignedTx::Transfer(base(&plan)), &plan.signers).unwrap()
    }

    #[test]
    fn test_admit_build_accept_and_reopen() {
        let store = Arc::new(MemoryStore::new());
        let chain = manager(genesis_state(Arc::clone(&store), &[(1, 200)]));
        let genesis = chain.last_accepted().unwrap();

        let tx = bond(&*chain.preferred_state().unwrap(), 1, 100);
        chain.admit(tx.clone(), &CancelToken::new()).unwrap();
        assert!(chain.is_pending(&tx.id()).unwrap());

        let block = chain.build_block(GENESIS_TIME + 10).unwrap().unwrap();
        assert_eq!(block.parent_id(), genesis);
        assert_eq!(block.height(), 1);
        assert_eq!(block.tx_ids(), vec![tx.id()]);

        chain.verify_block(block.clone()).unwrap();
        assert_eq!(chain.preferred().unwrap(), block.id());
        assert_eq!(chain.pending_count().unwrap(), 0);
        // the store is untouched until acceptance
        let bonded_id = UtxoId::new(tx.id(), 0).input_id();
        assert!(chain.state().get_utxo(&bonded_id).unwrap().is_none());
        assert!(chain.preferred_state().unwrap().get_utxo(&bonded_id).unwrap().is_some());

        chain.accept(&block.id()).unwrap();
        assert_eq!(chain.last_accepted().unwrap(), block.id());
        assert_eq!(chain.preferred().unwrap(), block.id());
        drop(chain);

        let reopened = State::open(Arc::clone(&store)).unwrap();
        assert_eq!(reopened.last_accepted(), block.id());
        assert_eq!(reopened.timestamp().unwrap(), GENESIS_TIME + 10);
        let bonded = reopened.get_utxo(&bonded_id).unwrap().unwrap();
        assert_eq!(bonded.out.lock_ids(), Some(&LockIds::bonded(tx.id())));
        assert_eq!(reopened.get_block(&block.id()).unwrap(), Some(block.bytes().to_vec()));

        let resumed = manager(reopened);
        assert_eq!(resumed.get_block(&block.id()).unwrap(), Some(block));
    }

    #[test]
    fn test_conflicting_admission_rejected() {
        let chain = manager(genesis_state(MemoryStore::new(), &[(1, 200)]));
        let view = chain.preferred_state().unwrap();
        let first = bond(&*view, 1, 100);
        let second = bond(&*view, 1, 50);

        chain.admit(first.clone(), &CancelToken::new()).unwrap();
        let err = chain.admit(second.clone(), &CancelToken::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(matches!(err, ChainError::Conflict { conflicts, .. } if conflicts == vec![first.id()]));
        assert!(!chain.is_pending(&second.id()).unwrap());

        let err = chain.admit(first, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, ChainError::Duplicate(_)));
    }

    #[test]
    fn test_invalid_tx_recorded_as_dropped() {
        let chain = manager(genesis_state(MemoryStore::new(), &[(1, 200)]));
        let keys = Keychain::from_keys([secret(1)]);
        let view = chain.preferred_state().unwrap();
        let plan = lock(&*view, &keys, &LockRequest::new(ASSET, 100, 1, LockState::BONDED)).unwrap();
        let mut wrong_network = base(&plan);
        wrong_network.network_id = NETWORK + 1;
        let tx = keys
            .sign_tx(
                UnsignedTx::Bond(BondTx {
                    base: wrong_network,
                    node_id: ShortId::new([0x0d; 20]),
                    amount: 100,
                    reward_owner: OutputOwners::single(address(1)),
                }),
                &plan.signers,
            )
            .unwrap();

        let err = chain.admit(tx.clone(), &CancelToken::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let dropped = chain.dropped(&tx.id()).unwrap().unwrap();
        assert_eq!(dropped.kind, ErrorKind::InvalidArgument);
        assert_eq!(dropped.reason, err.to_string());
        assert_eq!(chain.pending_count().unwrap(), 0);
    }

    #[test]
    fn test_cancelled_admission_leaves_no_trace() {
        let chain = manager(genesis_state(MemoryStore::new(), &[(1, 200)]));
        let tx = bond(&*chain.preferred_state().unwrap(), 1, 100);
        let cancel = CancelToken::new();
        cancel.clone().cancel();

        let err = chain.admit(tx.clone(), &cancel).unwrap_err();
        assert!(matches!(err, ChainError::Cancelled(id) if id == tx.id()));
        assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
        assert!(chain.dropped(&tx.id()).unwrap().is_none());
        assert_eq!(chain.pending_count().unwrap(), 0);
    }

    #[test]
    fn test_later_txs_see_earlier_effects() {
        let chain = manager(genesis_state(MemoryStore::new(), &[(1, 200)]));
        let genesis = chain.last_accepted().unwrap();

        // a mirror of the chain, used to plan a tx on top of the bond
        let mut mirror = genesis_state(MemoryStore::new(), &[(1, 200)]);
        let fx = Secp256k1Fx::new();
        let bond_tx = bond(&mirror, 1, 100);
        Executor::new(&config().execution, &fx)
            .execute(&mut mirror, &bond_tx)
            .unwrap();
        let spend_change = transfer(&mirror, 1, 2, 50);
        assert_eq!(
            spend_change.input_ids(),
            vec![UtxoId::new(bond_tx.id(), 1).input_id()]
        );

        let out_of_order = Block::new(
            genesis,
            1,
            GENESIS_TIME + 1,
            vec![spend_change.clone(), bond_tx.clone()],
        )
        .unwrap();
        let err = chain.verify_block(out_of_order).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let in_order = Block::new(genesis, 1, GENESIS_TIME + 1, vec![bond_tx, spend_change.clone()]).unwrap();
        chain.verify_block(in_order.clone()).unwrap();
        chain.accept(&in_order.id()).unwrap();
        let received: Vec<u64> = (0..spend_change.unsigned.base().outs.len() as u32)
            .filter_map(|index| {
                chain
                    .state()
                    .get_utxo(&UtxoId::new(spend_change.id(), index).input_id())
                    .unwrap()
            })
            .filter(|utxo| utxo.out.owners().unwrap() == &OutputOwners::single(address(2)))
            .map(|utxo| utxo.out.amount().unwrap())
            .collect();
        assert_eq!(received, vec![50]);
    }

    #[test]
    fn test_block_checks_against_parent() {
        let chain = manager(genesis_state(MemoryStore::new(), &[(1, 200)]));
        let genesis = chain.last_accepted().unwrap();
        let tx = bond(&*chain.preferred_state().unwrap(), 1, 100);

        let unknown_parent = Block::new(Id::new([9; 32]), 1, GENESIS_TIME, vec![tx.clone()]).unwrap();
        assert_eq!(chain.verify_block(unknown_parent).unwrap_err().kind(), ErrorKind::NotFound);

        let wrong_height = Block::new(genesis, 2, GENESIS_TIME, vec![tx.clone()]).unwrap();
        assert_eq!(chain.verify_block(wrong_height).unwrap_err().kind(), ErrorKind::InvalidArgument);

        let too_early = Block::new(genesis, 1, GENESIS_TIME - 1, vec![tx]).unwrap();
        assert_eq!(chain.verify_block(too_early).unwrap_err().kind(), ErrorKind::InvalidArgument);

        let empty = Block::new(genesis, 1, GENESIS_TIME, Vec::new()).unwrap();
        assert!(chain.verify_block(empty).is_err());
        assert_eq!(chain.preferred().unwrap(), genesis);
    }

    #[test]
    fn test_reject_requeues_txs() {
        let chain = manager(genesis_state(MemoryStore::new(), &[(1, 200)]));
        let genesis = chain.last_accepted().unwrap();
        let tx = bond(&*chain.preferred_state().unwrap(), 1, 100);
        chain.admit(tx.clone(), &CancelToken::new()).unwrap();

        let block = chain.build_block(GENESIS_TIME + 1).unwrap().unwrap();
        chain.verify_block(block.clone()).unwrap();
        assert!(!chain.is_pending(&tx.id()).unwrap());

        chain.reject(&block.id()).unwrap();
        assert_eq!(chain.preferred().unwrap(), genesis);
        assert!(chain.is_pending(&tx.id()).unwrap());
        assert!(chain.get_block(&block.id()).unwrap().is_none());
        assert!(matches!(chain.accept(&block.id()), Err(ChainError::UnknownBlock(_))));

        // the requeued tx is still valid on the genesis state
        let rebuilt = chain.build_block(GENESIS_TIME + 2).unwrap().unwrap();
        assert_eq!(rebuilt.tx_ids(), vec![tx.id()]);
    }

    #[test]
    fn test_blocks_accepted_in_chain_order() {
        let chain = manager(genesis_state(MemoryStore::new(), &[(1, 200)]));
        let first_tx = bond(&*chain.preferred_state().unwrap(), 1, 100);
        chain.admit(first_tx, &CancelToken::new()).unwrap();
        let first = chain.build_block(GENESIS_TIME + 1).unwrap().unwrap();
        chain.verify_block(first.clone()).unwrap();

        // planned and checked on top of the processing block
        let second_tx = transfer(&*chain.preferred_state().unwrap(), 1, 2, 50);
        chain.admit(second_tx.clone(), &CancelToken::new()).unwrap();
        let second = chain.build_block(GENESIS_TIME + 2).unwrap().unwrap();
        assert_eq!(second.parent_id(), first.id());
        assert_eq!(second.height(), 2);
        chain.verify_block(second.clone()).unwrap();

        let err = chain.accept(&second.id()).unwrap_err();
        assert!(matches!(err, ChainError::InvalidBlock { .. }));

        chain.accept(&first.id()).unwrap();
        chain.accept(&second.id()).unwrap();
        assert_eq!(chain.last_accepted().unwrap(), second.id());
        assert!(chain
            .state()
            .get_utxo(&UtxoId::new(second_tx.id(), 0).input_id())
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_nothing_to_build() {
        let chain = manager(genesis_state(MemoryStore::new(), &[(1, 200)]));
        assert!(chain.build_block(GENESIS_TIME).unwrap().is_none());
    }
}
