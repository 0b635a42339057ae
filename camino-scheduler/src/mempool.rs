use crate::conflict::{ConflictChecker, ConflictResult};
use crate::error::ChainError;
use camino_core::error::ErrorKind;
use camino_core::id::Id;
use camino_transaction::SignedTx;
use std::collections::{HashMap, VecDeque};

/// Why a tx left the mempool without being included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedTx {
    pub kind: ErrorKind,
    pub reason: String,
}

/// Pending txs in admission order, with a record of dropped ones
pub struct Mempool {
    checker: Box<dyn ConflictChecker>,
    order: VecDeque<Id>,
    txs: HashMap<Id, SignedTx>,
    dropped: HashMap<Id, DroppedTx>,
    max_txs: usize,
}

impl Mempool {
    pub fn new(checker: Box<dyn ConflictChecker>, max_txs: usize) -> Self {
        Self {
            checker,
            order: VecDeque::new(),
            txs: HashMap::new(),
            dropped: HashMap::new(),
            max_txs,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, tx_id: &Id) -> bool {
        self.txs.contains_key(tx_id)
    }

    pub fn get(&self, tx_id: &Id) -> Option<&SignedTx> {
        self.txs.get(tx_id)
    }

    /// Append a tx that consumes nothing a pending tx consumes
    pub fn add(&mut self, tx: SignedTx) -> Result<(), ChainError> {
        let tx_id = tx.id();
        if self.contains(&tx_id) {
            return Err(ChainError::Duplicate(tx_id));
        }
        if self.len() >= self.max_txs {
            return Err(ChainError::MempoolFull(self.max_txs));
        }
        let pending = self.pending();
        if let ConflictResult::Conflict(conflicts) = self.checker.check_conflicts(&tx, &pending) {
            return Err(ChainError::Conflict {
                tx: tx_id,
                conflicts,
            });
        }
        self.dropped.remove(&tx_id);
        self.order.push_back(tx_id);
        self.txs.insert(tx_id, tx);
        Ok(())
    }

    /// Pending txs in admission order
    pub fn pending(&self) -> Vec<SignedTx> {
        self.order
            .iter()
            .filter_map(|id| self.txs.get(id).cloned())
            .collect()
    }

    /// Up to `limit` pending txs in admission order
    pub fn peek(&self, limit: usize) -> Vec<SignedTx> {
        self.order
            .iter()
            .take(limit)
            .filter_map(|id| self.txs.get(id).cloned())
            .collect()
    }

    pub fn remove(&mut self, tx_ids: &[Id]) {
        for tx_id in tx_ids {
            if self.txs.remove(tx_id).is_some() {
                self.order.retain(|id| id != tx_id);
            }
        }
    }

    /// Remove a tx (if pending) and remember why it was dropped
    pub fn mark_dropped(&mut self, tx_id: Id, kind: ErrorKind, reason: String) {
        self.remove(&[tx_id]);
        self.dropped.insert(tx_id, DroppedTx { kind, reason });
    }

    pub fn get_dropped(&self, tx_id: &Id) -> Option<&DroppedTx> {
        self.dropped.get(tx_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::BasicConflictChecker;
    use camino_core::components::{Input, TransferInput};
    use camino_core::utxo::UtxoId;
    use camino_transaction::{BaseTx, Credential, TransferableInput, UnsignedTx};

    fn tx(spends: u8, memo: u8) -> SignedTx {
        let unsigned = UnsignedTx::Transfer(BaseTx {
            ins: vec![TransferableInput {
                utxo_id: UtxoId::new(Id::new([spends; 32]), 0),
                asset_id: Id::EMPTY,
                input: Input::Transfer(TransferInput {
                    amount: 1,
                    sig_indices: vec![0],
                }),
            }],
            memo: vec![memo],
            ..Default::default()
        });
        SignedTx::new(unsigned, vec![Credential::default()]).unwrap()
    }

    fn mempool(max_txs: usize) -> Mempool {
        Mempool::new(Box::new(BasicConflictChecker::new()), max_txs)
    }

    #[test]
    fn test_admission_order_and_removal() {
        let mut pool = mempool(10);
        let txs: Vec<SignedTx> = (1..=3).map(|n| tx(n, 0)).collect();
        for tx in &txs {
            pool.add(tx.clone()).unwrap();
        }
        assert_eq!(pool.pending(), txs);
        assert_eq!(pool.peek(2), txs[..2].to_vec());

        pool.remove(&[txs[1].id()]);
        assert_eq!(pool.pending(), vec![txs[0].clone(), txs[2].clone()]);
        assert!(matches!(pool.add(txs[0].clone()), Err(ChainError::Duplicate(_))));
    }

    #[test]
    fn test_conflicting_tx_rejected() {
        let mut pool = mempool(10);
        let first = tx(1, 0);
        pool.add(first.clone()).unwrap();

        match pool.add(tx(1, 1)) {
            Err(ChainError::Conflict { conflicts, .. }) => assert_eq!(conflicts, vec![first.id()]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_capacity_and_dropped_record() {
        let mut pool = mempool(1);
        let first = tx(1, 0);
        pool.add(first.clone()).unwrap();
        assert!(matches!(pool.add(tx(2, 0)), Err(ChainError::MempoolFull(1))));

        pool.mark_dropped(first.id(), ErrorKind::PreconditionFailed, "stale".to_string());
        assert!(pool.is_empty());
        let dropped = pool.get_dropped(&first.id()).unwrap();
        assert_eq!(dropped.kind, ErrorKind::PreconditionFailed);
        assert_eq!(dropped.reason, "stale");
    }
}
