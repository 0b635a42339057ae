use camino_core::id::Id;
use camino_transaction::SignedTx;
use std::collections::HashSet;

/// Outcome of checking a tx against pending txs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictResult {
    /// The tx consumes no UTXOs
    NoInputs,
    NoConflict,
    /// IDs of the pending txs consuming a UTXO this tx also consumes
    Conflict(Vec<Id>),
}

/// Trait for transaction conflict checking
pub trait ConflictChecker: Send + Sync {
    /// Check for conflicts with pending txs
    ///
    /// # Parameters
    /// * `tx` - The transaction to check for conflicts
    /// * `pending` - Pending transactions to check against
    ///
    /// # Returns
    /// A ConflictResult indicating whether conflicts were detected
    fn check_conflicts(&self, tx: &SignedTx, pending: &[SignedTx]) -> ConflictResult;

    /// UTXO IDs a tx consumes
    fn consumed_utxos(&self, tx: &SignedTx) -> HashSet<Id> {
        tx.input_ids().into_iter().collect()
    }
}

/// Conflict checker keyed on consumed UTXO IDs
pub struct BasicConflictChecker;

impl BasicConflictChecker {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for BasicConflictChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl ConflictChecker for BasicConflictChecker {
    fn check_conflicts(&self, tx: &SignedTx, pending: &[SignedTx]) -> ConflictResult {
        let consumed = self.consumed_utxos(tx);
        if consumed.is_empty() {
            return ConflictResult::NoInputs;
        }

        let conflicts: Vec<Id> = pending
            .iter()
            .filter(|other| other.id() != tx.id())
            .filter(|other| other.input_ids().iter().any(|id| consumed.contains(id)))
            .map(|other| other.id())
            .collect();

        if conflicts.is_empty() {
            ConflictResult::NoConflict
        } else {
            ConflictResult::Conflict(conflicts)
        }
    }
}
