use camino_core::codec;
use camino_core::error::StorageError;
use camino_core::id::Id;
use camino_transaction::SignedTx;
use serde::{Deserialize, Serialize};

/// Stored form of a block; txs are kept as their signed bytes
#[derive(Serialize, Deserialize)]
struct BlockRecord {
    parent_id: Id,
    height: u64,
    timestamp: u64,
    txs: Vec<Vec<u8>>,
}

/// An ordered batch of txs on top of `parent_id`.
/// The ID is the hash of the encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    parent_id: Id,
    height: u64,
    timestamp: u64,
    txs: Vec<SignedTx>,
    id: Id,
    bytes: Vec<u8>,
}

impl Block {
    pub fn new(
        parent_id: Id,
        height: u64,
        timestamp: u64,
        txs: Vec<SignedTx>,
    ) -> Result<Self, StorageError> {
        let record = BlockRecord {
            parent_id,
            height,
            timestamp,
            txs: txs.iter().map(|tx| tx.bytes().to_vec()).collect(),
        };
        let bytes = codec::marshal(&record)?;
        Ok(Self {
            parent_id,
            height,
            timestamp,
            txs,
            id: Id::hash(&bytes),
            bytes,
        })
    }

    /// The first block of a chain: no parent, no txs
    pub fn genesis(timestamp: u64) -> Result<Self, StorageError> {
        Self::new(Id::EMPTY, 0, timestamp, Vec::new())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let record: BlockRecord = codec::unmarshal(bytes)?;
        let txs = record
            .txs
            .iter()
            .map(|tx| SignedTx::from_bytes(tx))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            parent_id: record.parent_id,
            height: record.height,
            timestamp: record.timestamp,
            txs,
            id: Id::hash(bytes),
            bytes: bytes.to_vec(),
        })
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn parent_id(&self) -> Id {
        self.parent_id
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn txs(&self) -> &[SignedTx] {
        &self.txs
    }

    pub fn tx_ids(&self) -> Vec<Id> {
        self.txs.iter().map(|tx| tx.id()).collect()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_transaction::{BaseTx, UnsignedTx};

    #[test]
    fn test_block_decodes_to_same_id() {
        let tx = SignedTx::new(
            UnsignedTx::Transfer(BaseTx {
                memo: b"block".to_vec(),
                ..Default::default()
            }),
            Vec::new(),
        )
        .unwrap();
        let genesis = Block::genesis(1_000).unwrap();
        let block = Block::new(genesis.id(), 1, 1_010, vec![tx.clone()]).unwrap();

        let decoded = Block::from_bytes(block.bytes()).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoded.tx_ids(), vec![tx.id()]);
        assert_eq!(decoded.parent_id(), genesis.id());
        assert_ne!(block.id(), genesis.id());
    }
}
