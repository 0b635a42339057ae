use crate::components::StoredOutput;
use crate::id::{Id, ShortId};
use serde::{Deserialize, Serialize};

/// Position of an output in the tx that created it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtxoId {
    pub tx_id: Id,
    pub output_index: u32,
}

impl UtxoId {
    pub fn new(tx_id: Id, output_index: u32) -> Self {
        Self {
            tx_id,
            output_index,
        }
    }

    /// hash(txID || outputIndex)
    pub fn input_id(&self) -> Id {
        self.tx_id.prefix(self.output_index)
    }
}

/// An unspent output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub utxo_id: UtxoId,
    pub asset_id: Id,
    pub out: StoredOutput,
}

impl Utxo {
    pub fn id(&self) -> Id {
        self.utxo_id.input_id()
    }

    /// Addresses this UTXO is indexed under. Outputs that fail to unwrap
    /// (nested, stakeable) are indexed under nobody.
    pub fn addresses(&self) -> Vec<ShortId> {
        self.out
            .owners()
            .map(|owners| owners.addrs.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::owner::OutputOwners;

    #[test]
    fn test_utxo_id_matches_prefix() {
        let tx_id = Id::hash(b"tx");
        let utxo = Utxo {
            utxo_id: UtxoId::new(tx_id, 3),
            asset_id: Id::EMPTY,
            out: StoredOutput::transfer(1, OutputOwners::single(ShortId::new([1; 20]))),
        };
        assert_eq!(utxo.id(), tx_id.prefix(3));
        assert_eq!(utxo.addresses(), vec![ShortId::new([1; 20])]);
    }
}
