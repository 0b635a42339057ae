use crate::cheque::Cheque;
use crate::credential::Credential;
use camino_core::codec;
use camino_core::components::{Input, TxOutput};
use camino_core::error::{StorageError, TxError};
use camino_core::id::{Id, ShortId};
use camino_core::lock::PendingLockIds;
use camino_core::owner::{MultisigAlias, OutputOwners};
use camino_core::utxo::UtxoId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// An input spending the UTXO at `utxo_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferableInput {
    pub utxo_id: UtxoId,
    pub asset_id: Id,
    pub input: Input,
}

impl TransferableInput {
    /// ID of the consumed UTXO
    pub fn input_id(&self) -> Id {
        self.utxo_id.input_id()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferableOutput {
    pub asset_id: Id,
    pub out: TxOutput,
}

impl TransferableOutput {
    /// Canonical output order: asset, owner ID, lock IDs, amount.
    /// Outputs that cannot be unwrapped sort by asset only.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.asset_id
            .cmp(&other.asset_id)
            .then_with(|| self.sort_key().cmp(&other.sort_key()))
    }

    fn sort_key(&self) -> Option<(Id, PendingLockIds, u64)> {
        let inner = self.out.transfer_output().ok()?;
        let lock = self.out.lock_ids().copied().unwrap_or_default();
        Some((inner.owners.owner_id(), lock, inner.amount))
    }
}

/// Sort outputs into canonical order
pub fn sort_outputs(outs: &mut [TransferableOutput]) {
    outs.sort_by(|a, b| a.canonical_cmp(b));
}

/// Sort inputs by consumed UTXO ID, permuting `signers` identically
pub fn sort_inputs_with_signers<T>(ins: &mut Vec<TransferableInput>, signers: &mut Vec<T>) {
    let mut paired: Vec<(TransferableInput, T)> =
        ins.drain(..).zip(signers.drain(..)).collect();
    paired.sort_by_key(|(input, _)| input.input_id());
    for (input, signer) in paired {
        ins.push(input);
        signers.push(signer);
    }
}

/// Fields shared by every transaction
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BaseTx {
    pub network_id: u32,
    pub blockchain_id: Id,
    pub ins: Vec<TransferableInput>,
    pub outs: Vec<TransferableOutput>,
    pub memo: Vec<u8>,
}

/// Longest memo accepted on a tx
pub const MAX_MEMO_SIZE: usize = 256;

impl BaseTx {
    /// Structural checks that need no chain state: values well formed,
    /// inputs strictly ascending by UTXO ID, outputs in canonical order
    /// without duplicates.
    pub fn syntactic_verify(&self) -> Result<(), TxError> {
        if self.memo.len() > MAX_MEMO_SIZE {
            return Err(TxError::Syntactic(format!(
                "memo of {} bytes exceeds {}",
                self.memo.len(),
                MAX_MEMO_SIZE
            )));
        }
        for input in &self.ins {
            input.input.verify()?;
        }
        for window in self.ins.windows(2) {
            if window[0].input_id() >= window[1].input_id() {
                return Err(TxError::Syntactic(
                    "inputs not sorted and unique".to_string(),
                ));
            }
        }
        for output in &self.outs {
            output.out.verify()?;
        }
        for window in self.outs.windows(2) {
            if window[0].canonical_cmp(&window[1]) != Ordering::Less {
                return Err(TxError::Syntactic(
                    "outputs not sorted and unique".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Lock value as a validator bond
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondTx {
    pub base: BaseTx,
    pub node_id: ShortId,
    pub amount: u64,
    pub reward_owner: OutputOwners,
}

/// Lock value into a deposit offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositTx {
    pub base: BaseTx,
    pub deposit_offer_id: Id,
    pub duration: u32,
    pub amount: u64,
    pub reward_owner: OutputOwners,
}

/// Release `amount` of locked value back to its owners
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockTx {
    pub base: BaseTx,
    pub amount: u64,
}

/// Cash out a cheque: the outputs pay the beneficiary the increment over the
/// last accepted cheque
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashOutTx {
    pub base: BaseTx,
    pub cheque: Cheque,
}

/// Set or clear one role bit of `address`. `executor` authorizes the
/// change with the credential following the input credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressStateTx {
    pub base: BaseTx,
    pub address: ShortId,
    pub role_bit: u8,
    pub remove: bool,
    pub executor: ShortId,
}

/// Register a new multisig alias; its address is derived from the tx ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterMultisigAliasTx {
    pub base: BaseTx,
    pub memo: Vec<u8>,
    pub owners: OutputOwners,
}

impl RegisterMultisigAliasTx {
    pub fn alias(&self, tx_id: Id) -> MultisigAlias {
        MultisigAlias {
            id: ShortId::from_id(&Id::hash_parts(b"multisig-alias", &[tx_id.bytes()])),
            memo: self.memo.clone(),
            owners: self.owners.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnsignedTx {
    Transfer(BaseTx),
    Bond(BondTx),
    Deposit(DepositTx),
    Unlock(UnlockTx),
    CashOut(CashOutTx),
    AddressState(AddressStateTx),
    RegisterMultisigAlias(RegisterMultisigAliasTx),
}

impl UnsignedTx {
    pub fn base(&self) -> &BaseTx {
        match self {
            UnsignedTx::Transfer(base) => base,
            UnsignedTx::Bond(tx) => &tx.base,
            UnsignedTx::Deposit(tx) => &tx.base,
            UnsignedTx::Unlock(tx) => &tx.base,
            UnsignedTx::CashOut(tx) => &tx.base,
            UnsignedTx::AddressState(tx) => &tx.base,
            UnsignedTx::RegisterMultisigAlias(tx) => &tx.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut BaseTx {
        match self {
            UnsignedTx::Transfer(base) => base,
            UnsignedTx::Bond(tx) => &mut tx.base,
            UnsignedTx::Deposit(tx) => &mut tx.base,
            UnsignedTx::Unlock(tx) => &mut tx.base,
            UnsignedTx::CashOut(tx) => &mut tx.base,
            UnsignedTx::AddressState(tx) => &mut tx.base,
            UnsignedTx::RegisterMultisigAlias(tx) => &mut tx.base,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            UnsignedTx::Transfer(_) => "transfer",
            UnsignedTx::Bond(_) => "bond",
            UnsignedTx::Deposit(_) => "deposit",
            UnsignedTx::Unlock(_) => "unlock",
            UnsignedTx::CashOut(_) => "cashOut",
            UnsignedTx::AddressState(_) => "addressState",
            UnsignedTx::RegisterMultisigAlias(_) => "registerMultisigAlias",
        }
    }

    /// Credentials expected beyond one per input
    pub fn extra_credentials(&self) -> usize {
        match self {
            UnsignedTx::AddressState(_) => 1,
            _ => 0,
        }
    }

    /// Hash signed by every credential
    pub fn hash(&self) -> Result<Id, StorageError> {
        Ok(Id::hash(&codec::marshal(self)?))
    }
}

/// Processing status of a tx as recorded by the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    Unknown,
    Processing,
    Committed,
    Aborted,
}

/// A tx with its credentials. The ID is the hash of the signed encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    pub unsigned: UnsignedTx,
    pub creds: Vec<Credential>,
    id: Id,
    bytes: Vec<u8>,
}

impl SignedTx {
    pub fn new(unsigned: UnsignedTx, creds: Vec<Credential>) -> Result<Self, StorageError> {
        let bytes = codec::marshal(&(&unsigned, &creds))?;
        Ok(Self {
            id: Id::hash(&bytes),
            unsigned,
            creds,
            bytes,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let (unsigned, creds): (UnsignedTx, Vec<Credential>) = codec::unmarshal(bytes)?;
        Ok(Self {
            id: Id::hash(bytes),
            unsigned,
            creds,
            bytes: bytes.to_vec(),
        })
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// IDs of every UTXO this tx consumes
    pub fn input_ids(&self) -> Vec<Id> {
        self.unsigned.base().ins.iter().map(|i| i.input_id()).collect()
    }
}
