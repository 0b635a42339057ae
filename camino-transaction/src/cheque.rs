use camino_core::cheque::ChequeKey;
use camino_core::id::{Id, ShortId};
use serde::{Deserialize, Serialize};

/// A cumulative payment promise from `issuer` to `beneficiary`, relayed by
/// `agent`. Later cheques supersede earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cheque {
    pub issuer: ShortId,
    pub agent: ShortId,
    pub beneficiary: ShortId,
    pub amount: u64,
    pub serial: u64,
    pub signature: Vec<u8>,
}

impl Cheque {
    pub fn key(&self) -> ChequeKey {
        ChequeKey::new(self.issuer, self.agent, self.beneficiary)
    }

    /// Hash the issuer signs: parties, amount and serial
    pub fn message_hash(&self) -> Id {
        Self::hash_fields(
            &self.issuer,
            &self.agent,
            &self.beneficiary,
            self.amount,
            self.serial,
        )
    }

    pub fn hash_fields(
        issuer: &ShortId,
        agent: &ShortId,
        beneficiary: &ShortId,
        amount: u64,
        serial: u64,
    ) -> Id {
        Id::hash_parts(
            b"cheque",
            &[
                issuer.bytes(),
                agent.bytes(),
                beneficiary.bytes(),
                &amount.to_be_bytes(),
                &serial.to_be_bytes(),
            ],
        )
    }
}
