use crate::id::ShortId;
use serde::{Deserialize, Serialize};

/// Chequebook entry key: the issuer's cheques to a beneficiary through an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChequeKey {
    pub issuer: ShortId,
    pub agent: ShortId,
    pub beneficiary: ShortId,
}

impl ChequeKey {
    pub fn new(issuer: ShortId, agent: ShortId, beneficiary: ShortId) -> Self {
        Self {
            issuer,
            agent,
            beneficiary,
        }
    }
}

/// Cumulative amount and serial of the last accepted cheque
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChequeRecord {
    pub amount: u64,
    pub serial: u64,
}
