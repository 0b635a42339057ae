use crate::error::VerifyError;
use crate::id::{Id, ShortId};
use serde::{Deserialize, Serialize};

/// A threshold set of addresses that may spend an output after `locktime`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OutputOwners {
    pub locktime: u64,
    pub threshold: u32,
    pub addrs: Vec<ShortId>,
}

impl OutputOwners {
    /// Owners with the addresses sorted and deduplicated
    pub fn new(locktime: u64, threshold: u32, mut addrs: Vec<ShortId>) -> Self {
        addrs.sort();
        addrs.dedup();
        Self {
            locktime,
            threshold,
            addrs,
        }
    }

    /// One-of-one ownership by `addr`
    pub fn single(addr: ShortId) -> Self {
        Self::new(0, 1, vec![addr])
    }

    /// Threshold must be reachable, addresses strictly ascending, and only
    /// an empty address list may carry a zero threshold.
    pub fn verify(&self) -> Result<(), VerifyError> {
        if self.threshold as usize > self.addrs.len() {
            return Err(VerifyError::InvalidOutput(format!(
                "threshold {} exceeds {} addresses",
                self.threshold,
                self.addrs.len()
            )));
        }
        if self.threshold == 0 && !self.addrs.is_empty() {
            return Err(VerifyError::InvalidOutput(
                "zero threshold with non-empty address list".to_string(),
            ));
        }
        if self.addrs.windows(2).any(|w| w[0] >= w[1]) {
            return Err(VerifyError::InvalidOutput(
                "addresses not sorted and unique".to_string(),
            ));
        }
        Ok(())
    }

    /// Canonical byte encoding: locktime, threshold, count, addresses
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + self.addrs.len() * 20);
        out.extend_from_slice(&self.locktime.to_be_bytes());
        out.extend_from_slice(&self.threshold.to_be_bytes());
        out.extend_from_slice(&(self.addrs.len() as u32).to_be_bytes());
        for addr in &self.addrs {
            out.extend_from_slice(addr.bytes());
        }
        out
    }

    /// Hash of the canonical encoding
    pub fn owner_id(&self) -> Id {
        Id::hash_parts(b"owners", &[&self.canonical_bytes()])
    }
}

/// A named multisig owner that other owner sets may reference by address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigAlias {
    pub id: ShortId,
    pub memo: Vec<u8>,
    pub owners: OutputOwners,
}

/// Maximum alias nesting followed when resolving owners.
pub const MAX_ALIAS_DEPTH: usize = 4;
