use crate::error::IdParseError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::Deref;

/// A 32-byte identifier: tx IDs, block IDs, UTXO IDs, asset IDs and owner IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Id([u8; 32]);

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Ord for Id {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for Id {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Default for Id {
    fn default() -> Self {
        Id::EMPTY
    }
}

impl Deref for Id {
    type Target = [u8; 32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for Id {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Id {
    /// The all-zero ID. Lock slots holding it are considered empty.
    pub const EMPTY: Id = Id([0; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Id(bytes)
    }

    /// Create an Id from a byte slice, failing unless it is exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdParseError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| IdParseError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Id(arr))
    }

    /// Parse a hex string, with or without a `0x` prefix
    pub fn from_hex(s: &str) -> Result<Self, IdParseError> {
        let raw = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| IdParseError::InvalidHex(e.to_string()))?;
        Self::from_slice(&raw)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == [0; 32]
    }

    /// SHA-256 of `data`
    pub fn hash(data: &[u8]) -> Self {
        Id(Sha256::digest(data).into())
    }

    /// SHA-256 over a domain separator followed by every part in order
    pub fn hash_parts(domain: &[u8], parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        for part in parts {
            hasher.update(part);
        }
        Id(hasher.finalize().into())
    }

    /// Derive the ID of the `index`-th child of this ID: hash(self || index)
    pub fn prefix(&self, index: u32) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(self.0);
        hasher.update(index.to_be_bytes());
        Id(hasher.finalize().into())
    }
}

/// A 20-byte address. Owners, aliases, cheque parties and role holders are
/// all identified by short IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ShortId([u8; 20]);

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Deref for ShortId {
    type Target = [u8; 20];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for ShortId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl ShortId {
    pub const EMPTY: ShortId = ShortId([0; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        ShortId(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdParseError> {
        let arr: [u8; 20] = bytes.try_into().map_err(|_| IdParseError::InvalidLength {
            expected: 20,
            actual: bytes.len(),
        })?;
        Ok(ShortId(arr))
    }

    pub fn from_hex(s: &str) -> Result<Self, IdParseError> {
        let raw = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| IdParseError::InvalidHex(e.to_string()))?;
        Self::from_slice(&raw)
    }

    /// Address of a compressed secp256k1 public key
    pub fn from_public_key(compressed: &[u8]) -> Self {
        Self::from_id(&Id::hash(compressed))
    }

    /// The first 20 bytes of a 32-byte ID
    pub fn from_id(id: &Id) -> Self {
        let mut out = [0u8; 20];
        out.copy_from_slice(&id[..20]);
        ShortId(out)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == [0; 20]
    }
}
