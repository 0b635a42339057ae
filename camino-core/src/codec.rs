//! Record codec: a big-endian codec version followed by the bincode encoding.
//!
//! Enum variants are tagged with their index and sequences are length
//! prefixed, so encoding is deterministic and decoding is byte-exact.

use crate::error::StorageError;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const CODEC_VERSION: u16 = 0;

pub fn marshal<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    let mut out = CODEC_VERSION.to_be_bytes().to_vec();
    bincode::serialize_into(&mut out, value)?;
    Ok(out)
}

pub fn unmarshal<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    if bytes.len() < 2 {
        return Err(StorageError::Serialization(format!(
            "record too short: {} bytes",
            bytes.len()
        )));
    }
    let version = u16::from_be_bytes([bytes[0], bytes[1]]);
    if version != CODEC_VERSION {
        return Err(StorageError::Serialization(format!(
            "unknown codec version {}",
            version
        )));
    }
    Ok(bincode::deserialize(&bytes[2..])?)
}
