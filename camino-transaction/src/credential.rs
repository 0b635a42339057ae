use camino_core::error::VerifyError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Length of a recoverable secp256k1 signature: 64 compact bytes plus the
/// recovery id.
pub const SIGNATURE_LEN: usize = 65;

/// Signatures authorizing one input (or one extra authority such as an
/// address-state executor)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Credential {
    pub sigs: Vec<Vec<u8>>,
}

impl Credential {
    pub fn new(sigs: Vec<Vec<u8>>) -> Self {
        Self { sigs }
    }

    /// Every signature well sized and no signature repeated
    pub fn verify(&self) -> Result<(), VerifyError> {
        let mut seen = HashSet::new();
        for sig in &self.sigs {
            if sig.len() != SIGNATURE_LEN {
                return Err(VerifyError::InvalidCredential(format!(
                    "signature of {} bytes, expected {}",
                    sig.len(),
                    SIGNATURE_LEN
                )));
            }
            if !seen.insert(sig.as_slice()) {
                return Err(VerifyError::InvalidCredential(
                    "duplicate signature".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_checks_length_and_duplicates() {
        assert!(Credential::default().verify().is_ok());
        assert!(Credential::new(vec![vec![1; 65], vec![2; 65]]).verify().is_ok());
        assert!(Credential::new(vec![vec![1; 64]]).verify().is_err());
        assert!(Credential::new(vec![vec![1; 65], vec![1; 65]]).verify().is_err());
    }
}
