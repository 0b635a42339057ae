//! Credential verification behind a feature-extension seam.

use camino_core::error::{StorageError, VerifyError};
use camino_core::id::{Id, ShortId};
use camino_core::owner::{OutputOwners, MAX_ALIAS_DEPTH};
use camino_core::components::TransferInput;
use camino_storage_impl::ChainReader;
use camino_transaction::{Credential, SIGNATURE_LEN};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, Secp256k1, VerifyOnly};
use std::collections::BTreeSet;

/// Signature scheme used to authorize spends
pub trait Fx: Send + Sync {
    /// Get a string identifier for this extension
    fn name(&self) -> &str;

    /// Structural check of a credential, independent of what it spends
    fn verify_credential(&self, cred: &Credential) -> Result<(), VerifyError>;

    /// Address whose key produced `sig` over `hash`
    fn recover_address(&self, hash: &Id, sig: &[u8]) -> Result<ShortId, VerifyError>;

    /// Addresses that signed `hash` in `cred`. Two signatures from the same
    /// address are rejected.
    fn recover_signers(&self, hash: &Id, cred: &Credential) -> Result<BTreeSet<ShortId>, VerifyError> {
        let mut signers = BTreeSet::new();
        for sig in &cred.sigs {
            let address = self.recover_address(hash, sig)?;
            if !signers.insert(address) {
                return Err(VerifyError::InvalidCredential(format!(
                    "address {} signed twice",
                    address
                )));
            }
        }
        Ok(signers)
    }

    /// Check that `cred` authorizes `input` to spend an output held by
    /// `owners` at chain time `now`.
    ///
    /// # Parameters
    /// * `chain` - State used to resolve multisig aliases among the owners
    /// * `tx_hash` - Hash of the unsigned tx the credential signs
    /// * `input` - The spending input; its signature indices select owners
    /// * `cred` - Signatures over `tx_hash`
    /// * `owners` - Owners of the consumed output
    /// * `now` - Chain time compared against the locktime
    fn verify_transfer(
        &self,
        chain: &dyn ChainReader,
        tx_hash: &Id,
        input: &TransferInput,
        cred: &Credential,
        owners: &OutputOwners,
        now: u64,
    ) -> Result<(), VerifyError> {
        self.verify_credential(cred)?;
        if owners.locktime > now {
            return Err(VerifyError::LocktimeNotReached {
                locktime: owners.locktime,
                now,
            });
        }
        if input.sig_indices.len() != owners.threshold as usize {
            return Err(VerifyError::Unauthorized(format!(
                "{} signature indices for threshold {}",
                input.sig_indices.len(),
                owners.threshold
            )));
        }
        if input.sig_indices.windows(2).any(|w| w[0] >= w[1]) {
            return Err(VerifyError::InvalidCredential(
                "signature indices not sorted and unique".to_string(),
            ));
        }

        let signers = self.recover_signers(tx_hash, cred)?;
        for index in &input.sig_indices {
            let address = owners.addrs.get(*index as usize).ok_or_else(|| {
                VerifyError::Unauthorized(format!("signature index {} out of range", index))
            })?;
            if !is_authorized(chain, address, &signers, now, 0)? {
                return Err(VerifyError::Unauthorized(format!(
                    "address {} did not sign",
                    address
                )));
            }
        }
        Ok(())
    }
}

/// Whether `address` signed, or is an alias whose owners are satisfied by
/// `signers`
pub fn is_authorized<R: ChainReader + ?Sized>(
    chain: &R,
    address: &ShortId,
    signers: &BTreeSet<ShortId>,
    now: u64,
    depth: usize,
) -> Result<bool, StorageError> {
    if signers.contains(address) {
        return Ok(true);
    }
    if depth >= MAX_ALIAS_DEPTH {
        return Ok(false);
    }
    match chain.multisig_alias(address)? {
        Some(alias) => owners_satisfied(chain, &alias.owners, signers, now, depth + 1),
        None => Ok(false),
    }
}

/// Whether at least `owners.threshold` of the owners are authorized by
/// `signers`
pub fn owners_satisfied<R: ChainReader + ?Sized>(
    chain: &R,
    owners: &OutputOwners,
    signers: &BTreeSet<ShortId>,
    now: u64,
    depth: usize,
) -> Result<bool, StorageError> {
    if owners.locktime > now {
        return Ok(false);
    }
    let mut satisfied = 0u32;
    for address in &owners.addrs {
        if satisfied >= owners.threshold {
            break;
        }
        if is_authorized(chain, address, signers, now, depth)? {
            satisfied += 1;
        }
    }
    Ok(satisfied >= owners.threshold)
}

/// Recoverable secp256k1 signatures over the 32-byte tx hash
pub struct Secp256k1Fx {
    secp: Secp256k1<VerifyOnly>,
}

impl Default for Secp256k1Fx {
    fn default() -> Self {
        Self::new()
    }
}

impl Secp256k1Fx {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::verification_only(),
        }
    }
}

impl Fx for Secp256k1Fx {
    fn name(&self) -> &str {
        "secp256k1fx"
    }

    fn verify_credential(&self, cred: &Credential) -> Result<(), VerifyError> {
        cred.verify()
    }

    fn recover_address(&self, hash: &Id, sig: &[u8]) -> Result<ShortId, VerifyError> {
        if sig.len() != SIGNATURE_LEN {
            return Err(VerifyError::InvalidCredential(format!(
                "signature of {} bytes, expected {}",
                sig.len(),
                SIGNATURE_LEN
            )));
        }
        let rec_id = RecoveryId::from_i32(i32::from(sig[SIGNATURE_LEN - 1]))
            .map_err(|e| VerifyError::InvalidCredential(e.to_string()))?;
        let sig = RecoverableSignature::from_compact(&sig[..SIGNATURE_LEN - 1], rec_id)
            .map_err(|e| VerifyError::InvalidCredential(e.to_string()))?;
        let public = self
            .secp
            .recover_ecdsa(&Message::from_digest(**hash), &sig)
            .map_err(|e| VerifyError::Unauthorized(format!("signature recovery failed: {}", e)))?;
        Ok(ShortId::from_public_key(&public.serialize()))
    }
}
