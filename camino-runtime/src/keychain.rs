//! Private keys held by a wallet-side planner, and the signing paths that
//! turn a planned tx into a [`SignedTx`].

use camino_core::error::{LockError, StorageError};
use camino_core::id::{Id, ShortId};
use camino_core::owner::{OutputOwners, MAX_ALIAS_DEPTH};
use camino_storage_impl::ChainReader;
use camino_transaction::{Credential, SignedTx, UnsignedTx, SIGNATURE_LEN};
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use std::collections::{BTreeMap, BTreeSet};

/// Address controlled by `key`
pub fn address_of(secp: &Secp256k1<All>, key: &SecretKey) -> ShortId {
    let public = PublicKey::from_secret_key(secp, key);
    ShortId::from_public_key(&public.serialize())
}

/// Recoverable signature over `hash`: 64 compact bytes then the recovery id
pub fn sign_recoverable(secp: &Secp256k1<All>, key: &SecretKey, hash: &Id) -> Vec<u8> {
    let msg = Message::from_digest(**hash);
    let (rec_id, compact) = secp.sign_ecdsa_recoverable(&msg, key).serialize_compact();
    let mut out = Vec::with_capacity(SIGNATURE_LEN);
    out.extend_from_slice(&compact);
    out.push(rec_id.to_i32() as u8);
    out
}

/// A set of secp256k1 keys indexed by address
pub struct Keychain {
    secp: Secp256k1<All>,
    keys: BTreeMap<ShortId, SecretKey>,
}

impl Default for Keychain {
    fn default() -> Self {
        Self::new()
    }
}

impl Keychain {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
            keys: BTreeMap::new(),
        }
    }

    pub fn from_keys<I: IntoIterator<Item = SecretKey>>(keys: I) -> Self {
        let mut keychain = Self::new();
        for key in keys {
            keychain.add(key);
        }
        keychain
    }

    /// Add a key and return its address
    pub fn add(&mut self, key: SecretKey) -> ShortId {
        let address = address_of(&self.secp, &key);
        self.keys.insert(address, key);
        address
    }

    /// Addresses of every held key, ascending
    pub fn addresses(&self) -> Vec<ShortId> {
        self.keys.keys().copied().collect()
    }

    pub fn contains(&self, address: &ShortId) -> bool {
        self.keys.contains_key(address)
    }

    /// Sign `hash` with the key of `address`
    pub fn sign_hash(&self, address: &ShortId, hash: &Id) -> Result<Vec<u8>, LockError> {
        let key = self
            .keys
            .get(address)
            .ok_or_else(|| LockError::Signing(format!("no key for address {}", address)))?;
        Ok(sign_recoverable(&self.secp, key, hash))
    }

    /// Pick the owner addresses this keychain can authorize at time `now`.
    ///
    /// Walks `owners.addrs` in order, taking each address whose key is held
    /// or that names a multisig alias the keychain can satisfy in turn, until
    /// the threshold is met.
    ///
    /// # Returns
    /// The signature indices into `owners.addrs` and the addresses whose keys
    /// must sign, ascending and deduplicated
    pub fn spend_multisig<R: ChainReader + ?Sized>(
        &self,
        owners: &OutputOwners,
        now: u64,
        chain: &R,
    ) -> Result<(Vec<u32>, Vec<ShortId>), LockError> {
        if owners.locktime > now {
            return Err(LockError::CannotSpend(format!(
                "locktime {} not reached at {}",
                owners.locktime, now
            )));
        }
        match self.match_owners(chain, owners, now, 0)? {
            Some((indices, signers)) => Ok((indices, signers.into_iter().collect())),
            None => Err(LockError::CannotSpend(format!(
                "keys cannot meet threshold {} of {} owners",
                owners.threshold,
                owners.addrs.len()
            ))),
        }
    }

    fn match_owners<R: ChainReader + ?Sized>(
        &self,
        chain: &R,
        owners: &OutputOwners,
        now: u64,
        depth: usize,
    ) -> Result<Option<(Vec<u32>, BTreeSet<ShortId>)>, StorageError> {
        if owners.locktime > now {
            return Ok(None);
        }
        let threshold = owners.threshold as usize;
        let mut indices = Vec::with_capacity(threshold);
        let mut signers = BTreeSet::new();
        for (index, address) in owners.addrs.iter().enumerate() {
            if indices.len() == threshold {
                break;
            }
            if self.keys.contains_key(address) {
                indices.push(index as u32);
                signers.insert(*address);
                continue;
            }
            if depth >= MAX_ALIAS_DEPTH {
                continue;
            }
            if let Some(alias) = chain.multisig_alias(address)? {
                if let Some((_, nested)) = self.match_owners(chain, &alias.owners, now, depth + 1)? {
                    indices.push(index as u32);
                    signers.extend(nested);
                }
            }
        }
        if indices.len() < threshold {
            return Ok(None);
        }
        Ok(Some((indices, signers)))
    }

    /// Sign `unsigned` with one credential per entry of `signers`: one entry
    /// per input, then one per extra authority the tx type requires.
    pub fn sign_tx(
        &self,
        unsigned: UnsignedTx,
        signers: &[Vec<ShortId>],
    ) -> Result<SignedTx, LockError> {
        let hash = unsigned.hash()?;
        let creds = signers
            .iter()
            .map(|addresses| {
                addresses
                    .iter()
                    .map(|address| self.sign_hash(address, &hash))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Credential::new)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SignedTx::new(unsigned, creds)?)
    }
}

#[cfg(test)]
pub(crate) mod test_keys {
    use super::*;

    pub fn secret(n: u8) -> SecretKey {
        let mut bytes = [0u8; 32];
        bytes[31] = n;
        SecretKey::from_slice(&bytes).unwrap()
    }

    pub fn keychain(ns: &[u8]) -> Keychain {
        Keychain::from_keys(ns.iter().map(|n| secret(*n)))
    }

    pub fn address(n: u8) -> ShortId {
        address_of(&Secp256k1::new(), &secret(n))
    }
}

#[cfg(test)]
mod tests {
    use super::test_keys::*;
    use super::*;
    use camino_core::owner::MultisigAlias;
    use camino_storage_impl::{Chain, MemoryStore, State};

    #[test]
    fn test_spend_multisig_direct_keys() {
        let state = State::open(MemoryStore::new()).unwrap();
        let keychain = keychain(&[1, 3]);
        let owners = OutputOwners::new(0, 2, vec![address(1), address(2), address(3)]);

        let (indices, signers) = keychain.spend_multisig(&owners, 0, &state).unwrap();
        assert_eq!(indices.len(), 2);
        assert_eq!(signers.len(), 2);
        for index in &indices {
            assert!(keychain.contains(&owners.addrs[*index as usize]));
        }
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_spend_multisig_below_threshold() {
        let state = State::open(MemoryStore::new()).unwrap();
        let keychain = keychain(&[1]);
        let owners = OutputOwners::new(0, 2, vec![address(1), address(2)]);
        assert!(matches!(
            keychain.spend_multisig(&owners, 0, &state),
            Err(LockError::CannotSpend(_))
        ));
    }

    #[test]
    fn test_spend_multisig_respects_locktime() {
        let state = State::open(MemoryStore::new()).unwrap();
        let keychain = keychain(&[1]);
        let mut owners = OutputOwners::single(address(1));
        owners.locktime = 100;
        assert!(keychain.spend_multisig(&owners, 99, &state).is_err());
        assert!(keychain.spend_multisig(&owners, 100, &state).is_ok());
    }

    #[test]
    fn test_spend_multisig_through_alias() {
        let mut state = State::open(MemoryStore::new()).unwrap();
        let alias_id = ShortId::new([0xaa; 20]);
        state.set_multisig_alias(MultisigAlias {
            id: alias_id,
            memo: vec![],
            owners: OutputOwners::new(0, 1, vec![address(2), address(3)]),
        });

        let keychain = keychain(&[3]);
        let owners = OutputOwners::single(alias_id);
        let (indices, signers) = keychain.spend_multisig(&owners, 0, &state).unwrap();
        assert_eq!(indices, vec![0]);
        assert_eq!(signers, vec![address(3)]);
    }

    #[test]
    fn test_sign_hash_requires_key() {
        let keychain = keychain(&[1]);
        let hash = Id::hash(b"msg");
        assert_eq!(keychain.sign_hash(&address(1), &hash).unwrap().len(), SIGNATURE_LEN);
        assert!(matches!(
            keychain.sign_hash(&address(2), &hash),
            Err(LockError::Signing(_))
        ));
    }
}
