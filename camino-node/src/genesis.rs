//! Genesis parsing, validation and the initial chain state.

use crate::error::GenesisError;
use camino_core::components::{StoredOutput, TransferOutput};
use camino_core::id::{Id, ShortId};
use camino_core::lock::LockIds;
use camino_core::owner::{MultisigAlias, OutputOwners};
use camino_core::roles::{AddressRole, AddressRoles};
use camino_core::utxo::{Utxo, UtxoId};
use camino_scheduler::Block;
use camino_storage_impl::{Chain, KeyValueStore, State};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Delegation fees are expressed in millionths
pub const MAX_DELEGATION_FEE: u32 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockScheduleEntry {
    pub amount: u64,
    pub locktime: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressStates {
    pub consortium_member: bool,
    pub kyc_verified: bool,
}

impl AddressStates {
    fn roles(&self) -> AddressRoles {
        let mut roles = AddressRoles::NONE;
        if self.consortium_member {
            roles = roles.with(AddressRole::Consortium);
        }
        if self.kyc_verified {
            roles = roles.with(AddressRole::KycVerified);
        }
        roles
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    /// Hex short ID
    pub avax_addr: String,
    #[serde(default)]
    pub initial_amount: u64,
    #[serde(default)]
    pub unlock_schedule: Vec<UnlockScheduleEntry>,
    #[serde(default)]
    pub address_states: AddressStates,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staker {
    #[serde(rename = "nodeID")]
    pub node_id: String,
    pub reward_address: String,
    pub delegation_fee: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigAliasSpec {
    pub alias: String,
    pub threshold: u32,
    pub addresses: Vec<String>,
}

/// Genesis document as written by operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Genesis {
    #[serde(rename = "networkID")]
    pub network_id: u32,
    pub allocations: Vec<Allocation>,
    pub start_time: u64,
    pub initial_stake_duration: u64,
    pub initial_stake_duration_offset: u64,
    #[serde(default)]
    pub initial_staked_funds: Vec<String>,
    #[serde(default)]
    pub initial_stakers: Vec<Staker>,
    #[serde(default)]
    pub initial_multisig_addresses: Vec<MultisigAliasSpec>,
    #[serde(default)]
    pub c_chain_genesis: String,
    #[serde(default)]
    pub message: String,
}

fn parse_address(address: &str) -> Result<ShortId, GenesisError> {
    ShortId::from_hex(address).map_err(|source| GenesisError::MalformedAddress {
        address: address.to_string(),
        source,
    })
}

impl Genesis {
    pub fn from_json(bytes: &[u8]) -> Result<Self, GenesisError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// ID all genesis UTXOs are created under
    pub fn tx_id(&self) -> Result<Id, GenesisError> {
        Ok(Id::hash(&serde_json::to_vec(self)?))
    }

    /// Lock ID carried by the initially staked funds
    pub fn bond_id(&self) -> Result<Id, GenesisError> {
        Ok(Id::hash_parts(b"genesis/bond", &[self.tx_id()?.bytes()]))
    }

    /// Check the document against wall-clock time `now` (unix seconds)
    pub fn validate(&self, now: u64) -> Result<(), GenesisError> {
        if self.allocations.is_empty() {
            return Err(GenesisError::NoAllocations);
        }
        if self.start_time > now {
            return Err(GenesisError::StartTimeInFuture {
                start: self.start_time,
                now,
            });
        }
        if self.initial_stake_duration_offset >= self.initial_stake_duration {
            return Err(GenesisError::OffsetTooLarge {
                offset: self.initial_stake_duration_offset,
                duration: self.initial_stake_duration,
            });
        }

        let mut allocated = HashSet::new();
        for allocation in &self.allocations {
            allocated.insert(parse_address(&allocation.avax_addr)?);
        }
        let mut staked = HashSet::new();
        for address in &self.initial_staked_funds {
            let parsed = parse_address(address)?;
            if !staked.insert(parsed) {
                return Err(GenesisError::DuplicateStakedFund(address.clone()));
            }
            if !allocated.contains(&parsed) {
                return Err(GenesisError::StakedFundNotAllocated(address.clone()));
            }
        }

        for staker in &self.initial_stakers {
            parse_address(&staker.node_id)?;
            parse_address(&staker.reward_address)?;
            if staker.delegation_fee > MAX_DELEGATION_FEE {
                return Err(GenesisError::Invalid(format!(
                    "staker {} delegation fee {} exceeds {}",
                    staker.node_id, staker.delegation_fee, MAX_DELEGATION_FEE
                )));
            }
        }

        let mut aliases = HashSet::new();
        for spec in &self.initial_multisig_addresses {
            let alias = self.multisig_alias(spec)?;
            if !aliases.insert(alias.id) {
                return Err(GenesisError::Invalid(format!("duplicate alias {}", spec.alias)));
            }
            alias
                .owners
                .verify()
                .map_err(|e| GenesisError::Invalid(format!("alias {}: {}", spec.alias, e)))?;
        }
        // genesis aliases may only be owned by plain addresses
        for spec in &self.initial_multisig_addresses {
            for address in &spec.addresses {
                if aliases.contains(&parse_address(address)?) {
                    return Err(GenesisError::Invalid(format!(
                        "alias {} is owned by alias {}",
                        spec.alias, address
                    )));
                }
            }
        }
        Ok(())
    }

    fn multisig_alias(&self, spec: &MultisigAliasSpec) -> Result<MultisigAlias, GenesisError> {
        let addrs = spec
            .addresses
            .iter()
            .map(|a| parse_address(a))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MultisigAlias {
            id: parse_address(&spec.alias)?,
            memo: Vec::new(),
            owners: OutputOwners::new(0, spec.threshold, addrs),
        })
    }

    /// Genesis UTXOs in creation order
    pub fn utxos(&self, asset_id: Id) -> Result<Vec<Utxo>, GenesisError> {
        let tx_id = self.tx_id()?;
        let bond_id = self.bond_id()?;
        let staked = self
            .initial_staked_funds
            .iter()
            .map(|a| parse_address(a))
            .collect::<Result<HashSet<_>, _>>()?;

        let mut outs = Vec::new();
        for allocation in &self.allocations {
            let address = parse_address(&allocation.avax_addr)?;
            let is_staked = staked.contains(&address);
            for entry in &allocation.unlock_schedule {
                let out = if is_staked {
                    StoredOutput::locked(
                        LockIds::bonded(bond_id),
                        TransferOutput::new(entry.amount, OutputOwners::single(address)),
                    )
                } else {
                    StoredOutput::transfer(
                        entry.amount,
                        OutputOwners::new(entry.locktime, 1, vec![address]),
                    )
                };
                outs.push(out);
            }
            if allocation.initial_amount > 0 {
                outs.push(StoredOutput::transfer(
                    allocation.initial_amount,
                    OutputOwners::single(address),
                ));
            }
        }

        Ok(outs
            .into_iter()
            .enumerate()
            .map(|(index, out)| Utxo {
                utxo_id: UtxoId::new(tx_id, index as u32),
                asset_id,
                out,
            })
            .collect())
    }

    /// Write the genesis state and block into `state` and commit.
    ///
    /// A state that is already initialized is left untouched.
    ///
    /// # Returns
    /// The ID of the last accepted block
    pub fn initialize<K: KeyValueStore>(
        &self,
        state: &mut State<K>,
        asset_id: Id,
        now: u64,
    ) -> Result<Id, GenesisError> {
        if state.is_initialized()? {
            return Ok(state.last_accepted());
        }
        self.validate(now)?;

        let utxos = self.utxos(asset_id)?;
        let count = utxos.len();
        let result = self.write(state, utxos);
        if let Err(err) = result {
            state.abort();
            return Err(err);
        }
        let block = Block::genesis(self.start_time)?;
        state.add_block(block.id(), block.bytes().to_vec());
        state.set_last_accepted(block.id());
        state.set_initialized();
        state.commit()?;

        info!(
            "initialized network {} with {} genesis utxos, genesis block {}",
            self.network_id,
            count,
            block.id()
        );
        Ok(block.id())
    }

    fn write<C: Chain>(&self, state: &mut C, utxos: Vec<Utxo>) -> Result<(), GenesisError> {
        for utxo in utxos {
            state.add_utxo(utxo)?;
        }
        let mut roles: BTreeMap<ShortId, AddressRoles> = BTreeMap::new();
        for allocation in &self.allocations {
            let address = parse_address(&allocation.avax_addr)?;
            let states = allocation.address_states.roles();
            if states != AddressRoles::NONE {
                let entry = roles.entry(address).or_default();
                *entry = AddressRoles::from_bits(entry.bits() | states.bits());
            }
        }
        for (address, roles) in roles {
            state.set_address_roles(address, roles);
        }
        for spec in &self.initial_multisig_addresses {
            state.set_multisig_alias(self.multisig_alias(spec)?);
        }
        state.set_timestamp(self.start_time);
        Ok(())
    }
}
