use crate::admin::AdminService;
use crate::config::{NodeConfig, StorageBackend};
use crate::error::{ConfigError, GenesisError, NodeError};
use crate::genesis::Genesis;
use anyhow::Context;
use camino_core::error::StorageError;
use camino_core::id::Id;
use camino_runtime::Secp256k1Fx;
use camino_scheduler::ChainManager;
use camino_storage_impl::{KeyValueStore, MemoryStore, State};
use log::info;
use secp256k1::SecretKey;
use std::fs;
use std::sync::Arc;

/// Backend chosen at runtime from the config
pub type NodeStore = Arc<dyn KeyValueStore>;

/// Open the configured backend under `data_dir`
pub fn open_store(config: &NodeConfig) -> Result<NodeStore, NodeError> {
    if config.storage != StorageBackend::Memory {
        fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("creating data dir {}", config.data_dir.display()))
            .map_err(StorageError::from)?;
    }
    match config.storage {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        #[cfg(feature = "sqlite")]
        StorageBackend::Sqlite => Ok(Arc::new(camino_storage_impl::SqliteStore::new(
            config.data_dir.join("chain.sqlite"),
        )?)),
        #[cfg(feature = "rocksdb")]
        StorageBackend::Rocksdb => Ok(Arc::new(camino_storage_impl::RocksDbStore::new(
            config.data_dir.join("chain.rocksdb"),
        )?)),
        #[allow(unreachable_patterns)]
        other => Err(ConfigError::BackendUnavailable(other.name().to_string()).into()),
    }
}

/// A chain pipeline with its admin service
pub struct Node {
    config: NodeConfig,
    chain_id: Id,
    chain: ChainManager<NodeStore>,
    admin: AdminService<NodeStore>,
}

impl Node {
    /// Open storage, write genesis on first start and resume the chain.
    ///
    /// # Parameters
    /// * `config` - Validated before anything is opened
    /// * `genesis` - Genesis JSON; must name the configured network
    /// * `signer` - The node's signing key
    pub fn start(config: NodeConfig, genesis: &[u8], signer: SecretKey) -> Result<Self, NodeError> {
        config.validate()?;
        let genesis = Genesis::from_json(genesis)?;
        if genesis.network_id != config.network_id {
            return Err(GenesisError::Invalid(format!(
                "genesis network {} differs from configured network {}",
                genesis.network_id, config.network_id
            ))
            .into());
        }

        let mut state = State::open(open_store(&config)?)?;
        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
        genesis.initialize(&mut state, config.asset()?, now)?;

        let chain_id = genesis.tx_id()?;
        let chain = ChainManager::new(state, config.chain_config()?, Box::new(Secp256k1Fx::new()))?;
        let admin = AdminService::new(config.clone(), chain.state(), signer, &[chain_id])?;
        info!(
            "node started on network {} with {} storage",
            config.network_id,
            config.storage.name()
        );
        Ok(Self {
            config,
            chain_id,
            chain,
            admin,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn chain_id(&self) -> Id {
        self.chain_id
    }

    pub fn chain(&self) -> &ChainManager<NodeStore> {
        &self.chain
    }

    /// `None` when the admin service is disabled
    pub fn admin(&self) -> Option<&AdminService<NodeStore>> {
        self.config.admin.enabled.then_some(&self.admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_core::error::ErrorKind;
    use camino_core::id::ShortId;
    use camino_core::lock::LockState;
    use camino_core::owner::OutputOwners;
    use camino_runtime::{address_of, lock, Keychain, LockRequest};
    use camino_scheduler::CancelToken;
    use camino_storage_impl::get_all_utxos;
    use camino_transaction::{BaseTx, BondTx, UnsignedTx};
    use secp256k1::Secp256k1;
    use serde_json::json;

    const ASSET: Id = Id::new([0xa5; 32]);

    fn secret(n: u8) -> SecretKey {
        let mut bytes = [0u8; 32];
        bytes[31] = n;
        SecretKey::from_slice(&bytes).unwrap()
    }

    fn config() -> NodeConfig {
        let mut config = NodeConfig::default();
        config.network_id = 1002;
        config.asset_id = ASSET.to_string();
        config.tx_fee = 1;
        config.admin.enabled = true;
        config.admin.secret = "s3cret".to_string();
        config
    }

    fn genesis(owner: ShortId) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "networkID": 1002,
            "allocations": [{ "avaxAddr": owner.to_string(), "initialAmount": 200 }],
            "startTime": 1_600_000_000u64,
            "initialStakeDuration": 31_536_000u64,
            "initialStakeDurationOffset": 5_400u64,
        }))
        .unwrap()
    }

    #[test]
    fn test_node_runs_a_bond_through_the_pipeline() {
        let owner = address_of(&Secp256k1::new(), &secret(1));
        let node = Node::start(config(), &genesis(owner), secret(9)).unwrap();
        let chain = node.chain();

        let keys = Keychain::from_keys([secret(1)]);
        let view = chain.preferred_state().unwrap();
        let plan = lock(&*view, &keys, &LockRequest::new(ASSET, 100, 1, LockState::BONDED)).unwrap();
        let tx = keys
            .sign_tx(
                UnsignedTx::Bond(BondTx {
                    base: BaseTx {
                        network_id: 1002,
                        ins: plan.ins.clone(),
                        outs: plan.outs.clone(),
                        ..Default::default()
                    },
                    node_id: ShortId::new([0x0d; 20]),
                    amount: 100,
                    reward_owner: OutputOwners::single(owner),
                }),
                &plan.signers,
            )
            .unwrap();
        chain.admit(tx, &CancelToken::new()).unwrap();

        let block = chain.build_block(1_600_000_100).unwrap().unwrap();
        chain.verify_block(block.clone()).unwrap();
        chain.accept(&block.id()).unwrap();

        let utxos = get_all_utxos(&chain.state(), &[owner]).unwrap();
        let mut amounts: Vec<u64> = utxos.iter().map(|u| u.out.amount().unwrap()).collect();
        amounts.sort();
        assert_eq!(amounts, vec![99, 100]);

        let admin = node.admin().unwrap();
        let aliases = admin
            .handle(
                "localhost",
                "admin.getChainAliases",
                &json!({ "secret": "s3cret", "chain": node.chain_id().to_string() }),
            )
            .unwrap();
        assert_eq!(aliases["aliases"][0], json!(node.chain_id().to_string()));
    }

    #[test]
    fn test_start_rejects_mismatched_network() {
        let mut config = config();
        config.network_id = 1;
        let err = Node::start(config, &genesis(ShortId::new([1; 20])), secret(9))
            .err()
            .unwrap();
        assert!(matches!(err, NodeError::Genesis(GenesisError::Invalid(_))));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_admin_disabled() {
        let mut config = config();
        config.admin.enabled = false;
        let node = Node::start(config, &genesis(ShortId::new([1; 20])), secret(9)).unwrap();
        assert!(node.admin().is_none());
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_sqlite_node_resumes() {
        use camino_storage_impl::ChainReader;
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = config();
        config.storage = StorageBackend::Sqlite;
        config.data_dir = dir.path().to_path_buf();
        let doc = genesis(ShortId::new([1; 20]));

        let first = Node::start(config.clone(), &doc, secret(9)).unwrap();
        let genesis_block = first.chain().last_accepted().unwrap();
        let timestamp = first.chain().state().timestamp().unwrap();
        drop(first);

        let resumed = Node::start(config, &doc, secret(9)).unwrap();
        assert_eq!(resumed.chain().last_accepted().unwrap(), genesis_block);
        assert_eq!(resumed.chain().state().timestamp().unwrap(), timestamp);
    }
}
