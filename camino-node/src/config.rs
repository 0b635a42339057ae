//! Node configuration loaded from TOML.

use crate::error::ConfigError;
use camino_core::id::Id;
use camino_runtime::ExecutionConfig;
use camino_scheduler::ChainConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Key/value backend holding the chain state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
    Rocksdb,
}

impl StorageBackend {
    pub fn name(&self) -> &str {
        match self {
            StorageBackend::Memory => "memory",
            StorageBackend::Sqlite => "sqlite",
            StorageBackend::Rocksdb => "rocksdb",
        }
    }
}

/// Settings of the admin service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub enabled: bool,
    /// Every admin call must carry this value as `secret`
    pub secret: String,
    /// Accepted `Host` header names; `*` accepts any host
    pub allowed_hosts: Vec<String>,
    /// Where profiles and stack traces are written
    pub profile_dir: PathBuf,
    /// Scanned by `loadVMs`
    pub plugin_dir: PathBuf,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            secret: String::new(),
            allowed_hosts: vec!["localhost".to_string()],
            profile_dir: PathBuf::from("./profiles"),
            plugin_dir: PathBuf::from("./plugins"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub data_dir: PathBuf,
    pub storage: StorageBackend,
    pub network_id: u32,
    /// Hex ID of the fee and staking asset
    pub asset_id: String,
    pub tx_fee: u64,
    pub multisig_alias_fee: u64,
    pub max_mempool_txs: usize,
    pub max_block_txs: usize,
    pub admin: AdminConfig,
    /// Logger name to level (`off`, `error`, `warn`, `info`, `debug`, `trace`)
    pub log_levels: BTreeMap<String, String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let execution = ExecutionConfig::default();
        let chain = ChainConfig::default();
        Self {
            data_dir: PathBuf::from("./data"),
            storage: StorageBackend::Memory,
            network_id: execution.network_id,
            asset_id: execution.asset_id.to_string(),
            tx_fee: execution.tx_fee,
            multisig_alias_fee: execution.multisig_alias_fee,
            max_mempool_txs: chain.max_mempool_txs,
            max_block_txs: chain.max_block_txs,
            admin: AdminConfig::default(),
            log_levels: BTreeMap::from([("camino".to_string(), "info".to_string())]),
        }
    }
}

impl NodeConfig {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: NodeConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&s)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admin.enabled && self.admin.secret.is_empty() {
            return Err(ConfigError::Invalid(
                "admin is enabled without a secret".to_string(),
            ));
        }
        if self.max_block_txs == 0 || self.max_mempool_txs == 0 {
            return Err(ConfigError::Invalid(
                "mempool and block limits must be positive".to_string(),
            ));
        }
        self.asset()?;
        for (logger, level) in &self.log_levels {
            log::LevelFilter::from_str(level).map_err(|_| {
                ConfigError::Invalid(format!("logger {} has invalid level {}", logger, level))
            })?;
        }
        Ok(())
    }

    pub fn asset(&self) -> Result<Id, ConfigError> {
        Id::from_hex(&self.asset_id)
            .map_err(|e| ConfigError::Invalid(format!("asset_id: {}", e)))
    }

    /// Pipeline settings derived from this config
    pub fn chain_config(&self) -> Result<ChainConfig, ConfigError> {
        Ok(ChainConfig {
            execution: ExecutionConfig {
                network_id: self.network_id,
                asset_id: self.asset()?,
                tx_fee: self.tx_fee,
                multisig_alias_fee: self.multisig_alias_fee,
            },
            max_mempool_txs: self.max_mempool_txs,
            max_block_txs: self.max_block_txs,
        })
    }
}
