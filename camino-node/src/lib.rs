pub mod admin;
pub mod config;
pub mod error;
pub mod genesis;
pub mod node;

use log::LevelFilter;
use std::collections::BTreeMap;
use std::str::FromStr;

// Re-export the main types for convenience
pub use admin::{check_host, AdminService, LoggerLevels, MAX_ALIAS_LEN};
pub use config::{AdminConfig, NodeConfig, StorageBackend};
pub use error::{AdminError, ConfigError, GenesisError, NodeError};
pub use genesis::Genesis;
pub use node::{open_store, Node, NodeStore};

/// Install the global logger with one filter per configured logger name.
/// `RUST_LOG` is applied on top.
///
/// Returns `false` if a logger was already installed.
pub fn init_logging(levels: &BTreeMap<String, String>) -> Result<bool, ConfigError> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn"),
    );
    for (logger, level) in levels {
        let level = LevelFilter::from_str(level).map_err(|_| {
            ConfigError::Invalid(format!("logger {} has invalid level {}", logger, level))
        })?;
        builder.filter_module(logger, level);
    }
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    Ok(builder.try_init().is_ok())
}
