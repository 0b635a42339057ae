//! The `admin` service: node maintenance calls guarded by a shared secret
//! and a Host check.

use crate::config::{AdminConfig, NodeConfig};
use crate::error::AdminError;
use camino_core::id::Id;
use camino_storage_impl::{KeyValueStore, SharedState};
use chrono::Utc;
use log::{info, warn, LevelFilter};
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, PoisonError, RwLock};

pub const SERVICE_NAME: &str = "admin";
pub const MAX_ALIAS_LEN: usize = 512;
pub const STACKTRACE_FILE: &str = "stacktrace.txt";
pub const CPU_PROFILE_FILE: &str = "cpu.profile";
pub const MEMORY_PROFILE_FILE: &str = "mem.profile";
pub const LOCK_PROFILE_FILE: &str = "lock.profile";

/// Levels of one named logger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggerLevels {
    pub log_level: LevelFilter,
    pub display_level: LevelFilter,
}

impl LoggerLevels {
    fn to_json(self) -> Value {
        json!({
            "logLevel": self.log_level.to_string(),
            "displayLevel": self.display_level.to_string(),
        })
    }
}

#[derive(Default)]
struct Aliases {
    /// alias -> endpoint
    endpoints: HashMap<String, String>,
    /// chain ID -> aliases, the ID itself first
    chains: BTreeMap<String, Vec<String>>,
    /// alias -> chain ID
    chain_lookup: HashMap<String, String>,
}

impl Aliases {
    fn is_taken(&self, alias: &str) -> bool {
        self.endpoints.contains_key(alias) || self.chain_lookup.contains_key(alias)
    }

    fn add_chain(&mut self, chain_id: String) {
        self.chain_lookup.insert(chain_id.clone(), chain_id.clone());
        self.chains.insert(chain_id.clone(), vec![chain_id]);
    }
}

fn poisoned<T>(err: PoisonError<T>) -> AdminError {
    AdminError::Io(io::Error::new(io::ErrorKind::Other, err.to_string()))
}

/// Accept `host` if it equals an allowed hostname, optionally followed by
/// `:port` with a port in [0, 65535]. `*` allows every host.
pub fn check_host(host: &str, allowed: &[String]) -> Result<(), AdminError> {
    if allowed.iter().any(|h| h == "*") {
        return Ok(());
    }
    let name = match host.rsplit_once(':') {
        Some((name, port)) if !name.ends_with(':') => {
            port.parse::<u16>()
                .map_err(|_| AdminError::HostNotAllowed(host.to_string()))?;
            name
        }
        _ => host,
    };
    if allowed.iter().any(|h| h.eq_ignore_ascii_case(name)) {
        Ok(())
    } else {
        Err(AdminError::HostNotAllowed(host.to_string()))
    }
}

fn param<'p>(params: &'p Value, name: &str) -> Result<&'p str, AdminError> {
    optional_param(params, name)?
        .ok_or_else(|| AdminError::InvalidParams(format!("missing {}", name)))
}

fn optional_param<'p>(params: &'p Value, name: &str) -> Result<Option<&'p str>, AdminError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(AdminError::InvalidParams(format!("{} must be a string", name))),
    }
}

fn parse_level(level: &str) -> Result<LevelFilter, AdminError> {
    LevelFilter::from_str(level).map_err(|_| AdminError::InvalidLogLevel(level.to_string()))
}

/// Write `contents` to `path`, readable and writable by the owner only
fn write_private_file(path: &Path, contents: &[u8]) -> Result<(), AdminError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, contents)?;
    set_permission_0600(path)?;
    Ok(())
}

#[cfg(unix)]
fn set_permission_0600(path: &Path) -> Result<(), io::Error> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_permission_0600(_path: &Path) -> Result<(), io::Error> {
    Ok(())
}

pub struct AdminService<K: KeyValueStore> {
    config: AdminConfig,
    node_config: NodeConfig,
    state: SharedState<K>,
    signer: SecretKey,
    aliases: RwLock<Aliases>,
    loggers: RwLock<BTreeMap<String, LoggerLevels>>,
    /// Start stamp of the running cpu profile
    cpu_profile: Mutex<Option<String>>,
    /// VM ID -> aliases, as found by `loadVMs`
    vms: RwLock<BTreeMap<Id, Vec<String>>>,
}

impl<K: KeyValueStore> AdminService<K> {
    /// # Parameters
    /// * `node_config` - Served by `getConfig`; its admin section configures the service
    /// * `state` - Read by `dbGet`
    /// * `signer` - Returned by `getNodeSigner`
    /// * `chains` - Chains that can be aliased
    pub fn new(
        node_config: NodeConfig,
        state: SharedState<K>,
        signer: SecretKey,
        chains: &[Id],
    ) -> Result<Self, AdminError> {
        let mut loggers = BTreeMap::new();
        for (name, level) in &node_config.log_levels {
            let level = parse_level(level)?;
            loggers.insert(
                name.clone(),
                LoggerLevels {
                    log_level: level,
                    display_level: level,
                },
            );
        }
        let mut aliases = Aliases::default();
        for chain in chains {
            aliases.add_chain(chain.to_string());
        }
        Ok(Self {
            config: node_config.admin.clone(),
            node_config,
            state,
            signer,
            aliases: RwLock::new(aliases),
            loggers: RwLock::new(loggers),
            cpu_profile: Mutex::new(None),
            vms: RwLock::new(BTreeMap::new()),
        })
    }

    /// Dispatch one call.
    ///
    /// # Parameters
    /// * `host` - The request's `Host` header
    /// * `method` - Method name, with or without the `admin.` prefix
    /// * `params` - Named parameters, including `secret`
    ///
    /// # Returns
    /// The method's JSON result
    pub fn handle(&self, host: &str, method: &str, params: &Value) -> Result<Value, AdminError> {
        let result = self.dispatch(host, method, params);
        match &result {
            Ok(_) => info!("{}: {}", SERVICE_NAME, method),
            Err(err) => warn!("{}: {} rejected: {}", SERVICE_NAME, method, err),
        }
        result
    }

    fn dispatch(&self, host: &str, method: &str, params: &Value) -> Result<Value, AdminError> {
        check_host(host, &self.config.allowed_hosts)?;
        match optional_param(params, "secret") {
            Ok(Some(secret)) if !self.config.secret.is_empty() && secret == self.config.secret => {}
            _ => return Err(AdminError::BadSecret),
        }

        let prefix = format!("{}.", SERVICE_NAME);
        match method.strip_prefix(prefix.as_str()).unwrap_or(method) {
            "startCPUProfiler" => self.start_cpu_profiler(),
            "stopCPUProfiler" => self.stop_cpu_profiler(),
            "memoryProfile" => self.memory_profile(),
            "lockProfile" => self.lock_profile(),
            "alias" => self.alias(param(params, "endpoint")?, param(params, "alias")?),
            "aliasChain" => self.alias_chain(param(params, "chain")?, param(params, "alias")?),
            "getChainAliases" => self.get_chain_aliases(param(params, "chain")?),
            "stacktrace" => self.stacktrace(),
            "setLoggerLevel" => self.set_logger_level(
                optional_param(params, "loggerName")?,
                optional_param(params, "logLevel")?,
                optional_param(params, "displayLevel")?,
            ),
            "getLoggerLevel" => self.get_logger_level(optional_param(params, "loggerName")?),
            "getConfig" => self.get_config(),
            "loadVMs" => self.load_vms(),
            "dbGet" => self.db_get(param(params, "key")?),
            "getNodeSigner" => Ok(self.get_node_signer()),
            other => Err(AdminError::UnknownMethod(other.to_string())),
        }
    }

    fn profile_path(&self, file: &str) -> PathBuf {
        self.config.profile_dir.join(file)
    }

    fn start_cpu_profiler(&self) -> Result<Value, AdminError> {
        let mut running = self.cpu_profile.lock().map_err(poisoned)?;
        if running.is_some() {
            return Err(AdminError::ProfilerRunning);
        }
        *running = Some(Utc::now().to_rfc3339());
        Ok(json!({ "success": true }))
    }

    fn stop_cpu_profiler(&self) -> Result<Value, AdminError> {
        let started = self
            .cpu_profile
            .lock()
            .map_err(poisoned)?
            .take()
            .ok_or(AdminError::ProfilerNotRunning)?;
        let profile = json!({ "started": started, "stopped": Utc::now().to_rfc3339() });
        write_private_file(&self.profile_path(CPU_PROFILE_FILE), &serde_json::to_vec_pretty(&profile)?)?;
        Ok(json!({ "success": true }))
    }

    fn memory_profile(&self) -> Result<Value, AdminError> {
        let (last_accepted, pending_writes) = {
            let state = self.state.read()?;
            (state.last_accepted(), state.has_pending_writes())
        };
        let profile = json!({
            "takenAt": Utc::now().to_rfc3339(),
            "lastAccepted": last_accepted.to_string(),
            "pendingWrites": pending_writes,
            "loadedVMs": self.vms.read().map_err(poisoned)?.len(),
        });
        write_private_file(&self.profile_path(MEMORY_PROFILE_FILE), &serde_json::to_vec_pretty(&profile)?)?;
        Ok(json!({ "success": true }))
    }

    fn lock_profile(&self) -> Result<Value, AdminError> {
        let profile = json!({
            "takenAt": Utc::now().to_rfc3339(),
            "cpuProfilerRunning": self.cpu_profile.lock().map_err(poisoned)?.is_some(),
        });
        write_private_file(&self.profile_path(LOCK_PROFILE_FILE), &serde_json::to_vec_pretty(&profile)?)?;
        Ok(json!({ "success": true }))
    }

    fn alias(&self, endpoint: &str, alias: &str) -> Result<Value, AdminError> {
        if alias.len() > MAX_ALIAS_LEN {
            return Err(AdminError::AliasTooLong(alias.len()));
        }
        if endpoint.is_empty() || alias.is_empty() {
            return Err(AdminError::InvalidParams("endpoint and alias must be set".to_string()));
        }
        let mut aliases = self.aliases.write().map_err(poisoned)?;
        if aliases.is_taken(alias) {
            return Err(AdminError::AliasTaken(alias.to_string()));
        }
        aliases.endpoints.insert(alias.to_string(), endpoint.to_string());
        Ok(json!({ "success": true }))
    }

    fn alias_chain(&self, chain: &str, alias: &str) -> Result<Value, AdminError> {
        if alias.len() > MAX_ALIAS_LEN {
            return Err(AdminError::AliasTooLong(alias.len()));
        }
        if alias.is_empty() {
            return Err(AdminError::InvalidParams("alias must be set".to_string()));
        }
        let mut aliases = self.aliases.write().map_err(poisoned)?;
        let chain_id = aliases
            .chain_lookup
            .get(chain)
            .cloned()
            .ok_or_else(|| AdminError::UnknownChain(chain.to_string()))?;
        if aliases.is_taken(alias) {
            return Err(AdminError::AliasTaken(alias.to_string()));
        }
        aliases.chain_lookup.insert(alias.to_string(), chain_id.clone());
        if let Some(list) = aliases.chains.get_mut(&chain_id) {
            list.push(alias.to_string());
        }
        Ok(json!({ "success": true }))
    }

    fn get_chain_aliases(&self, chain: &str) -> Result<Value, AdminError> {
        let aliases = self.aliases.read().map_err(poisoned)?;
        let list = aliases
            .chains
            .get(chain)
            .ok_or_else(|| AdminError::UnknownChain(chain.to_string()))?;
        Ok(json!({ "aliases": list }))
    }

    fn stacktrace(&self) -> Result<Value, AdminError> {
        let trace = std::backtrace::Backtrace::force_capture().to_string();
        write_private_file(&self.profile_path(STACKTRACE_FILE), trace.as_bytes())?;
        Ok(json!({ "success": true }))
    }

    fn set_logger_level(
        &self,
        logger: Option<&str>,
        log_level: Option<&str>,
        display_level: Option<&str>,
    ) -> Result<Value, AdminError> {
        if log_level.is_none() && display_level.is_none() {
            return Err(AdminError::NoLogLevel);
        }
        let log_level = log_level.map(parse_level).transpose()?;
        let display_level = display_level.map(parse_level).transpose()?;

        let mut loggers = self.loggers.write().map_err(poisoned)?;
        let names: Vec<String> = match logger {
            Some(name) if !name.is_empty() => {
                if !loggers.contains_key(name) {
                    return Err(AdminError::UnknownLogger(name.to_string()));
                }
                vec![name.to_string()]
            }
            _ => loggers.keys().cloned().collect(),
        };
        for name in &names {
            if let Some(levels) = loggers.get_mut(name) {
                if let Some(level) = log_level {
                    levels.log_level = level;
                }
                if let Some(level) = display_level {
                    levels.display_level = level;
                }
            }
        }

        let max = loggers
            .values()
            .map(|levels| levels.log_level)
            .max()
            .unwrap_or(LevelFilter::Info);
        log::set_max_level(max);
        Ok(json!({ "success": true }))
    }

    fn get_logger_level(&self, logger: Option<&str>) -> Result<Value, AdminError> {
        let loggers = self.loggers.read().map_err(poisoned)?;
        let mut levels = Map::new();
        match logger {
            Some(name) if !name.is_empty() => {
                let found = loggers
                    .get(name)
                    .ok_or_else(|| AdminError::UnknownLogger(name.to_string()))?;
                levels.insert(name.to_string(), found.to_json());
            }
            _ => {
                for (name, found) in loggers.iter() {
                    levels.insert(name.clone(), found.to_json());
                }
            }
        }
        Ok(json!({ "loggerLevels": levels }))
    }

    fn get_config(&self) -> Result<Value, AdminError> {
        let mut config = serde_json::to_value(&self.node_config)?;
        if let Some(admin) = config.get_mut("admin") {
            admin["secret"] = json!("<redacted>");
        }
        Ok(config)
    }

    /// Register every plugin file named by a hex VM ID that is not loaded yet
    fn load_vms(&self) -> Result<Value, AdminError> {
        let mut new_vms = Map::new();
        let mut failed_vms = Map::new();
        let mut vms = self.vms.write().map_err(poisoned)?;

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.config.plugin_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                entries.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        entries.sort();

        for name in entries {
            let stem = name.split('.').next().unwrap_or_default();
            match Id::from_hex(stem) {
                Ok(vm_id) if !vms.contains_key(&vm_id) => {
                    vms.insert(vm_id, vec![name.clone()]);
                    new_vms.insert(vm_id.to_string(), json!([name]));
                }
                Ok(_) => {}
                Err(err) => {
                    failed_vms.insert(name, json!(err.to_string()));
                }
            }
        }
        Ok(json!({ "newVMs": new_vms, "failedVMs": failed_vms }))
    }

    fn db_get(&self, key: &str) -> Result<Value, AdminError> {
        let raw = hex::decode(key.trim_start_matches("0x"))
            .map_err(|e| AdminError::InvalidParams(format!("key: {}", e)))?;
        let value = self
            .state
            .read()?
            .db()
            .get(&raw)?
            .ok_or_else(|| AdminError::KeyNotFound(key.to_string()))?;
        Ok(json!({ "value": hex::encode(value) }))
    }

    fn get_node_signer(&self) -> Value {
        let public = PublicKey::from_secret_key(&Secp256k1::signing_only(), &self.signer);
        json!({
            "privateKey": hex::encode(self.signer.secret_bytes()),
            "publicKey": hex::encode(public.serialize()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_storage_impl::{keys, MemoryStore, State};
    use tempfile::TempDir;

    const SECRET: &str = "s3cret";
    const HOST: &str = "localhost";

    fn service(dir: &TempDir) -> AdminService<MemoryStore> {
        let mut config = NodeConfig::default();
        config.admin = AdminConfig {
            enabled: true,
            secret: SECRET.to_string(),
            allowed_hosts: vec!["localhost".to_string(), "node.local".to_string()],
            profile_dir: dir.path().join("profiles"),
            plugin_dir: dir.path().join("plugins"),
        };
        let mut state = State::open(MemoryStore::new()).unwrap();
        state.set_last_accepted(Id::hash(b"block"));
        state.commit().unwrap();
        let signer = SecretKey::from_slice(&[7u8; 32]).unwrap();
        AdminService::new(config, SharedState::new(state), signer, &[Id::hash(b"chain")]).unwrap()
    }

    fn call(admin: &AdminService<MemoryStore>, method: &str, mut params: Value) -> Result<Value, AdminError> {
        params["secret"] = json!(SECRET);
        admin.handle(HOST, method, &params)
    }

    #[test]
    fn test_memory_profile_needs_secret() {
        let dir = TempDir::new().unwrap();
        let admin = service(&dir);

        let err = admin
            .handle(HOST, "admin.memoryProfile", &json!({ "secret": "wrong" }))
            .unwrap_err();
        assert_eq!(err.to_string(), "secret arg missing or wrong");
        assert_eq!(err.kind(), camino_core::error::ErrorKind::PermissionDenied);
        assert!(admin.handle(HOST, "admin.memoryProfile", &json!({})).is_err());
        assert!(!dir.path().join("profiles").join(MEMORY_PROFILE_FILE).exists());

        call(&admin, "admin.memoryProfile", json!({})).unwrap();
        let written = fs::read(dir.path().join("profiles").join(MEMORY_PROFILE_FILE)).unwrap();
        let profile: Value = serde_json::from_slice(&written).unwrap();
        assert_eq!(profile["lastAccepted"], json!(Id::hash(b"block").to_string()));
    }

    #[test]
    fn test_host_matching() {
        let allowed = vec!["localhost".to_string()];
        assert!(check_host("localhost", &allowed).is_ok());
        assert!(check_host("LOCALHOST:9650", &allowed).is_ok());
        assert!(check_host("localhost:0", &allowed).is_ok());
        assert!(check_host("localhost:65535", &allowed).is_ok());
        assert!(check_host("localhost:65536", &allowed).is_err());
        assert!(check_host("localhost:port", &allowed).is_err());
        assert!(check_host("evil.com", &allowed).is_err());
        assert!(check_host("evil.com", &["*".to_string()]).is_ok());

        let dir = TempDir::new().unwrap();
        let admin = service(&dir);
        let err = admin
            .handle("evil.com", "getConfig", &json!({ "secret": SECRET }))
            .unwrap_err();
        assert!(matches!(err, AdminError::HostNotAllowed(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_stacktrace_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let admin = service(&dir);
        call(&admin, "admin.stacktrace", json!({})).unwrap();

        let meta = fs::metadata(dir.path().join("profiles").join(STACKTRACE_FILE)).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn test_cpu_profiler_lifecycle() {
        let dir = TempDir::new().unwrap();
        let admin = service(&dir);
        assert!(matches!(
            call(&admin, "stopCPUProfiler", json!({})),
            Err(AdminError::ProfilerNotRunning)
        ));
        call(&admin, "startCPUProfiler", json!({})).unwrap();
        assert!(matches!(
            call(&admin, "startCPUProfiler", json!({})),
            Err(AdminError::ProfilerRunning)
        ));
        call(&admin, "lockProfile", json!({})).unwrap();
        call(&admin, "stopCPUProfiler", json!({})).unwrap();
        assert!(dir.path().join("profiles").join(CPU_PROFILE_FILE).exists());
        assert!(dir.path().join("profiles").join(LOCK_PROFILE_FILE).exists());
    }

    #[test]
    fn test_aliases() {
        let dir = TempDir::new().unwrap();
        let admin = service(&dir);
        let chain = Id::hash(b"chain").to_string();

        let too_long = "a".repeat(MAX_ALIAS_LEN + 1);
        assert!(matches!(
            call(&admin, "alias", json!({ "endpoint": "/ext/bc/P", "alias": too_long })),
            Err(AdminError::AliasTooLong(513))
        ));
        let longest = "a".repeat(MAX_ALIAS_LEN);
        call(&admin, "alias", json!({ "endpoint": "/ext/bc/P", "alias": longest })).unwrap();

        call(&admin, "aliasChain", json!({ "chain": chain, "alias": "P" })).unwrap();
        // an alias resolves to its chain
        call(&admin, "aliasChain", json!({ "chain": "P", "alias": "platform" })).unwrap();
        assert!(matches!(
            call(&admin, "aliasChain", json!({ "chain": chain, "alias": "P" })),
            Err(AdminError::AliasTaken(_))
        ));
        assert!(matches!(
            call(&admin, "aliasChain", json!({ "chain": "X", "alias": "x" })),
            Err(AdminError::UnknownChain(_))
        ));

        let result = call(&admin, "getChainAliases", json!({ "chain": chain })).unwrap();
        assert_eq!(result, json!({ "aliases": [chain, "P", "platform"] }));
    }

    #[test]
    fn test_logger_levels() {
        let dir = TempDir::new().unwrap();
        let admin = service(&dir);

        assert!(matches!(
            call(&admin, "setLoggerLevel", json!({ "loggerName": "camino" })),
            Err(AdminError::NoLogLevel)
        ));
        assert!(matches!(
            call(&admin, "setLoggerLevel", json!({ "loggerName": "nope", "logLevel": "debug" })),
            Err(AdminError::UnknownLogger(_))
        ));
        assert!(matches!(
            call(&admin, "setLoggerLevel", json!({ "logLevel": "loud" })),
            Err(AdminError::InvalidLogLevel(_))
        ));

        call(&admin, "setLoggerLevel", json!({ "loggerName": "camino", "displayLevel": "warn" })).unwrap();
        let levels = call(&admin, "getLoggerLevel", json!({ "loggerName": "camino" })).unwrap();
        assert_eq!(
            levels,
            json!({ "loggerLevels": { "camino": { "logLevel": "INFO", "displayLevel": "WARN" } } })
        );
    }

    #[test]
    fn test_config_db_and_signer() {
        let dir = TempDir::new().unwrap();
        let admin = service(&dir);

        let config = call(&admin, "getConfig", json!({})).unwrap();
        assert_eq!(config["admin"]["secret"], json!("<redacted>"));
        assert_eq!(config["storage"], json!("memory"));

        let value = call(&admin, "dbGet", json!({ "key": hex::encode(keys::LAST_ACCEPTED) })).unwrap();
        assert!(value["value"].as_str().is_some());
        assert!(matches!(
            call(&admin, "dbGet", json!({ "key": hex::encode(b"missing") })),
            Err(AdminError::KeyNotFound(_))
        ));
        assert!(matches!(
            call(&admin, "dbGet", json!({ "key": "xyz" })),
            Err(AdminError::InvalidParams(_))
        ));

        let signer = call(&admin, "getNodeSigner", json!({})).unwrap();
        assert_eq!(signer["privateKey"], json!(hex::encode([7u8; 32])));
        assert_eq!(signer["publicKey"].as_str().unwrap().len(), 66);

        assert!(matches!(
            call(&admin, "admin.shutdown", json!({})),
            Err(AdminError::UnknownMethod(_))
        ));
    }

    #[test]
    fn test_load_vms() {
        let dir = TempDir::new().unwrap();
        let admin = service(&dir);
        let plugins = dir.path().join("plugins");
        fs::create_dir_all(&plugins).unwrap();
        let vm_id = Id::hash(b"vm");
        fs::write(plugins.join(vm_id.to_string()), b"").unwrap();
        fs::write(plugins.join("not-a-vm"), b"").unwrap();

        let result = call(&admin, "loadVMs", json!({})).unwrap();
        assert_eq!(result["newVMs"][vm_id.to_string()], json!([vm_id.to_string()]));
        assert!(result["failedVMs"]["not-a-vm"].is_string());

        // already loaded VMs are not reported again
        let again = call(&admin, "loadVMs", json!({})).unwrap();
        assert_eq!(again["newVMs"], json!({}));
    }
}
