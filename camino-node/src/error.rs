use camino_core::error::{ErrorKind, IdParseError, StorageError};
use camino_scheduler::ChainError;
use std::io;
use thiserror::Error;

/// Errors loading or validating the node configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] io::Error),

    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("storage backend {0} is not compiled in")]
    BackendUnavailable(String),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::Io(e) if e.kind() == io::ErrorKind::NotFound => ErrorKind::NotFound,
            ConfigError::Io(_) => ErrorKind::Fatal,
            ConfigError::Parse(_) | ConfigError::Invalid(_) => ErrorKind::InvalidArgument,
            ConfigError::BackendUnavailable(_) => ErrorKind::PreconditionFailed,
        }
    }
}

/// Errors parsing, validating or writing genesis
#[derive(Error, Debug)]
pub enum GenesisError {
    #[error("could not parse genesis: {0}")]
    Json(#[from] serde_json::Error),

    #[error("genesis has no allocations")]
    NoAllocations,

    #[error("duplicate staked-fund address {0}")]
    DuplicateStakedFund(String),

    #[error("staked-fund address {0} has no allocation")]
    StakedFundNotAllocated(String),

    #[error("start time {start} is in the future (now {now})")]
    StartTimeInFuture { start: u64, now: u64 },

    #[error("initial stake duration offset {offset} is not below duration {duration}")]
    OffsetTooLarge { offset: u64, duration: u64 },

    #[error("malformed address {address}: {source}")]
    MalformedAddress {
        address: String,
        source: IdParseError,
    },

    #[error("invalid genesis: {0}")]
    Invalid(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl GenesisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenesisError::Storage(e) => e.kind(),
            _ => ErrorKind::InvalidArgument,
        }
    }
}

/// Errors returned by admin methods
#[derive(Error, Debug)]
pub enum AdminError {
    #[error("secret arg missing or wrong")]
    BadSecret,

    #[error("host {0} is not allowed")]
    HostNotAllowed(String),

    #[error("unknown method {0}")]
    UnknownMethod(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("alias length {0} exceeds the maximum of 512")]
    AliasTooLong(usize),

    #[error("alias {0} is already in use")]
    AliasTaken(String),

    #[error("unknown chain {0}")]
    UnknownChain(String),

    #[error("need at least one of logLevel and displayLevel")]
    NoLogLevel,

    #[error("invalid log level {0}")]
    InvalidLogLevel(String),

    #[error("unknown logger {0}")]
    UnknownLogger(String),

    #[error("cpu profiler is already running")]
    ProfilerRunning,

    #[error("cpu profiler is not running")]
    ProfilerNotRunning,

    #[error("key {0} not found")]
    KeyNotFound(String),

    #[error("admin io failed: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AdminError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdminError::BadSecret | AdminError::HostNotAllowed(_) => ErrorKind::PermissionDenied,
            AdminError::UnknownMethod(_)
            | AdminError::UnknownChain(_)
            | AdminError::UnknownLogger(_)
            | AdminError::KeyNotFound(_) => ErrorKind::NotFound,
            AdminError::InvalidParams(_)
            | AdminError::AliasTooLong(_)
            | AdminError::NoLogLevel
            | AdminError::InvalidLogLevel(_)
            | AdminError::Json(_) => ErrorKind::InvalidArgument,
            AdminError::AliasTaken(_) => ErrorKind::Conflict,
            AdminError::ProfilerRunning | AdminError::ProfilerNotRunning => {
                ErrorKind::PreconditionFailed
            }
            AdminError::Io(_) => ErrorKind::Fatal,
            AdminError::Storage(e) => e.kind(),
        }
    }
}

/// Errors starting a node
#[derive(Error, Debug)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Genesis(#[from] GenesisError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Admin(#[from] AdminError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl NodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NodeError::Config(e) => e.kind(),
            NodeError::Genesis(e) => e.kind(),
            NodeError::Chain(e) => e.kind(),
            NodeError::Admin(e) => e.kind(),
            NodeError::Storage(e) => e.kind(),
        }
    }
}
