//! # Proxy Configuration
//!
//! Unified configuration for all subsystems and runtime parameters.
//!
//! Sources, later ones winning:
//!
//! 1. built-in defaults
//! 2. the JSON file named by `LP_CONFIG`, if set
//! 3. `LP_*` environment variables
//!
//! ## Security Requirements
//!
//! - `credential_secret` MUST NOT be the default zero value

use lp_01_privacy_mapper::{MapperConfig, MapperConfigError};
use lp_03_interceptor::{PipelineConfig, PipelineConfigError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub const ENV_CONFIG: &str = "LP_CONFIG";
pub const ENV_DATA_DIR: &str = "LP_DATA_DIR";
pub const ENV_STORAGE_BACKEND: &str = "LP_STORAGE_BACKEND";
pub const ENV_FORWARD_TIMEOUT_MS: &str = "LP_FORWARD_TIMEOUT_MS";
pub const ENV_CREDENTIAL_SECRET: &str = "LP_CREDENTIAL_SECRET";
pub const ENV_LOG_LEVEL: &str = "LP_LOG_LEVEL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Rocksdb,
}

impl std::str::FromStr for StorageBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rocksdb" => Ok(Self::Rocksdb),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Database directory for the persistent backend.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::from("./data"),
        }
    }
}

/// Complete proxy configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub storage: StorageConfig,
    pub mapper: MapperConfig,
    pub pipeline: PipelineConfig,
    /// Key for minting account credentials (32 bytes).
    pub credential_secret: [u8; 32],
    /// Filter used when `RUST_LOG` is unset.
    pub log_level: LogLevel,
}

/// Default filter directive, `info` unless configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogLevel(pub String);

impl Default for LogLevel {
    fn default() -> Self {
        Self("info".to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("credential secret is the default zero value; set LP_CREDENTIAL_SECRET to 64 hex chars")]
    InsecureCredentialSecret,

    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("cannot read config file {path}: {message}")]
    File { path: PathBuf, message: String },

    #[error("storage backend {0:?} is not compiled in")]
    BackendUnavailable(StorageBackend),

    #[error(transparent)]
    Mapper(#[from] MapperConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineConfigError),
}

impl ProxyConfig {
    /// Defaults, then `LP_CONFIG`, then the `LP_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = match std::env::var_os(ENV_CONFIG) {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => Self::default(),
        };
        base.overlay(|var| std::env::var(var).ok())
    }

    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::File {
            path: path.clone(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::File {
            path,
            message: e.to_string(),
        })
    }

    /// Apply overrides found through `lookup`.
    pub fn overlay(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let invalid = |var: &'static str, value: &str| ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        };

        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(backend) = lookup(ENV_STORAGE_BACKEND) {
            self.storage.backend = backend
                .parse()
                .map_err(|_| invalid(ENV_STORAGE_BACKEND, &backend))?;
        }
        if let Some(timeout) = lookup(ENV_FORWARD_TIMEOUT_MS) {
            self.pipeline.forward_timeout_ms = timeout
                .parse()
                .map_err(|_| invalid(ENV_FORWARD_TIMEOUT_MS, &timeout))?;
        }
        if let Some(secret_hex) = lookup(ENV_CREDENTIAL_SECRET) {
            // never echo the secret back
            let bytes = hex::decode(secret_hex.trim())
                .map_err(|_| invalid(ENV_CREDENTIAL_SECRET, "<redacted>"))?;
            self.credential_secret = bytes
                .try_into()
                .map_err(|_| invalid(ENV_CREDENTIAL_SECRET, "<redacted>"))?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = LogLevel(level);
        }
        Ok(self)
    }

    /// Reject configurations the runtime must not start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.credential_secret == [0u8; 32] {
            return Err(ConfigError::InsecureCredentialSecret);
        }
        if self.storage.backend == StorageBackend::Rocksdb && !cfg!(feature = "rocksdb") {
            return Err(ConfigError::BackendUnavailable(self.storage.backend));
        }
        self.mapper.validate()?;
        self.pipeline.validate()?;
        Ok(())
    }
}
