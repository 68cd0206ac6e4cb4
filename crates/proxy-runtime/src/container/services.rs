//! # Service Container
//!
//! Holds every subsystem instance and wires them together.
//!
//! ```text
//! KeyValueStore ──┬──→ PrivacyMapper ──┬──→ SessionRegistry ──→ InterceptorPipeline
//!                 │                    ├──→ PrivacyRule ───────────────┘
//!                 │                    └──→ ControlPlaneService
//!                 └──→ AccountService ──┬──→ AccountRule ─────────────┘
//!                                       └──→ ControlPlaneService
//! ```
//!
//! All services are shared behind `Arc`; nothing here holds a lock.

use crate::adapters::{session_id_for, HmacCredentialIssuer};
use crate::container::config::{ConfigError, ProxyConfig, StorageBackend};
use lp_01_privacy_mapper::PrivacyMapper;
use lp_02_accounts::AccountService;
use lp_03_interceptor::{
    AccountRule, InterceptorPipeline, NodeForwarder, PrivacyRule, SessionBinding,
    SessionRegistry,
};
use lp_04_control_plane::ControlPlaneService;
use shared_types::{InMemoryKVStore, KeyValueStore, SessionId, StoreError, SystemTimeSource};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to open storage: {0}")]
    Storage(#[from] StoreError),

    #[error("credential for session {0} was not issued by this proxy")]
    UnrecognizedCredential(SessionId),
}

pub struct ProxyServices {
    pub config: ProxyConfig,
    pub store: Arc<dyn KeyValueStore>,
    pub mapper: Arc<PrivacyMapper>,
    pub ledger: Arc<AccountService>,
    pub issuer: Arc<HmacCredentialIssuer>,
    pub registry: Arc<SessionRegistry>,
    pub pipeline: Arc<InterceptorPipeline>,
    pub control: Arc<ControlPlaneService>,
}

impl ProxyServices {
    /// Wire the subsystems over an already opened store.
    pub fn new(
        config: ProxyConfig,
        store: Arc<dyn KeyValueStore>,
        forwarder: Arc<dyn NodeForwarder>,
    ) -> Self {
        let mapper = Arc::new(PrivacyMapper::new(store.clone(), config.mapper.clone()));
        let issuer = Arc::new(HmacCredentialIssuer::new(config.credential_secret));
        let ledger = Arc::new(AccountService::new(
            store.clone(),
            Arc::new(SystemTimeSource),
            issuer.clone(),
        ));
        let registry = Arc::new(SessionRegistry::new(mapper.clone()));
        let pipeline = Arc::new(InterceptorPipeline::new(
            registry.clone(),
            Arc::new(PrivacyRule::new(mapper.clone())),
            Arc::new(AccountRule::new(ledger.clone())),
            forwarder,
            config.pipeline.clone(),
        ));
        let control = Arc::new(ControlPlaneService::new(ledger.clone(), mapper.clone()));

        info!(
            backend = ?config.storage.backend,
            forward_timeout_ms = config.pipeline.forward_timeout_ms,
            "Services wired"
        );
        Self {
            config,
            store,
            mapper,
            ledger,
            issuer,
            registry,
            pipeline,
            control,
        }
    }

    /// Open the configured store and wire the subsystems over it.
    pub fn open(
        config: ProxyConfig,
        forwarder: Arc<dyn NodeForwarder>,
    ) -> Result<Self, ContainerError> {
        let store = open_store(&config)?;
        Ok(Self::new(config, store, forwarder))
    }

    /// Bind the session a presented credential opens.
    ///
    /// Only credentials minted by this proxy are accepted; the session is
    /// bound to their account.
    pub fn accept_credential(&self, credential: &[u8]) -> Result<SessionBinding, ContainerError> {
        let session = session_id_for(credential);
        let Some(account) = self.issuer.verify(credential) else {
            warn!(session = %session, "Credential not minted here, rejected");
            return Err(ContainerError::UnrecognizedCredential(session));
        };
        Ok(self.registry.bind(session, Some(account)))
    }
}

fn open_store(config: &ProxyConfig) -> Result<Arc<dyn KeyValueStore>, ContainerError> {
    match config.storage.backend {
        StorageBackend::Memory => {
            warn!("In-memory storage: state is lost on exit");
            Ok(Arc::new(InMemoryKVStore::new()))
        }
        #[cfg(feature = "rocksdb")]
        StorageBackend::Rocksdb => {
            use crate::adapters::storage::{RocksDbConfig, RocksDbStore};
            let rocks = RocksDbConfig {
                path: config.storage.data_dir.join("rocksdb"),
                ..Default::default()
            };
            info!(path = %rocks.path.display(), "Opening RocksDB");
            Ok(Arc::new(RocksDbStore::open(rocks)?))
        }
        #[cfg(not(feature = "rocksdb"))]
        StorageBackend::Rocksdb => Err(ConfigError::BackendUnavailable(StorageBackend::Rocksdb).into()),
    }
}
