//! # Privacy Mapper Service
//!
//! Persists real↔pseudo pairs through the injected `KeyValueStore`.
//!
//! ## Atomicity
//!
//! `real_to_pseudo` runs read-check-create inside an exclusive section per
//! session namespace. Two callers racing on the first encounter of the same
//! real value serialize on that section; the loser finds the winner's pair
//! and returns it. Both directions of a new pair are written in one atomic
//! batch, so a reverse lookup never sees half a pair.
//!
//! Reverse lookups and scans do not take the section: they only observe
//! committed batches.

use crate::domain::keys::{direction_prefix, namespace_prefix, pair_key, Direction};
use crate::domain::{MapperConfig, PrivacyMapError, PseudonymShape};
use crate::ports::PrivacyMapApi;
use shared_types::{BatchOperation, KeyValueStore, KeyedLocks, SessionId, StoreError};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Session-scoped bijective privacy mapper.
pub struct PrivacyMapper {
    store: Arc<dyn KeyValueStore>,
    config: MapperConfig,
    /// One exclusive section per session namespace.
    namespaces: KeyedLocks<SessionId>,
}

impl PrivacyMapper {
    pub fn new(store: Arc<dyn KeyValueStore>, config: MapperConfig) -> Self {
        Self {
            store,
            config,
            namespaces: KeyedLocks::new(),
        }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    fn read_value(&self, key: &[u8]) -> Result<Option<String>, PrivacyMapError> {
        match self.store.get(key)? {
            None => Ok(None),
            Some(bytes) => Ok(Some(decode_text(key, bytes)?)),
        }
    }

    /// Draw candidates until one is unused in the namespace.
    fn allocate(&self, session: &SessionId, real: &str) -> Result<String, PrivacyMapError> {
        let shape = PseudonymShape::of(real);
        for attempt in 1..=self.config.max_allocation_attempts {
            let candidate = shape.generate();
            let reverse = pair_key(session, Direction::PseudoToReal, &candidate)?;
            if !self.store.exists(&reverse)? {
                if attempt > 1 {
                    debug!(session = %session, attempt, "Pseudonym allocated after collision");
                }
                return Ok(candidate);
            }
        }

        warn!(
            session = %session,
            attempts = self.config.max_allocation_attempts,
            "Pseudonym space exhausted"
        );
        Err(PrivacyMapError::PseudonymSpaceExhausted {
            attempts: self.config.max_allocation_attempts,
        })
    }
}

impl PrivacyMapApi for PrivacyMapper {
    fn real_to_pseudo(&self, session: &SessionId, real: &str) -> Result<String, PrivacyMapError> {
        if real.is_empty() {
            return Err(PrivacyMapError::InvalidInput("real value is empty".into()));
        }
        let forward = pair_key(session, Direction::RealToPseudo, real)?;

        let _section = self.namespaces.lock(session);

        if let Some(existing) = self.read_value(&forward)? {
            return Ok(existing);
        }

        let pseudo = self.allocate(session, real)?;
        let reverse = pair_key(session, Direction::PseudoToReal, &pseudo)?;
        self.store.atomic_batch_write(vec![
            BatchOperation::put(forward, pseudo.clone().into_bytes()),
            BatchOperation::put(reverse, real.as_bytes().to_vec()),
        ])?;

        debug!(session = %session, "New privacy pair created");
        Ok(pseudo)
    }

    fn pseudo_to_real(
        &self,
        session: &SessionId,
        pseudo: &str,
    ) -> Result<String, PrivacyMapError> {
        if pseudo.is_empty() {
            return Err(PrivacyMapError::InvalidInput("pseudo value is empty".into()));
        }
        let reverse = pair_key(session, Direction::PseudoToReal, pseudo)?;
        self.read_value(&reverse)?
            .ok_or_else(|| PrivacyMapError::MappingNotFound {
                session: session.clone(),
            })
    }

    fn clear(&self, session: &SessionId) -> Result<usize, PrivacyMapError> {
        let prefix = namespace_prefix(session)?;

        let _section = self.namespaces.lock(session);

        let entries = self.store.prefix_scan(&prefix)?;
        if entries.is_empty() {
            return Ok(0);
        }
        let pairs = entries.len() / 2;
        let ops = entries
            .into_iter()
            .map(|(key, _)| BatchOperation::delete(key))
            .collect();
        self.store.atomic_batch_write(ops)?;

        info!(session = %session, pairs, "Privacy map namespace cleared");
        Ok(pairs)
    }

    fn pairs(&self, session: &SessionId) -> Result<Vec<(String, String)>, PrivacyMapError> {
        let prefix = direction_prefix(session, Direction::RealToPseudo)?;
        self.store
            .prefix_scan(&prefix)?
            .into_iter()
            .map(|(key, value)| {
                let real = decode_text(&key, key[prefix.len()..].to_vec())?;
                let pseudo = decode_text(&key, value)?;
                Ok((real, pseudo))
            })
            .collect()
    }
}

fn decode_text(key: &[u8], bytes: Vec<u8>) -> Result<String, PrivacyMapError> {
    String::from_utf8(bytes).map_err(|e| {
        StoreError::Corruption {
            key: hex::encode(key),
            message: e.to_string(),
        }
        .into()
    })
}
