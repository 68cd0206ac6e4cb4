//! # Session Registry
//!
//! Binds sessions to the rules that run for them. Privacy mapping always
//! runs; account enforcement runs when an account is bound.

use crate::rules::RuleKind;
use dashmap::DashMap;
use lp_01_privacy_mapper::{PrivacyMapApi, PrivacyMapError};
use serde::Serialize;
use shared_types::{AccountId, SessionId};
use std::sync::Arc;
use tracing::info;

/// Rules bound to one session, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionBinding {
    pub session: SessionId,
    pub account: Option<AccountId>,
    pub rules: Vec<RuleKind>,
}

impl SessionBinding {
    pub fn new(session: SessionId, account: Option<AccountId>) -> Self {
        let mut rules = vec![RuleKind::PrivacyMapping];
        if account.is_some() {
            rules.push(RuleKind::AccountEnforcement);
        }
        Self {
            session,
            account,
            rules,
        }
    }
}

pub struct SessionRegistry {
    bindings: DashMap<SessionId, SessionBinding>,
    mapper: Arc<dyn PrivacyMapApi>,
}

impl SessionRegistry {
    pub fn new(mapper: Arc<dyn PrivacyMapApi>) -> Self {
        Self {
            bindings: DashMap::new(),
            mapper,
        }
    }

    /// Bind (or rebind) a session. The privacy namespace is created lazily on
    /// first substitution.
    pub fn bind(&self, session: SessionId, account: Option<AccountId>) -> SessionBinding {
        let binding = SessionBinding::new(session.clone(), account);
        self.bindings.insert(session.clone(), binding.clone());
        info!(session = %session, account = ?account, "Session bound");
        binding
    }

    pub fn binding(&self, session: &SessionId) -> Option<SessionBinding> {
        self.bindings.get(session).map(|b| b.value().clone())
    }

    /// Drop the binding and erase the session's privacy namespace.
    ///
    /// Returns whether a binding existed. The namespace is cleared either way.
    pub fn revoke(&self, session: &SessionId) -> Result<bool, PrivacyMapError> {
        let existed = self.bindings.remove(session).is_some();
        let pairs = self.mapper.clear(session)?;
        info!(session = %session, existed, pairs, "Session revoked");
        Ok(existed)
    }

    /// Bound sessions, ordered by id.
    pub fn sessions(&self) -> Vec<SessionId> {
        let mut sessions: Vec<_> = self.bindings.iter().map(|b| b.key().clone()).collect();
        sessions.sort();
        sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lp_01_privacy_mapper::{MapperConfig, PrivacyMapper};
    use shared_types::InMemoryKVStore;

    fn registry() -> (SessionRegistry, Arc<PrivacyMapper>) {
        let mapper = Arc::new(PrivacyMapper::new(
            Arc::new(InMemoryKVStore::new()),
            MapperConfig::default(),
        ));
        (SessionRegistry::new(mapper.clone()), mapper)
    }

    #[test]
    fn test_rule_order() {
        let (registry, _) = registry();
        let plain = registry.bind(SessionId::new(vec![1]), None);
        assert_eq!(plain.rules, vec![RuleKind::PrivacyMapping]);

        let bound = registry.bind(SessionId::new(vec![2]), Some(AccountId([7; 8])));
        assert_eq!(
            bound.rules,
            vec![RuleKind::PrivacyMapping, RuleKind::AccountEnforcement]
        );
        assert_eq!(registry.binding(&SessionId::new(vec![2])), Some(bound));
    }

    #[test]
    fn test_revoke_clears_namespace() {
        let (registry, mapper) = registry();
        let session = SessionId::new(vec![1]);
        registry.bind(session.clone(), None);
        let pseudo = mapper.real_to_pseudo(&session, "secret").unwrap();

        assert!(registry.revoke(&session).unwrap());
        assert!(registry.binding(&session).is_none());
        assert!(mapper.pseudo_to_real(&session, &pseudo).is_err());
        assert!(!registry.revoke(&session).unwrap());
    }

    #[test]
    fn test_sessions_sorted() {
        let (registry, _) = registry();
        for id in [3u8, 1, 2] {
            registry.bind(SessionId::new(vec![id]), None);
        }
        assert_eq!(
            registry.sessions(),
            vec![
                SessionId::new(vec![1]),
                SessionId::new(vec![2]),
                SessionId::new(vec![3])
            ]
        );
    }
}
