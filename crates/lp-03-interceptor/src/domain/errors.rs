//! Interceptor error types.

use super::state::IllegalTransition;
use lp_01_privacy_mapper::PrivacyMapError;
use lp_02_accounts::AccountError;
use shared_types::{ErrorKind, SessionId};
use thiserror::Error;

/// Failure inside a rule. Always aborts the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error(transparent)]
    Mapper(#[from] PrivacyMapError),

    #[error(transparent)]
    Ledger(#[from] AccountError),

    /// A field the rule depends on is missing or has the wrong type.
    #[error("Malformed field {field}: {message}")]
    Malformed { field: String, message: String },
}

impl RuleError {
    pub fn malformed(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Mapper(e) => e.kind(),
            Self::Ledger(e) => e.kind(),
            Self::Malformed { .. } => ErrorKind::Validation,
        }
    }
}

/// Failure reaching the node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForwardError {
    #[error("Node unavailable: {0}")]
    Unavailable(String),

    #[error("Node returned error {code}: {message}")]
    Node { code: i32, message: String },
}

/// Pipeline error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("No binding for session {0}")]
    UnknownSession(SessionId),

    /// A request rule refused the call; nothing was forwarded.
    #[error("Call declined by {rule}: {reason}")]
    Declined {
        rule: &'static str,
        kind: ErrorKind,
        reason: String,
    },

    #[error("Request rule {rule} failed: {source}")]
    RequestRule {
        rule: &'static str,
        #[source]
        source: RuleError,
    },

    #[error(transparent)]
    Forward(#[from] ForwardError),

    #[error("Forward timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    /// The node answered but the answer could not be rewritten; it was
    /// dropped.
    #[error("Response rule {rule} failed: {source}")]
    ResponseRule {
        rule: &'static str,
        #[source]
        source: RuleError,
    },

    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),
}

impl PipelineError {
    /// Taxonomy kind, when the failure originates in the ledger, the mapper
    /// or the session table.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::UnknownSession(_) => Some(ErrorKind::NotFound),
            Self::Declined { kind, .. } => Some(*kind),
            Self::RequestRule { source, .. } | Self::ResponseRule { source, .. } => {
                Some(source.kind())
            }
            Self::Forward(_) | Self::Timeout { .. } | Self::IllegalTransition(_) => None,
        }
    }
}
