//! # Rules
//!
//! A rule sees every call of the sessions it is bound to, once on the way
//! in and once on the way out.
//!
//! | Rule | Request | Response | Abort |
//! |------|---------|----------|-------|
//! | `PrivacyRule` | pseudo → real | real → pseudo | nothing |
//! | `AccountRule` | reserve spend | settle / fail / associate | fail reservation |
//!
//! Request rules run in binding order, response rules in reverse order.

pub mod accounts;
pub mod privacy;

pub use accounts::AccountRule;
pub use privacy::{FieldKind, FieldRule, Phase, PrivacyRule, PRIVACY_FIELDS};

use crate::domain::{CallContext, RpcMessage, RuleError};
use serde::{Deserialize, Serialize};
use shared_types::ErrorKind;

/// Why a request rule refused a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decline {
    pub kind: ErrorKind,
    pub reason: String,
}

impl Decline {
    pub fn new(kind: ErrorKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestVerdict {
    /// Pass the (possibly rewritten) request on.
    Continue(RpcMessage),
    /// Stop here. Nothing is forwarded.
    Decline(Decline),
}

/// One stage of the interceptor chain.
///
/// Rules must not block on I/O other than the ledger and mapper stores, and
/// must never hold a lock when they return.
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    fn handle_request(
        &self,
        ctx: &CallContext,
        request: RpcMessage,
    ) -> Result<RequestVerdict, RuleError>;

    fn handle_response(
        &self,
        ctx: &CallContext,
        response: RpcMessage,
    ) -> Result<RpcMessage, RuleError>;

    /// Compensate for an accepted request whose call will never complete
    /// normally (forward failure, timeout, cancellation, or a later request
    /// rule declining).
    fn abort(&self, ctx: &CallContext);
}

/// Rules a session can be bound to, in the order they run on requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    PrivacyMapping,
    AccountEnforcement,
}
