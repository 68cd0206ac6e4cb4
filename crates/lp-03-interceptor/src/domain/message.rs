//! Messages and per-call context.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{AccountId, SessionId};
use std::fmt;
use uuid::Uuid;

/// Identifier of one intercepted call.
///
/// UUID v7, so ids sort by arrival time in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(Uuid);

impl CallId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A request or response travelling through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcMessage {
    /// Full gRPC method path, see `domain::methods`.
    pub method: String,
    pub payload: Value,
}

impl RpcMessage {
    pub fn new(method: impl Into<String>, payload: Value) -> Self {
        Self {
            method: method.into(),
            payload,
        }
    }
}

/// What every rule knows about the call it is handling.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub call_id: CallId,
    pub session: SessionId,
    pub account: Option<AccountId>,
    pub method: String,
}

impl CallContext {
    pub fn new(session: SessionId, account: Option<AccountId>, method: impl Into<String>) -> Self {
        Self {
            call_id: CallId::new(),
            session,
            account,
            method: method.into(),
        }
    }
}

/// Dot-separated lookup into nested objects, e.g. `payment_route.total_amt_msat`.
pub fn field<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.get(segment))
}

/// Unsigned integer carried either as a JSON number or as a decimal string.
pub fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
