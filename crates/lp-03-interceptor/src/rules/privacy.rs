//! # Privacy Rule
//!
//! Hides real node identifiers from the application. Response fields listed
//! in [`PRIVACY_FIELDS`] are replaced by session pseudonyms; request fields
//! listed there are replaced by the real values behind them. A request
//! carrying a pseudonym this session was never given is declined.
//!
//! Paths are dot-separated; a segment ending in `[]` fans out over every
//! element of that array. Missing and `null` fields are left alone.

use super::{Decline, RequestVerdict, Rule};
use crate::domain::methods::*;
use crate::domain::{CallContext, RpcMessage, RuleError};
use lp_01_privacy_mapper::{PrivacyMapApi, PrivacyMapError};
use serde_json::Value;
use shared_types::ErrorKind;
use std::sync::Arc;
use tracing::{debug, warn};

/// How a field's value is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Any string (hex keys and hashes, channel points).
    Text,
    /// Unsigned 64-bit integer, as a JSON number or a decimal string. The
    /// representation is preserved.
    Uint64,
    /// Embeds identifiers in a form that cannot be mapped (node URIs). The
    /// value is emptied, keeping its JSON type.
    Redacted,
}

/// Which direction of the call a field rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Application → node: pseudonyms are revealed.
    Request,
    /// Node → application: real values are hidden.
    Response,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub method: &'static str,
    pub phase: Phase,
    pub path: &'static str,
    pub kind: FieldKind,
}

const fn hide(method: &'static str, path: &'static str, kind: FieldKind) -> FieldRule {
    FieldRule {
        method,
        phase: Phase::Response,
        path,
        kind,
    }
}

const fn reveal(method: &'static str, path: &'static str, kind: FieldKind) -> FieldRule {
    FieldRule {
        method,
        phase: Phase::Request,
        path,
        kind,
    }
}

/// Fields carrying node identifiers.
///
/// `payment_request` strings are BOLT11 invoices, which embed the payment
/// hash and the node key, so they are hidden whole.
pub static PRIVACY_FIELDS: &[FieldRule] = &[
    hide(GET_INFO, "identity_pubkey", FieldKind::Text),
    hide(GET_INFO, "uris", FieldKind::Redacted),
    hide(ADD_INVOICE, "r_hash", FieldKind::Text),
    hide(ADD_INVOICE, "payment_request", FieldKind::Text),
    hide(LIST_INVOICES, "invoices[].r_hash", FieldKind::Text),
    hide(LIST_INVOICES, "invoices[].payment_request", FieldKind::Text),
    hide(LIST_INVOICES, "invoices[].route_hints[].hop_hints[].node_id", FieldKind::Text),
    hide(LIST_INVOICES, "invoices[].route_hints[].hop_hints[].chan_id", FieldKind::Uint64),
    reveal(LOOKUP_INVOICE, "r_hash_str", FieldKind::Text),
    hide(LOOKUP_INVOICE, "r_hash", FieldKind::Text),
    hide(LOOKUP_INVOICE, "payment_request", FieldKind::Text),
    hide(LOOKUP_INVOICE, "route_hints[].hop_hints[].node_id", FieldKind::Text),
    hide(LOOKUP_INVOICE, "route_hints[].hop_hints[].chan_id", FieldKind::Uint64),
    hide(LIST_PAYMENTS, "payments[].payment_hash", FieldKind::Text),
    hide(LIST_PAYMENTS, "payments[].payment_request", FieldKind::Text),
    hide(LIST_PAYMENTS, "payments[].htlcs[].route.hops[].pub_key", FieldKind::Text),
    hide(LIST_PAYMENTS, "payments[].htlcs[].route.hops[].chan_id", FieldKind::Uint64),
    hide(SEND_PAYMENT_SYNC, "payment_hash", FieldKind::Text),
    hide(SEND_PAYMENT_SYNC, "payment_route.hops[].pub_key", FieldKind::Text),
    hide(SEND_PAYMENT_SYNC, "payment_route.hops[].chan_id", FieldKind::Uint64),
    hide(SEND_PAYMENT_V2, "payment_hash", FieldKind::Text),
    hide(SEND_PAYMENT_V2, "payment_request", FieldKind::Text),
    hide(SEND_PAYMENT_V2, "htlcs[].route.hops[].pub_key", FieldKind::Text),
    hide(SEND_PAYMENT_V2, "htlcs[].route.hops[].chan_id", FieldKind::Uint64),
    reveal(TRACK_PAYMENT_V2, "payment_hash", FieldKind::Text),
    hide(TRACK_PAYMENT_V2, "payment_hash", FieldKind::Text),
    hide(TRACK_PAYMENT_V2, "payment_request", FieldKind::Text),
    hide(TRACK_PAYMENT_V2, "htlcs[].route.hops[].pub_key", FieldKind::Text),
    hide(TRACK_PAYMENT_V2, "htlcs[].route.hops[].chan_id", FieldKind::Uint64),
    hide(LIST_CHANNELS, "channels[].remote_pubkey", FieldKind::Text),
    hide(LIST_CHANNELS, "channels[].channel_point", FieldKind::Text),
    hide(LIST_CHANNELS, "channels[].chan_id", FieldKind::Uint64),
    reveal(GET_CHAN_INFO, "chan_id", FieldKind::Uint64),
    hide(GET_CHAN_INFO, "channel_id", FieldKind::Uint64),
    hide(GET_CHAN_INFO, "chan_point", FieldKind::Text),
    hide(GET_CHAN_INFO, "node1_pub", FieldKind::Text),
    hide(GET_CHAN_INFO, "node2_pub", FieldKind::Text),
    hide(FORWARDING_HISTORY, "forwarding_events[].chan_id_in", FieldKind::Uint64),
    hide(FORWARDING_HISTORY, "forwarding_events[].chan_id_out", FieldKind::Uint64),
];

type LeafFn<'a> = dyn FnMut(&mut Value) -> Result<(), RuleError> + 'a;

/// Apply `leaf` to every value addressed by `segments`.
fn visit(value: &mut Value, segments: &[&str], leaf: &mut LeafFn<'_>) -> Result<(), RuleError> {
    let Some((head, rest)) = segments.split_first() else {
        return leaf(value);
    };
    let (name, fan_out) = match head.strip_suffix("[]") {
        Some(name) => (name, true),
        None => (*head, false),
    };
    let Some(child) = value.get_mut(name) else {
        return Ok(());
    };
    if !fan_out {
        return visit(child, rest, leaf);
    }
    match child {
        Value::Array(items) => items.iter_mut().try_for_each(|item| visit(item, rest, leaf)),
        Value::Null => Ok(()),
        _ => Err(RuleError::malformed(name, "expected an array")),
    }
}

/// Session-scoped pseudonymization of node identifiers.
pub struct PrivacyRule {
    mapper: Arc<dyn PrivacyMapApi>,
    fields: &'static [FieldRule],
}

impl PrivacyRule {
    pub fn new(mapper: Arc<dyn PrivacyMapApi>) -> Self {
        Self::with_fields(mapper, PRIVACY_FIELDS)
    }

    pub fn with_fields(mapper: Arc<dyn PrivacyMapApi>, fields: &'static [FieldRule]) -> Self {
        Self { mapper, fields }
    }

    fn map_text(&self, ctx: &CallContext, phase: Phase, s: &str) -> Result<String, RuleError> {
        Ok(match phase {
            Phase::Request => self.mapper.pseudo_to_real(&ctx.session, s)?,
            Phase::Response => self.mapper.real_to_pseudo(&ctx.session, s)?,
        })
    }

    fn map_u64(&self, ctx: &CallContext, phase: Phase, v: u64) -> Result<u64, RuleError> {
        Ok(match phase {
            Phase::Request => self.mapper.reveal_u64(&ctx.session, v)?,
            Phase::Response => self.mapper.hide_u64(&ctx.session, v)?,
        })
    }

    fn map_leaf(
        &self,
        ctx: &CallContext,
        rule: &FieldRule,
        leaf: &mut Value,
    ) -> Result<(), RuleError> {
        let replacement = match (rule.kind, &*leaf) {
            (_, Value::Null) => None,
            (FieldKind::Redacted, other) => Some(emptied(other)),
            (FieldKind::Text, Value::String(s)) if s.is_empty() => None,
            (FieldKind::Text, Value::String(s)) => {
                Some(Value::String(self.map_text(ctx, rule.phase, s)?))
            }
            (FieldKind::Uint64, Value::Number(n)) => {
                let v = n
                    .as_u64()
                    .ok_or_else(|| RuleError::malformed(rule.path, "not an unsigned integer"))?;
                Some(Value::from(self.map_u64(ctx, rule.phase, v)?))
            }
            (FieldKind::Uint64, Value::String(s)) => {
                let v: u64 = s
                    .parse()
                    .map_err(|_| RuleError::malformed(rule.path, "not a decimal integer"))?;
                Some(Value::String(self.map_u64(ctx, rule.phase, v)?.to_string()))
            }
            (kind, other) => {
                return Err(RuleError::malformed(
                    rule.path,
                    format!("expected {kind:?}, found {}", json_type(other)),
                ))
            }
        };
        if let Some(value) = replacement {
            *leaf = value;
        }
        Ok(())
    }

    fn rewrite(
        &self,
        ctx: &CallContext,
        message: &mut RpcMessage,
        phase: Phase,
    ) -> Result<usize, RuleError> {
        let mut rewritten = 0;
        for rule in self
            .fields
            .iter()
            .filter(|f| f.phase == phase && f.method == message.method)
        {
            let segments: Vec<&str> = rule.path.split('.').collect();
            let mut map = |leaf: &mut Value| self.map_leaf(ctx, rule, leaf);
            visit(&mut message.payload, &segments, &mut map)?;
            rewritten += 1;
        }
        Ok(rewritten)
    }
}

fn emptied(value: &Value) -> Value {
    match value {
        Value::Array(_) => Value::Array(Vec::new()),
        Value::Object(_) => Value::Object(Default::default()),
        Value::String(_) => Value::String(String::new()),
        Value::Number(_) => Value::from(0u64),
        Value::Bool(_) => Value::Bool(false),
        Value::Null => Value::Null,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Rule for PrivacyRule {
    fn name(&self) -> &'static str {
        "privacy"
    }

    fn handle_request(
        &self,
        ctx: &CallContext,
        mut request: RpcMessage,
    ) -> Result<RequestVerdict, RuleError> {
        match self.rewrite(ctx, &mut request, Phase::Request) {
            Ok(fields) => {
                debug!(call = %ctx.call_id, method = %ctx.method, fields, "Request revealed");
                Ok(RequestVerdict::Continue(request))
            }
            Err(RuleError::Mapper(PrivacyMapError::MappingNotFound { .. })) => {
                warn!(call = %ctx.call_id, method = %ctx.method, "Request carries unknown pseudonym");
                Ok(RequestVerdict::Decline(Decline::new(
                    ErrorKind::MappingNotFound,
                    "request carries a value this session was never given",
                )))
            }
            Err(e) => Err(e),
        }
    }

    fn handle_response(
        &self,
        ctx: &CallContext,
        mut response: RpcMessage,
    ) -> Result<RpcMessage, RuleError> {
        let fields = self.rewrite(ctx, &mut response, Phase::Response)?;
        debug!(call = %ctx.call_id, method = %ctx.method, fields, "Response hidden");
        Ok(response)
    }

    fn abort(&self, _ctx: &CallContext) {}
}
