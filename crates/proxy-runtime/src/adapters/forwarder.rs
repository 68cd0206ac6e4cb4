//! Forwarder used when no node connection is configured.

use async_trait::async_trait;
use lp_03_interceptor::{CallContext, ForwardError, NodeForwarder, RpcMessage};
use tracing::warn;

/// Fails every forward. Calls still run their request rules, so
/// reservations made for them are released through the abort path.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisconnectedForwarder;

#[async_trait]
impl NodeForwarder for DisconnectedForwarder {
    async fn forward(
        &self,
        ctx: &CallContext,
        _request: RpcMessage,
    ) -> Result<RpcMessage, ForwardError> {
        warn!(call = %ctx.call_id, method = %ctx.method, "No node connection");
        Err(ForwardError::Unavailable("no node connection configured".into()))
    }
}
