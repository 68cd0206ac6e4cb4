//! # Interceptor Pipeline
//!
//! Runs every call of a bound session through its rules:
//!
//! ```text
//! request ──→ privacy ──→ accounts ──→ [node] ──→ accounts ──→ privacy ──→ response
//! ```
//!
//! - A request-stage decline stops the call: nothing is forwarded and no
//!   response rule runs. Rules that already accepted are aborted.
//! - A forward failure, timeout, or the call future being dropped aborts
//!   every rule, in reverse order.
//! - A response-stage failure drops the node's answer and returns an error.
//!   Nothing is aborted: the node has already acted on the request.

use crate::domain::methods::is_spend;
use crate::domain::{
    CallContext, CallState, CallTracker, PipelineConfig, PipelineError, RpcMessage,
};
use crate::ports::NodeForwarder;
use crate::rules::{AccountRule, PrivacyRule, RequestVerdict, Rule, RuleKind};
use crate::session::{SessionBinding, SessionRegistry};
use shared_types::SessionId;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

/// Aborts the accepted rules unless disarmed. Dropping the call future while
/// it awaits the node runs the compensation too.
struct AbortGuard<'a> {
    ctx: &'a CallContext,
    rules: &'a [Arc<dyn Rule>],
    armed: bool,
}

impl<'a> AbortGuard<'a> {
    fn new(ctx: &'a CallContext, rules: &'a [Arc<dyn Rule>]) -> Self {
        Self {
            ctx,
            rules,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AbortGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!(call = %self.ctx.call_id, "Call did not complete, aborting rules");
            compensate(self.ctx, self.rules);
        }
    }
}

fn compensate(ctx: &CallContext, accepted: &[Arc<dyn Rule>]) {
    for rule in accepted.iter().rev() {
        rule.abort(ctx);
    }
}

pub struct InterceptorPipeline {
    registry: Arc<SessionRegistry>,
    privacy: Arc<PrivacyRule>,
    accounts: Arc<AccountRule>,
    forwarder: Arc<dyn NodeForwarder>,
    config: PipelineConfig,
}

impl InterceptorPipeline {
    pub fn new(
        registry: Arc<SessionRegistry>,
        privacy: Arc<PrivacyRule>,
        accounts: Arc<AccountRule>,
        forwarder: Arc<dyn NodeForwarder>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            registry,
            privacy,
            accounts,
            forwarder,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Rules for one call. Spends always meet the account rule, which
    /// declines them when no account is bound.
    fn rules_for(&self, binding: &SessionBinding, method: &str) -> Vec<Arc<dyn Rule>> {
        let mut rules: Vec<Arc<dyn Rule>> = binding
            .rules
            .iter()
            .map(|kind| -> Arc<dyn Rule> {
                match kind {
                    RuleKind::PrivacyMapping => self.privacy.clone(),
                    RuleKind::AccountEnforcement => self.accounts.clone(),
                }
            })
            .collect();
        if is_spend(method) && !binding.rules.contains(&RuleKind::AccountEnforcement) {
            rules.push(self.accounts.clone());
        }
        rules
    }

    /// Run one call of `session` through its rules and the node.
    pub async fn intercept(
        &self,
        session: &SessionId,
        request: RpcMessage,
    ) -> Result<RpcMessage, PipelineError> {
        let binding = self
            .registry
            .binding(session)
            .ok_or_else(|| PipelineError::UnknownSession(session.clone()))?;
        let ctx = CallContext::new(session.clone(), binding.account, request.method.clone());
        let rules = self.rules_for(&binding, &ctx.method);

        let span = info_span!(
            "intercept",
            call = %ctx.call_id,
            method = %ctx.method,
            session = %ctx.session,
        );
        self.run(&ctx, &rules, request).instrument(span).await
    }

    async fn run(
        &self,
        ctx: &CallContext,
        rules: &[Arc<dyn Rule>],
        request: RpcMessage,
    ) -> Result<RpcMessage, PipelineError> {
        let mut tracker = CallTracker::new();
        tracker.advance(CallState::RequestRewrite)?;

        let mut message = request;
        for (index, rule) in rules.iter().enumerate() {
            match rule.handle_request(ctx, message) {
                Ok(RequestVerdict::Continue(next)) => message = next,
                Ok(RequestVerdict::Decline(decline)) => {
                    compensate(ctx, &rules[..index]);
                    tracker.advance(CallState::Aborted)?;
                    warn!(rule = rule.name(), reason = %decline.reason, "Call declined");
                    return Err(PipelineError::Declined {
                        rule: rule.name(),
                        kind: decline.kind,
                        reason: decline.reason,
                    });
                }
                Err(source) => {
                    compensate(ctx, &rules[..index]);
                    tracker.advance(CallState::Aborted)?;
                    error!(rule = rule.name(), error = %source, "Request rule failed");
                    return Err(PipelineError::RequestRule {
                        rule: rule.name(),
                        source,
                    });
                }
            }
        }

        tracker.advance(CallState::Forwarded)?;
        let guard = AbortGuard::new(ctx, rules);
        let forwarded = tokio::time::timeout(
            self.config.forward_timeout(),
            self.forwarder.forward(ctx, message),
        )
        .await;
        let response = match forwarded {
            Ok(Ok(response)) => {
                guard.disarm();
                response
            }
            Ok(Err(e)) => {
                drop(guard);
                tracker.advance(CallState::Aborted)?;
                warn!(error = %e, "Forward failed");
                return Err(e.into());
            }
            Err(_) => {
                drop(guard);
                tracker.advance(CallState::Aborted)?;
                warn!(
                    timeout_ms = self.config.forward_timeout_ms,
                    "Forward timed out"
                );
                return Err(PipelineError::Timeout {
                    after_ms: self.config.forward_timeout_ms,
                });
            }
        };

        tracker.advance(CallState::ResponseRewrite)?;
        let mut message = response;
        for rule in rules.iter().rev() {
            message = match rule.handle_response(ctx, message) {
                Ok(next) => next,
                Err(source) => {
                    tracker.advance(CallState::Aborted)?;
                    error!(rule = rule.name(), error = %source, "Response dropped");
                    return Err(PipelineError::ResponseRule {
                        rule: rule.name(),
                        source,
                    });
                }
            };
        }

        tracker.advance(CallState::Returned)?;
        info!("Call returned");
        Ok(message)
    }
}
