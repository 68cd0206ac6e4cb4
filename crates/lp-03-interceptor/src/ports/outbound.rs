//! Outbound (Driven) ports for the interceptor.

use crate::domain::{CallContext, ForwardError, RpcMessage};
use async_trait::async_trait;

/// Connection to the real node.
///
/// The pipeline holds no ledger or mapper lock while awaiting `forward`.
#[async_trait]
pub trait NodeForwarder: Send + Sync {
    async fn forward(
        &self,
        ctx: &CallContext,
        request: RpcMessage,
    ) -> Result<RpcMessage, ForwardError>;
}

#[cfg(any(test, feature = "test-utils"))]
pub use mock::ScriptedForwarder;

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    type Responder = dyn Fn(&RpcMessage) -> Result<RpcMessage, ForwardError> + Send + Sync;

    /// Forwarder answering from a closure, optionally after a delay.
    /// Records every request it receives.
    pub struct ScriptedForwarder {
        responder: Box<Responder>,
        delay: Option<Duration>,
        calls: AtomicUsize,
        received: Mutex<Vec<RpcMessage>>,
    }

    impl ScriptedForwarder {
        pub fn new(
            responder: impl Fn(&RpcMessage) -> Result<RpcMessage, ForwardError>
                + Send
                + Sync
                + 'static,
        ) -> Self {
            Self {
                responder: Box::new(responder),
                delay: None,
                calls: AtomicUsize::new(0),
                received: Mutex::new(Vec::new()),
            }
        }

        /// Answers every call with `payload` under the request's method.
        pub fn replying(payload: serde_json::Value) -> Self {
            Self::new(move |req| Ok(RpcMessage::new(req.method.clone(), payload.clone())))
        }

        /// Fails every call.
        pub fn unavailable() -> Self {
            Self::new(|_| Err(ForwardError::Unavailable("connection refused".into())))
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn received(&self) -> Vec<RpcMessage> {
            self.received.lock().clone()
        }
    }

    #[async_trait]
    impl NodeForwarder for ScriptedForwarder {
        async fn forward(
            &self,
            _ctx: &CallContext,
            request: RpcMessage,
        ) -> Result<RpcMessage, ForwardError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.received.lock().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            (self.responder)(&request)
        }
    }
}
