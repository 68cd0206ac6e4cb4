//! # Domain Layer - Interceptor
//!
//! ## Components
//!
//! - `message`: `RpcMessage`, `CallContext`, JSON field helpers
//! - `methods`: node RPC paths the rules act on
//! - `state`: per-call state machine
//! - `config`: `PipelineConfig`
//! - `errors`: `RuleError`, `ForwardError`, `PipelineError`

pub mod config;
pub mod errors;
pub mod message;
pub mod methods;
pub mod state;

pub use config::{PipelineConfig, PipelineConfigError};
pub use errors::{ForwardError, PipelineError, RuleError};
pub use message::{CallContext, CallId, RpcMessage};
pub use state::{CallState, CallTracker, IllegalTransition};
