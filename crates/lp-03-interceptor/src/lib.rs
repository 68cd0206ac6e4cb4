//! # RPC Interceptor Subsystem
//!
//! **Subsystem ID:** 3
//!
//! ## Purpose
//!
//! Sits between an application holding a restricted credential and the
//! node. Every call of a bound session passes through the session's rules
//! before it is forwarded and again before the answer is returned.
//!
//! ## Call Flow
//!
//! ```text
//!               ┌─────────────── InterceptorPipeline ───────────────┐
//! application ──┤ privacy.request → accounts.request → NodeForwarder ├──→ node
//!               │                                         │          │
//! application ←─┤ privacy.response ← accounts.response ←──┘          │
//!               └─────────────────────────────────────────────────────┘
//!
//! RECEIVED → REQUEST_REWRITE → FORWARDED → RESPONSE_REWRITE → RETURNED
//!                  │               │              │
//!                  └───────────────┴──────────────┴──→ ABORTED
//! ```
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Declined calls never reach the node | `service.rs` - returns before forwarding |
//! | Every reservation is settled, failed or kept in flight | `service.rs` - `AbortGuard` on error, timeout and cancellation |
//! | Unrewritable responses are never returned raw | `service.rs` - response rule errors drop the answer |
//! | Only real values reach the node, only pseudonyms reach the application | `rules/privacy.rs` - field table |
//! | Calls follow the state machine | `domain/state.rs` - `CallTracker` |

pub mod domain;
pub mod ports;
pub mod rules;
pub mod service;
pub mod session;

pub use domain::*;
pub use ports::NodeForwarder;
pub use rules::{AccountRule, Decline, PrivacyRule, RequestVerdict, Rule, RuleKind};
pub use service::InterceptorPipeline;
pub use session::{SessionBinding, SessionRegistry};

#[cfg(any(test, feature = "test-utils"))]
pub use ports::ScriptedForwarder;
