//! # Call State Machine
//!
//! ```text
//! [RECEIVED] ──→ [REQUEST_REWRITE] ──→ [FORWARDED] ──→ [RESPONSE_REWRITE] ──→ [RETURNED]
//!                       │                   │                  │
//!                       └───────────────────┴──────────────────┴──→ [ABORTED]
//! ```
//!
//! `Forwarded → Aborted` covers forward failure, timeout and cancellation.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallState {
    Received,
    RequestRewrite,
    Forwarded,
    ResponseRewrite,
    Returned,
    Aborted,
}

impl CallState {
    pub fn can_transition_to(self, next: CallState) -> bool {
        use CallState::*;
        matches!(
            (self, next),
            (Received, RequestRewrite)
                | (RequestRewrite, Forwarded)
                | (RequestRewrite, Aborted)
                | (Forwarded, ResponseRewrite)
                | (Forwarded, Aborted)
                | (ResponseRewrite, Returned)
                | (ResponseRewrite, Aborted)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CallState::Returned | CallState::Aborted)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallState::Received => "RECEIVED",
            CallState::RequestRewrite => "REQUEST_REWRITE",
            CallState::Forwarded => "FORWARDED",
            CallState::ResponseRewrite => "RESPONSE_REWRITE",
            CallState::Returned => "RETURNED",
            CallState::Aborted => "ABORTED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Illegal call transition {from} -> {to}")]
pub struct IllegalTransition {
    pub from: CallState,
    pub to: CallState,
}

/// Tracks the state of one call and rejects illegal transitions.
#[derive(Debug)]
pub struct CallTracker {
    state: CallState,
}

impl CallTracker {
    pub fn new() -> Self {
        Self {
            state: CallState::Received,
        }
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn advance(&mut self, next: CallState) -> Result<(), IllegalTransition> {
        if !self.state.can_transition_to(next) {
            return Err(IllegalTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!(from = %self.state, to = %next, "Call transition");
        self.state = next;
        Ok(())
    }
}

impl Default for CallTracker {
    fn default() -> Self {
        Self::new()
    }
}
