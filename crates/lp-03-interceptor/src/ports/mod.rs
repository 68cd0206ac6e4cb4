//! Ports for the interceptor.
//!
//! The pipeline itself is the driving side; the only driven dependency
//! besides the ledger and the mapper is the node connection.

pub mod outbound;

pub use outbound::NodeForwarder;

#[cfg(any(test, feature = "test-utils"))]
pub use outbound::ScriptedForwarder;
