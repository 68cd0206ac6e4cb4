//! # Proxy Runtime Library
//!
//! Composition root of the session proxy. The binary in `main.rs` loads the
//! configuration, installs logging and waits for a shutdown signal; this
//! library holds everything it wires so it can be tested.
//!
//! ## Modules
//!
//! - `container/` - `ProxyConfig` and the `ProxyServices` container
//! - `adapters/` - storage, credential and node-connection adapters
//! - `logging` - tracing subscriber setup

pub mod adapters;
pub mod container;
pub mod logging;

pub use container::{ProxyConfig, ProxyServices};
