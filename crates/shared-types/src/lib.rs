//! # Shared Types Crate
//!
//! Primitives used by every subsystem of the session proxy: identifiers,
//! the error taxonomy, the key-value storage port and the time source.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: cross-crate identifiers live here, so the
//!   ledger, the mapper and the pipeline agree on encodings.
//! - **Injected Storage**: no subsystem owns a global store. Every service is
//!   constructed with an `Arc<dyn KeyValueStore>` handed in by the runtime.

pub mod entities;
pub mod errors;
pub mod locks;
pub mod store;
pub mod time;

pub use entities::*;
pub use errors::*;
pub use locks::{KeyGuard, KeyedLocks};
pub use store::{BatchOperation, InMemoryKVStore, KeyValueStore};
pub use time::{SystemTimeSource, TimeSource};

#[cfg(any(test, feature = "test-utils"))]
pub use store::FailingKVStore;
#[cfg(any(test, feature = "test-utils"))]
pub use time::MockTimeSource;
