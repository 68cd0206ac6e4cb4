//! # Adapters
//!
//! Concrete implementations of the subsystems' outbound ports.
//!
//! | Port | Adapter |
//! |------|---------|
//! | `KeyValueStore` | `InMemoryKVStore`, `RocksDbStore` (feature `rocksdb`) |
//! | `CredentialIssuer` | `HmacCredentialIssuer` |
//! | `NodeForwarder` | `DisconnectedForwarder` |

pub mod credentials;
pub mod forwarder;
pub mod storage;

pub use credentials::{session_id_for, HmacCredentialIssuer, CREDENTIAL_LEN};
pub use forwarder::DisconnectedForwarder;
