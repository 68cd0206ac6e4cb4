//! # Storage Adapters
//!
//! Enable the `rocksdb` feature for the persistent backend:
//!
//! ```toml
//! proxy-runtime = { path = "...", features = ["rocksdb"] }
//! ```
//!
//! Without it only `InMemoryKVStore` is available and state is lost on exit.

#[cfg(feature = "rocksdb")]
pub mod rocksdb_adapter;

#[cfg(feature = "rocksdb")]
pub use rocksdb_adapter::{RocksDbConfig, RocksDbStore};

pub use shared_types::InMemoryKVStore;
