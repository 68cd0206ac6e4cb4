//! Ports for the privacy mapper.
//!
//! The only driven dependency is `shared_types::KeyValueStore`.

pub mod inbound;

pub use inbound::PrivacyMapApi;
