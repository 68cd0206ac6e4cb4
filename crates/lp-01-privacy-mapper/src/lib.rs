//! # Privacy Mapper Subsystem
//!
//! **Subsystem ID:** 1
//!
//! ## Purpose
//!
//! Substitutes real node identifiers (payment hashes, node keys, amounts)
//! with session-scoped pseudonyms and maps them back. Third-party
//! applications only ever see pseudonyms; the node only ever sees real
//! values.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Bijection per session | `service.rs` - exclusive section + `allocate()` uniqueness check |
//! | Pairs immutable for the session's life | `service.rs` - existing pair returned, never overwritten |
//! | Unknown pseudonyms fail | `service.rs` - `pseudo_to_real()` returns `MappingNotFound` |
//! | Unpredictable pseudonyms | `domain/pseudonym.rs` - OS CSPRNG |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  service.rs        - PrivacyMapper over an injected KV store    │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - PrivacyMapApi trait                        │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/codec.rs     - fixed-width u64 encoding                 │
//! │  domain/pseudonym.rs - shape-preserving generation              │
//! │  domain/keys.rs      - storage layout                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mapper = PrivacyMapper::new(store, MapperConfig::default());
//! let pseudo = mapper.real_to_pseudo(&session, &payment_hash_hex)?;
//! assert_eq!(mapper.pseudo_to_real(&session, &pseudo)?, payment_hash_hex);
//! ```

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::*;
pub use ports::PrivacyMapApi;
pub use service::PrivacyMapper;
