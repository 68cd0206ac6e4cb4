//! # Domain Layer - Privacy Mapper
//!
//! ## Components
//!
//! - `codec`: fixed-width decimal encoding of `u64` values
//! - `pseudonym`: shape-preserving random pseudonym generation
//! - `keys`: storage layout of pair records
//! - `config`: `MapperConfig`
//! - `errors`: `PrivacyMapError`

pub mod codec;
pub mod config;
pub mod errors;
pub mod keys;
pub mod pseudonym;

pub use codec::{decode_u64, encode_u64, CodecError, ENCODED_U64_WIDTH};
pub use config::{MapperConfig, MapperConfigError};
pub use errors::PrivacyMapError;
pub use keys::Direction;
pub use pseudonym::PseudonymShape;
