//! Privacy mapper error types.

use super::codec::CodecError;
use shared_types::{ErrorKind, SessionId, StoreError};
use thiserror::Error;

/// Privacy mapper error type.
///
/// Messages never carry real or pseudo values, only the session they belong
/// to, so errors can be logged without leaking mapped data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrivacyMapError {
    /// Input rejected before touching the store.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Numeric input/output did not follow the codec format.
    #[error("Invalid numeric encoding: {0}")]
    Codec(#[from] CodecError),

    /// Reverse lookup of a pseudonym that was never issued for the session.
    #[error("No mapping for pseudonym in session {session}")]
    MappingNotFound { session: SessionId },

    /// Every candidate pseudonym collided with an existing one.
    #[error("Could not allocate a unique pseudonym after {attempts} attempts")]
    PseudonymSpaceExhausted { attempts: u32 },

    /// Persistence layer failure.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl PrivacyMapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) | Self::Codec(_) => ErrorKind::Validation,
            Self::MappingNotFound { .. } => ErrorKind::MappingNotFound,
            Self::PseudonymSpaceExhausted { .. } | Self::Storage(_) => ErrorKind::InternalStorage,
        }
    }
}
