//! # Error Types
//!
//! Defines the error taxonomy shared across subsystems.

use thiserror::Error;

/// Coarse error classification every subsystem error maps onto.
///
/// The control plane turns these into RPC error codes and the interceptor
/// pipeline uses them to decide between declining a call and failing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input (bad encoding, out-of-range values).
    Validation,
    /// A non-empty account label is already taken.
    DuplicateLabel,
    /// The referenced account or record does not exist.
    NotFound,
    /// The spending limit would be exceeded.
    InsufficientBalance,
    /// Reverse lookup of a pseudonym that was never issued for the session.
    MappingNotFound,
    /// The persistence layer failed.
    InternalStorage,
}

/// Errors raised by `KeyValueStore` implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Underlying I/O failure.
    #[error("Storage I/O error: {message}")]
    Io { message: String },

    /// Stored bytes could not be decoded.
    #[error("Corrupted record under key {key}: {message}")]
    Corruption { key: String, message: String },
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InternalStorage
    }
}
