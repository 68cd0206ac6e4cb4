//! # Core Domain Entities
//!
//! Identifiers shared by every subsystem of the proxy.
//!
//! ## Clusters
//!
//! - **Lightning**: `Hash` (payment hash), `MilliSatoshi`
//! - **Sessions**: `SessionId`
//! - **Accounts**: `AccountId`
//! - **Time**: `Timestamp`

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 32-byte payment hash.
pub type Hash = [u8; 32];

/// Amounts are tracked in milli-satoshis throughout the core.
pub type MilliSatoshi = u64;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Number of bytes in an account identifier.
pub const ACCOUNT_ID_LEN: usize = 8;

// =============================================================================
// SESSION IDENTITY
// =============================================================================

/// Identity of a bound credential.
///
/// Usually the SHA-256 of the credential bytes, but the core treats it as an
/// opaque byte string.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SessionId(Vec<u8>);

impl SessionId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse a hex-encoded session id.
    pub fn from_hex(s: &str) -> Result<Self, IdParseError> {
        let bytes = hex::decode(s).map_err(|e| IdParseError::InvalidHex(e.to_string()))?;
        if bytes.is_empty() {
            return Err(IdParseError::Empty);
        }
        Ok(Self(bytes))
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.to_hex())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for SessionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// ACCOUNT IDENTITY
// =============================================================================

/// Identifier of an off-chain balance account.
///
/// Eight random bytes, rendered as 16 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AccountId(pub [u8; ACCOUNT_ID_LEN]);

impl AccountId {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; ACCOUNT_ID_LEN] {
        &self.0
    }

    /// Build an id from a byte slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdParseError> {
        let raw: [u8; ACCOUNT_ID_LEN] =
            bytes.try_into().map_err(|_| IdParseError::InvalidLength {
                expected: ACCOUNT_ID_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(raw))
    }
}

impl FromStr for AccountId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(IdParseError::Empty);
        }
        let bytes = hex::decode(s).map_err(|e| IdParseError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.to_hex())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors parsing hex identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    #[error("identifier is empty")]
    Empty,

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Parse a hex payment hash.
pub fn parse_hash(s: &str) -> Result<Hash, IdParseError> {
    let bytes = hex::decode(s).map_err(|e| IdParseError::InvalidHex(e.to_string()))?;
    bytes.as_slice().try_into().map_err(|_| IdParseError::InvalidLength {
        expected: 32,
        actual: bytes.len(),
    })
}
