//! Control-plane error type with stable numeric codes.
//!
//! Every ledger and mapper error lands on exactly one code through its
//! [`ErrorKind`], so operators can match on codes across releases.

use lp_01_privacy_mapper::PrivacyMapError;
use lp_02_accounts::AccountError;
use serde::{Deserialize, Serialize};
use shared_types::{ErrorKind, IdParseError};
use std::fmt;

/// Error codes, one per [`ErrorKind`].
pub mod codes {
    pub const VALIDATION: i32 = -32602;
    pub const INTERNAL_STORAGE: i32 = -32603;

    pub const NOT_FOUND: i32 = -32001;
    pub const DUPLICATE_LABEL: i32 = -32040;
    pub const INSUFFICIENT_BALANCE: i32 = -32041;
    pub const MAPPING_NOT_FOUND: i32 = -32042;
}

/// Error returned by every control-plane operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: i32,
    pub message: String,
}

impl ApiError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(code_for(kind), message)
    }

    pub fn invalid_params(details: impl Into<String>) -> Self {
        Self::new(
            codes::VALIDATION,
            format!("Invalid params: {}", details.into()),
        )
    }

    /// Kind behind the code, if the code is one of ours.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self.code {
            codes::VALIDATION => Some(ErrorKind::Validation),
            codes::DUPLICATE_LABEL => Some(ErrorKind::DuplicateLabel),
            codes::NOT_FOUND => Some(ErrorKind::NotFound),
            codes::INSUFFICIENT_BALANCE => Some(ErrorKind::InsufficientBalance),
            codes::MAPPING_NOT_FOUND => Some(ErrorKind::MappingNotFound),
            codes::INTERNAL_STORAGE => Some(ErrorKind::InternalStorage),
            _ => None,
        }
    }
}

pub fn code_for(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Validation => codes::VALIDATION,
        ErrorKind::DuplicateLabel => codes::DUPLICATE_LABEL,
        ErrorKind::NotFound => codes::NOT_FOUND,
        ErrorKind::InsufficientBalance => codes::INSUFFICIENT_BALANCE,
        ErrorKind::MappingNotFound => codes::MAPPING_NOT_FOUND,
        ErrorKind::InternalStorage => codes::INTERNAL_STORAGE,
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        Self::from_kind(e.kind(), e.to_string())
    }
}

impl From<PrivacyMapError> for ApiError {
    fn from(e: PrivacyMapError) -> Self {
        Self::from_kind(e.kind(), e.to_string())
    }
}

impl From<IdParseError> for ApiError {
    fn from(e: IdParseError) -> Self {
        Self::invalid_params(e.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
