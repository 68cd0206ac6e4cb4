//! # Domain Layer - Control Plane
//!
//! - `types`: request/response messages and the operator account view
//! - `error`: `ApiError` and its stable codes

pub mod error;
pub mod types;

pub use error::{codes, ApiError, ApiResult};
pub use types::*;
