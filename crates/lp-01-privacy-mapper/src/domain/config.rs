//! Privacy mapper configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default bound on pseudonym allocation retries.
pub const DEFAULT_MAX_ALLOCATION_ATTEMPTS: u32 = 64;

/// Privacy mapper configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// How many random candidates to draw before giving up on a namespace
    /// whose pseudonym space is (nearly) full.
    pub max_allocation_attempts: u32,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            max_allocation_attempts: DEFAULT_MAX_ALLOCATION_ATTEMPTS,
        }
    }
}

impl MapperConfig {
    pub fn validate(&self) -> Result<(), MapperConfigError> {
        if self.max_allocation_attempts == 0 {
            return Err(MapperConfigError::ZeroAttempts);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapperConfigError {
    #[error("max_allocation_attempts cannot be 0")]
    ZeroAttempts,
}
