//! Pipeline configuration with validation.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Upper bound on one forward to the node, in milliseconds.
    pub forward_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            forward_timeout_ms: 60_000,
        }
    }
}

impl PipelineConfig {
    pub fn forward_timeout(&self) -> Duration {
        Duration::from_millis(self.forward_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), PipelineConfigError> {
        if self.forward_timeout_ms == 0 {
            return Err(PipelineConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineConfigError {
    #[error("forward_timeout_ms cannot be 0")]
    ZeroTimeout,
}
