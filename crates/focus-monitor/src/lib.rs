//! Focus Monitor
//!
//! Detects loss of tab/window focus independently of the camera,
//! throttles rapid toggles, and escalates from warnings to forced
//! termination.

mod monitor;

pub use monitor::{Escalation, FocusMonitor, FocusOutcome, FocusState, TabSwitchState};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Focus monitor errors
#[derive(Debug, Error)]
pub enum FocusError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Verification failed for {0}")]
    Verification(String),
}

/// Focus monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Minimum time between two accepted transitions (milliseconds)
    pub throttle_ms: i64,
    /// Tab switches that force termination
    pub hard_limit: u32,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            throttle_ms: 1000,
            hard_limit: 3,
        }
    }
}

impl FocusConfig {
    pub fn validate(&self) -> Result<(), FocusError> {
        if self.hard_limit == 0 {
            return Err(FocusError::Config("hard_limit must be at least 1".into()));
        }
        if self.throttle_ms < 0 {
            return Err(FocusError::Config("throttle_ms must not be negative".into()));
        }
        Ok(())
    }
}
