//! Face monitor configuration

use crate::MonitorError;
use serde::{Deserialize, Serialize};

/// Face monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Max eye-to-ear horizontal gap (normalized) that still counts as turned away
    pub gaze_threshold: f64,

    /// Identical consecutive signals required before confirming
    pub consecutive_threshold: u32,

    /// Minimum time between two confirmations (milliseconds)
    pub throttle_ms: i64,

    /// Looking left is only a warning while the right eye is still past this x
    pub left_warning_right_eye_x: f64,

    /// Looking right is only a warning while the left eye is still before this x
    pub right_warning_left_eye_x: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            gaze_threshold: 0.05,
            consecutive_threshold: 3,
            throttle_ms: 2000,
            left_warning_right_eye_x: 0.3,
            right_warning_left_eye_x: 0.7,
        }
    }
}

impl MonitorConfig {
    /// More sensitive detection (fewer repeats, shorter throttle)
    pub fn strict() -> Self {
        Self {
            consecutive_threshold: 2,
            throttle_ms: 1500,
            ..Default::default()
        }
    }

    /// Less sensitive detection
    pub fn lenient() -> Self {
        Self {
            gaze_threshold: 0.025,
            consecutive_threshold: 5,
            throttle_ms: 3000,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.consecutive_threshold == 0 {
            return Err(MonitorError::Config(
                "consecutive_threshold must be at least 1".into(),
            ));
        }
        if self.throttle_ms < 0 {
            return Err(MonitorError::Config("throttle_ms must not be negative".into()));
        }
        for (name, value) in [
            ("gaze_threshold", self.gaze_threshold),
            ("left_warning_right_eye_x", self.left_warning_right_eye_x),
            ("right_warning_left_eye_x", self.right_warning_left_eye_x),
        ] {
            if !value.is_finite() {
                return Err(MonitorError::Config(format!("{} must be finite", name)));
            }
        }
        Ok(())
    }
}
