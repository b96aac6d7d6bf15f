//! Frame analysis results and camera status

use crate::{Classification, Confirmation};
use proctor_types::{RawSignal, ViolationType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status surfaced to the exam UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CameraStatus {
    #[default]
    Ok,
    Cheating(ViolationType),
    /// Permission denied or detector failure; the exam continues
    Unavailable,
}

impl CameraStatus {
    pub fn from_signal(signal: RawSignal) -> Self {
        match signal {
            RawSignal::Ok => CameraStatus::Ok,
            RawSignal::Violation(kind) => CameraStatus::Cheating(kind),
        }
    }
}

impl fmt::Display for CameraStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraStatus::Ok => f.write_str("ok"),
            CameraStatus::Cheating(kind) => write!(f, "Cheating Detected: {}", kind.reason()),
            CameraStatus::Unavailable => f.write_str("Camera unavailable"),
        }
    }
}

/// Outcome of analyzing one detection frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameAnalysis {
    pub classification: Classification,
    /// Present only when this frame confirmed an event
    pub confirmation: Option<Confirmation>,
    pub status: CameraStatus,
}

impl FrameAnalysis {
    pub fn is_confirmed_violation(&self) -> bool {
        self.confirmation.map_or(false, |c| !c.warning)
    }
}
