//! Proctoring Shared Types
//!
//! Types shared by every stage of the integrity engine:
//! - Violation kinds and raw per-frame signals
//! - Aggregated violation statistics
//! - Exam identifiers and their side-store keys
//! - Injected clock

mod clock;
mod stats;

pub use clock::{Clock, ManualClock, SystemClock};
pub use stats::{ViolationBreakdown, ViolationStats};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cheating-relevant event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViolationType {
    LookingLeft,
    LookingRight,
    FaceNotDetected,
    MultipleFaces,
}

impl ViolationType {
    /// All violation kinds, in breakdown order
    pub const ALL: [ViolationType; 4] = [
        ViolationType::LookingLeft,
        ViolationType::LookingRight,
        ViolationType::FaceNotDetected,
        ViolationType::MultipleFaces,
    ];

    /// Event name used by the proctoring audit log
    pub fn audit_name(&self) -> &'static str {
        match self {
            ViolationType::LookingLeft => "looking_left",
            ViolationType::LookingRight => "looking_right",
            ViolationType::FaceNotDetected => "face_not_detected",
            ViolationType::MultipleFaces => "multiple_faces",
        }
    }

    /// Human readable reason shown to the candidate
    pub fn reason(&self) -> &'static str {
        match self {
            ViolationType::LookingLeft => "You're looking left",
            ViolationType::LookingRight => "You're looking right",
            ViolationType::FaceNotDetected => "Face not visible",
            ViolationType::MultipleFaces => "Multiple faces detected",
        }
    }

    /// Whether this kind is always a hard violation, never a warning
    pub fn always_hard(&self) -> bool {
        matches!(self, ViolationType::FaceNotDetected | ViolationType::MultipleFaces)
    }
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.audit_name())
    }
}

/// Raw classification of a single detection frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RawSignal {
    #[default]
    Ok,
    Violation(ViolationType),
}

impl RawSignal {
    pub fn violation(&self) -> Option<ViolationType> {
        match self {
            RawSignal::Ok => None,
            RawSignal::Violation(kind) => Some(*kind),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, RawSignal::Ok)
    }
}

/// Exam identifier; owns the naming of every durable side-store key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExamId(String);

impl ExamId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key holding the confirmed violation total (integer string)
    pub fn violations_key(&self) -> String {
        format!("exam_{}_violations", self.0)
    }

    /// Key holding the JSON-encoded `ViolationStats`
    pub fn stats_key(&self) -> String {
        format!("exam_{}_stats", self.0)
    }

    /// Key holding the tab switch count (integer string)
    pub fn tab_switches_key(&self) -> String {
        format!("exam_{}_tab_switches", self.0)
    }
}

impl fmt::Display for ExamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
