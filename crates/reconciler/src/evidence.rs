//! Normalized submission evidence

use proctor_types::ViolationStats;
use serde::{Deserialize, Serialize};

/// Cheating evidence attached to an exam submission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionEvidence {
    pub tab_switch_count: u32,
    pub face_detection_violations: u32,
    pub face_detection_stats: ViolationStats,
}

impl SubmissionEvidence {
    /// `faceDetectionViolations == totalViolations == sum(violationTypes)`
    pub fn is_consistent(&self) -> bool {
        self.face_detection_stats.is_consistent()
            && self.face_detection_violations == self.face_detection_stats.total_violations
    }

    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_total(
            self.face_detection_violations
                .saturating_add(self.tab_switch_count),
        )
    }
}

/// Coarse cheating risk shown to reviewers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Based on violations plus tab switches
    pub fn from_total(total: u32) -> Self {
        if total >= 10 {
            RiskLevel::High
        } else if total >= 5 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}
