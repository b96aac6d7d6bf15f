//! Outbound surfaces: UI notices, audit events, and the submission client

use crate::SubmitError;
use proctor_types::ExamId;
use reconciler::SubmissionEvidence;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};
use uuid::Uuid;

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Candidate submitted
    Manual,
    TimeExpired,
    TabSwitchLimit,
    FaceViolationLimit,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::Manual => "manual",
            TerminationReason::TimeExpired => "time_expired",
            TerminationReason::TabSwitchLimit => "tab_switch_limit",
            TerminationReason::FaceViolationLimit => "face_violation_limit",
        }
    }

    /// Message shown when the exam closes
    pub fn message(&self) -> &'static str {
        match self {
            TerminationReason::Manual => "Exam submitted.",
            TerminationReason::TimeExpired => "Time is up. Your exam has been submitted.",
            TerminationReason::TabSwitchLimit => {
                "Your exam has been terminated due to excessive tab switching."
            }
            TerminationReason::FaceViolationLimit => {
                "Your exam has been terminated due to repeated proctoring violations."
            }
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candidate-facing notification
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Toast text
    Warning(String),
    /// Camera status line changed
    StatusChanged(String),
    Terminated {
        reason: TerminationReason,
        message: String,
    },
    Submitted(SubmissionEvidence),
    SubmissionFailed(String),
}

/// Audit record for a confirmed hard violation or a tab switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProctorEvent {
    pub session_id: Uuid,
    pub exam_id: ExamId,
    /// `looking_left`, `multiple_faces`, `tab_switch`, ...
    pub kind: String,
    pub at_ms: i64,
    /// Time spent away, for tab switches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub away_ms: Option<i64>,
}

/// Sink for notices and audit events
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);

    fn record_event(&self, _event: &ProctorEvent) {}
}

/// Exam submission API
pub trait SubmissionClient: Send + Sync {
    fn submit(&self, exam_id: &ExamId, payload: &SubmissionPayload) -> Result<(), SubmitError>;
}

/// Body of the submission request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub answers: serde_json::Value,
    #[serde(flatten)]
    pub evidence: SubmissionEvidence,
}

/// Notifier that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: &Notice) {
        match notice {
            Notice::Warning(text) => warn!("Notice: {}", text),
            Notice::StatusChanged(status) => info!("Camera status: {}", status),
            Notice::Terminated { reason, message } => {
                warn!("Session terminated ({}): {}", reason, message)
            }
            Notice::Submitted(evidence) => info!(
                "Submitted with {} violations, {} tab switches",
                evidence.face_detection_violations, evidence.tab_switch_count
            ),
            Notice::SubmissionFailed(e) => warn!("Submission failed: {}", e),
        }
    }

    fn record_event(&self, event: &ProctorEvent) {
        info!(
            session = %event.session_id,
            exam = %event.exam_id,
            "Proctor event {} at {}",
            event.kind,
            event.at_ms
        );
    }
}
