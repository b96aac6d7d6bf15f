//! JSONL trace format and runner

use crate::{EngineConfig, ReplayError};
use face_monitor::{DetectionFrame, FaceLandmarks};
use proctor_types::{Clock, ExamId, ManualClock};
use serde::{Deserialize, Serialize};
use session::{
    ProctorSession, SessionOutcome, SubmissionClient, SubmissionPayload, SubmitError,
    TracingNotifier,
};
use std::io::BufRead;
use std::sync::{Arc, Mutex};
use storage::SideStore;
use tracing::{debug, info, warn};

/// One recorded input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    Frame { faces: Vec<FaceLandmarks> },
    Visibility { hidden: bool },
    Tick,
    CameraUnavailable {
        #[serde(default)]
        reason: String,
    },
    Answers { answers: serde_json::Value },
    Submit,
}

/// A trace line: timestamp plus event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceLine {
    pub at_ms: i64,
    #[serde(flatten)]
    pub event: TraceEvent,
}

/// Parse a JSONL trace, skipping blank lines and `#` comments
pub fn parse_trace<R: BufRead>(reader: R) -> Result<Vec<TraceLine>, ReplayError> {
    let mut lines = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let parsed = serde_json::from_str(trimmed).map_err(|e| ReplayError::Trace {
            line: index + 1,
            message: e.to_string(),
        })?;
        lines.push(parsed);
    }
    Ok(lines)
}

/// Submission client that keeps the payload for the caller
#[derive(Debug, Default)]
pub struct CapturingClient {
    payload: Mutex<Option<SubmissionPayload>>,
}

impl CapturingClient {
    pub fn take(&self) -> Option<SubmissionPayload> {
        self.payload.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl SubmissionClient for CapturingClient {
    fn submit(&self, exam_id: &ExamId, payload: &SubmissionPayload) -> Result<(), SubmitError> {
        let mut slot = self
            .payload
            .lock()
            .map_err(|e| SubmitError::Transport(e.to_string()))?;
        info!("Captured submission for exam {}", exam_id);
        *slot = Some(payload.clone());
        Ok(())
    }
}

/// Result of one replay
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayReport {
    pub events: usize,
    pub outcome: Option<SessionOutcome>,
    pub payload: Option<SubmissionPayload>,
}

/// Run `lines` through a fresh session.
/// The session starts at the first event's timestamp.
pub fn replay(
    lines: &[TraceLine],
    config: &EngineConfig,
    store: Arc<dyn SideStore>,
) -> Result<ReplayReport, ReplayError> {
    let first = lines.first().ok_or(ReplayError::EmptyTrace)?;
    let clock = ManualClock::new(first.at_ms);
    let client = Arc::new(CapturingClient::default());

    let mut session = ProctorSession::start(
        ExamId::new(config.exam_id.clone()),
        config.session.clone(),
        store,
        Arc::new(clock.clone()),
        first.at_ms.saturating_add(config.duration_ms),
        Arc::new(TracingNotifier),
        client.clone(),
    )?;

    let mut applied = 0;
    for line in lines {
        if session.is_terminated() {
            debug!("Session terminated, skipping remaining events");
            break;
        }
        if line.at_ms < clock.now_ms() {
            warn!("Trace goes back in time at {}, keeping clock", line.at_ms);
        } else {
            clock.set(line.at_ms);
        }

        match &line.event {
            TraceEvent::Frame { faces } => {
                let report = session.on_detection(&DetectionFrame::new(faces.clone()));
                debug!("{} ({} violations)", report.status, report.violation_count);
            }
            TraceEvent::Visibility { hidden } => {
                session.on_visibility_change(*hidden);
            }
            TraceEvent::Tick => {
                session.on_tick();
            }
            TraceEvent::CameraUnavailable { reason } => {
                session.on_camera_unavailable(reason);
            }
            TraceEvent::Answers { answers } => session.set_answers(answers.clone()),
            TraceEvent::Submit => {
                session.submit();
            }
        }
        applied += 1;
    }

    info!(
        "Replayed {} of {} events, {} violations, {} tab switches",
        applied,
        lines.len(),
        session.violation_count(),
        session.tab_switch_count()
    );

    Ok(ReplayReport {
        events: applied,
        outcome: session.outcome().cloned(),
        payload: client.take(),
    })
}
