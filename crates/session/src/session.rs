//! Session orchestrator

use crate::{
    Notice, Notifier, ProctorEvent, SessionConfig, SessionError, SubmissionClient,
    SubmissionPayload, TerminationGuard, TerminationReason,
};
use exam_timer::ExamClock;
use face_monitor::{CameraStatus, Confirmation, DetectionFrame, FaceMonitor};
use focus_monitor::{Escalation, FocusMonitor, FocusOutcome};
use ledger::ViolationLedger;
use metrics::counter;
use proctor_types::{Clock, ExamId};
use reconciler::{Reconciler, SubmissionEvidence};
use std::sync::Arc;
use storage::SideStore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// What the UI needs after one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReport {
    pub status: CameraStatus,
    pub confirmation: Option<Confirmation>,
    pub violation_count: u32,
}

/// Final state of a terminated session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub reason: TerminationReason,
    pub evidence: SubmissionEvidence,
    pub submitted: bool,
}

/// One exam attempt
pub struct ProctorSession {
    id: Uuid,
    exam_id: ExamId,
    store: Arc<dyn SideStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    client: Arc<dyn SubmissionClient>,

    face: FaceMonitor,
    ledger: ViolationLedger,
    focus: FocusMonitor,
    timer: ExamClock,
    reconciler: Reconciler,
    guard: TerminationGuard,

    face_violation_limit: Option<u32>,
    answers: serde_json::Value,
    hidden_since_ms: Option<i64>,
    outcome: Option<SessionOutcome>,
}

impl ProctorSession {
    /// Wire every component and load durable state left by an earlier page load
    pub fn start(
        exam_id: ExamId,
        config: SessionConfig,
        store: Arc<dyn SideStore>,
        clock: Arc<dyn Clock>,
        expiry_ms: i64,
        notifier: Arc<dyn Notifier>,
        client: Arc<dyn SubmissionClient>,
    ) -> Result<Self, SessionError> {
        config.validate()?;

        let now = clock.now_ms();
        let face = FaceMonitor::new(config.monitor)?;
        let ledger = ViolationLedger::load(exam_id.clone(), store.clone());
        let (focus, resumed) = FocusMonitor::resume(exam_id.clone(), store.clone(), config.focus)?;
        let timer = ExamClock::new(expiry_ms, now);

        let mut session = Self {
            id: Uuid::new_v4(),
            exam_id,
            store,
            clock,
            notifier,
            client,
            face,
            ledger,
            focus,
            timer,
            reconciler: Reconciler::new(config.reconciler),
            guard: TerminationGuard::new(),
            face_violation_limit: config.face_violation_limit,
            answers: serde_json::Value::Null,
            hidden_since_ms: None,
            outcome: None,
        };

        info!(
            "Session {} started for exam {} (expires at {}, {:?})",
            session.id,
            session.exam_id,
            session.timer.expires_at_ms(),
            session.timer.source()
        );

        if resumed == Some(Escalation::Terminate) {
            let count = session.focus.count();
            let limit = session.focus.config().hard_limit;
            if let Some(text) = Escalation::Terminate.message(count, limit) {
                session.notifier.notify(&Notice::Warning(text));
            }
            session.terminate(TerminationReason::TabSwitchLimit);
        }

        Ok(session)
    }

    /// Feed one landmark detection result
    pub fn on_detection(&mut self, frame: &DetectionFrame) -> FrameReport {
        if self.guard.is_terminated() {
            return self.report(None);
        }

        let now = self.clock.now_ms();
        let previous = self.face.status();
        let analysis = self.face.analyze(frame, now);
        if analysis.status != previous {
            self.notifier
                .notify(&Notice::StatusChanged(analysis.status.to_string()));
        }

        if let Some(confirmation) = analysis.confirmation {
            self.record_confirmation(confirmation);
        }

        self.report(analysis.confirmation)
    }

    /// Camera permission denied or the detector failed
    pub fn on_camera_unavailable(&mut self, reason: &str) -> CameraStatus {
        let previous = self.face.status();
        let status = self.face.camera_unavailable(reason);
        if status != previous {
            self.notifier.notify(&Notice::StatusChanged(status.to_string()));
        }
        status
    }

    /// Page visibility changed
    pub fn on_visibility_change(&mut self, hidden: bool) -> FocusOutcome {
        if self.guard.is_terminated() {
            return FocusOutcome::Unchanged;
        }

        let now = self.clock.now_ms();
        let outcome = self.focus.on_visibility(hidden, now);

        match outcome {
            FocusOutcome::Left => self.hidden_since_ms = Some(now),
            FocusOutcome::Returned { count, escalation } => {
                counter!("proctor_tab_switches_total").increment(1);
                let away_ms = self.hidden_since_ms.take().map(|since| now - since);
                self.notifier.record_event(&ProctorEvent {
                    session_id: self.id,
                    exam_id: self.exam_id.clone(),
                    kind: "tab_switch".into(),
                    at_ms: now,
                    away_ms,
                });

                let limit = self.focus.config().hard_limit;
                if let Some(text) = escalation.message(count, limit) {
                    self.notifier.notify(&Notice::Warning(text));
                }
                if escalation == Escalation::Terminate {
                    self.terminate(TerminationReason::TabSwitchLimit);
                }
            }
            FocusOutcome::Unchanged | FocusOutcome::Throttled => {}
        }

        outcome
    }

    /// Countdown tick. Returns true once, when the timer fires.
    pub fn on_tick(&mut self) -> bool {
        if self.guard.is_terminated() {
            return false;
        }

        let now = self.clock.now_ms();
        let mut expired = false;
        self.timer.tick(now, || expired = true);
        if expired {
            info!("Exam {} time expired", self.exam_id);
            self.terminate(TerminationReason::TimeExpired);
        }
        expired
    }

    /// Latest answers; sent with the submission
    pub fn set_answers(&mut self, answers: serde_json::Value) {
        self.answers = answers;
    }

    /// Manual submission
    pub fn submit(&mut self) -> Option<SessionOutcome> {
        self.terminate(TerminationReason::Manual)
    }

    /// End the session: reconcile once, submit once.
    /// Returns `None` when the session was already terminated.
    pub fn terminate(&mut self, reason: TerminationReason) -> Option<SessionOutcome> {
        if !self.guard.try_begin() {
            debug!("Termination ({}) ignored, session already terminated", reason);
            return None;
        }

        counter!("proctor_terminations_total", "reason" => reason.as_str()).increment(1);
        info!("Terminating session {} ({})", self.id, reason);
        self.notifier.notify(&Notice::Terminated {
            reason,
            message: reason.message().to_string(),
        });

        let snapshot = self.ledger.snapshot(self.focus.count());
        let reconciliation = self
            .reconciler
            .reconcile(&self.exam_id, self.store.as_ref(), &snapshot);
        if !reconciliation.adjustments.is_empty() {
            info!("Evidence adjusted: {:?}", reconciliation.adjustments);
        }
        let evidence = reconciliation.evidence;

        let payload = SubmissionPayload {
            answers: std::mem::take(&mut self.answers),
            evidence,
        };

        let submitted = match self.client.submit(&self.exam_id, &payload) {
            Ok(()) => {
                self.clear_durable();
                self.notifier.notify(&Notice::Submitted(evidence));
                true
            }
            Err(e) => {
                error!("Submission for exam {} failed: {}", self.exam_id, e);
                self.notifier.notify(&Notice::SubmissionFailed(e.to_string()));
                false
            }
        };

        let outcome = SessionOutcome {
            reason,
            evidence,
            submitted,
        };
        self.outcome = Some(outcome.clone());
        Some(outcome)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn exam_id(&self) -> &ExamId {
        &self.exam_id
    }

    pub fn status(&self) -> CameraStatus {
        self.face.status()
    }

    pub fn violation_count(&self) -> u32 {
        self.ledger.stats().total_violations
    }

    pub fn tab_switch_count(&self) -> u32 {
        self.focus.count()
    }

    /// Countdown text, e.g. `04:59`
    pub fn time_remaining(&self) -> String {
        self.timer.display(self.clock.now_ms())
    }

    pub fn is_terminated(&self) -> bool {
        self.guard.is_terminated()
    }

    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    /// Shared handle, see `drive_countdown`
    pub fn termination_guard(&self) -> TerminationGuard {
        self.guard.clone()
    }

    fn record_confirmation(&mut self, confirmation: Confirmation) {
        let kind = confirmation.kind;
        let recorded = self.ledger.record(kind, confirmation.warning);

        if confirmation.warning {
            counter!("proctor_warnings_confirmed_total").increment(1);
            self.notifier
                .notify(&Notice::Warning(format!("Warning: {}", kind.reason())));
            return;
        }

        counter!("proctor_violations_confirmed_total", "type" => kind.audit_name()).increment(1);
        self.notifier.record_event(&ProctorEvent {
            session_id: self.id,
            exam_id: self.exam_id.clone(),
            kind: kind.audit_name().to_string(),
            at_ms: confirmation.at_ms,
            away_ms: None,
        });
        self.notifier.notify(&Notice::Warning(format!(
            "Cheating Detected: {}",
            kind.reason()
        )));

        if let Some(limit) = self.face_violation_limit {
            if recorded.stats.total_violations >= limit {
                warn!(
                    "Camera violation limit reached ({} >= {})",
                    recorded.stats.total_violations, limit
                );
                self.terminate(TerminationReason::FaceViolationLimit);
            }
        }
    }

    fn clear_durable(&self) {
        if let Err(e) = self.ledger.clear() {
            warn!("Could not clear ledger for exam {}: {}", self.exam_id, e);
        }
        if let Err(e) = self.focus.clear() {
            warn!("Could not clear tab switches for exam {}: {}", self.exam_id, e);
        }
    }

    fn report(&self, confirmation: Option<Confirmation>) -> FrameReport {
        FrameReport {
            status: self.face.status(),
            confirmation,
            violation_count: self.violation_count(),
        }
    }
}
