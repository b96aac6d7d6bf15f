//! Exam Session
//!
//! Wires the integrity engine for one exam attempt:
//! - Camera frames -> classifier -> debouncer -> ledger
//! - Visibility events -> focus monitor
//! - Timer ticks -> exam clock
//!
//! Timer expiry, the tab switch limit, the optional camera limit, and manual
//! submission all converge on one guarded termination path that reconciles
//! the evidence and calls the submission client at most once.

mod config;
mod driver;
mod guard;
mod notice;
mod session;

pub use config::SessionConfig;
pub use driver::drive_countdown;
pub use guard::TerminationGuard;
pub use notice::{
    Notice, Notifier, ProctorEvent, SubmissionClient, SubmissionPayload, TerminationReason,
    TracingNotifier,
};
pub use session::{FrameReport, ProctorSession, SessionOutcome};

use thiserror::Error;

/// Session setup errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Face monitor: {0}")]
    Monitor(#[from] face_monitor::MonitorError),

    #[error("Focus monitor: {0}")]
    Focus(#[from] focus_monitor::FocusError),

    #[error("Reconciler: {0}")]
    Reconcile(#[from] reconciler::ReconcileError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Submission failures reported by the external API client
#[derive(Error, Debug, Clone)]
pub enum SubmitError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Submission rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}
