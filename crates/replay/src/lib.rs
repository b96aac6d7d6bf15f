//! Proctoring Trace Replay
//!
//! Drives a `ProctorSession` from a recorded JSONL trace with a manual
//! clock, for offline review of a candidate's session and for tuning
//! thresholds against real detector output.

mod config;
mod trace;

pub use config::EngineConfig;
pub use trace::{parse_trace, replay, CapturingClient, ReplayReport, TraceEvent, TraceLine};

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Replay errors
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Trace line {line}: {message}")]
    Trace { line: usize, message: String },

    #[error("Empty trace")]
    EmptyTrace,

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] session::SessionError),
}

/// Initialize logging
pub fn init_logging(json: bool, verbose: bool) -> Result<(), ReplayError> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.map_err(|e| ReplayError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))
}
