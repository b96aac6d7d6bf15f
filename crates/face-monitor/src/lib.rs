//! Face Monitor
//!
//! Webcam-side cheating detection:
//! - Landmark classification (face count, gaze direction)
//! - Consecutive-repeat debouncing
//! - Confirmation throttling
//!
//! Face and landmark detection itself is an external capability; this crate
//! consumes its landmark output.

pub mod analysis;
pub mod config;
pub mod debouncer;
pub mod detector;
pub mod state;

pub use analysis::{CameraStatus, FrameAnalysis};
pub use config::MonitorConfig;
pub use debouncer::{Confirmation, Debouncer};
pub use detector::{classify, Classification, DetectionFrame, FaceLandmarks, Landmark};
pub use state::DebounceState;

use thiserror::Error;
use tracing::{debug, warn};

/// Face monitor error types
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Per-session webcam monitor
pub struct FaceMonitor {
    config: MonitorConfig,
    debouncer: Debouncer,
    status: CameraStatus,
    undecodable_frames: u64,
}

impl FaceMonitor {
    /// Create a new face monitor with configuration
    pub fn new(config: MonitorConfig) -> Result<Self, MonitorError> {
        config.validate()?;
        Ok(Self {
            debouncer: Debouncer::new(&config),
            status: CameraStatus::Ok,
            undecodable_frames: 0,
            config,
        })
    }

    /// Analyze a single detection frame
    pub fn analyze(&mut self, frame: &DetectionFrame, now_ms: i64) -> FrameAnalysis {
        let classification = classify(frame, &self.config);

        if classification.undecodable {
            self.undecodable_frames += 1;
            debug!(
                "Undecodable landmarks ({} so far), treating frame as ok",
                self.undecodable_frames
            );
        }

        let confirmation = self.debouncer.observe(&classification, now_ms);
        self.status = CameraStatus::from_signal(classification.signal);

        FrameAnalysis {
            classification,
            confirmation,
            status: self.status,
        }
    }

    /// Camera permission denied or detector failure
    pub fn camera_unavailable(&mut self, reason: &str) -> CameraStatus {
        warn!("Camera unavailable: {}", reason);
        self.debouncer.reset();
        self.status = CameraStatus::Unavailable;
        self.status
    }

    pub fn status(&self) -> CameraStatus {
        self.status
    }

    pub fn undecodable_frames(&self) -> u64 {
        self.undecodable_frames
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Reset monitoring state (session restart)
    pub fn reset_state(&mut self) {
        self.debouncer.reset();
        self.status = CameraStatus::Ok;
        self.undecodable_frames = 0;
    }
}
