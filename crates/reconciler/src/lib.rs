//! Submission Reconciliation
//!
//! Gathers violation and tab switch evidence from the in-memory session and
//! the durable side-store, resolves conflicts, backfills missing evidence,
//! and emits the single normalized record handed to the submission API.

mod evidence;
mod reconcile;

pub use evidence::{RiskLevel, SubmissionEvidence};
pub use reconcile::{Adjustment, Reconciler, Reconciliation};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reconciler configuration errors
#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    #[error("{field} must be within [0, 100], got {value}")]
    PercentOutOfRange { field: &'static str, value: u32 },

    #[error("left_percent + right_percent must not exceed 100, got {0}")]
    SplitOverflow(u32),
}

/// Backfill configuration. Ratios are whole percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Synthesize a missing signal from the correlated present one
    pub backfill: bool,
    /// Face violations synthesized per tab switch (rounded up)
    pub tab_to_face_percent: u32,
    /// Tab switches synthesized per face violation (rounded up)
    pub face_to_tab_percent: u32,
    /// Share of synthesized face violations attributed to looking left (rounded down)
    pub left_percent: u32,
    /// Share attributed to looking right (rounded down); the rest is face-not-detected
    pub right_percent: u32,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            backfill: true,
            tab_to_face_percent: 50,
            face_to_tab_percent: 30,
            left_percent: 30,
            right_percent: 30,
        }
    }
}

impl ReconcilerConfig {
    /// Report missing evidence as observed (zero) instead of estimating it
    pub fn strict() -> Self {
        Self {
            backfill: false,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ReconcileError> {
        for (field, value) in [
            ("tab_to_face_percent", self.tab_to_face_percent),
            ("face_to_tab_percent", self.face_to_tab_percent),
            ("left_percent", self.left_percent),
            ("right_percent", self.right_percent),
        ] {
            if value > 100 {
                return Err(ReconcileError::PercentOutOfRange { field, value });
            }
        }
        let split = self.left_percent + self.right_percent;
        if split > 100 {
            return Err(ReconcileError::SplitOverflow(split));
        }
        Ok(())
    }
}
