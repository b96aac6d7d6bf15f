//! Violation debouncer
//!
//! A single misclassified frame must never count. A kind is confirmed only
//! after it repeats `consecutive_threshold` times in a row, and never sooner
//! than `throttle_ms` after the previous confirmation. Switching kinds
//! restarts the streak, so alternating faster than the threshold confirms
//! neither kind.

use crate::{Classification, DebounceState, MonitorConfig};
use proctor_types::{RawSignal, ViolationType};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A debounced, trustworthy event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub kind: ViolationType,
    /// Soft signal: counts toward warnings, not violations
    pub warning: bool,
    pub at_ms: i64,
}

/// Consecutive-repeat counter plus minimum-interval throttle
#[derive(Debug, Clone)]
pub struct Debouncer {
    consecutive_threshold: u32,
    throttle_ms: i64,
    state: DebounceState,
}

impl Debouncer {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            consecutive_threshold: config.consecutive_threshold.max(1),
            throttle_ms: config.throttle_ms,
            state: DebounceState::default(),
        }
    }

    /// Feed one classified frame
    pub fn observe(&mut self, classification: &Classification, now_ms: i64) -> Option<Confirmation> {
        let kind = match classification.signal {
            RawSignal::Ok => {
                self.state.clear_streak();
                return None;
            }
            RawSignal::Violation(kind) => kind,
        };

        if self.state.pending_type == Some(kind) {
            self.state.consecutive_count = self.state.consecutive_count.saturating_add(1);
        } else {
            self.state.pending_type = Some(kind);
            self.state.consecutive_count = 1;
        }

        if self.state.consecutive_count < self.consecutive_threshold {
            debug!(
                "{} streak {}/{}",
                kind, self.state.consecutive_count, self.consecutive_threshold
            );
            return None;
        }

        if !self.state.throttle_open(now_ms, self.throttle_ms) {
            debug!("{} confirmation throttled", kind);
            return None;
        }

        let warning = classification.borderline && !kind.always_hard();
        self.state.last_confirmed_at_ms = Some(now_ms);
        self.state.consecutive_count = 0;

        info!(
            "Confirmed {} {} at {}",
            if warning { "warning" } else { "violation" },
            kind,
            now_ms
        );
        Some(Confirmation {
            kind,
            warning,
            at_ms: now_ms,
        })
    }

    pub fn state(&self) -> &DebounceState {
        &self.state
    }

    /// Drop all pending evidence (camera lost, session restarted)
    pub fn reset(&mut self) {
        self.state.reset();
    }
}
