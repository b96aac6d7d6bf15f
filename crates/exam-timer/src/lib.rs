//! Exam Timer
//!
//! One-shot countdown: `Pending(expires_at)` -> `Fired`, never back.
//! Bad upstream expiry values are clamped instead of rejected so the exam
//! stays completable.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Expiry used when the proposed one is not in the future (10 minutes)
pub const PAST_EXPIRY_FALLBACK_MS: i64 = 10 * 60 * 1000;

/// Longest accepted countdown (24 hours)
pub const MAX_COUNTDOWN_MS: i64 = 24 * 60 * 60 * 1000;

/// How the effective expiry was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpirySource {
    AsGiven,
    /// Proposed expiry was not in the future
    ClampedPast,
    /// Proposed expiry was more than 24 hours out
    ClampedFar,
}

/// Countdown state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerState {
    Pending { expires_at_ms: i64 },
    Fired,
}

/// One-shot exam clock
#[derive(Debug, Clone)]
pub struct ExamClock {
    expires_at_ms: i64,
    has_fired: bool,
    source: ExpirySource,
}

impl ExamClock {
    /// Build a clock from a proposed expiry, clamping unreasonable values
    pub fn new(proposed_ms: i64, now_ms: i64) -> Self {
        let (expires_at_ms, source) = if proposed_ms <= now_ms {
            warn!(
                "Expiry {} is not in the future (now {}), falling back to 10 minutes",
                proposed_ms, now_ms
            );
            (now_ms + PAST_EXPIRY_FALLBACK_MS, ExpirySource::ClampedPast)
        } else if proposed_ms - now_ms > MAX_COUNTDOWN_MS {
            warn!(
                "Expiry {} is more than 24h away (now {}), capping",
                proposed_ms, now_ms
            );
            (now_ms + MAX_COUNTDOWN_MS, ExpirySource::ClampedFar)
        } else {
            (proposed_ms, ExpirySource::AsGiven)
        };

        info!("Exam clock armed, expires at {} ({:?})", expires_at_ms, source);
        Self {
            expires_at_ms,
            has_fired: false,
            source,
        }
    }

    pub fn expires_at_ms(&self) -> i64 {
        self.expires_at_ms
    }

    pub fn source(&self) -> ExpirySource {
        self.source
    }

    pub fn has_fired(&self) -> bool {
        self.has_fired
    }

    pub fn state(&self) -> TimerState {
        if self.has_fired {
            TimerState::Fired
        } else {
            TimerState::Pending {
                expires_at_ms: self.expires_at_ms,
            }
        }
    }

    /// Milliseconds left, never negative
    pub fn remaining_ms(&self, now_ms: i64) -> i64 {
        if self.has_fired {
            return 0;
        }
        (self.expires_at_ms - now_ms).max(0)
    }

    /// `MM:SS`, or `HH:MM:SS` once an hour or more remains
    pub fn display(&self, now_ms: i64) -> String {
        let total_secs = (self.remaining_ms(now_ms) + 999) / 1000;
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let seconds = total_secs % 60;
        if hours > 0 {
            format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
        } else {
            format!("{:02}:{:02}", minutes, seconds)
        }
    }

    /// Periodic tick; runs `on_expire` once the deadline passes.
    /// Returns true only on the call that fired.
    pub fn tick<F: FnOnce()>(&mut self, now_ms: i64, on_expire: F) -> bool {
        if self.has_fired || now_ms < self.expires_at_ms {
            return false;
        }
        self.expire(on_expire)
    }

    /// Fire now regardless of the deadline; a no-op once fired
    pub fn expire<F: FnOnce()>(&mut self, on_expire: F) -> bool {
        if self.has_fired {
            debug!("Timer already expired, ignoring duplicate expiration");
            return false;
        }
        self.has_fired = true;
        info!("Exam timer expired");
        on_expire();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;
    const HOUR_MS: i64 = 60 * 60 * 1000;

    #[test]
    fn test_past_expiry_clamped_to_ten_minutes() {
        let clock = ExamClock::new(NOW - 2 * HOUR_MS, NOW);
        assert_eq!(clock.expires_at_ms(), NOW + 10 * 60 * 1000);
        assert_eq!(clock.source(), ExpirySource::ClampedPast);
    }

    #[test]
    fn test_far_expiry_clamped_to_a_day() {
        let clock = ExamClock::new(NOW + 48 * HOUR_MS, NOW);
        assert_eq!(clock.expires_at_ms(), NOW + 24 * HOUR_MS);
        assert_eq!(clock.source(), ExpirySource::ClampedFar);
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(ExamClock::new(NOW, NOW).source(), ExpirySource::ClampedPast);
        assert_eq!(
            ExamClock::new(NOW + 24 * HOUR_MS, NOW).source(),
            ExpirySource::AsGiven
        );
        assert_eq!(ExamClock::new(NOW + 1, NOW).expires_at_ms(), NOW + 1);
    }

    #[test]
    fn test_double_expiry_fires_once() {
        let mut clock = ExamClock::new(NOW + 1_000, NOW);
        let mut calls = 0;

        assert!(!clock.tick(NOW + 999, || calls += 1));
        assert!(clock.tick(NOW + 1_000, || calls += 1));
        assert!(!clock.tick(NOW + 1_001, || calls += 1));
        assert!(!clock.expire(|| calls += 1));

        assert_eq!(calls, 1);
        assert_eq!(clock.state(), TimerState::Fired);
        assert_eq!(clock.remaining_ms(NOW), 0);
    }

    #[test]
    fn test_display() {
        let clock = ExamClock::new(NOW + 90 * 60 * 1000 + 5_000, NOW);
        assert_eq!(clock.display(NOW), "01:30:05");
        assert_eq!(clock.display(NOW + HOUR_MS), "30:05");
        assert_eq!(clock.display(NOW + 2 * HOUR_MS), "00:00");
    }
}
