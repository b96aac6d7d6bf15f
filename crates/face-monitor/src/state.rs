//! Debounce state tracking

use proctor_types::ViolationType;

/// Per-session debounce state, owned by the debouncer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebounceState {
    /// Time of the last confirmation (any kind)
    pub last_confirmed_at_ms: Option<i64>,

    /// Identical signals seen in a row
    pub consecutive_count: u32,

    /// Kind currently accumulating
    pub pending_type: Option<ViolationType>,
}

impl DebounceState {
    /// Whether the throttle window since the last confirmation has passed
    pub fn throttle_open(&self, now_ms: i64, throttle_ms: i64) -> bool {
        self.last_confirmed_at_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= throttle_ms)
    }

    /// Forget any pending streak; keeps the throttle timestamp
    pub fn clear_streak(&mut self) {
        self.consecutive_count = 0;
        self.pending_type = None;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_window() {
        let mut state = DebounceState::default();
        assert!(state.throttle_open(0, 1500));

        state.last_confirmed_at_ms = Some(1_000);
        assert!(!state.throttle_open(2_499, 1500));
        assert!(state.throttle_open(2_500, 1500));
    }

    #[test]
    fn test_clear_streak_keeps_timestamp() {
        let mut state = DebounceState {
            last_confirmed_at_ms: Some(10),
            consecutive_count: 2,
            pending_type: Some(ViolationType::LookingLeft),
        };
        state.clear_streak();
        assert_eq!(state.last_confirmed_at_ms, Some(10));
        assert_eq!(state.consecutive_count, 0);
        assert_eq!(state.pending_type, None);
    }
}
