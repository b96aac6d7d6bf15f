//! One-shot termination guard

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag ensuring termination runs at most once per session.
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct TerminationGuard {
    terminated: Arc<AtomicBool>,
}

impl TerminationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim termination; only the first caller gets `true`
    pub fn try_begin(&self) -> bool {
        self.terminated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_claim_wins() {
        let guard = TerminationGuard::new();
        let other = guard.clone();

        assert!(!guard.is_terminated());
        assert!(other.try_begin());
        assert!(!guard.try_begin());
        assert!(guard.is_terminated());
    }

    #[test]
    fn test_racing_threads_claim_once() {
        let guard = TerminationGuard::new();
        let winners: usize = (0..8)
            .map(|_| {
                let guard = guard.clone();
                std::thread::spawn(move || guard.try_begin())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(winners, 1);
    }
}
