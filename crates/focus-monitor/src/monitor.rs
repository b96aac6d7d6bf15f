//! Focus state machine

use crate::{FocusConfig, FocusError};
use proctor_types::ExamId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::{read_count, write_count, SideStore};
use tracing::{debug, error, info, warn};

/// Page visibility as seen by the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FocusState {
    #[default]
    Focused,
    Hidden,
}

/// Tab switch bookkeeping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabSwitchState {
    pub count: u32,
    pub last_toggle_at_ms: Option<i64>,
}

/// Enforcement step for a tab switch count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Escalation {
    /// First switch
    FirstWarning,
    /// One more switch forces termination
    FinalWarning,
    /// Below the limit, past the first warning
    Reminder,
    /// Limit reached; issued once per session
    Terminate,
    /// Limit already enforced
    LimitReached,
}

impl Escalation {
    /// Toast text for the candidate
    pub fn message(&self, count: u32, hard_limit: u32) -> Option<String> {
        match self {
            Escalation::FirstWarning => {
                Some("Warning: Tab switching detected! This may be considered cheating.".into())
            }
            Escalation::FinalWarning => Some(
                "Warning: Tab switching detected again! One more switch will terminate your exam."
                    .into(),
            ),
            Escalation::Reminder => Some(format!(
                "Warning: You've switched tabs {} times. Your exam will be terminated after {}.",
                count, hard_limit
            )),
            Escalation::Terminate => Some(format!(
                "You have switched tabs {} times. Your exam will be terminated.",
                count
            )),
            Escalation::LimitReached => None,
        }
    }
}

/// Result of one visibility event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusOutcome {
    /// Event did not change state (duplicate event)
    Unchanged,
    /// Within the throttle window of the last accepted transition
    Throttled,
    /// Candidate left the exam page
    Left,
    /// Candidate came back; the switch was counted
    Returned { count: u32, escalation: Escalation },
}

/// Per-session focus monitor
pub struct FocusMonitor {
    exam_id: ExamId,
    store: Arc<dyn SideStore>,
    config: FocusConfig,
    state: FocusState,
    tabs: TabSwitchState,
    termination_issued: bool,
}

impl FocusMonitor {
    /// Start monitoring, resuming the durable tab switch count.
    /// Returns `Escalation::Terminate` when the limit was already reached
    /// before a reload.
    pub fn resume(
        exam_id: ExamId,
        store: Arc<dyn SideStore>,
        config: FocusConfig,
    ) -> Result<(Self, Option<Escalation>), FocusError> {
        config.validate()?;

        let count = match read_count(store.as_ref(), &exam_id.tab_switches_key()) {
            Ok(count) => count.unwrap_or(0),
            Err(e) => {
                warn!("Could not read tab switches for exam {}: {}", exam_id, e);
                0
            }
        };

        let mut monitor = Self {
            exam_id,
            store,
            config,
            state: FocusState::Focused,
            tabs: TabSwitchState {
                count,
                last_toggle_at_ms: None,
            },
            termination_issued: false,
        };

        let escalation = if count >= monitor.config.hard_limit {
            warn!(
                "Exam {} resumed with {} tab switches (limit {})",
                monitor.exam_id, count, monitor.config.hard_limit
            );
            monitor.termination_issued = true;
            Some(Escalation::Terminate)
        } else {
            if count > 0 {
                info!("Exam {} resumed with {} tab switches", monitor.exam_id, count);
            }
            None
        };

        Ok((monitor, escalation))
    }

    /// Handle a visibility change (`hidden == true` means the page lost focus)
    pub fn on_visibility(&mut self, hidden: bool, now_ms: i64) -> FocusOutcome {
        let next = match (self.state, hidden) {
            (FocusState::Focused, true) => FocusState::Hidden,
            (FocusState::Hidden, false) => FocusState::Focused,
            _ => {
                debug!("Visibility event without transition (hidden={})", hidden);
                return FocusOutcome::Unchanged;
            }
        };

        if let Some(last) = self.tabs.last_toggle_at_ms {
            if now_ms.saturating_sub(last) < self.config.throttle_ms {
                debug!("Ignoring rapid visibility change (throttled)");
                return FocusOutcome::Throttled;
            }
        }

        self.tabs.last_toggle_at_ms = Some(now_ms);
        self.state = next;

        match next {
            FocusState::Hidden => {
                debug!("Candidate left exam {}", self.exam_id);
                FocusOutcome::Left
            }
            FocusState::Focused => {
                let count = self.count_switch();
                let escalation = self.escalate(count);
                info!(
                    "Tab switch {} for exam {} ({:?})",
                    count, self.exam_id, escalation
                );
                FocusOutcome::Returned { count, escalation }
            }
        }
    }

    pub fn count(&self) -> u32 {
        self.tabs.count
    }

    pub fn state(&self) -> FocusState {
        self.state
    }

    pub fn tab_switches(&self) -> TabSwitchState {
        self.tabs
    }

    pub fn config(&self) -> &FocusConfig {
        &self.config
    }

    /// Remove the durable counter (after a successful submission)
    pub fn clear(&self) -> Result<(), storage::StorageError> {
        self.store.remove(&self.exam_id.tab_switches_key())
    }

    /// Increment, merge with the durable copy by maximum, persist
    fn count_switch(&mut self) -> u32 {
        let key = self.exam_id.tab_switches_key();
        let incremented = self.tabs.count.saturating_add(1);

        let durable = match read_count(self.store.as_ref(), &key) {
            Ok(value) => value.unwrap_or(0),
            Err(e) => {
                warn!("Could not read {}: {}", key, e);
                0
            }
        };
        if durable > incremented {
            info!("Durable tab switch count {} ahead of {}, adopting", durable, incremented);
        }

        let merged = incremented.max(durable);
        self.tabs.count = merged;

        if let Err(first) = self.persist_count(&key, merged) {
            warn!("Tab switch count not verified ({}), retrying", first);
            if let Err(e) = self.persist_count(&key, merged) {
                error!(
                    "Tab switch count for exam {} not persisted after retry: {}",
                    self.exam_id, e
                );
            }
        }

        merged
    }

    /// Write, then read back
    fn persist_count(&self, key: &str, value: u32) -> Result<(), FocusError> {
        write_count(self.store.as_ref(), key, value)?;
        if read_count(self.store.as_ref(), key)? != Some(value) {
            return Err(FocusError::Verification(key.to_string()));
        }
        Ok(())
    }

    fn escalate(&mut self, count: u32) -> Escalation {
        let limit = self.config.hard_limit;
        if count >= limit {
            if self.termination_issued {
                Escalation::LimitReached
            } else {
                self.termination_issued = true;
                Escalation::Terminate
            }
        } else if count == 1 {
            Escalation::FirstWarning
        } else if count + 1 == limit {
            Escalation::FinalWarning
        } else {
            Escalation::Reminder
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use storage::{MemoryStore, StorageError};

    /// Store that silently drops the first `drops` writes
    struct LossyStore {
        inner: MemoryStore,
        drops: AtomicU32,
    }

    impl LossyStore {
        fn new(drops: u32) -> Self {
            Self {
                inner: MemoryStore::new(),
                drops: AtomicU32::new(drops),
            }
        }
    }

    impl SideStore for LossyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            let remaining = self.drops.load(Ordering::SeqCst);
            if remaining > 0 {
                self.drops.store(remaining - 1, Ordering::SeqCst);
                return Ok(());
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    fn monitor_with(store: Arc<MemoryStore>, config: FocusConfig) -> FocusMonitor {
        let (monitor, escalation) = FocusMonitor::resume(ExamId::new("e1"), store, config).unwrap();
        assert!(escalation.is_none());
        monitor
    }

    /// Leave at `t`, come back one second later
    fn switch(monitor: &mut FocusMonitor, t: i64) -> FocusOutcome {
        assert_eq!(monitor.on_visibility(true, t), FocusOutcome::Left);
        monitor.on_visibility(false, t + 1_000)
    }

    #[test]
    fn test_escalation_sequence() {
        let store = Arc::new(MemoryStore::new());
        let mut monitor = monitor_with(store.clone(), FocusConfig::default());

        assert_eq!(
            switch(&mut monitor, 0),
            FocusOutcome::Returned { count: 1, escalation: Escalation::FirstWarning }
        );
        assert_eq!(
            switch(&mut monitor, 5_000),
            FocusOutcome::Returned { count: 2, escalation: Escalation::FinalWarning }
        );
        assert_eq!(
            switch(&mut monitor, 10_000),
            FocusOutcome::Returned { count: 3, escalation: Escalation::Terminate }
        );
        assert_eq!(
            switch(&mut monitor, 15_000),
            FocusOutcome::Returned { count: 4, escalation: Escalation::LimitReached }
        );

        assert_eq!(store.get("exam_e1_tab_switches").unwrap().as_deref(), Some("4"));
    }

    #[test]
    fn test_rapid_toggles_count_once() {
        let mut monitor = monitor_with(Arc::new(MemoryStore::new()), FocusConfig::default());

        monitor.on_visibility(true, 0);
        assert!(matches!(monitor.on_visibility(false, 1_000), FocusOutcome::Returned { count: 1, .. }));
        assert_eq!(monitor.on_visibility(true, 1_100), FocusOutcome::Throttled);
        assert_eq!(monitor.on_visibility(false, 1_200), FocusOutcome::Unchanged);

        assert_eq!(monitor.count(), 1);
        assert_eq!(monitor.state(), FocusState::Focused);
    }

    #[test]
    fn test_throttled_return_is_not_counted() {
        let mut monitor = monitor_with(Arc::new(MemoryStore::new()), FocusConfig::default());

        monitor.on_visibility(true, 0);
        assert_eq!(monitor.on_visibility(false, 300), FocusOutcome::Throttled);
        assert_eq!(monitor.count(), 0);
        assert_eq!(monitor.state(), FocusState::Hidden);

        assert!(matches!(monitor.on_visibility(false, 1_500), FocusOutcome::Returned { count: 1, .. }));
    }

    #[test]
    fn test_durable_count_ahead_is_adopted() {
        let store = Arc::new(MemoryStore::new());
        let mut monitor = monitor_with(store.clone(), FocusConfig { hard_limit: 10, ..Default::default() });

        // another tab of the same exam bumped the durable counter
        store.set("exam_e1_tab_switches", "5").unwrap();

        assert_eq!(
            switch(&mut monitor, 0),
            FocusOutcome::Returned { count: 5, escalation: Escalation::Reminder }
        );
    }

    #[test]
    fn test_resume_at_limit_terminates_once() {
        let store = Arc::new(MemoryStore::new());
        store.set("exam_e1_tab_switches", "3").unwrap();

        let (mut monitor, escalation) =
            FocusMonitor::resume(ExamId::new("e1"), store, FocusConfig::default()).unwrap();
        assert_eq!(escalation, Some(Escalation::Terminate));
        assert_eq!(monitor.count(), 3);

        assert_eq!(
            switch(&mut monitor, 0),
            FocusOutcome::Returned { count: 4, escalation: Escalation::LimitReached }
        );
    }

    #[test]
    fn test_configurable_limit() {
        let mut monitor = monitor_with(
            Arc::new(MemoryStore::new()),
            FocusConfig { hard_limit: 10, ..Default::default() },
        );

        let last = (0..9).map(|i| switch(&mut monitor, i * 5_000)).last();
        assert_eq!(
            last,
            Some(FocusOutcome::Returned { count: 9, escalation: Escalation::FinalWarning })
        );
        assert!(matches!(
            switch(&mut monitor, 100_000),
            FocusOutcome::Returned { escalation: Escalation::Terminate, .. }
        ));
    }

    #[test]
    fn test_first_switch_warns_softly_with_low_limit() {
        let mut monitor = monitor_with(
            Arc::new(MemoryStore::new()),
            FocusConfig { hard_limit: 2, ..Default::default() },
        );

        assert_eq!(
            switch(&mut monitor, 0),
            FocusOutcome::Returned { count: 1, escalation: Escalation::FirstWarning }
        );
        assert_eq!(
            switch(&mut monitor, 5_000),
            FocusOutcome::Returned { count: 2, escalation: Escalation::Terminate }
        );
    }

    #[test]
    fn test_dropped_write_is_retried() {
        let store = Arc::new(LossyStore::new(1));
        let (mut monitor, _) =
            FocusMonitor::resume(ExamId::new("e1"), store.clone(), FocusConfig::default()).unwrap();

        switch(&mut monitor, 0);
        assert_eq!(monitor.count(), 1);
        assert_eq!(store.get("exam_e1_tab_switches").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_lost_writes_keep_memory_count() {
        let store = Arc::new(LossyStore::new(u32::MAX));
        let (mut monitor, _) =
            FocusMonitor::resume(ExamId::new("e1"), store.clone(), FocusConfig::default()).unwrap();

        switch(&mut monitor, 0);
        assert_eq!(monitor.count(), 1);
        assert_eq!(store.get("exam_e1_tab_switches").unwrap(), None);
    }

    #[test]
    fn test_messages() {
        assert!(Escalation::FinalWarning
            .message(2, 3)
            .unwrap()
            .contains("One more switch"));
        assert!(Escalation::Terminate.message(3, 3).unwrap().contains("terminated"));
        assert_eq!(Escalation::LimitReached.message(4, 3), None);
    }

    #[test]
    fn test_clear_removes_counter() {
        let store = Arc::new(MemoryStore::new());
        let mut monitor = monitor_with(store.clone(), FocusConfig::default());
        switch(&mut monitor, 0);

        monitor.clear().unwrap();
        assert!(store.is_empty());
    }
}
