//! Violation Ledger
//!
//! Authoritative accumulation of confirmed camera events for one exam
//! session. Every mutation is mirrored to the durable side-store and read
//! back; a failed write is retried once, after which the in-memory copy
//! stays authoritative for the rest of the session.

use proctor_types::{ExamId, ViolationStats, ViolationType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::{SideStore, StorageError};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Verification failed for {0}")]
    Verification(String),
}

/// Result of recording one confirmed event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOutcome {
    pub stats: ViolationStats,
    /// False when the durable mirror could not be verified after the retry
    pub persisted: bool,
}

/// Immutable view handed to the reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub stats: ViolationStats,
    pub tab_switch_count: u32,
}

/// Per-session violation ledger
pub struct ViolationLedger {
    exam_id: ExamId,
    store: Arc<dyn SideStore>,
    stats: ViolationStats,
    persist_failures: u32,
}

impl ViolationLedger {
    /// Start a ledger, adopting any durable snapshot left by an earlier page load
    pub fn load(exam_id: ExamId, store: Arc<dyn SideStore>) -> Self {
        let stats = match read_stats(store.as_ref(), &exam_id) {
            Ok(Some(mut stats)) => {
                if let Some(previous) = stats.repair() {
                    warn!(
                        "Stored total {} disagrees with per-type sum {}, repaired",
                        previous, stats.total_violations
                    );
                }
                info!(
                    "Resumed ledger for exam {}: {} violations, {} warnings",
                    exam_id, stats.total_violations, stats.total_warnings
                );
                stats
            }
            Ok(None) => {
                debug!("No stored ledger for exam {}", exam_id);
                ViolationStats::default()
            }
            Err(e) => {
                warn!("Discarding unreadable ledger for exam {}: {}", exam_id, e);
                ViolationStats::default()
            }
        };

        Self {
            exam_id,
            store,
            stats,
            persist_failures: 0,
        }
    }

    /// Apply one confirmed event and mirror the result
    pub fn record(&mut self, kind: ViolationType, is_warning: bool) -> RecordOutcome {
        self.stats.apply(kind, is_warning);
        debug_assert!(self.stats.is_consistent());

        let result = match self.persist() {
            Ok(()) => Ok(()),
            Err(first) => {
                warn!("Ledger write for exam {} not verified ({}), retrying", self.exam_id, first);
                self.persist()
            }
        };

        let persisted = match result {
            Ok(()) => true,
            Err(e) => {
                self.persist_failures += 1;
                error!(
                    "Ledger for exam {} not persisted after retry: {} (in-memory copy stays authoritative)",
                    self.exam_id, e
                );
                false
            }
        };

        RecordOutcome {
            stats: self.stats,
            persisted,
        }
    }

    pub fn stats(&self) -> ViolationStats {
        self.stats
    }

    pub fn snapshot(&self, tab_switch_count: u32) -> LedgerSnapshot {
        LedgerSnapshot {
            stats: self.stats,
            tab_switch_count,
        }
    }

    /// Writes that could not be verified even after the retry
    pub fn persist_failures(&self) -> u32 {
        self.persist_failures
    }

    pub fn exam_id(&self) -> &ExamId {
        &self.exam_id
    }

    /// Remove the durable copy (after a successful submission)
    pub fn clear(&self) -> Result<(), LedgerError> {
        self.store.remove(&self.exam_id.stats_key())?;
        self.store.remove(&self.exam_id.violations_key())?;
        Ok(())
    }

    fn persist(&self) -> Result<(), LedgerError> {
        let stats_key = self.exam_id.stats_key();
        let violations_key = self.exam_id.violations_key();
        let stats_json = serde_json::to_string(&self.stats)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;
        let total = self.stats.total_violations.to_string();

        self.store.set(&violations_key, &total)?;
        self.store.set(&stats_key, &stats_json)?;

        if self.store.get(&violations_key)?.as_deref() != Some(total.as_str()) {
            return Err(LedgerError::Verification(violations_key));
        }
        if self.store.get(&stats_key)?.as_deref() != Some(stats_json.as_str()) {
            return Err(LedgerError::Verification(stats_key));
        }
        Ok(())
    }
}

/// Read the durable stats snapshot for an exam
pub fn read_stats(
    store: &dyn SideStore,
    exam_id: &ExamId,
) -> Result<Option<ViolationStats>, LedgerError> {
    match store.get(&exam_id.stats_key())? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| LedgerError::Serialization(e.to_string())),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use storage::MemoryStore;

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

    /// Store whose writes always fail
    struct FullStore;

    impl SideStore for FullStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".into()))
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn exam() -> ExamId {
        ExamId::new("exam-42")
    }

    #[test]
    fn test_record_persists_both_keys() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = ViolationLedger::load(exam(), store.clone());

        let outcome = ledger.record(ViolationType::MultipleFaces, false);
        assert!(outcome.persisted);
        assert_eq!(outcome.stats.total_violations, 1);

        assert_eq!(
            store.get("exam_exam-42_violations").unwrap().as_deref(),
            Some("1")
        );
        let stored = read_stats(store.as_ref(), &exam()).unwrap().unwrap();
        assert_eq!(stored.violation_types.multiple_faces, 1);
    }

    #[test]
    fn test_warning_only_bumps_warnings() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = ViolationLedger::load(exam(), store);

        let outcome = ledger.record(ViolationType::LookingLeft, true);
        assert_eq!(outcome.stats.total_warnings, 1);
        assert_eq!(outcome.stats.total_violations, 0);
        assert_eq!(outcome.stats.violation_types.looking_left, 0);
    }

    #[test]
    fn test_load_adopts_and_repairs_durable_snapshot() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                "exam_exam-42_stats",
                r#"{"totalViolations":9,"totalWarnings":1,"violationTypes":{"lookingLeft":4,"lookingRight":3}}"#,
            )
            .unwrap();

        let mut ledger = ViolationLedger::load(exam(), store);
        assert_eq!(ledger.stats().total_violations, 7);

        let outcome = ledger.record(ViolationType::FaceNotDetected, false);
        assert_eq!(outcome.stats.total_violations, 8);
        assert_eq!(outcome.stats.total_warnings, 1);
    }

    #[test]
    fn test_load_ignores_corrupt_snapshot() {
        let store = Arc::new(MemoryStore::new());
        store.set("exam_exam-42_stats", "{not json").unwrap();

        let ledger = ViolationLedger::load(exam(), store);
        assert_eq!(ledger.stats(), ViolationStats::default());
    }

    #[test]
    fn test_lost_write_is_retried() {
        let store = Arc::new(LossyStore::new(1));
        let mut ledger = ViolationLedger::load(exam(), store.clone());

        let outcome = ledger.record(ViolationType::FaceNotDetected, false);
        assert!(outcome.persisted);
        assert_eq!(ledger.persist_failures(), 0);
        assert!(read_stats(store.as_ref(), &exam()).unwrap().is_some());
    }

    #[test]
    fn test_persistent_failure_keeps_memory_authoritative() {
        let mut ledger = ViolationLedger::load(exam(), Arc::new(FullStore));

        let outcome = ledger.record(ViolationType::LookingRight, false);
        assert!(!outcome.persisted);
        assert_eq!(ledger.persist_failures(), 1);
        assert_eq!(ledger.stats().violation_types.looking_right, 1);
    }

    #[test]
    fn test_clear_removes_durable_copy() {
        let store = Arc::new(MemoryStore::new());
        let mut ledger = ViolationLedger::load(exam(), store.clone());
        ledger.record(ViolationType::LookingLeft, false);

        ledger.clear().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_snapshot_carries_tab_switches() {
        let ledger = ViolationLedger::load(exam(), Arc::new(MemoryStore::new()));
        let snapshot = ledger.snapshot(3);
        assert_eq!(snapshot.tab_switch_count, 3);
        assert_eq!(snapshot.stats.total_violations, 0);
    }

    proptest! {
        #[test]
        fn durable_copy_stays_consistent(events in proptest::collection::vec((0usize..4, any::<bool>()), 1..40)) {
            let store = Arc::new(MemoryStore::new());
            let mut ledger = ViolationLedger::load(exam(), store.clone());

            for (i, warning) in events {
                ledger.record(ViolationType::ALL[i], warning);
            }

            let stored = read_stats(store.as_ref(), &exam()).unwrap().unwrap();
            prop_assert!(stored.is_consistent());
            prop_assert_eq!(stored, ledger.stats());
        }
    }
}
