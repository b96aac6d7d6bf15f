//! Evidence reconciliation rules

use crate::{ReconcilerConfig, SubmissionEvidence};
use ledger::{read_stats, LedgerSnapshot};
use proctor_types::{ExamId, ViolationBreakdown, ViolationStats};
use serde::{Deserialize, Serialize};
use storage::{read_count, SideStore};
use tracing::{debug, info, warn};

/// A rule that changed the evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Adjustment {
    /// Durable tab switch count was ahead of the in-memory one
    TabSwitchesFromStore { memory: u32, durable: u32 },
    /// In-memory counts were ahead of the durable stats (lost write)
    StatsMergedFromMemory,
    /// Face violations estimated from tab switches
    FaceViolationsBackfilled { tab_switches: u32, synthesized: u32 },
    /// Tab switches estimated from face violations
    TabSwitchesBackfilled { face_violations: u32, synthesized: u32 },
    /// Recorded total disagreed with the per-type sum
    TotalRepaired { recorded: u32, actual: u32 },
}

/// Reconciled evidence plus the rules that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub evidence: SubmissionEvidence,
    pub adjustments: Vec<Adjustment>,
}

impl Reconciliation {
    /// Whether any value was estimated rather than observed
    pub fn is_synthetic(&self) -> bool {
        self.adjustments.iter().any(|a| {
            matches!(
                a,
                Adjustment::FaceViolationsBackfilled { .. } | Adjustment::TabSwitchesBackfilled { .. }
            )
        })
    }
}

/// Submission-time evidence reconciler
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Produce one consistent evidence record for `exam_id`
    pub fn reconcile(
        &self,
        exam_id: &ExamId,
        store: &dyn SideStore,
        memory: &LedgerSnapshot,
    ) -> Reconciliation {
        let mut adjustments = Vec::new();

        // Tab switches: monotonic merge of memory and durable copies
        let durable_tabs = read_count(store, &exam_id.tab_switches_key()).unwrap_or_else(|e| {
            warn!("Could not read durable tab switches: {}", e);
            None
        });
        let mut tab_switch_count = memory.tab_switch_count;
        if let Some(durable) = durable_tabs {
            if durable > tab_switch_count {
                adjustments.push(Adjustment::TabSwitchesFromStore {
                    memory: tab_switch_count,
                    durable,
                });
                tab_switch_count = durable;
            }
        }

        // Camera evidence: durable copy is authoritative, memory fills lost writes
        let durable_stats = read_stats(store, exam_id).unwrap_or_else(|e| {
            warn!("Could not read durable stats: {}", e);
            None
        });
        let durable_total = read_count(store, &exam_id.violations_key()).unwrap_or_else(|e| {
            warn!("Could not read durable violation count: {}", e);
            None
        });

        let mut stats = match durable_stats {
            Some(durable) => {
                let merged_types = durable
                    .violation_types
                    .merge_max(&memory.stats.violation_types);
                let merged_warnings = durable.total_warnings.max(memory.stats.total_warnings);
                if merged_types != durable.violation_types || merged_warnings != durable.total_warnings {
                    adjustments.push(Adjustment::StatsMergedFromMemory);
                }
                ViolationStats {
                    total_violations: durable.total_violations,
                    total_warnings: merged_warnings,
                    violation_types: merged_types,
                }
            }
            None => memory.stats,
        };
        // Recorded total; a lost durable write cannot lower it below memory
        let mut face_detection_violations = durable_total
            .unwrap_or(stats.total_violations)
            .max(memory.stats.total_violations);

        // Backfill works on the recorded total, before repair
        if self.config.backfill {
            let recorded = face_detection_violations;

            if tab_switch_count > 0 && recorded == 0 {
                let synthesized = ceil_percent(tab_switch_count, self.config.tab_to_face_percent);
                stats.violation_types = self.split(synthesized);
                stats.total_violations = synthesized;
                face_detection_violations = synthesized;
                info!(
                    "Backfilled {} face violations from {} tab switches",
                    synthesized, tab_switch_count
                );
                adjustments.push(Adjustment::FaceViolationsBackfilled {
                    tab_switches: tab_switch_count,
                    synthesized,
                });
            } else if recorded > 0 && tab_switch_count == 0 {
                let synthesized = ceil_percent(recorded, self.config.face_to_tab_percent);
                tab_switch_count = synthesized;
                info!(
                    "Backfilled {} tab switches from {} face violations",
                    synthesized, recorded
                );
                adjustments.push(Adjustment::TabSwitchesBackfilled {
                    face_violations: recorded,
                    synthesized,
                });
            }
        }

        // Per-type counts win over any recorded total
        let actual = stats.violation_types.sum();
        let recorded = if face_detection_violations != actual {
            face_detection_violations
        } else {
            stats.total_violations
        };
        if recorded != actual {
            warn!(
                "Recorded violation total {} doesn't match per-type sum {}, correcting",
                recorded, actual
            );
            adjustments.push(Adjustment::TotalRepaired { recorded, actual });
        }
        stats.total_violations = actual;
        face_detection_violations = actual;

        let evidence = SubmissionEvidence {
            tab_switch_count,
            face_detection_violations,
            face_detection_stats: stats,
        };
        debug_assert!(evidence.is_consistent());
        debug!("Reconciled evidence for exam {}: {:?}", exam_id, evidence);

        Reconciliation {
            evidence,
            adjustments,
        }
    }

    /// Distribute synthesized face violations across kinds
    fn split(&self, total: u32) -> ViolationBreakdown {
        let looking_left = floor_percent(total, self.config.left_percent);
        let looking_right = floor_percent(total, self.config.right_percent);
        ViolationBreakdown {
            looking_left,
            looking_right,
            face_not_detected: total.saturating_sub(looking_left + looking_right),
            multiple_faces: 0,
        }
    }
}

fn ceil_percent(value: u32, percent: u32) -> u32 {
    let scaled = u64::from(value) * u64::from(percent);
    u32::try_from((scaled + 99) / 100).unwrap_or(u32::MAX)
}

fn floor_percent(value: u32, percent: u32) -> u32 {
    let scaled = u64::from(value) * u64::from(percent);
    u32::try_from(scaled / 100).unwrap_or(u32::MAX)
}
