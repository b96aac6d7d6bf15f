//! Aggregated violation statistics
//!
//! Per-type counts are authoritative; `total_violations` is always derivable
//! from them and is repaired whenever the two disagree.

use crate::ViolationType;
use serde::{Deserialize, Serialize};

/// Confirmed hard violations per kind (`violationTypes`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViolationBreakdown {
    pub looking_left: u32,
    pub looking_right: u32,
    pub face_not_detected: u32,
    pub multiple_faces: u32,
}

impl ViolationBreakdown {
    pub fn get(&self, kind: ViolationType) -> u32 {
        match kind {
            ViolationType::LookingLeft => self.looking_left,
            ViolationType::LookingRight => self.looking_right,
            ViolationType::FaceNotDetected => self.face_not_detected,
            ViolationType::MultipleFaces => self.multiple_faces,
        }
    }

    fn slot(&mut self, kind: ViolationType) -> &mut u32 {
        match kind {
            ViolationType::LookingLeft => &mut self.looking_left,
            ViolationType::LookingRight => &mut self.looking_right,
            ViolationType::FaceNotDetected => &mut self.face_not_detected,
            ViolationType::MultipleFaces => &mut self.multiple_faces,
        }
    }

    pub fn set(&mut self, kind: ViolationType, value: u32) {
        *self.slot(kind) = value;
    }

    pub fn increment(&mut self, kind: ViolationType) {
        let slot = self.slot(kind);
        *slot = slot.saturating_add(1);
    }

    pub fn sum(&self) -> u32 {
        ViolationType::ALL
            .iter()
            .fold(0u32, |acc, kind| acc.saturating_add(self.get(*kind)))
    }

    /// Per-kind maximum of two breakdowns
    pub fn merge_max(&self, other: &ViolationBreakdown) -> ViolationBreakdown {
        let mut merged = *self;
        for kind in ViolationType::ALL {
            merged.set(kind, self.get(kind).max(other.get(kind)));
        }
        merged
    }
}

/// Aggregate cheating evidence for one exam session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationStats {
    pub total_violations: u32,
    /// Soft signals; never part of `total_violations`
    #[serde(default)]
    pub total_warnings: u32,
    #[serde(default)]
    pub violation_types: ViolationBreakdown,
}

impl ViolationStats {
    /// Record one confirmed event
    pub fn apply(&mut self, kind: ViolationType, is_warning: bool) {
        if is_warning {
            self.total_warnings = self.total_warnings.saturating_add(1);
        } else {
            self.violation_types.increment(kind);
        }
        self.repair();
    }

    pub fn is_consistent(&self) -> bool {
        self.total_violations == self.violation_types.sum()
    }

    /// Recompute the total from the per-type sum.
    /// Returns the previous total if it had to be corrected.
    pub fn repair(&mut self) -> Option<u32> {
        let sum = self.violation_types.sum();
        if self.total_violations == sum {
            return None;
        }
        let previous = self.total_violations;
        self.total_violations = sum;
        Some(previous)
    }

    /// Monotonic merge: per-kind maximum, warnings maximum, total re-derived
    pub fn merge_max(&self, other: &ViolationStats) -> ViolationStats {
        let mut merged = ViolationStats {
            total_violations: 0,
            total_warnings: self.total_warnings.max(other.total_warnings),
            violation_types: self.violation_types.merge_max(&other.violation_types),
        };
        merged.repair();
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_warning_does_not_count() {
        let mut stats = ViolationStats::default();
        stats.apply(ViolationType::LookingLeft, true);
        stats.apply(ViolationType::MultipleFaces, false);

        assert_eq!(stats.total_warnings, 1);
        assert_eq!(stats.total_violations, 1);
        assert_eq!(stats.violation_types.looking_left, 0);
        assert_eq!(stats.violation_types.multiple_faces, 1);
    }

    #[test]
    fn test_repair_prefers_per_type_sum() {
        let mut stats = ViolationStats {
            total_violations: 9,
            total_warnings: 0,
            violation_types: ViolationBreakdown {
                looking_left: 3,
                looking_right: 2,
                face_not_detected: 2,
                multiple_faces: 0,
            },
        };

        assert_eq!(stats.repair(), Some(9));
        assert_eq!(stats.total_violations, 7);
        assert_eq!(stats.repair(), None);
    }

    #[test]
    fn test_deserialize_without_warnings() {
        let json = r#"{"totalViolations":2,"violationTypes":{"lookingLeft":1,"faceNotDetected":1}}"#;
        let stats: ViolationStats = serde_json::from_str(json).unwrap();

        assert_eq!(stats.total_warnings, 0);
        assert_eq!(stats.violation_types.looking_right, 0);
        assert!(stats.is_consistent());
    }

    #[test]
    fn test_serialized_shape() {
        let mut stats = ViolationStats::default();
        stats.apply(ViolationType::FaceNotDetected, false);
        let value = serde_json::to_value(stats).unwrap();

        assert_eq!(value["totalViolations"], 1);
        assert_eq!(value["violationTypes"]["faceNotDetected"], 1);
        assert_eq!(value["violationTypes"]["multipleFaces"], 0);
    }

    fn arb_event() -> impl Strategy<Value = (ViolationType, bool)> {
        (0usize..4, any::<bool>()).prop_map(|(i, w)| (ViolationType::ALL[i], w))
    }

    proptest! {
        #[test]
        fn total_matches_per_type_sum(events in proptest::collection::vec(arb_event(), 0..64)) {
            let mut stats = ViolationStats::default();
            for (kind, warning) in events {
                stats.apply(kind, warning);
                prop_assert!(stats.is_consistent());
            }
        }

        #[test]
        fn merge_is_monotonic(
            a in proptest::collection::vec(arb_event(), 0..16),
            b in proptest::collection::vec(arb_event(), 0..16),
        ) {
            let mut left = ViolationStats::default();
            let mut right = ViolationStats::default();
            for (kind, warning) in a { left.apply(kind, warning); }
            for (kind, warning) in b { right.apply(kind, warning); }

            let merged = left.merge_max(&right);
            prop_assert!(merged.is_consistent());
            prop_assert!(merged.total_violations >= left.total_violations.max(right.total_violations));
        }
    }
}
