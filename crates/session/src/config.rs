//! Session configuration

use crate::SessionError;
use face_monitor::MonitorConfig;
use focus_monitor::FocusConfig;
use reconciler::ReconcilerConfig;
use serde::{Deserialize, Serialize};

/// Configuration for every engine component of a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub monitor: MonitorConfig,
    pub focus: FocusConfig,
    pub reconciler: ReconcilerConfig,
    /// Confirmed camera violations that force termination (disabled when unset)
    pub face_violation_limit: Option<u32>,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), SessionError> {
        self.monitor.validate()?;
        self.focus.validate()?;
        self.reconciler.validate()?;
        if self.face_violation_limit == Some(0) {
            return Err(SessionError::Config(
                "face_violation_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_nested_sections_deserialize() {
        let config: SessionConfig = serde_json::from_str(
            r#"{"focus":{"hard_limit":10},"monitor":{"consecutive_threshold":2},"face_violation_limit":20}"#,
        )
        .unwrap();

        assert_eq!(config.focus.hard_limit, 10);
        assert_eq!(config.focus.throttle_ms, 1000);
        assert_eq!(config.monitor.consecutive_threshold, 2);
        assert_eq!(config.face_violation_limit, Some(20));
        assert!(config.reconciler.backfill);
    }

    #[test]
    fn test_zero_face_limit_rejected() {
        let config = SessionConfig {
            face_violation_limit: Some(0),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(SessionError::Config(_))));
    }
}
