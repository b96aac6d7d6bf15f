//! Engine configuration loading

use crate::ReplayError;
use serde::{Deserialize, Serialize};
use session::SessionConfig;
use std::path::Path;

/// Everything needed to run one exam session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub exam_id: String,
    /// Exam length, measured from the first trace event
    pub duration_ms: i64,
    pub session: SessionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            exam_id: "replay".into(),
            duration_ms: 60 * 60 * 1000,
            session: SessionConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load from an optional TOML file, then `PROCTOR__*` environment overrides
    /// (e.g. `PROCTOR__SESSION__FOCUS__HARD_LIMIT=10`)
    pub fn load(path: Option<&Path>) -> Result<Self, ReplayError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix("PROCTOR")
                .separator("__")
                .try_parsing(true),
        );

        let config: EngineConfig = builder.build()?.try_deserialize()?;
        config.session.validate()?;
        Ok(config)
    }
}
