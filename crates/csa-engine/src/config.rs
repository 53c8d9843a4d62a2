//! Engine configuration, read from the environment with defaults.

use std::time::Duration;

use csa_core::RequirementVersion;

use crate::error::EngineError;

/// Default debounce window between the last edit and the bulk flush.
pub const DEFAULT_DEBOUNCE_MS: u64 = 1000;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Quiet period after the last mutation before a scope is flushed.
    pub debounce: Duration,
    /// Catalog version used when a scope is opened without one.
    pub default_version: RequirementVersion,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            default_version: RequirementVersion::default(),
        }
    }
}

impl EngineConfig {
    /// Read `CSA_DEBOUNCE_MS` and `CSA_DEFAULT_REQUIREMENT_VERSION`.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EngineError> {
        let mut config = Self::default();
        if let Some(raw) = lookup("CSA_DEBOUNCE_MS") {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                EngineError::Config(format!("CSA_DEBOUNCE_MS must be an integer, got {raw:?}"))
            })?;
            config.debounce = Duration::from_millis(ms);
        }
        if let Some(raw) = lookup("CSA_DEFAULT_REQUIREMENT_VERSION") {
            config.default_version = RequirementVersion::new(raw)
                .map_err(|e| EngineError::Config(e.to_string()))?;
        }
        Ok(config)
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}
