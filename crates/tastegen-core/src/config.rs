//! Orchestrator configuration
//!
//! Loaded from TOML or JSON. The embedded [`SessionConfig`] is shared by
//! every session the orchestrator starts.

use crate::error::{OrchestratorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tastegen_stream::SessionConfig;

/// Host-side settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Sessions allowed in flight at once
    pub max_concurrent_sessions: usize,
    /// Per-session verdict cache bound; 0 disables the cache
    pub verdict_cache_capacity: u64,
    /// Configuration for every session
    pub session: SessionConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: 8,
            verdict_cache_capacity: 256,
            session: SessionConfig::screen_stream(),
        }
    }
}

impl OrchestratorConfig {
    /// Create config with defaults
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With concurrency limit
    #[must_use]
    pub fn with_max_concurrent_sessions(mut self, max: usize) -> Self {
        self.max_concurrent_sessions = max;
        self
    }

    /// With verdict cache capacity
    #[must_use]
    pub fn with_verdict_cache_capacity(mut self, capacity: u64) -> Self {
        self.verdict_cache_capacity = capacity;
        self
    }

    /// With session config
    #[must_use]
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Parse from TOML
    ///
    /// # Errors
    /// Parse or validation failure
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from JSON
    ///
    /// # Errors
    /// Parse or validation failure
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; `.json` files are read as JSON, anything else as TOML
    ///
    /// # Errors
    /// IO, parse or validation failure
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| OrchestratorError::io(path, e))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        tracing::debug!(path = %path.display(), is_json, "loading orchestrator config");
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }

    /// Check settings
    ///
    /// # Errors
    /// - `OrchestratorError::Invalid` for a zero concurrency limit
    /// - `OrchestratorError::Session` for an unusable session config
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_sessions == 0 {
            return Err(OrchestratorError::Invalid(
                "max_concurrent_sessions must be at least 1".to_string(),
            ));
        }
        self.session.validate()?;
        Ok(())
    }
}
