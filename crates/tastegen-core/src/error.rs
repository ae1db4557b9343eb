//! Error types for host orchestration
//!
//! Covers configuration loading and session task failures. Failures inside
//! a session are reported through its events and summary, not here.

use std::path::PathBuf;
use tastegen_stream::ConfigError;

/// Orchestration error type
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Config file is not valid JSON for this schema
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// Orchestrator settings are unusable
    #[error("invalid orchestrator config: {0}")]
    Invalid(String),

    /// Session settings are unusable
    #[error("invalid session config: {0}")]
    Session(#[from] ConfigError),

    /// A session task panicked or was aborted
    #[error("session task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl OrchestratorError {
    /// Create IO error for a config path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_error_wraps_config_error() {
        let err: OrchestratorError = ConfigError::MultiArtifactWithoutSplit.into();
        assert_eq!(
            err.to_string(),
            "invalid session config: multi-artifact mode requires a split delimiter"
        );
    }

    #[test]
    fn io_error_names_path() {
        let err = OrchestratorError::io(
            "/tmp/missing.toml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.to_string(), "failed to read config /tmp/missing.toml: gone");
    }
}
