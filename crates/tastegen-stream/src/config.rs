//! Session configuration
//!
//! The call sites this crate serves differ only in delimiter configuration
//! and artifact kind, so one [`SessionConfig`] parameterizes the whole state
//! machine. A config is compiled into a [`SessionPlan`] once, after
//! validation.

use crate::cleanup::CleanupPipeline;
use crate::error::ConfigError;
use crate::extractor::CheckpointExtractor;
use crate::repair::RepairPipeline;
use crate::scanner::{Delimiter, DelimiterRole, MarkerScanner};
use crate::validator::ArtifactValidator;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tastegen_artifact::ArtifactKind;

/// Default narration → payload delimiter
pub const DEFAULT_SPLIT_DELIMITER: &str = "$GENERATING";

/// Default checkpoint announcement token
pub const DEFAULT_ANNOUNCEMENT: &str = "// $CHECKPOINT";

/// Default completion block opener
pub const DEFAULT_BLOCK_OPEN: &str = "/*$COMPLETION";

/// Default completion block closer
pub const DEFAULT_BLOCK_CLOSE: &str = "$END_COMPLETION*/";

/// Checkpoint delimiter pair: an outer announcement and an inner block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointMarkers {
    /// Single-line announcement token
    pub announcement: String,
    /// Opens the completion block
    pub block_open: String,
    /// Closes the completion block
    pub block_close: String,
}

impl CheckpointMarkers {
    /// Create marker set
    #[must_use]
    pub fn new(
        announcement: impl Into<String>,
        block_open: impl Into<String>,
        block_close: impl Into<String>,
    ) -> Self {
        Self {
            announcement: announcement.into(),
            block_open: block_open.into(),
            block_close: block_close.into(),
        }
    }

    /// Delimiters for the checkpoint tokens
    #[must_use]
    pub fn delimiters(&self) -> Vec<Delimiter> {
        vec![
            Delimiter::new(DelimiterRole::Announcement, self.announcement.clone()),
            Delimiter::new(DelimiterRole::BlockOpen, self.block_open.clone()),
            Delimiter::new(DelimiterRole::BlockClose, self.block_close.clone()),
        ]
    }
}

impl Default for CheckpointMarkers {
    fn default() -> Self {
        Self::new(DEFAULT_ANNOUNCEMENT, DEFAULT_BLOCK_OPEN, DEFAULT_BLOCK_CLOSE)
    }
}

/// Per-session configuration, supplied at session start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Narration → payload delimiter; absent for checkpoint-only flows
    pub split_delimiter: Option<String>,
    /// Checkpoint tokens
    pub markers: CheckpointMarkers,
    /// Selects the validation rules
    pub artifact_kind: ArtifactKind,
    /// Emit narration alongside code
    pub multi_artifact: bool,
    /// Fail the session if no chunk arrives for this long
    pub idle_timeout_ms: Option<u64>,
    /// Attempt to unwrap a final artifact that arrived in another serialization
    pub repair: bool,
}

impl SessionConfig {
    /// Checkpoint-only React component session
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Narration then code, separated by `$GENERATING`
    #[must_use]
    pub fn narration_and_code() -> Self {
        Self::new()
            .with_split_delimiter(DEFAULT_SPLIT_DELIMITER)
            .with_multi_artifact(true)
    }

    /// Code only, progress announced through checkpoints
    #[must_use]
    pub fn checkpoint_only() -> Self {
        Self::new()
    }

    /// Progressive screen streaming: one React component per screen
    #[must_use]
    pub fn screen_stream() -> Self {
        Self::new()
            .with_artifact_kind(ArtifactKind::ReactComponent)
            .with_idle_timeout(Duration::from_secs(120))
    }

    /// Look up a preset by name
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "narration_and_code" | "narration-and-code" => Some(Self::narration_and_code()),
            "checkpoint_only" | "checkpoint-only" => Some(Self::checkpoint_only()),
            "screen_stream" | "screen-stream" => Some(Self::screen_stream()),
            _ => None,
        }
    }

    /// With split delimiter
    #[must_use]
    pub fn with_split_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.split_delimiter = Some(delimiter.into());
        self
    }

    /// With checkpoint markers
    #[must_use]
    pub fn with_markers(mut self, markers: CheckpointMarkers) -> Self {
        self.markers = markers;
        self
    }

    /// With artifact kind
    #[must_use]
    pub fn with_artifact_kind(mut self, kind: ArtifactKind) -> Self {
        self.artifact_kind = kind;
        self
    }

    /// With multi-artifact mode
    #[must_use]
    pub fn with_multi_artifact(mut self, enabled: bool) -> Self {
        self.multi_artifact = enabled;
        self
    }

    /// With idle timeout
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// With final-artifact repair
    #[must_use]
    pub fn with_repair(mut self, enabled: bool) -> Self {
        self.repair = enabled;
        self
    }

    /// Idle timeout as a duration
    #[must_use]
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_ms.map(Duration::from_millis)
    }

    /// Every configured delimiter, split first
    #[must_use]
    pub fn delimiters(&self) -> Vec<Delimiter> {
        let mut all = Vec::with_capacity(4);
        if let Some(split) = &self.split_delimiter {
            all.push(Delimiter::new(DelimiterRole::Split, split.clone()));
        }
        all.extend(self.markers.delimiters());
        all
    }

    /// Check the configuration is usable
    ///
    /// # Errors
    /// - `ConfigError::EmptyToken` for an empty delimiter
    /// - `ConfigError::DuplicateToken` if two roles share a token
    /// - `ConfigError::MultiArtifactWithoutSplit` for narration without a split
    pub fn validate(&self) -> Result<(), ConfigError> {
        let delimiters = self.delimiters();
        for d in &delimiters {
            if d.token.is_empty() {
                return Err(ConfigError::EmptyToken(d.role));
            }
        }
        for (i, a) in delimiters.iter().enumerate() {
            if let Some(b) = delimiters[i + 1..].iter().find(|b| b.token == a.token) {
                return Err(ConfigError::DuplicateToken {
                    token: a.token.clone(),
                    first: a.role,
                    second: b.role,
                });
            }
        }
        if self.multi_artifact && self.split_delimiter.is_none() {
            return Err(ConfigError::MultiArtifactWithoutSplit);
        }
        Ok(())
    }

    /// Validate and compile
    ///
    /// # Errors
    /// Any error from [`SessionConfig::validate`] or rule compilation
    pub fn compile(&self) -> Result<SessionPlan, ConfigError> {
        SessionPlan::new(self.clone())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            split_delimiter: None,
            markers: CheckpointMarkers::default(),
            artifact_kind: ArtifactKind::ReactComponent,
            multi_artifact: false,
            idle_timeout_ms: None,
            repair: true,
        }
    }
}

/// Compiled, immutable machinery for one session configuration
#[derive(Debug, Clone)]
pub struct SessionPlan {
    config: SessionConfig,
    narration_scanner: MarkerScanner,
    payload_scanner: MarkerScanner,
    extractor: CheckpointExtractor,
    validator: ArtifactValidator,
    repair: RepairPipeline,
}

impl SessionPlan {
    /// Validate and compile a configuration
    ///
    /// # Errors
    /// Any error from [`SessionConfig::validate`] or rule compilation
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let cleanup = CleanupPipeline::new(&config.markers)?;
        let residual: Vec<String> = config.delimiters().into_iter().map(|d| d.token).collect();
        Ok(Self {
            narration_scanner: MarkerScanner::new(config.delimiters()),
            payload_scanner: MarkerScanner::new(config.markers.delimiters()),
            extractor: CheckpointExtractor::new(config.markers.clone(), cleanup),
            validator: ArtifactValidator::new(config.artifact_kind.rules(), residual),
            repair: RepairPipeline::standard(),
            config,
        })
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Scanner for the region before the split (all delimiters)
    #[inline]
    #[must_use]
    pub fn narration_scanner(&self) -> &MarkerScanner {
        &self.narration_scanner
    }

    /// Scanner for the payload region (checkpoint tokens only)
    #[inline]
    #[must_use]
    pub fn payload_scanner(&self) -> &MarkerScanner {
        &self.payload_scanner
    }

    #[inline]
    #[must_use]
    pub fn extractor(&self) -> &CheckpointExtractor {
        &self.extractor
    }

    #[inline]
    #[must_use]
    pub fn validator(&self) -> &ArtifactValidator {
        &self.validator
    }

    #[inline]
    #[must_use]
    pub fn repair(&self) -> &RepairPipeline {
        &self.repair
    }
}
