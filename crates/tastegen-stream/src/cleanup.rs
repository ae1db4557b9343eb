//! Marker cleanup rules
//!
//! A candidate is cleaned once by an ordered [`CleanupPipeline`]. Order
//! matters: blank-line collapsing assumes trailing whitespace is already
//! gone, and announcement removal assumes the blocks around it are gone.

use crate::config::CheckpointMarkers;
use crate::error::ConfigError;
use regex::Regex;

/// One cleanup pass
#[derive(Debug, Clone)]
pub enum CleanupRule {
    /// Drop complete inner completion blocks, including a trailing line break
    RemoveCompleteBlocks(Regex),
    /// Drop announcement lines, then any inline announcement tokens
    RemoveAnnouncements { line: Regex, token: String },
    /// Drop a block-close token standing alone on its own line
    RemoveOrphanedCloses(Regex),
    /// Strip spaces and tabs at line ends
    TrimTrailingWhitespace(Regex),
    /// Collapse three or more blank lines to two
    CollapseBlankLines(Regex),
    /// Trim the whole text
    TrimEnds,
}

impl CleanupRule {
    /// Complete-block rule for the given tokens
    pub fn remove_complete_blocks(open: &str, close: &str) -> Result<Self, ConfigError> {
        let pattern = format!(
            r"(?s)[ \t]*{}.*?{}[ \t]*(?:\r?\n)?",
            regex::escape(open),
            regex::escape(close)
        );
        Regex::new(&pattern)
            .map(Self::RemoveCompleteBlocks)
            .map_err(|e| ConfigError::invalid_rule("remove_complete_blocks", e))
    }

    /// Announcement rule for the given token
    pub fn remove_announcements(token: &str) -> Result<Self, ConfigError> {
        let pattern = format!(r"(?m)^[ \t]*{}[ \t]*(?:\r?\n)?", regex::escape(token));
        Regex::new(&pattern)
            .map(|line| Self::RemoveAnnouncements {
                line,
                token: token.to_string(),
            })
            .map_err(|e| ConfigError::invalid_rule("remove_announcements", e))
    }

    /// Orphaned-close rule for the given token
    pub fn remove_orphaned_closes(close: &str) -> Result<Self, ConfigError> {
        let pattern = format!(r"(?m)^[ \t]*{}[ \t]*(?:\r?\n)?", regex::escape(close));
        Regex::new(&pattern)
            .map(Self::RemoveOrphanedCloses)
            .map_err(|e| ConfigError::invalid_rule("remove_orphaned_closes", e))
    }

    /// Trailing whitespace rule
    pub fn trim_trailing_whitespace() -> Result<Self, ConfigError> {
        Regex::new(r"(?m)[ \t]+$")
            .map(Self::TrimTrailingWhitespace)
            .map_err(|e| ConfigError::invalid_rule("trim_trailing_whitespace", e))
    }

    /// Blank-line collapsing rule
    pub fn collapse_blank_lines() -> Result<Self, ConfigError> {
        Regex::new(r"\n{4,}")
            .map(Self::CollapseBlankLines)
            .map_err(|e| ConfigError::invalid_rule("collapse_blank_lines", e))
    }

    /// Stable rule name for logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            CleanupRule::RemoveCompleteBlocks(_) => "remove_complete_blocks",
            CleanupRule::RemoveAnnouncements { .. } => "remove_announcements",
            CleanupRule::RemoveOrphanedCloses(_) => "remove_orphaned_closes",
            CleanupRule::TrimTrailingWhitespace(_) => "trim_trailing_whitespace",
            CleanupRule::CollapseBlankLines(_) => "collapse_blank_lines",
            CleanupRule::TrimEnds => "trim_ends",
        }
    }

    /// Apply this rule alone
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        match self {
            CleanupRule::RemoveCompleteBlocks(re)
            | CleanupRule::RemoveOrphanedCloses(re)
            | CleanupRule::TrimTrailingWhitespace(re) => re.replace_all(text, "").into_owned(),
            CleanupRule::RemoveAnnouncements { line, token } => {
                line.replace_all(text, "").replace(token.as_str(), "")
            }
            CleanupRule::CollapseBlankLines(re) => re.replace_all(text, "\n\n\n").into_owned(),
            CleanupRule::TrimEnds => text.trim().to_string(),
        }
    }
}

/// Ordered cleanup rules for one marker set
#[derive(Debug, Clone)]
pub struct CleanupPipeline {
    rules: Vec<CleanupRule>,
}

impl CleanupPipeline {
    /// Standard pipeline for the given markers
    pub fn new(markers: &CheckpointMarkers) -> Result<Self, ConfigError> {
        Ok(Self {
            rules: vec![
                CleanupRule::remove_complete_blocks(&markers.block_open, &markers.block_close)?,
                CleanupRule::remove_announcements(&markers.announcement)?,
                CleanupRule::remove_orphaned_closes(&markers.block_close)?,
                CleanupRule::trim_trailing_whitespace()?,
                CleanupRule::collapse_blank_lines()?,
                CleanupRule::TrimEnds,
            ],
        })
    }

    /// Rules in application order
    #[inline]
    #[must_use]
    pub fn rules(&self) -> &[CleanupRule] {
        &self.rules
    }

    /// Apply every rule once, in order
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        self.rules
            .iter()
            .fold(text.to_string(), |acc, rule| rule.apply(&acc))
    }
}
