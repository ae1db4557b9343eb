//! Error types for the streaming core
//!
//! Malformed markers and failed validation are not errors here: they are
//! ordinary outcomes handled inside the pipeline. Only configuration
//! problems and upstream transport failures surface as `Err`.

use crate::scanner::DelimiterRole;

/// Unusable session configuration
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// A delimiter token is empty
    #[error("empty {0} token")]
    EmptyToken(DelimiterRole),

    /// Two roles share the same token
    #[error("token '{token}' is used for both {first} and {second}")]
    DuplicateToken {
        token: String,
        first: DelimiterRole,
        second: DelimiterRole,
    },

    /// Narration output requested without a split delimiter
    #[error("multi-artifact mode requires a split delimiter")]
    MultiArtifactWithoutSplit,

    /// A cleanup rule could not be compiled
    #[error("invalid cleanup rule '{rule}': {source}")]
    InvalidRule {
        rule: &'static str,
        #[source]
        source: regex::Error,
    },
}

impl ConfigError {
    /// Create rule compilation error
    pub fn invalid_rule(rule: &'static str, source: regex::Error) -> Self {
        Self::InvalidRule { rule, source }
    }
}

/// Failures that end a session
#[derive(Debug, Clone, thiserror::Error)]
pub enum StreamError {
    /// The chunk source errored or disconnected
    #[error("upstream stream failed: {0}")]
    Upstream(String),

    /// No chunk arrived within the idle window
    #[error("upstream idle for more than {millis}ms")]
    IdleTimeout { millis: u64 },

    /// Session could not be started
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl StreamError {
    /// Create upstream error from any displayable source error
    pub fn upstream(source: impl std::fmt::Display) -> Self {
        Self::Upstream(source.to_string())
    }
}

/// Failure to hand an event to the downstream consumer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// Consumer went away
    #[error("consumer disconnected")]
    Disconnected,

    /// Consumer refused the event
    #[error("consumer rejected event: {0}")]
    Rejected(String),
}

/// Result type alias for session startup
pub type StreamResult<T> = Result<T, StreamError>;
