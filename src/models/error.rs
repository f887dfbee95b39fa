//! Error types for cscorpus.
//!
//! Epistemic taxonomy:
//! - B_i falsified: Expected failures (bad config, malformed data, bad index)
//! - I^B materialized: Infrastructure failures (network, timeout, HTTP status)
//! - K_i violated: Internal invariant violations (bugs)

use thiserror::Error;

/// Top-level error type for cscorpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    // ═══════════════════════════════════════════════════════════════════
    // B_i FALSIFIED - Belief proven wrong (expected failures)
    // ═══════════════════════════════════════════════════════════════════

    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Position {index} is out of range (store holds {len} records)")]
    IndexRange { index: usize, len: usize },

    #[error("Not signed in: select a worker first")]
    NotSignedIn,

    #[error("Parse error: {0}")]
    ParseError(String),

    // ═══════════════════════════════════════════════════════════════════
    // I^B MATERIALIZED - Bounded ignorance became known-bad
    // ═══════════════════════════════════════════════════════════════════

    #[error("Remote call failed: {0}")]
    Remote(#[from] RemoteCallError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ═══════════════════════════════════════════════════════════════════
    // K_i VIOLATED - Invariant broken (bug, should not happen)
    // ═══════════════════════════════════════════════════════════════════

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Remote generation endpoint errors.
#[derive(Debug, Error)]
pub enum RemoteCallError {
    #[error("Authentication failed: credential rejected (status {status})")]
    AuthenticationFailed { status: u16 },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Rate limited by endpoint: retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<f64> },

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl CorpusError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this error is worth another attempt.
    ///
    /// Server-side (5xx) failures, rate limits, timeouts and transport errors
    /// are transient. Auth, not-found, other 4xx and malformed bodies are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Network(_) => true,
            Self::Remote(RemoteCallError::RateLimited { .. }) => true,
            Self::Remote(RemoteCallError::ApiError { status, .. }) => *status >= 500,
            _ => false,
        }
    }

    /// Get retry delay hint in seconds, if applicable.
    pub fn retry_after(&self) -> Option<f64> {
        match self {
            Self::Remote(RemoteCallError::RateLimited { retry_after_secs }) => *retry_after_secs,
            _ => None,
        }
    }
}

/// Result type alias for cscorpus.
pub type Result<T> = std::result::Result<T, CorpusError>;
