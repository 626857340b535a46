//! Error types for phishscan.

use std::time::Duration;

/// Top-level error type for the crate.
///
/// The core analysis path never surfaces these: model-call failures are
/// downgraded to "AI analysis unavailable" at the analyzer boundary, and the
/// fusion stage is total. These errors appear only at the outer boundaries
/// (provider construction, email ingestion, configuration).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Email ingestion errors. Only raw RFC 822 parsing can fail; an
/// `EmailMessage` built directly from fields is always valid (missing text
/// is treated as empty).
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Failed to parse email: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Model-call errors.
///
/// The analyzer treats every variant uniformly as "analysis unavailable";
/// the distinction matters only for logging and for the retry wrapper, which
/// retries transient failures and nothing else.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Model call timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RequestFailed { .. } | Self::RateLimited { .. })
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
