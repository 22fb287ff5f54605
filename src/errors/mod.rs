use thiserror::Error;

/// Typed error hierarchy for autocrab.
///
/// Use at module boundaries (provider calls, tool dispatch, config validation).
/// Internal/leaf functions can continue using `anyhow::Result` — the `Internal` variant
/// allows seamless conversion via the `?` operator.
#[derive(Debug, Error)]
pub enum AutocrabError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {message}")]
    Provider { message: String, retryable: bool },

    #[error("Tool error: {tool}: {message}")]
    Tool { tool: String, message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AutocrabError {
    /// Whether this error is transient and the operation could be retried by a supervisor.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider { retryable, .. } => *retryable,
            Self::Internal(_) => true,
            Self::Config(_) | Self::Tool { .. } => false,
        }
    }
}
