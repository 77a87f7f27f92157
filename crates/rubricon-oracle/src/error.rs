//! Oracle error types.

use thiserror::Error;

/// Errors from interacting with a scoring oracle.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The oracle answered, but not with usable scoring JSON.
    #[error("malformed oracle reply: {0}")]
    MalformedReply(String),
}

impl OracleError {
    /// Whether retrying the same request can possibly help.
    pub fn is_permanent(&self) -> bool {
        matches!(self, OracleError::ModelNotFound(_))
    }
}
