//! Client error types.

use serde::Deserialize;

/// Errors returned by the tally client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (connection, timeout, TLS).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service returned an error response.
    #[error("api error ({status}): {code}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Machine-readable error code (e.g. `insufficient_credits`).
        code: String,
        /// Human-readable message.
        message: String,
        /// Structured error detail, when present.
        details: Option<serde_json::Value>,
    },

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Whether retrying the request (with the same request id) is safe and
    /// likely to help.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Api { code, .. } => code == "busy",
            Self::InvalidResponse(_) => false,
        }
    }
}

/// The service's JSON error envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}
