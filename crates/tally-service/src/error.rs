//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use tally_core::{LedgerError, ReadOnlyReason};

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// No active rate for the requested feature.
    #[error("unknown feature: {0}")]
    UnknownFeature(String),

    /// Balance too low. The caller should prompt a top-up.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance in credits.
        balance: i64,
        /// Cost of the rejected consumption.
        required: i64,
    },

    /// The organization's lifecycle state forbids spending. The caller
    /// should prompt plan or payment resolution.
    #[error("spending disabled: {reason}")]
    SpendingDisabled {
        /// Why the organization is read-only.
        reason: ReadOnlyReason,
    },

    /// Ledger contention timeout. Transient; safe to retry with the same
    /// request id.
    #[error("ledger busy: {0}")]
    Busy(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::UnknownFeature(feature) => (
                StatusCode::BAD_REQUEST,
                "unknown_feature",
                self.to_string(),
                Some(serde_json::json!({ "feature_type": feature })),
            ),
            Self::InsufficientCredits { balance, required } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_credits",
                self.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::SpendingDisabled { reason } => (
                StatusCode::FORBIDDEN,
                "spending_disabled",
                self.to_string(),
                Some(serde_json::json!({ "reason": reason })),
            ),
            Self::Busy(org_id) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "busy",
                self.to_string(),
                Some(serde_json::json!({
                    "org_id": org_id,
                    "retryable": true
                })),
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidAmount(_)
            | LedgerError::InvalidQuantity(_)
            | LedgerError::InvalidId(_) => Self::BadRequest(err.to_string()),
            LedgerError::UnknownFeature(feature) => Self::UnknownFeature(feature),
            LedgerError::InsufficientCredits { balance, required } => {
                Self::InsufficientCredits { balance, required }
            }
            LedgerError::SpendingDisabled { reason } => Self::SpendingDisabled { reason },
            LedgerError::Busy { org_id } => Self::Busy(org_id),
            LedgerError::OrgNotFound(id) => Self::NotFound(format!("organization not found: {id}")),
            LedgerError::OrgAlreadyExists(id) => {
                Self::Conflict(format!("organization already exists: {id}"))
            }
            LedgerError::Storage(msg) => Self::Internal(msg),
        }
    }
}
