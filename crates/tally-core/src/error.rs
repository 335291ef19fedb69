//! Error taxonomy for ledger operations.

use crate::ids::IdError;
use crate::ReadOnlyReason;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur in ledger operations.
///
/// `InsufficientCredits`, `SpendingDisabled`, and `UnknownFeature` are
/// terminal for the calling feature request and carry actionable detail.
/// `Busy` is transient: retrying with the same request id is safe because
/// of idempotency.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// A grant or debit amount was not strictly positive.
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    /// A consumption quantity was not strictly positive (or overflowed the
    /// cost computation).
    #[error("invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// No active usage rate for the requested feature.
    #[error("unknown feature: {0}")]
    UnknownFeature(String),

    /// Balance too low for the requested consumption. No partial debit was
    /// made.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance in credits.
        balance: i64,
        /// Cost of the rejected consumption.
        required: i64,
    },

    /// The organization's lifecycle state forbids spending.
    #[error("spending disabled: {reason}")]
    SpendingDisabled {
        /// Why the organization is read-only.
        reason: ReadOnlyReason,
    },

    /// The per-organization serialization boundary could not be acquired
    /// within the bounded wait. Retryable with the same request id.
    #[error("ledger busy for organization {org_id}")]
    Busy {
        /// The contended organization.
        org_id: String,
    },

    /// Unknown organization.
    #[error("organization not found: {0}")]
    OrgNotFound(String),

    /// Organization already exists (signup replay).
    #[error("organization already exists: {0}")]
    OrgAlreadyExists(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// Storage failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Whether a caller may safely retry the failed operation (with the
    /// same request id, where one was supplied).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }
}
