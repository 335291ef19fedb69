//! Error types for tally storage.

use tally_core::LedgerError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// What kind of record was missing.
        entity: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// Balance too low for the requested debit.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance in credits.
        balance: i64,
        /// Cost of the rejected debit.
        required: i64,
    },

    /// A receipt for this request id already exists.
    #[error("duplicate request: {request_id}")]
    DuplicateRequest {
        /// The replayed request id.
        request_id: String,
    },

    /// The per-organization lock slot could not be acquired in time.
    #[error("lock timeout for organization {org_id}")]
    Busy {
        /// The contended organization.
        org_id: String,
    },
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Storage(msg),
            StoreError::NotFound { entity, id } => {
                if entity == "organization" {
                    Self::OrgNotFound(id)
                } else {
                    Self::Storage(format!("{entity} not found: {id}"))
                }
            }
            StoreError::InsufficientCredits { balance, required } => {
                Self::InsufficientCredits { balance, required }
            }
            StoreError::DuplicateRequest { request_id } => {
                // Callers resolve duplicates by returning the stored
                // receipt; reaching this conversion means they did not.
                Self::Storage(format!("unresolved duplicate request: {request_id}"))
            }
            StoreError::Busy { org_id } => Self::Busy { org_id },
        }
    }
}
