//! Wire types for the tally client.
//!
//! Organization and entry ids travel as strings here; the service is the
//! one that validates them.

use serde::{Deserialize, Serialize};

/// A consumption authorization request.
#[derive(Debug, Clone, Serialize)]
pub struct ConsumeRequest {
    /// The organization spending credits.
    pub org_id: String,
    /// The feature being used.
    pub feature_type: String,
    /// Number of uses.
    pub quantity: i64,
    /// Idempotency key. Retries with the same key return the original
    /// result and never double-charge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Caller context persisted on the debit entry.
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

/// A consumption result.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsumeResponse {
    /// The debit entry appended. Absent for exempt organizations.
    pub entry_id: Option<String>,
    /// Credits deducted.
    pub credits_consumed: i64,
    /// Balance after the deduction. Absent for exempt organizations.
    pub balance_after: Option<i64>,
    /// Whether the organization is exempt (unmetered).
    pub unlimited: bool,
}

/// A grant request.
#[derive(Debug, Clone, Serialize)]
pub struct GrantRequest {
    /// The organization to credit.
    pub org_id: String,
    /// Credits to add. Strictly positive.
    pub amount: i64,
    /// Where the credits came from (e.g. `"purchase"`, `"promotion"`).
    pub source: String,
    /// Human-readable description.
    pub description: String,
    /// External correlation id (e.g. a payment-event id).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

/// A grant result.
#[derive(Debug, Clone, Deserialize)]
pub struct GrantResponse {
    /// The credit entry appended.
    pub entry_id: String,
    /// Balance after the grant.
    pub balance_after: i64,
}

/// A balance snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResponse {
    /// Organization ID.
    pub org_id: String,
    /// Balance in credits. Absent for exempt organizations.
    pub balance: Option<i64>,
    /// Whether the organization is exempt (unmetered).
    pub unlimited: bool,
}

/// One ledger entry in a history page.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryRecord {
    /// Entry ID.
    pub entry_id: String,
    /// `credit` or `debit`.
    pub kind: String,
    /// Credits moved (positive; sign carried by `kind`).
    pub credits: i64,
    /// Balance snapshot after this entry.
    pub balance_after: i64,
    /// Human-readable description.
    pub description: String,
    /// Creation timestamp, RFC 3339.
    pub created_at: String,
}

/// A page of ledger history, newest first.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    /// Entries on this page.
    pub entries: Vec<EntryRecord>,
    /// Total entries for the organization.
    pub total_count: usize,
    /// Whether more entries exist past this page.
    pub has_more: bool,
}
