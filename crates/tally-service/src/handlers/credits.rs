//! Credit balance, history, and grant handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use tally_core::{ActorId, Balance, CreditSource, LedgerEntry};
use tally_engine::GrantRequest;

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::handlers::orgs::parse_org_id;
use crate::state::AppState;

/// Default history page size.
const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Maximum history page size.
const MAX_HISTORY_LIMIT: usize = 200;

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Organization ID.
    pub org_id: String,
    /// Balance in credits. Absent for exempt organizations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<i64>,
    /// Whether the organization is exempt (unmetered).
    pub unlimited: bool,
}

/// Get the current balance for an organization.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(org_id): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let org_id = parse_org_id(&org_id)?;
    let balance = state.ledger.balance(&org_id)?;

    Ok(Json(BalanceResponse {
        org_id: org_id.to_string(),
        balance: balance.credits(),
        unlimited: balance == Balance::Unlimited,
    }))
}

/// History query parameters.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Page size (default 50, max 200).
    pub limit: Option<usize>,
    /// Entries to skip.
    pub offset: Option<usize>,
}

/// A ledger entry on the wire.
#[derive(Debug, Serialize)]
pub struct EntryResponse {
    /// Entry ID.
    pub entry_id: String,
    /// `credit` or `debit`.
    pub kind: tally_core::EntryKind,
    /// Credits moved (positive; sign carried by `kind`).
    pub credits: i64,
    /// Balance snapshot after this entry.
    pub balance_after: i64,
    /// The economic event behind the entry.
    pub source: tally_core::EntrySource,
    /// Human-readable description.
    pub description: String,
    /// External correlation id, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Caller idempotency key, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Creation timestamp, RFC 3339.
    pub created_at: String,
}

impl From<&LedgerEntry> for EntryResponse {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            entry_id: entry.id.to_string(),
            kind: entry.kind,
            credits: entry.credits,
            balance_after: entry.balance_after,
            source: entry.source.clone(),
            description: entry.description.clone(),
            correlation_id: entry.correlation_id.clone(),
            request_id: entry.request_id.clone(),
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

/// History response.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Entries on this page, newest first.
    pub entries: Vec<EntryResponse>,
    /// Total entries for the organization.
    pub total_count: usize,
    /// Whether more entries exist past this page.
    pub has_more: bool,
}

/// List ledger history for an organization.
pub async fn list_history(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(org_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let org_id = parse_org_id(&org_id)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let page = state.ledger.history(&org_id, limit, offset)?;
    Ok(Json(HistoryResponse {
        entries: page.entries.iter().map(EntryResponse::from).collect(),
        total_count: page.total_count,
        has_more: page.has_more,
    }))
}

/// Grant request body.
#[derive(Debug, Deserialize)]
pub struct GrantBody {
    /// The organization to credit.
    pub org_id: String,
    /// Credits to add. Strictly positive.
    pub amount: i64,
    /// Where the credits came from.
    pub source: CreditSource,
    /// Human-readable description.
    pub description: String,
    /// External correlation id (e.g. a payment-event id).
    pub correlation_id: Option<String>,
    /// The administrator responsible, for admin grants.
    pub actor_id: Option<String>,
}

/// Grant response.
#[derive(Debug, Serialize)]
pub struct GrantResponse {
    /// The credit entry appended.
    pub entry_id: String,
    /// Balance after the grant.
    pub balance_after: i64,
}

/// Issue a grant.
pub async fn grant_credits(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<GrantBody>,
) -> Result<Json<GrantResponse>, ApiError> {
    let org_id = parse_org_id(&body.org_id)?;
    let actor_id = body
        .actor_id
        .map(|raw| raw.parse::<ActorId>())
        .transpose()
        .map_err(|_| ApiError::BadRequest("Invalid actor ID".into()))?;

    let outcome = state.ledger.grant(&GrantRequest {
        org_id,
        amount: body.amount,
        source: body.source,
        description: body.description,
        correlation_id: body.correlation_id,
        actor_id,
    })?;

    Ok(Json(GrantResponse {
        entry_id: outcome.entry_id.to_string(),
        balance_after: outcome.balance_after,
    }))
}
