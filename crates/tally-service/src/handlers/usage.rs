//! Consumption and usage rate handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use tally_core::Balance;
use tally_engine::ConsumeRequest;

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::handlers::orgs::parse_org_id;
use crate::state::AppState;

/// Consumption request from feature call sites.
#[derive(Debug, Deserialize)]
pub struct ConsumeBody {
    /// The organization spending credits.
    pub org_id: String,
    /// The feature being used.
    pub feature_type: String,
    /// Number of uses.
    pub quantity: i64,
    /// Idempotency key. Retries with the same key return the original
    /// result and never re-debit.
    pub request_id: Option<String>,
    /// Caller context persisted on the debit entry.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Consumption response.
#[derive(Debug, Serialize)]
pub struct ConsumeResponse {
    /// The debit entry appended. Absent for exempt organizations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
    /// Credits deducted.
    pub credits_consumed: i64,
    /// Balance after the deduction. Absent for exempt organizations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_after: Option<i64>,
    /// Whether the organization is exempt (unmetered).
    pub unlimited: bool,
}

/// Authorize and record a consumption.
pub async fn consume(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<ConsumeBody>,
) -> Result<Json<ConsumeResponse>, ApiError> {
    let org_id = parse_org_id(&body.org_id)?;

    let receipt = state.ledger.consume(&ConsumeRequest {
        org_id,
        feature_type: body.feature_type,
        quantity: body.quantity,
        request_id: body.request_id,
        metadata: body.metadata,
    })?;

    Ok(Json(ConsumeResponse {
        entry_id: receipt.entry_id.map(|id| id.to_string()),
        credits_consumed: receipt.credits_consumed,
        balance_after: receipt.balance_after.credits(),
        unlimited: receipt.balance_after == Balance::Unlimited,
    }))
}

/// A usage rate on the wire.
#[derive(Debug, Serialize)]
pub struct RateResponse {
    /// Feature identifier.
    pub feature_type: String,
    /// Credits charged per use.
    pub credits_per_use: i64,
    /// Whether the rate is active.
    pub active: bool,
}

/// Rate listing response.
#[derive(Debug, Serialize)]
pub struct RatesResponse {
    /// All configured rates.
    pub rates: Vec<RateResponse>,
}

/// List configured usage rates.
pub async fn list_rates(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
) -> Result<Json<RatesResponse>, ApiError> {
    let rates = state
        .ledger
        .rates()?
        .into_iter()
        .map(|rate| RateResponse {
            feature_type: rate.feature_type,
            credits_per_use: rate.credits_per_use,
            active: rate.active,
        })
        .collect();
    Ok(Json(RatesResponse { rates }))
}

/// Rate upsert body.
#[derive(Debug, Deserialize)]
pub struct PutRateBody {
    /// Credits charged per use. Strictly positive.
    pub credits_per_use: i64,
    /// Whether the rate is active. Defaults to active.
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

/// Insert or update a usage rate. Past consumption amounts stay frozen in
/// their ledger entries.
pub async fn put_rate(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Path(feature_type): Path<String>,
    Json(body): Json<PutRateBody>,
) -> Result<Json<RateResponse>, ApiError> {
    let rate = state
        .ledger
        .set_rate(&feature_type, body.credits_per_use, body.active)?;
    Ok(Json(RateResponse {
        feature_type: rate.feature_type,
        credits_per_use: rate.credits_per_use,
        active: rate.active,
    }))
}
