//! Payment lifecycle webhook and sweep handlers.
//!
//! The payment processor is an external event source. Its payloads arrive
//! as a closed tagged set and are translated immediately into lifecycle
//! manager calls; the external shape never leaks further in.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use tally_core::LifecycleSignal;

use crate::auth::ServiceAuth;
use crate::crypto::{constant_time_eq, hmac_sha256_hex};
use crate::error::ApiError;
use crate::handlers::orgs::parse_org_id;
use crate::state::AppState;

/// Signature header for payment webhooks.
pub const SIGNATURE_HEADER: &str = "x-tally-signature";

/// Payment lifecycle event payload.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentEvent {
    /// A charge succeeded.
    PaymentSucceeded {
        /// The organization the charge belongs to.
        org_id: String,
        /// Payment-processor event id.
        correlation_id: Option<String>,
    },
    /// A charge failed.
    PaymentFailed {
        /// The organization the charge belongs to.
        org_id: String,
        /// Payment-processor event id.
        correlation_id: Option<String>,
    },
    /// The subscription was cancelled.
    SubscriptionCanceled {
        /// The organization that cancelled.
        org_id: String,
    },
}

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the event was processed.
    pub received: bool,
    /// The organization's state after the event.
    pub account_status: String,
}

/// Handle a payment lifecycle webhook.
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    if let Some(secret) = &state.config.webhook_secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::BadRequest("Missing webhook signature".into()))?;

        let expected = hmac_sha256_hex(secret, &body);
        if !constant_time_eq(signature, &expected) {
            tracing::warn!("Invalid webhook signature");
            return Err(ApiError::BadRequest("Invalid webhook signature".into()));
        }
    }

    let event: PaymentEvent =
        serde_json::from_str(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let (org_id, signal) = match event {
        PaymentEvent::PaymentSucceeded {
            org_id,
            correlation_id,
        } => (org_id, LifecycleSignal::PaymentSucceeded { correlation_id }),
        PaymentEvent::PaymentFailed {
            org_id,
            correlation_id,
        } => (org_id, LifecycleSignal::PaymentFailed { correlation_id }),
        PaymentEvent::SubscriptionCanceled { org_id } => {
            (org_id, LifecycleSignal::SubscriptionCanceled)
        }
    };

    let org_id = parse_org_id(&org_id)?;
    tracing::info!(org_id = %org_id, signal = ?signal, "Received payment webhook");

    let org = state.lifecycle.apply(&org_id, signal)?;

    Ok(Json(WebhookResponse {
        received: true,
        account_status: org.account_status.as_str().to_string(),
    }))
}

/// Sweep response.
#[derive(Debug, Serialize)]
pub struct SweepResponse {
    /// Organizations examined.
    pub examined: usize,
    /// Organizations that transitioned.
    pub transitioned: usize,
    /// Organizations whose sweep failed.
    pub failed: usize,
}

/// Run the expiration sweep on demand (admin/cron entry point). The same
/// sweep also runs on the background interval.
pub async fn run_sweep(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
) -> Result<Json<SweepResponse>, ApiError> {
    let lifecycle = Arc::clone(&state.lifecycle);
    let outcome = tokio::task::spawn_blocking(move || lifecycle.sweep_expirations())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(SweepResponse {
        examined: outcome.examined,
        transitioned: outcome.transitioned,
        failed: outcome.failed,
    }))
}
