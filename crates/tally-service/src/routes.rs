//! Router configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{credits, health, orgs, usage, webhooks};
use crate::state::AppState;

/// Maximum concurrent requests for the consumption endpoint. Consumption
/// carries the high-volume traffic from feature call sites.
const CONSUME_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Organizations (API key)
/// - `POST /v1/orgs` - Signup
/// - `GET /v1/orgs/:org_id` - Lifecycle state
/// - `POST /v1/orgs/:org_id/archive` - Admin archival
/// - `GET /v1/orgs/:org_id/transitions` - Lifecycle audit log
/// - `GET /v1/orgs/:org_id/balance` - Current balance
/// - `GET /v1/orgs/:org_id/history` - Ledger history
///
/// ## Ledger (API key)
/// - `POST /v1/consume` - Authorize and record a consumption
/// - `POST /v1/grants` - Issue a grant
/// - `GET /v1/rates` / `PUT /v1/rates/:feature_type` - Usage rates
/// - `POST /v1/lifecycle/sweep` - Run the expiration sweep
///
/// ## Webhooks (signature verification)
/// - `POST /webhooks/payments` - Payment lifecycle events
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let state = Arc::new(state);

    // Consumption gets its own, higher concurrency limit; everything else
    // shares the general one.
    let consume_routes = Router::new()
        .route("/consume", post(usage::consume))
        .layer(ConcurrencyLimitLayer::new(CONSUME_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Organizations
        .route("/orgs", post(orgs::create_org))
        .route("/orgs/:org_id", get(orgs::get_org))
        .route("/orgs/:org_id/archive", post(orgs::archive_org))
        .route("/orgs/:org_id/transitions", get(orgs::list_transitions))
        .route("/orgs/:org_id/balance", get(credits::get_balance))
        .route("/orgs/:org_id/history", get(credits::list_history))
        // Grants and rates
        .route("/grants", post(credits::grant_credits))
        .route("/rates", get(usage::list_rates))
        .route("/rates/:feature_type", put(usage::put_rate))
        // Lifecycle
        .route("/lifecycle/sweep", post(webhooks::run_sweep))
        .merge(consume_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // API v1
        .nest("/v1", api_routes)
        // Webhooks (no API key; signature-verified, sender-controlled rate)
        .route("/webhooks/payments", post(webhooks::payment_webhook))
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
