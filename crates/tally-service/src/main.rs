//! Tally Service - HTTP API for the credit ledger and account lifecycle.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tally_engine::ExemptionSet;
use tally_service::{create_router, AppState, ServiceConfig};
use tally_store::RocksStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tally=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Tally Service");

    let config = ServiceConfig::from_env();
    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        trial_days = config.trial_days,
        grace_period_hours = config.grace_period_hours,
        sweep_interval_seconds = config.sweep_interval_seconds,
        "Service configuration loaded"
    );

    let exemptions = ExemptionSet::from_csv(&config.exempt_org_ids)
        .map_err(|e| format!("invalid EXEMPT_ORG_IDS: {e}"))?;

    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open_with_timeout(
        &config.data_dir,
        Duration::from_millis(config.lock_timeout_ms),
    )?);

    let state = AppState::new(store, exemptions, config.clone());
    state.ledger.seed_default_rates()?;

    // Background expiration sweep: a single-flight periodic job.
    let sweep_state = Arc::new(state.clone());
    tokio::spawn(tally_service::sweep::run(
        sweep_state,
        Duration::from_secs(config.sweep_interval_seconds),
    ));

    let app = create_router(state);
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
