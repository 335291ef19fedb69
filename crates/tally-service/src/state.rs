//! Application state.

use std::sync::Arc;

use chrono::Duration;

use tally_engine::{CreditLedger, EngineConfig, ExemptionSet, LifecycleManager};
use tally_store::RocksStore;

use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The credit ledger.
    pub ledger: Arc<CreditLedger<RocksStore>>,

    /// The lifecycle manager.
    pub lifecycle: Arc<LifecycleManager<RocksStore>>,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create the application state.
    #[must_use]
    pub fn new(store: Arc<RocksStore>, exemptions: ExemptionSet, config: ServiceConfig) -> Self {
        if config.service_api_key.is_none() {
            tracing::warn!("SERVICE_API_KEY not configured - API is open (development mode)");
        }
        if config.webhook_secret.is_none() {
            tracing::warn!(
                "WEBHOOK_SECRET not configured - webhook signatures will not be verified"
            );
        }
        if !exemptions.is_empty() {
            tracing::info!(count = exemptions.len(), "Metering exemptions configured");
        }

        let engine_config = EngineConfig {
            trial_period: Duration::days(config.trial_days),
            grace_period: Duration::hours(config.grace_period_hours),
        };

        let ledger = Arc::new(CreditLedger::new(Arc::clone(&store), exemptions));
        let lifecycle = Arc::new(LifecycleManager::new(store, engine_config));

        Self {
            ledger,
            lifecycle,
            config,
        }
    }
}
