//! Background expiration sweep.
//!
//! A single sequential loop: one sweep finishes before the next tick is
//! honored, so the job is never concurrent with itself. Per-organization
//! failures are isolated inside the sweep itself.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::state::AppState;

/// Run the sweep loop forever. Spawn this as a background task.
pub async fn run(state: Arc<AppState>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let lifecycle = Arc::clone(&state.lifecycle);
        // The sweep is synchronous RocksDB work; keep it off the async
        // executor threads.
        match tokio::task::spawn_blocking(move || lifecycle.sweep_expirations()).await {
            Ok(Ok(outcome)) => {
                if outcome.transitioned > 0 || outcome.failed > 0 {
                    tracing::info!(
                        examined = outcome.examined,
                        transitioned = outcome.transitioned,
                        failed = outcome.failed,
                        "Background sweep finished"
                    );
                }
            }
            Ok(Err(e)) => tracing::error!(error = %e, "Background sweep failed"),
            Err(e) => tracing::error!(error = %e, "Background sweep task panicked"),
        }
    }
}
