//! Engine configuration.

use chrono::Duration;

/// Time-based lifecycle policy.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Length of the signup trial window.
    pub trial_period: Duration,

    /// Grace window after a payment failure during which spending stays
    /// enabled pending recovery.
    pub grace_period: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trial_period: Duration::days(14),
            grace_period: Duration::hours(72),
        }
    }
}
