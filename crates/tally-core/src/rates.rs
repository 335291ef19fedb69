//! Usage rates: credit cost per metered feature use.
//!
//! Rates are administrator-mutated and read by the authorizer at
//! consumption time. The rate in effect when a consumption is recorded is
//! frozen into that ledger entry; changing a rate never rewrites history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The credit cost of one use of a feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRate {
    /// Feature identifier, e.g. `"post_generation"`.
    pub feature_type: String,

    /// Credits charged per use.
    pub credits_per_use: i64,

    /// Inactive rates are ignored by the authorizer; consuming a feature
    /// with no active rate fails.
    pub active: bool,

    /// When the rate was last changed.
    pub updated_at: DateTime<Utc>,
}

impl UsageRate {
    /// Create an active rate.
    #[must_use]
    pub fn new(feature_type: impl Into<String>, credits_per_use: i64) -> Self {
        Self {
            feature_type: feature_type.into(),
            credits_per_use,
            active: true,
            updated_at: Utc::now(),
        }
    }
}

/// The rate table the platform ships with. Seeded into the store on first
/// boot; administrators adjust it from there.
#[must_use]
pub fn default_rates() -> Vec<UsageRate> {
    vec![
        UsageRate::new("post_generation", 2),
        UsageRate::new("assistant_message", 1),
        UsageRate::new("lead_enrichment", 5),
        UsageRate::new("image_generation", 4),
        UsageRate::new("report_export", 3),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rates_are_active_and_positive() {
        let rates = default_rates();
        assert!(!rates.is_empty());
        for rate in rates {
            assert!(rate.active, "{} inactive", rate.feature_type);
            assert!(rate.credits_per_use > 0, "{} non-positive", rate.feature_type);
        }
    }

    #[test]
    fn default_rates_have_unique_features() {
        let rates = default_rates();
        let mut features: Vec<_> = rates.iter().map(|r| r.feature_type.as_str()).collect();
        features.sort_unstable();
        features.dedup();
        assert_eq!(features.len(), rates.len());
    }
}
