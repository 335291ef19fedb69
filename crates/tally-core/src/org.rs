//! Organization account state.
//!
//! An `Organization` is the tenant the ledger bills. Lifecycle fields are
//! mutated only by the lifecycle manager; everything that spends credits
//! consults `credit_spending_enabled` before touching the ledger.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::OrgId;

/// A tenant organization.
///
/// Organizations are soft-archived, never deleted, because ledger entries
/// reference them indefinitely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    /// The organization ID (from the platform).
    pub id: OrgId,

    /// Display name.
    pub name: String,

    /// Current lifecycle state.
    pub account_status: AccountStatus,

    /// Whether consumption is currently permitted. Derived from the
    /// lifecycle state, denormalized here so the authorizer reads one flag.
    pub credit_spending_enabled: bool,

    /// Why spending is disabled, when it is.
    pub read_only_reason: Option<ReadOnlyReason>,

    /// When the trial started.
    pub trial_started_at: DateTime<Utc>,

    /// When the trial ends.
    pub trial_ends_at: DateTime<Utc>,

    /// End of the payment-failure grace window, while one is open.
    pub grace_period_ends_at: Option<DateTime<Utc>>,

    /// When the organization was archived, if it was.
    pub archived_at: Option<DateTime<Utc>>,

    /// When the organization was created.
    pub created_at: DateTime<Utc>,

    /// When the organization was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Create a new organization at signup: `trial` state, spending
    /// enabled, trial clock started.
    #[must_use]
    pub fn new(id: OrgId, name: String, trial_period: Duration) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            account_status: AccountStatus::Trial,
            credit_spending_enabled: true,
            read_only_reason: None,
            trial_started_at: now,
            trial_ends_at: now + trial_period,
            grace_period_ends_at: None,
            archived_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Lifecycle state of an organization account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// In the signup trial window; spending enabled.
    Trial,

    /// Paying subscriber; spending enabled.
    Active,

    /// Trial ended without a subscription; read-only.
    TrialExpired,

    /// A charge failed; spending still enabled until the grace window
    /// closes.
    PaymentFailed,

    /// Explicitly cancelled; read-only.
    Unsubscribed,

    /// Soft-deleted. Terminal.
    Archived,
}

impl AccountStatus {
    /// Whether this state permits credit spending.
    #[must_use]
    pub const fn allows_spending(self) -> bool {
        matches!(self, Self::Trial | Self::Active | Self::PaymentFailed)
    }

    /// Whether this state is terminal. Transition requests against a
    /// terminal state are no-ops.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Archived)
    }

    /// The state name as a string, as it appears on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Active => "active",
            Self::TrialExpired => "trial_expired",
            Self::PaymentFailed => "payment_failed",
            Self::Unsubscribed => "unsubscribed",
            Self::Archived => "archived",
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an organization is read-only.
///
/// Carried on `SpendingDisabled` errors so call sites can show actionable
/// messaging (prompt plan resolution vs. payment retry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadOnlyReason {
    /// Trial ended without a subscription.
    TrialExpired,

    /// Payment failure was never recovered within the grace window.
    GraceExpired,

    /// Subscription was cancelled.
    Unsubscribed,

    /// Organization was archived.
    Archived,
}

impl ReadOnlyReason {
    /// The reason as a string, as it appears on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TrialExpired => "trial_expired",
            Self::GraceExpired => "grace_expired",
            Self::Unsubscribed => "unsubscribed",
            Self::Archived => "archived",
        }
    }
}

impl std::fmt::Display for ReadOnlyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_org_starts_in_trial() {
        let org = Organization::new(OrgId::generate(), "Acme".into(), Duration::days(14));
        assert_eq!(org.account_status, AccountStatus::Trial);
        assert!(org.credit_spending_enabled);
        assert!(org.read_only_reason.is_none());
        assert!(org.trial_ends_at > org.trial_started_at);
        assert!(org.grace_period_ends_at.is_none());
        assert!(org.archived_at.is_none());
    }

    #[test]
    fn spending_states() {
        assert!(AccountStatus::Trial.allows_spending());
        assert!(AccountStatus::Active.allows_spending());
        assert!(AccountStatus::PaymentFailed.allows_spending());
        assert!(!AccountStatus::TrialExpired.allows_spending());
        assert!(!AccountStatus::Unsubscribed.allows_spending());
        assert!(!AccountStatus::Archived.allows_spending());
    }

    #[test]
    fn only_archived_is_terminal() {
        assert!(AccountStatus::Archived.is_terminal());
        assert!(!AccountStatus::Trial.is_terminal());
        assert!(!AccountStatus::Unsubscribed.is_terminal());
    }
}
