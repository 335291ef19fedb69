//! The account lifecycle manager.
//!
//! Translates external lifecycle signals (payment webhooks, admin actions)
//! and the periodic expiration sweep into state transitions, maintaining
//! the `credit_spending_enabled` gate the authorizer reads. Every applied
//! transition writes the organization record and an audit record in one
//! atomic batch.
//!
//! The manager is idempotent with respect to replayed external events: a
//! signal that produces no state change (including anything aimed at an
//! `archived` organization) is a successful no-op.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use tally_core::{
    AccountStatus, ActorId, LedgerError, LifecycleSignal, OrgId, Organization, ReadOnlyReason,
    Result, StatusTransition, TransitionTrigger,
};
use tally_store::Store;

use crate::config::EngineConfig;

/// Counters from one expiration sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Organizations examined.
    pub examined: usize,
    /// Organizations that transitioned.
    pub transitioned: usize,
    /// Organizations whose sweep failed (isolated; the sweep continued).
    pub failed: usize,
}

/// The lifecycle state machine driver.
pub struct LifecycleManager<S> {
    store: Arc<S>,
    config: EngineConfig,
}

impl<S: Store> LifecycleManager<S> {
    /// Create a manager over a store.
    #[must_use]
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Create an organization at signup: `trial` state, spending enabled,
    /// trial clock started, signup audit record written.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::OrgAlreadyExists`] if the id is taken.
    pub fn create_org(&self, id: OrgId, name: String) -> Result<Organization> {
        if self.store.get_org(&id)?.is_some() {
            return Err(LedgerError::OrgAlreadyExists(id.to_string()));
        }

        let org = Organization::new(id, name, self.config.trial_period);
        let transition = StatusTransition::record(
            id,
            None,
            AccountStatus::Trial,
            TransitionTrigger::Signup,
            None,
            None,
        );
        self.store.record_transition(&org, &transition)?;

        tracing::info!(org_id = %id, trial_ends_at = %org.trial_ends_at, "Organization created");
        Ok(org)
    }

    /// Get an organization.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::OrgNotFound`] for unknown organizations.
    pub fn get_org(&self, org_id: &OrgId) -> Result<Organization> {
        self.require_org(org_id)
    }

    /// Apply an external lifecycle signal.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::OrgNotFound`] for unknown organizations.
    pub fn apply(&self, org_id: &OrgId, signal: LifecycleSignal) -> Result<Organization> {
        match signal {
            LifecycleSignal::PaymentSucceeded { correlation_id } => {
                self.on_payment_succeeded(org_id, correlation_id)
            }
            LifecycleSignal::PaymentFailed { correlation_id } => {
                self.on_payment_failed(org_id, correlation_id)
            }
            LifecycleSignal::SubscriptionCanceled => self.on_subscription_canceled(org_id),
        }
    }

    /// A charge succeeded: activate the organization and re-open the gate.
    ///
    /// Covers subscription start (`trial`), recovery (`payment_failed`),
    /// and reactivation (`trial_expired`, `unsubscribed`). A renewal on an
    /// already-active organization changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::OrgNotFound`] for unknown organizations.
    pub fn on_payment_succeeded(
        &self,
        org_id: &OrgId,
        correlation_id: Option<String>,
    ) -> Result<Organization> {
        let mut org = self.require_org(org_id)?;
        match org.account_status {
            AccountStatus::Archived | AccountStatus::Active => Ok(org),
            AccountStatus::Trial
            | AccountStatus::TrialExpired
            | AccountStatus::PaymentFailed
            | AccountStatus::Unsubscribed => {
                org.credit_spending_enabled = true;
                org.read_only_reason = None;
                org.grace_period_ends_at = None;
                self.apply_transition(
                    org,
                    AccountStatus::Active,
                    TransitionTrigger::PaymentWebhook,
                    correlation_id,
                    None,
                )
            }
        }
    }

    /// A charge failed: open the grace window.
    ///
    /// Spending stays enabled until `grace_period_ends_at` so a transient
    /// card failure does not lock the tenant out. A repeat failure while
    /// already in `payment_failed` does not extend the window.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::OrgNotFound`] for unknown organizations.
    pub fn on_payment_failed(
        &self,
        org_id: &OrgId,
        correlation_id: Option<String>,
    ) -> Result<Organization> {
        let mut org = self.require_org(org_id)?;
        match org.account_status {
            AccountStatus::Active => {
                org.grace_period_ends_at = Some(Utc::now() + self.config.grace_period);
                self.apply_transition(
                    org,
                    AccountStatus::PaymentFailed,
                    TransitionTrigger::PaymentWebhook,
                    correlation_id,
                    None,
                )
            }
            _ => {
                tracing::debug!(
                    org_id = %org_id,
                    status = %org.account_status,
                    "Ignoring payment failure in current state"
                );
                Ok(org)
            }
        }
    }

    /// The subscription was explicitly cancelled: close the gate.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::OrgNotFound`] for unknown organizations.
    pub fn on_subscription_canceled(&self, org_id: &OrgId) -> Result<Organization> {
        let mut org = self.require_org(org_id)?;
        match org.account_status {
            AccountStatus::Archived | AccountStatus::Unsubscribed => Ok(org),
            _ => {
                org.credit_spending_enabled = false;
                org.read_only_reason = Some(ReadOnlyReason::Unsubscribed);
                org.grace_period_ends_at = None;
                self.apply_transition(
                    org,
                    AccountStatus::Unsubscribed,
                    TransitionTrigger::PaymentWebhook,
                    None,
                    None,
                )
            }
        }
    }

    /// Admin archival: the only destructive transition. Terminal and
    /// idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::OrgNotFound`] for unknown organizations.
    pub fn archive(&self, org_id: &OrgId, actor_id: Option<ActorId>) -> Result<Organization> {
        let mut org = self.require_org(org_id)?;
        if org.account_status.is_terminal() {
            return Ok(org);
        }
        org.credit_spending_enabled = false;
        org.read_only_reason = Some(ReadOnlyReason::Archived);
        org.grace_period_ends_at = None;
        org.archived_at = Some(Utc::now());
        self.apply_transition(
            org,
            AccountStatus::Archived,
            TransitionTrigger::Admin,
            None,
            actor_id,
        )
    }

    /// Run the expiration sweep against the current time.
    ///
    /// # Errors
    ///
    /// Returns an error only if listing organizations fails; per-org
    /// failures are isolated and counted.
    pub fn sweep_expirations(&self) -> Result<SweepOutcome> {
        self.sweep_expirations_at(Utc::now())
    }

    /// Run the expiration sweep against an explicit clock.
    ///
    /// Trials past `trial_ends_at` become `trial_expired`; payment
    /// failures past `grace_period_ends_at` become `archived`. A failure
    /// for one organization never aborts the sweep for the others.
    ///
    /// # Errors
    ///
    /// Returns an error only if listing organizations fails.
    pub fn sweep_expirations_at(&self, now: DateTime<Utc>) -> Result<SweepOutcome> {
        let mut outcome = SweepOutcome::default();
        for org in self.store.list_orgs()? {
            outcome.examined += 1;
            let org_id = org.id;
            match self.sweep_org(org, now) {
                Ok(true) => outcome.transitioned += 1,
                Ok(false) => {}
                Err(e) => {
                    outcome.failed += 1;
                    tracing::warn!(org_id = %org_id, error = %e, "Sweep failed for organization");
                }
            }
        }
        tracing::info!(
            examined = outcome.examined,
            transitioned = outcome.transitioned,
            failed = outcome.failed,
            "Expiration sweep complete"
        );
        Ok(outcome)
    }

    /// Transition audit records for an organization, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::OrgNotFound`] for unknown organizations.
    pub fn transitions(
        &self,
        org_id: &OrgId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StatusTransition>> {
        self.require_org(org_id)?;
        Ok(self.store.list_transitions(org_id, limit, offset)?)
    }

    fn sweep_org(&self, mut org: Organization, now: DateTime<Utc>) -> Result<bool> {
        match org.account_status {
            AccountStatus::Trial if now > org.trial_ends_at => {
                org.credit_spending_enabled = false;
                org.read_only_reason = Some(ReadOnlyReason::TrialExpired);
                self.apply_transition(
                    org,
                    AccountStatus::TrialExpired,
                    TransitionTrigger::Sweep,
                    None,
                    None,
                )?;
                Ok(true)
            }
            AccountStatus::PaymentFailed
                if org.grace_period_ends_at.is_some_and(|ends| now > ends) =>
            {
                org.credit_spending_enabled = false;
                org.read_only_reason = Some(ReadOnlyReason::GraceExpired);
                org.archived_at = Some(now);
                self.apply_transition(
                    org,
                    AccountStatus::Archived,
                    TransitionTrigger::Sweep,
                    None,
                    None,
                )?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn apply_transition(
        &self,
        mut org: Organization,
        to: AccountStatus,
        trigger: TransitionTrigger,
        correlation_id: Option<String>,
        actor_id: Option<ActorId>,
    ) -> Result<Organization> {
        let from = org.account_status;
        org.account_status = to;
        org.updated_at = Utc::now();

        let transition =
            StatusTransition::record(org.id, Some(from), to, trigger, correlation_id, actor_id);
        self.store.record_transition(&org, &transition)?;

        tracing::info!(
            org_id = %org.id,
            from = %from,
            to = %to,
            trigger = trigger.as_str(),
            "Lifecycle transition"
        );
        Ok(org)
    }

    fn require_org(&self, org_id: &OrgId) -> Result<Organization> {
        self.store
            .get_org(org_id)?
            .ok_or_else(|| LedgerError::OrgNotFound(org_id.to_string()))
    }
}
