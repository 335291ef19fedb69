//! The credit ledger facade: consumption authorization, grant issuance,
//! and balance/history reads.

use std::sync::Arc;

use tally_core::{
    ActorId, Balance, ConsumeReceipt, CreditSource, EntryId, LedgerEntry, LedgerError, OrgId,
    ReadOnlyReason, Result, UsageRate,
};
use tally_store::{ConsumptionDraft, GrantDraft, Store, StoreError};

use crate::exempt::ExemptionSet;

/// A consumption authorization request.
#[derive(Debug, Clone)]
pub struct ConsumeRequest {
    /// The organization spending credits.
    pub org_id: OrgId,
    /// The feature being used.
    pub feature_type: String,
    /// Number of uses. Strictly positive.
    pub quantity: i64,
    /// Caller-supplied idempotency key. Retries with the same key return
    /// the original receipt and never re-debit.
    pub request_id: Option<String>,
    /// Caller context persisted on the debit entry.
    pub metadata: serde_json::Value,
}

/// A grant request.
#[derive(Debug, Clone)]
pub struct GrantRequest {
    /// The organization receiving credits.
    pub org_id: OrgId,
    /// Credits to add. Strictly positive.
    pub amount: i64,
    /// Where the credits came from.
    pub source: CreditSource,
    /// Human-readable description.
    pub description: String,
    /// External correlation id (e.g. a payment-event id).
    pub correlation_id: Option<String>,
    /// The administrator responsible, for admin grants.
    pub actor_id: Option<ActorId>,
}

/// The result of a grant.
#[derive(Debug, Clone)]
pub struct GrantOutcome {
    /// The credit entry appended.
    pub entry_id: EntryId,
    /// Balance after the grant.
    pub balance_after: i64,
}

/// A page of ledger history, newest first.
#[derive(Debug, Clone)]
pub struct HistoryPage {
    /// The entries on this page.
    pub entries: Vec<LedgerEntry>,
    /// Total entries for the organization.
    pub total_count: usize,
    /// Whether more entries exist past this page.
    pub has_more: bool,
}

/// The credit ledger.
///
/// Wraps a [`Store`] with the authorization pipeline: exemption bypass,
/// idempotent replay, the lifecycle spending gate, rate lookup, and the
/// atomic check-then-debit.
pub struct CreditLedger<S> {
    store: Arc<S>,
    exemptions: ExemptionSet,
}

impl<S: Store> CreditLedger<S> {
    /// Create a ledger over a store.
    #[must_use]
    pub fn new(store: Arc<S>, exemptions: ExemptionSet) -> Self {
        Self { store, exemptions }
    }

    /// Seed the default rate table for any feature that has no rate yet.
    /// Existing rates are left alone; administrators own them after first
    /// boot.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn seed_default_rates(&self) -> Result<()> {
        for rate in tally_core::default_rates() {
            if self.store.get_rate(&rate.feature_type)?.is_none() {
                tracing::info!(feature = %rate.feature_type, credits = rate.credits_per_use, "Seeding default usage rate");
                self.store.put_rate(&rate)?;
            }
        }
        Ok(())
    }

    /// Current balance for an organization.
    ///
    /// Exempt organizations report [`Balance::Unlimited`]. For everyone
    /// else the value is recomputed from the entry stream.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::OrgNotFound`] for unknown organizations.
    pub fn balance(&self, org_id: &OrgId) -> Result<Balance> {
        if self.exemptions.is_exempt(org_id) {
            return Ok(Balance::Unlimited);
        }
        self.require_org(org_id)?;
        Ok(Balance::Metered(self.store.balance_of(org_id)?))
    }

    /// Authorize and record a consumption.
    ///
    /// Pipeline: validate quantity → exemption bypass → idempotent replay
    /// → lifecycle gate → rate lookup → atomic conditional debit → receipt.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidQuantity`] for non-positive quantities.
    /// - [`LedgerError::SpendingDisabled`] when the lifecycle gate is
    ///   closed; carries the read-only reason.
    /// - [`LedgerError::UnknownFeature`] when no active rate exists.
    /// - [`LedgerError::InsufficientCredits`] when the balance does not
    ///   cover the cost; no partial debit is made.
    /// - [`LedgerError::Busy`] when the per-organization lock could not be
    ///   acquired; retry with the same request id.
    pub fn consume(&self, req: &ConsumeRequest) -> Result<ConsumeReceipt> {
        if req.quantity <= 0 {
            return Err(LedgerError::InvalidQuantity(req.quantity));
        }

        // Exemption is a full bypass, not a balance override: no gate
        // check, no rate lookup, no ledger write.
        if self.exemptions.is_exempt(&req.org_id) {
            tracing::debug!(org_id = %req.org_id, feature = %req.feature_type, "Exempt organization, skipping metering");
            return Ok(ConsumeReceipt::exempt());
        }

        // Replay: a prior receipt for this request id is returned verbatim.
        if let Some(request_id) = &req.request_id {
            if let Some(receipt) = self.store.get_receipt(&req.org_id, request_id)? {
                tracing::debug!(org_id = %req.org_id, request_id = %request_id, "Replaying consumption receipt");
                return Ok(receipt);
            }
        }

        let org = self.require_org(&req.org_id)?;
        if !org.credit_spending_enabled {
            // The lifecycle manager records a reason whenever it closes
            // the gate.
            let reason = org.read_only_reason.unwrap_or(ReadOnlyReason::Archived);
            return Err(LedgerError::SpendingDisabled { reason });
        }

        let rate = self
            .store
            .get_rate(&req.feature_type)?
            .filter(|rate| rate.active)
            .ok_or_else(|| LedgerError::UnknownFeature(req.feature_type.clone()))?;

        let cost = rate
            .credits_per_use
            .checked_mul(req.quantity)
            .ok_or(LedgerError::InvalidQuantity(req.quantity))?;

        let draft = ConsumptionDraft {
            org_id: req.org_id,
            feature_type: req.feature_type.clone(),
            quantity: req.quantity,
            cost,
            request_id: req.request_id.clone(),
            metadata: req.metadata.clone(),
        };

        match self.store.record_consumption(&draft) {
            Ok(entry) => {
                tracing::info!(
                    org_id = %req.org_id,
                    feature = %req.feature_type,
                    quantity = req.quantity,
                    cost,
                    balance_after = entry.balance_after,
                    "Consumption recorded"
                );
                Ok(ConsumeReceipt {
                    entry_id: Some(entry.id),
                    credits_consumed: cost,
                    balance_after: Balance::Metered(entry.balance_after),
                })
            }
            // A concurrent retry with the same request id won the race
            // inside the lock; its receipt is the result.
            Err(StoreError::DuplicateRequest { request_id }) => self
                .store
                .get_receipt(&req.org_id, &request_id)?
                .ok_or_else(|| {
                    LedgerError::Storage(format!("receipt missing for request {request_id}"))
                }),
            Err(e) => Err(e.into()),
        }
    }

    /// Issue a grant.
    ///
    /// Grants are not authorization-gated: they are the thing that lifts a
    /// gate. They never touch the account status.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] for non-positive amounts.
    /// - [`LedgerError::OrgNotFound`] for unknown organizations.
    pub fn grant(&self, req: &GrantRequest) -> Result<GrantOutcome> {
        if req.amount <= 0 {
            return Err(LedgerError::InvalidAmount(req.amount));
        }
        self.require_org(&req.org_id)?;

        let entry = self.store.record_grant(&GrantDraft {
            org_id: req.org_id,
            amount: req.amount,
            source: req.source,
            description: req.description.clone(),
            correlation_id: req.correlation_id.clone(),
            actor_id: req.actor_id,
        })?;

        tracing::info!(
            org_id = %req.org_id,
            amount = req.amount,
            source = req.source.as_str(),
            balance_after = entry.balance_after,
            "Grant recorded"
        );

        Ok(GrantOutcome {
            entry_id: entry.id,
            balance_after: entry.balance_after,
        })
    }

    /// Ledger history for an organization, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::OrgNotFound`] for unknown organizations.
    pub fn history(&self, org_id: &OrgId, limit: usize, offset: usize) -> Result<HistoryPage> {
        self.require_org(org_id)?;
        let entries = self.store.list_entries(org_id, limit, offset)?;
        let total_count = self.store.count_entries(org_id)?;
        let has_more = offset + entries.len() < total_count;
        Ok(HistoryPage {
            entries,
            total_count,
            has_more,
        })
    }

    /// All configured usage rates.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn rates(&self) -> Result<Vec<UsageRate>> {
        Ok(self.store.list_rates()?)
    }

    /// Insert or update a usage rate. Past consumption amounts stay frozen
    /// in their entries; only future consumptions see the new rate.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidAmount`] for non-positive rates.
    pub fn set_rate(&self, feature_type: &str, credits_per_use: i64, active: bool) -> Result<UsageRate> {
        if credits_per_use <= 0 {
            return Err(LedgerError::InvalidAmount(credits_per_use));
        }
        let mut rate = UsageRate::new(feature_type, credits_per_use);
        rate.active = active;
        self.store.put_rate(&rate)?;
        tracing::info!(feature = %feature_type, credits = credits_per_use, active, "Usage rate updated");
        Ok(rate)
    }

    fn require_org(&self, org_id: &OrgId) -> Result<tally_core::Organization> {
        self.store
            .get_org(org_id)?
            .ok_or_else(|| LedgerError::OrgNotFound(org_id.to_string()))
    }
}
