//! `RocksDB` storage layer for the tally credit ledger.
//!
//! This crate persists organizations, ledger entries, idempotency
//! receipts, usage rates, and lifecycle transition audit records using
//! `RocksDB` with column families for efficient indexing.
//!
//! # Architecture
//!
//! - `orgs`: organization records, keyed by `org_id`
//! - `entries`: ledger entries, keyed by `entry_id` (ULID)
//! - `entries_by_org`: index keyed by `org_id || entry_id`; the value is
//!   the entry's signed credit amount, so recomputing a balance is a pure
//!   prefix scan over this index
//! - `receipts`: idempotency receipts, keyed by `org_id || request_id`
//! - `rates`: usage rates, keyed by feature type
//! - `transitions` / `transitions_by_org`: lifecycle audit log
//!
//! # Concurrency
//!
//! The check-then-debit sequence in [`Store::record_consumption`] is the
//! only read-modify-write race in the system. It runs under a
//! per-organization lock slot with a bounded wait; acquisition timeout
//! surfaces as [`StoreError::Busy`]. Operations on different organizations
//! never contend.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod locks;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use tally_core::{
    ActorId, ConsumeReceipt, CreditSource, EntryId, LedgerEntry, OrgId, Organization,
    StatusTransition, UsageRate,
};

/// A consumption about to be recorded. The store fills in the entry id,
/// timestamps, and `balance_after` under the per-organization lock.
#[derive(Debug, Clone)]
pub struct ConsumptionDraft {
    /// The organization to debit.
    pub org_id: OrgId,
    /// The feature being consumed.
    pub feature_type: String,
    /// How many uses are being charged.
    pub quantity: i64,
    /// Total cost in credits (rate × quantity, computed by the caller).
    pub cost: i64,
    /// Caller-supplied idempotency key, if any.
    pub request_id: Option<String>,
    /// Additional context persisted on the entry.
    pub metadata: serde_json::Value,
}

/// A grant about to be recorded.
#[derive(Debug, Clone)]
pub struct GrantDraft {
    /// The organization to credit.
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

/// The storage trait defining all database operations.
///
/// Abstracts the storage layer so the engine can be exercised against
/// different backends.
pub trait Store: Send + Sync {
    // =========================================================================
    // Organizations
    // =========================================================================

    /// Insert or update an organization record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_org(&self, org: &Organization) -> Result<()>;

    /// Get an organization by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_org(&self, org_id: &OrgId) -> Result<Option<Organization>>;

    /// List every organization. Used by the lifecycle sweep.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_orgs(&self) -> Result<Vec<Organization>>;

    // =========================================================================
    // Balance
    // =========================================================================

    /// Recompute an organization's balance as the signed sum of its ledger
    /// entries. This is the authoritative value; `balance_after` snapshots
    /// on entries are never trusted over it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn balance_of(&self, org_id: &OrgId) -> Result<i64>;

    // =========================================================================
    // Ledger entries
    // =========================================================================

    /// Get a ledger entry by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_entry(&self, entry_id: &EntryId) -> Result<Option<LedgerEntry>>;

    /// List entries for an organization, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_entries(&self, org_id: &OrgId, limit: usize, offset: usize)
        -> Result<Vec<LedgerEntry>>;

    /// Count all entries for an organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn count_entries(&self, org_id: &OrgId) -> Result<usize>;

    // =========================================================================
    // Idempotency receipts
    // =========================================================================

    /// Look up the receipt for a prior consumption with this request id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_receipt(&self, org_id: &OrgId, request_id: &str) -> Result<Option<ConsumeReceipt>>;

    // =========================================================================
    // Usage rates
    // =========================================================================

    /// Insert or update a usage rate.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_rate(&self, rate: &UsageRate) -> Result<()>;

    /// Get the rate for a feature type.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_rate(&self, feature_type: &str) -> Result<Option<UsageRate>>;

    /// List all rates.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_rates(&self) -> Result<Vec<UsageRate>>;

    // =========================================================================
    // Lifecycle transitions
    // =========================================================================

    /// Persist an updated organization record and its transition audit
    /// record in one atomic batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn record_transition(&self, org: &Organization, transition: &StatusTransition) -> Result<()>;

    /// List transition audit records for an organization, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_transitions(
        &self,
        org_id: &OrgId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StatusTransition>>;

    // =========================================================================
    // Compound ledger operations
    // =========================================================================

    /// Record a consumption debit atomically: under the organization's lock
    /// slot, recompute the balance, verify it covers `draft.cost`, append
    /// the debit entry, and persist the idempotency receipt (when a request
    /// id was supplied) in the same write batch.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Busy`] if the lock slot cannot be acquired in time.
    /// - [`StoreError::InsufficientCredits`] if the balance is too low; no
    ///   partial debit is made.
    /// - [`StoreError::DuplicateRequest`] if a receipt for the request id
    ///   already exists (a concurrent retry won the race); the caller
    ///   should return the stored receipt.
    fn record_consumption(&self, draft: &ConsumptionDraft) -> Result<LedgerEntry>;

    /// Record a grant credit atomically under the organization's lock slot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Busy`] if the lock slot cannot be acquired in
    /// time.
    fn record_grant(&self, draft: &GrantDraft) -> Result<LedgerEntry>;
}
