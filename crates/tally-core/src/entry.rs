//! Ledger entry types.
//!
//! Every balance-affecting event, grant or consumption, creates one
//! immutable `LedgerEntry`. Entries are never mutated or deleted; the
//! current balance of an organization is the signed sum of its entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ActorId, EntryId, OrgId};

/// An immutable ledger entry recording a single credit or debit event.
///
/// Entries use ULIDs for time-ordered IDs. The `balance_after` field is a
/// denormalized snapshot for fast history reads; it is recomputable from
/// the entry stream and is never treated as authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry ID (ULID, time-ordered).
    pub id: EntryId,

    /// The organization whose balance was affected.
    pub org_id: OrgId,

    /// Whether this entry adds or removes credits.
    pub kind: EntryKind,

    /// Credits moved by this entry. Always strictly positive; the sign is
    /// carried by `kind`.
    pub credits: i64,

    /// Balance after this entry was applied.
    pub balance_after: i64,

    /// What economic event produced this entry.
    pub source: EntrySource,

    /// Human-readable description.
    pub description: String,

    /// External correlation ID (e.g. a payment-event id), if any.
    pub correlation_id: Option<String>,

    /// Caller-supplied idempotency key, if any. Only consumption entries
    /// carry one.
    pub request_id: Option<String>,

    /// The administrator who triggered this entry, for admin grants.
    pub actor_id: Option<ActorId>,

    /// Additional context (feature call site, session id, etc.).
    pub metadata: serde_json::Value,

    /// When the entry was created.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Create a credit entry from a grant.
    #[must_use]
    pub fn grant(
        org_id: OrgId,
        credits: i64,
        balance_after: i64,
        source: CreditSource,
        description: String,
        correlation_id: Option<String>,
        actor_id: Option<ActorId>,
    ) -> Self {
        Self {
            id: EntryId::generate(),
            org_id,
            kind: EntryKind::Credit,
            credits,
            balance_after,
            source: EntrySource::Grant { source },
            description,
            correlation_id,
            request_id: None,
            actor_id,
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    /// Create a debit entry from a metered feature consumption.
    #[must_use]
    pub fn consumption(
        org_id: OrgId,
        credits: i64,
        balance_after: i64,
        feature_type: String,
        quantity: i64,
        request_id: Option<String>,
        metadata: serde_json::Value,
    ) -> Self {
        let description = format!("{quantity}x {feature_type}");
        Self {
            id: EntryId::generate(),
            org_id,
            kind: EntryKind::Debit,
            credits,
            balance_after,
            source: EntrySource::Usage {
                feature_type,
                quantity,
            },
            description,
            correlation_id: None,
            request_id,
            actor_id: None,
            metadata,
            created_at: Utc::now(),
        }
    }

    /// The signed contribution of this entry to the balance sum.
    #[must_use]
    pub const fn signed_credits(&self) -> i64 {
        match self.kind {
            EntryKind::Credit => self.credits,
            EntryKind::Debit => -self.credits,
        }
    }
}

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Credits added.
    Credit,

    /// Credits removed.
    Debit,
}

/// The economic event behind a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum EntrySource {
    /// A credit-increasing grant.
    Grant {
        /// Where the credits came from.
        source: CreditSource,
    },

    /// A metered feature consumption.
    Usage {
        /// The feature that was used.
        feature_type: String,
        /// How many uses were charged.
        quantity: i64,
    },
}

/// Where granted credits came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditSource {
    /// One-time credit purchase.
    Purchase,

    /// Subscription renewal allowance.
    Subscription,

    /// Signup welcome bonus.
    WelcomeBonus,

    /// Manual grant by an administrator.
    AdminGrant,

    /// Refund issued.
    Refund,

    /// Promotional credits (discount codes, campaigns).
    Promotion,
}

impl CreditSource {
    /// The source name as a string, as it appears on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Subscription => "subscription",
            Self::WelcomeBonus => "welcome_bonus",
            Self::AdminGrant => "admin_grant",
            Self::Refund => "refund",
            Self::Promotion => "promotion",
        }
    }
}

/// An organization's credit balance.
///
/// Exempt organizations are unmetered and report `Unlimited` instead of a
/// credit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "credits")]
pub enum Balance {
    /// A metered balance in credits.
    Metered(i64),

    /// The sentinel for exempt, unmetered organizations.
    Unlimited,
}

impl Balance {
    /// The metered credit count, if this balance is metered.
    #[must_use]
    pub const fn credits(self) -> Option<i64> {
        match self {
            Self::Metered(c) => Some(c),
            Self::Unlimited => None,
        }
    }
}

/// The result of a consumption request, also persisted as the idempotency
/// record for the request id that produced it.
///
/// `entry_id` is `None` only for exempt organizations, whose consumptions
/// bypass the ledger entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeReceipt {
    /// The debit entry appended, if any.
    pub entry_id: Option<EntryId>,

    /// Credits actually deducted.
    pub credits_consumed: i64,

    /// Balance after the deduction.
    pub balance_after: Balance,
}

impl ConsumeReceipt {
    /// The synthetic zero-cost receipt returned for exempt organizations.
    #[must_use]
    pub const fn exempt() -> Self {
        Self {
            entry_id: None,
            credits_consumed: 0,
            balance_after: Balance::Unlimited,
        }
    }
}
