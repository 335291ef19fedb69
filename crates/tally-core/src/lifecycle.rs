//! Lifecycle signal and transition audit types.
//!
//! External payment events arrive as a closed set of tagged variants and
//! are translated immediately into lifecycle manager calls; the external
//! payload shape never leaks into internal state. Every applied transition
//! is recorded in an append-only audit log, mirroring the ledger's
//! discipline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountStatus, ActorId, OrgId, TransitionId};

/// An external lifecycle signal at the ledger boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum LifecycleSignal {
    /// A charge (subscription start, renewal, or retry) succeeded.
    PaymentSucceeded {
        /// Payment-processor event id for correlation.
        correlation_id: Option<String>,
    },

    /// A charge failed.
    PaymentFailed {
        /// Payment-processor event id for correlation.
        correlation_id: Option<String>,
    },

    /// The subscription was explicitly cancelled.
    SubscriptionCanceled,
}

/// What caused a lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionTrigger {
    /// Organization creation.
    Signup,

    /// An external payment-processor event.
    PaymentWebhook,

    /// The periodic expiration sweep.
    Sweep,

    /// An explicit administrator action.
    Admin,
}

impl TransitionTrigger {
    /// The trigger name as a string, as it appears on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::PaymentWebhook => "payment_webhook",
            Self::Sweep => "sweep",
            Self::Admin => "admin",
        }
    }
}

/// An append-only audit record of one lifecycle transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTransition {
    /// Unique record ID (ULID, time-ordered).
    pub id: TransitionId,

    /// The organization that transitioned.
    pub org_id: OrgId,

    /// Previous state. `None` for the signup record.
    pub from: Option<AccountStatus>,

    /// New state.
    pub to: AccountStatus,

    /// What caused the transition.
    pub trigger: TransitionTrigger,

    /// External correlation id, when the trigger was a payment event.
    pub correlation_id: Option<String>,

    /// The administrator responsible, when the trigger was an admin action.
    pub actor_id: Option<ActorId>,

    /// When the transition occurred.
    pub occurred_at: DateTime<Utc>,
}

impl StatusTransition {
    /// Record a transition.
    #[must_use]
    pub fn record(
        org_id: OrgId,
        from: Option<AccountStatus>,
        to: AccountStatus,
        trigger: TransitionTrigger,
        correlation_id: Option<String>,
        actor_id: Option<ActorId>,
    ) -> Self {
        Self {
            id: TransitionId::generate(),
            org_id,
            from,
            to,
            trigger,
            correlation_id,
            actor_id,
            occurred_at: Utc::now(),
        }
    }
}
