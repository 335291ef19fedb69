//! Core types for the tally credit ledger.
//!
//! This crate provides the foundational types used throughout the tally
//! platform:
//!
//! - **Identifiers**: `OrgId`, `ActorId`, `EntryId`, `TransitionId`
//! - **Ledger**: `LedgerEntry`, `EntryKind`, `CreditSource`, `Balance`
//! - **Organizations**: `Organization`, `AccountStatus`, `ReadOnlyReason`
//! - **Rates**: `UsageRate` and the default rate table
//! - **Lifecycle**: `LifecycleSignal`, `StatusTransition`, `TransitionTrigger`
//!
//! # Credit Unit
//!
//! A credit is the smallest billable unit of metered feature usage.
//!
//! - Generating a post costs 2 credits
//! - A welcome bonus grants 100 credits
//! - Stored as `i64` to avoid floating point precision issues
//!
//! An organization's balance is the signed sum of its ledger entries;
//! nothing else is authoritative.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod entry;
pub mod error;
pub mod ids;
pub mod lifecycle;
pub mod org;
pub mod rates;

pub use entry::{Balance, ConsumeReceipt, CreditSource, EntryKind, EntrySource, LedgerEntry};
pub use error::{LedgerError, Result};
pub use ids::{ActorId, EntryId, IdError, OrgId, TransitionId};
pub use lifecycle::{LifecycleSignal, StatusTransition, TransitionTrigger};
pub use org::{AccountStatus, Organization, ReadOnlyReason};
pub use rates::{default_rates, UsageRate};
