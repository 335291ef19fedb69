//! Consumption authorizer and account lifecycle engine for tally.
//!
//! This crate holds the domain logic over the storage layer:
//!
//! - [`CreditLedger`]: authorizes consumption against balances, issues
//!   grants, and serves balance/history/rate reads
//! - [`LifecycleManager`]: drives organizations through
//!   trial, active, payment-failure, and archival states and maintains
//!   the `credit_spending_enabled` gate
//! - [`ExemptionSet`]: configured organizations that bypass metering
//!   entirely
//!
//! The engine is synchronous; the storage layer serializes the
//! check-then-debit race per organization, and everything else is
//! independent.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod exempt;
pub mod ledger;
pub mod lifecycle;

pub use config::EngineConfig;
pub use exempt::ExemptionSet;
pub use ledger::{ConsumeRequest, CreditLedger, GrantOutcome, GrantRequest, HistoryPage};
pub use lifecycle::{LifecycleManager, SweepOutcome};
