//! Client SDK for the tally credit ledger service.
//!
//! Used by feature services that meter usage: check a balance, authorize a
//! consumption, issue a grant, or page through history.
//!
//! # Example
//!
//! ```no_run
//! use tally_client::{ConsumeRequest, TallyClient};
//!
//! # async fn example() -> Result<(), tally_client::ClientError> {
//! let client = TallyClient::new("http://tally:8080", "service-api-key");
//!
//! let result = client
//!     .consume(ConsumeRequest {
//!         org_id: "7f8c0e7e-0000-4000-8000-000000000000".into(),
//!         feature_type: "post_generation".into(),
//!         quantity: 1,
//!         request_id: Some("req-123".into()),
//!         metadata: serde_json::Value::Null,
//!     })
//!     .await?;
//!
//! println!("consumed {} credits", result.credits_consumed);
//! # Ok(())
//! # }
//! ```
//!
//! Retrying a failed `consume` with the same `request_id` is always safe:
//! the service deduplicates on it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod error;
pub mod types;

pub use client::{ClientOptions, TallyClient};
pub use error::ClientError;
pub use types::{
    BalanceResponse, ConsumeRequest, ConsumeResponse, EntryRecord, GrantRequest, GrantResponse,
    HistoryResponse,
};
