//! Tally HTTP API service.
//!
//! This crate provides the HTTP API for the tally credit ledger:
//!
//! - Organization signup, status, and archival
//! - Balance, history, and grants
//! - Consumption authorization
//! - Usage rate administration
//! - Payment lifecycle webhooks and the expiration sweep
//!
//! # Authentication
//!
//! `/v1` routes accept a service API key (`x-api-key`). The ledger trusts
//! the organization identifier in each request; resolving it from a user
//! session is the platform's job, not ours. Webhooks are verified with an
//! HMAC-SHA256 signature when a secret is configured.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Axum handlers all return Result and need async for routing consistency.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::unused_async)]

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod sweep;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
