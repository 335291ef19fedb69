//! HTTP request handlers.

pub mod credits;
pub mod health;
pub mod orgs;
pub mod usage;
pub mod webhooks;
