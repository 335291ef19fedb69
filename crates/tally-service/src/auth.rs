//! Authentication extractor.
//!
//! `/v1` routes use service-to-service API-key authentication. The ledger
//! never resolves user sessions; callers present a trusted organization
//! identifier and the platform in front of us is responsible for how it
//! was obtained.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::crypto::constant_time_eq;
use crate::error::ApiError;
use crate::state::AppState;

/// Service authentication via the `x-api-key` header.
///
/// When no key is configured the API is open (development mode); the
/// state constructor logs that loudly at startup.
#[derive(Debug, Clone)]
pub struct ServiceAuth;

impl FromRequestParts<Arc<AppState>> for ServiceAuth {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let Some(expected) = &state.config.service_api_key else {
                return Ok(ServiceAuth);
            };

            let presented = parts
                .headers
                .get("x-api-key")
                .and_then(|v| v.to_str().ok())
                .ok_or(ApiError::Unauthorized)?;

            if constant_time_eq(presented, expected) {
                Ok(ServiceAuth)
            } else {
                Err(ApiError::Unauthorized)
            }
        })
    }
}
