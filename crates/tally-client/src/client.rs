//! Tally HTTP client implementation.

use reqwest::Client;
use std::time::Duration;

use crate::error::{ApiErrorResponse, ClientError};
use crate::types::{
    BalanceResponse, ConsumeRequest, ConsumeResponse, GrantRequest, GrantResponse, HistoryResponse,
};

/// Client construction options.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
        }
    }
}

/// Tally API client.
#[derive(Debug, Clone)]
pub struct TallyClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TallyClient {
    /// Create a new tally client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the tally service (e.g. `"http://tally:8080"`)
    /// * `api_key` - Service API key
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_options(base_url, api_key, ClientOptions::default())
    }

    /// Create a new tally client with custom options.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (does not happen with
    /// default settings).
    #[must_use]
    pub fn with_options(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        options: ClientOptions,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Authorize and record a consumption.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects the
    /// consumption. Check [`ClientError::is_retryable`] before retrying;
    /// retries must reuse the same `request_id`.
    pub async fn consume(&self, request: ConsumeRequest) -> Result<ConsumeResponse, ClientError> {
        let url = format!("{}/v1/consume", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Issue a grant.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an
    /// error.
    pub async fn grant(&self, request: GrantRequest) -> Result<GrantResponse, ClientError> {
        let url = format!("{}/v1/grants", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Get the current balance for an organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an
    /// error.
    pub async fn balance(&self, org_id: &str) -> Result<BalanceResponse, ClientError> {
        let url = format!("{}/v1/orgs/{org_id}/balance", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Page through ledger history for an organization, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an
    /// error.
    pub async fn history(
        &self,
        org_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<HistoryResponse, ClientError> {
        let url = format!(
            "{}/v1/orgs/{org_id}/history?limit={limit}&offset={offset}",
            self.base_url
        );

        let response = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Decode a success body, or map the service's error envelope into
    /// [`ClientError::Api`].
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            let body = response.text().await?;
            return serde_json::from_str(&body)
                .map_err(|e| ClientError::InvalidResponse(e.to_string()));
        }

        let body = response.text().await?;
        tracing::debug!(status = status.as_u16(), "Tally API returned an error");
        match serde_json::from_str::<ApiErrorResponse>(&body) {
            Ok(envelope) => Err(ClientError::Api {
                status: status.as_u16(),
                code: envelope.error.code,
                message: envelope.error.message,
                details: envelope.error.details,
            }),
            Err(_) => Err(ClientError::Api {
                status: status.as_u16(),
                code: "unknown".into(),
                message: body,
                details: None,
            }),
        }
    }
}
