//! Toolcredits HTTP client implementation.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::error::ClientError;
use crate::types::{
    Account, ApiErrorResponse, DebitOutcome, DebitRequest, EnsureAccountRequest, FailedRequest,
    PricingResponse, PurchaseRequest, PurchaseResponse, RefundRequest, RefundResponse,
    SucceededRequest, ToolPricing, UsageRecord,
};

/// Toolcredits API client.
///
/// Holds a pooled HTTP client; clone it freely.
#[derive(Debug, Clone)]
pub struct ToolCreditsClient {
    client: Client,
    base_url: String,
    api_key: String,
    service_name: String,
}

impl ToolCreditsClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the toolcredits service (e.g., `"http://toolcredits:8080"`)
    /// * `api_key` - Service API key for authentication
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ClientError> {
        Self::with_options(base_url, api_key, ClientOptions::default())
    }

    /// Create a new client with custom options.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Configuration`] if the base URL is empty or the
    /// HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::Configuration("base URL is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
            service_name: options.service_name,
        })
    }

    /// Get or create a user's account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn ensure_account(&self, user_id: &str, email: &str) -> Result<Account, ClientError> {
        self.post("/v1/accounts/ensure", &EnsureAccountRequest { user_id, email })
            .await
    }

    /// Charge a user for one use of a tool.
    ///
    /// Retrying with the same `idempotency_key` returns the original charge.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InsufficientCredits`] if the user cannot pay,
    /// or another error if the request fails.
    pub async fn debit(
        &self,
        user_id: &str,
        tool_key: &str,
        idempotency_key: &str,
    ) -> Result<DebitOutcome, ClientError> {
        self.debit_with_email(user_id, "", tool_key, idempotency_key)
            .await
    }

    /// Like [`debit`](Self::debit), with an email for accounts created on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn debit_with_email(
        &self,
        user_id: &str,
        email: &str,
        tool_key: &str,
        idempotency_key: &str,
    ) -> Result<DebitOutcome, ClientError> {
        let request = DebitRequest {
            user_id,
            email,
            tool_key,
            idempotency_key,
        };
        let outcome: DebitOutcome = self.post("/v1/usage/debit", &request).await?;

        tracing::debug!(
            user_id,
            tool_key,
            usage_id = %outcome.usage_id,
            balance_after = outcome.balance_after,
            "Debit accepted"
        );

        Ok(outcome)
    }

    /// Report that a tool run succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn mark_succeeded(
        &self,
        usage_id: &str,
        external_job_id: Option<&str>,
    ) -> Result<UsageRecord, ClientError> {
        self.post(
            &format!("/v1/usage/{usage_id}/succeeded"),
            &SucceededRequest { external_job_id },
        )
        .await
    }

    /// Report that a tool run failed. This does not refund the charge.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn mark_failed(
        &self,
        usage_id: &str,
        reason: Option<&str>,
    ) -> Result<UsageRecord, ClientError> {
        self.post(
            &format!("/v1/usage/{usage_id}/failed"),
            &FailedRequest { reason },
        )
        .await
    }

    /// Return the credits of a charge to the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn refund(&self, usage_id: &str, reason: &str) -> Result<RefundResponse, ClientError> {
        self.post(
            &format!("/v1/usage/{usage_id}/refund"),
            &RefundRequest { reason },
        )
        .await
    }

    /// Get a usage record.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn usage(&self, usage_id: &str) -> Result<UsageRecord, ClientError> {
        self.get(&format!("/v1/usage/{usage_id}")).await
    }

    /// List the tools that can currently be charged for.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn active_pricing(&self) -> Result<Vec<ToolPricing>, ClientError> {
        let response: PricingResponse = self.get("/v1/pricing").await?;
        Ok(response.tools)
    }

    /// Apply a verified payment. Redelivery is answered with the original purchase.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn apply_purchase(
        &self,
        request: &PurchaseRequest,
    ) -> Result<PurchaseResponse, ClientError> {
        self.post("/v1/purchases", request).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("x-service-name", &self.service_name)
            .json(body)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("x-service-name", &self.service_name)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }

        let Ok(api_error) = response.json::<ApiErrorResponse>().await else {
            return Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            });
        };
        let body = api_error.error;

        // Map specific error codes to typed errors
        Err(match body.code.as_str() {
            "insufficient_credits" => ClientError::InsufficientCredits {
                balance: body.detail_i64("balance"),
                required: body.detail_i64("required"),
            },
            "unknown_tool" => ClientError::UnknownTool(body.message),
            "tool_inactive" => ClientError::ToolInactive(body.message),
            "usage_not_found" => ClientError::UsageNotFound(body.message),
            _ => {
                tracing::warn!(code = %body.code, status = status.as_u16(), "Request rejected");
                ClientError::Api {
                    code: body.code,
                    message: body.message,
                    status: status.as_u16(),
                }
            }
        })
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 10).
    pub timeout_seconds: u64,
    /// Service name to include in requests.
    pub service_name: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            service_name: "unknown".to_string(),
        }
    }
}

impl ClientOptions {
    /// Create options with a service name.
    #[must_use]
    pub fn with_service_name(name: impl Into<String>) -> Self {
        Self {
            service_name: name.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_trims_trailing_slash() {
        let client = ToolCreditsClient::new("http://localhost:8080/", "test-api-key").unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let err = ToolCreditsClient::new("/", "key").unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }

    #[test]
    fn client_options() {
        let options = ClientOptions::with_service_name("brand-scraper");
        let client =
            ToolCreditsClient::with_options("http://localhost:8080", "key", options).unwrap();
        assert_eq!(client.service_name, "brand-scraper");
    }
}
