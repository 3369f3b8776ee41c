//! reqwest implementation of [`CashierApi`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::types::{
    ApiError, ErrorBody, ManualWithdrawResponse, MinimumWithdrawalResponse, PreparedWithdrawal,
    RiskCheckRequest, RiskCheckResponse, StatusRequest, StatusResponse, WithdrawRequest,
};
use crate::api::CashierApi;
use crate::config::ApiConfig;

/// HTTP client for the cashier service.
#[derive(Debug, Clone)]
pub struct HttpCashierApi {
    client: Client,
    base_url: String,
}

impl HttpCashierApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Unreachable(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.execute(self.client.post(self.url(path)).json(body)).await
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Unreachable(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Unreachable(e.to_string()))?;

        if !status.is_success() {
            return Err(status_error(status, &bytes));
        }

        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn status_error(status: StatusCode, body: &[u8]) -> ApiError {
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    tracing::debug!(status = status.as_u16(), reason = ?parsed.reason, "Cashier service returned error");
    ApiError::Status {
        status: status.as_u16(),
        reason: parsed.reason,
        message: parsed.message,
    }
}

#[async_trait]
impl CashierApi for HttpCashierApi {
    async fn risk_check(&self, request: &RiskCheckRequest) -> Result<RiskCheckResponse, ApiError> {
        self.post_json("/withdraw/risk-check", request).await
    }

    async fn minimum_withdrawal(&self, symbol: &str, network: u64) -> Result<Decimal, ApiError> {
        let network = network.to_string();
        let request = self
            .client
            .get(self.url("/withdraw/minimum"))
            .query(&[("token", symbol), ("network", network.as_str())]);
        let response: MinimumWithdrawalResponse = self.execute(request).await?;
        Ok(response.minimum)
    }

    async fn prepare_withdraw(&self, request: &WithdrawRequest) -> Result<PreparedWithdrawal, ApiError> {
        self.post_json("/withdraw/prepare", request).await
    }

    async fn manual_withdraw(&self, request: &WithdrawRequest) -> Result<(), ApiError> {
        let response: ManualWithdrawResponse = self.post_json("/withdraw/manual", request).await?;
        if response.success {
            Ok(())
        } else {
            Err(ApiError::Rejected {
                reason: response.reason,
            })
        }
    }

    async fn transaction_status(&self, request: &StatusRequest) -> Result<StatusResponse, ApiError> {
        self.post_json("/transactions/status", request).await
    }
}
