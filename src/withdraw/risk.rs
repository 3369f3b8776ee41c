//! Pre-submission risk gate.
//!
//! The service answers `{status, error?, message?}`. `reserved` is a business
//! outcome, not an error: the withdrawal is held for security review and the
//! user re-attempts later.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::api::{ApiError, CashierApi, RiskCheckRequest, RiskCheckResponse};

/// Classified risk verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiskVerdict {
    Ok,
    Critical { message: String },
    Reserved,
    /// No usable verdict (transport failure, `error: true`, unknown status).
    Error { message: String },
}

impl RiskVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskVerdict::Ok => "ok",
            RiskVerdict::Critical { .. } => "critical",
            RiskVerdict::Reserved => "reserved",
            RiskVerdict::Error { .. } => "error",
        }
    }
}

/// Map a service response onto a verdict.
pub fn classify(response: &RiskCheckResponse) -> RiskVerdict {
    let message = || {
        response
            .message
            .clone()
            .unwrap_or_else(|| format!("risk status '{}'", response.status))
    };
    if response.error {
        return RiskVerdict::Error { message: message() };
    }
    match response.status.trim().to_ascii_lowercase().as_str() {
        "ok" => RiskVerdict::Ok,
        "critical" => RiskVerdict::Critical { message: message() },
        "reserved" => RiskVerdict::Reserved,
        _ => RiskVerdict::Error { message: message() },
    }
}

#[derive(Clone)]
pub struct RiskGate {
    api: Arc<dyn CashierApi>,
}

impl RiskGate {
    pub fn new(api: Arc<dyn CashierApi>) -> Self {
        Self { api }
    }

    pub async fn check(&self, identity: &str, amount: Decimal) -> RiskVerdict {
        let request = RiskCheckRequest {
            identity: identity.to_string(),
            amount: amount.to_string(),
        };
        let verdict = match self.api.risk_check(&request).await {
            Ok(response) => classify(&response),
            Err(e) => RiskVerdict::Error {
                message: unavailable_message(&e),
            },
        };
        tracing::info!(identity = %identity, verdict = verdict.as_str(), "Risk check completed");
        verdict
    }
}

fn unavailable_message(error: &ApiError) -> String {
    match error.short_reason() {
        Some(reason) => reason.to_string(),
        None => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{PreparedWithdrawal, StatusRequest, StatusResponse, WithdrawRequest};
    use async_trait::async_trait;

    fn response(status: &str, error: bool) -> RiskCheckResponse {
        RiskCheckResponse {
            status: status.into(),
            error,
            message: None,
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(&response("ok", false)), RiskVerdict::Ok);
        assert_eq!(classify(&response("RESERVED", false)), RiskVerdict::Reserved);
        assert!(matches!(classify(&response("critical", false)), RiskVerdict::Critical { .. }));
        assert!(matches!(classify(&response("ok", true)), RiskVerdict::Error { .. }));
        assert!(matches!(classify(&response("weird", false)), RiskVerdict::Error { .. }));
    }

    #[test]
    fn test_critical_keeps_service_message() {
        let resp = RiskCheckResponse {
            status: "critical".into(),
            error: false,
            message: Some("account flagged".into()),
        };
        assert_eq!(
            classify(&resp),
            RiskVerdict::Critical {
                message: "account flagged".into()
            }
        );
    }

    struct Down;

    #[async_trait]
    impl CashierApi for Down {
        async fn risk_check(&self, _: &RiskCheckRequest) -> Result<RiskCheckResponse, ApiError> {
            Err(ApiError::Unreachable("connection refused".into()))
        }
        async fn minimum_withdrawal(&self, _: &str, _: u64) -> Result<Decimal, ApiError> {
            unreachable!()
        }
        async fn prepare_withdraw(&self, _: &WithdrawRequest) -> Result<PreparedWithdrawal, ApiError> {
            unreachable!()
        }
        async fn manual_withdraw(&self, _: &WithdrawRequest) -> Result<(), ApiError> {
            unreachable!()
        }
        async fn transaction_status(&self, _: &StatusRequest) -> Result<StatusResponse, ApiError> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_transport_failure_is_error_not_critical() {
        let gate = RiskGate::new(Arc::new(Down));
        let verdict = gate.check("u1", Decimal::from(10)).await;
        assert!(matches!(verdict, RiskVerdict::Error { message } if message.contains("connection refused")));
    }
}
