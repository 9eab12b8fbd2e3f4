//! # STK Push Gateway
//!
//! The collaborator payments API contract and its HTTP implementation.
//!
//! Initiation is synchronous: it either yields a `checkoutRequestId` or
//! fails with the server-supplied reason. Confirmation is asynchronous
//! and only observable by polling the status endpoint.

use crate::config::MpesaConfig;
use crate::phone::PhoneNumber;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use soko_core::{Price, StoreError, StoreResult};
use tracing::{debug, error, info, instrument};

/// Status of a payment as reported by `GET /payments/status/:orderId`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Push sent, the payer has not confirmed at the handset yet
    Pending,
    /// Payment confirmed
    Completed,
    /// Payer cancelled or declined at the handset
    Failed,
}

/// Payment gateway operations consumed by the confirmation engine
#[async_trait]
pub trait StkGateway: Send + Sync {
    /// `POST /payments/mpesa/stk-push`: push the payment prompt to the
    /// payer's handset. Returns the gateway's `checkoutRequestId`.
    async fn initiate_push(
        &self,
        order_id: &str,
        phone: &PhoneNumber,
        amount: &Price,
    ) -> StoreResult<String>;

    /// `GET /payments/status/:orderId`
    async fn payment_status(&self, order_id: &str) -> StoreResult<PaymentStatus>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StkPushRequest<'a> {
    order_id: &'a str,
    phone_number: &'a str,
    amount: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StkPushResponse {
    checkout_request_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    payment_status: PaymentStatus,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

/// HTTP implementation of `StkGateway`
pub struct HttpStkGateway {
    config: MpesaConfig,
    client: Client,
}

impl HttpStkGateway {
    /// Create a new gateway client
    pub fn new(config: MpesaConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Create from environment variables
    pub fn from_env() -> StoreResult<Self> {
        let config = MpesaConfig::from_env()?;
        Ok(Self::new(config))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }
}

#[async_trait]
impl StkGateway for HttpStkGateway {
    #[instrument(skip(self, phone, amount))]
    async fn initiate_push(
        &self,
        order_id: &str,
        phone: &PhoneNumber,
        amount: &Price,
    ) -> StoreResult<String> {
        let request = StkPushRequest {
            order_id,
            phone_number: phone.as_str(),
            amount: amount.amount,
        };

        let response = self
            .client
            .post(self.url("/payments/mpesa/stk-push"))
            .json(&request)
            .send()
            .await
            .map_err(|e| StoreError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("STK push rejected: status={}, body={}", status, body);
            let reason = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| format!("HTTP {status}"));
            return Err(StoreError::PaymentDeclined { reason });
        }

        let parsed: StkPushResponse = serde_json::from_str(&body).map_err(|e| {
            StoreError::Serialization(format!("Failed to parse STK push response: {e}"))
        })?;

        info!(
            checkout_request_id = %parsed.checkout_request_id,
            "STK push sent to handset"
        );
        Ok(parsed.checkout_request_id)
    }

    #[instrument(skip(self))]
    async fn payment_status(&self, order_id: &str) -> StoreResult<PaymentStatus> {
        let response = self
            .client
            .get(self.url(&format!("/payments/status/{order_id}")))
            .send()
            .await
            .map_err(|e| StoreError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // Treated as "not yet confirmed" by the polling loop
            return Err(StoreError::ServerError {
                status: status.as_u16(),
                message: "status check failed".to_string(),
            });
        }

        let parsed: StatusResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Serialization(format!("Failed to parse status: {e}")))?;

        debug!(?parsed.payment_status, "Polled payment status");
        Ok(parsed.payment_status)
    }
}
