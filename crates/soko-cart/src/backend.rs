//! # Cart Backend
//!
//! The collaborator cart API contract, plus its HTTP implementation.
//!
//! Every mutation returns the full authoritative cart snapshot; in
//! Authenticated mode the engine replaces its local state with that
//! snapshot wholesale and never recomputes pricing itself.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use soko_core::{CartSnapshot, Coupon, SelectedOption, StoreError, StoreResult};
use std::env;
use tracing::{debug, error, instrument};

/// Payload for `POST /cart/add` and `PUT /cart/update`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    pub product_id: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected_options: Vec<SelectedOption>,
}

/// Remote cart operations.
///
/// Implemented by `HttpCartBackend` in production and by in-memory fakes
/// in tests.
#[async_trait]
pub trait CartBackend: Send + Sync {
    /// `GET /cart`
    async fn fetch_cart(&self) -> StoreResult<CartSnapshot>;

    /// `POST /cart/add`: the server merges by line identity
    async fn add_item(&self, request: &LineItemRequest) -> StoreResult<CartSnapshot>;

    /// `PUT /cart/update`: replaces the quantity of a line
    async fn update_quantity(&self, request: &LineItemRequest) -> StoreResult<CartSnapshot>;

    /// `DELETE /cart/remove/:productId`
    async fn remove_item(
        &self,
        product_id: &str,
        options: &[SelectedOption],
    ) -> StoreResult<CartSnapshot>;

    /// `DELETE /cart/clear`
    async fn clear_cart(&self) -> StoreResult<CartSnapshot>;

    /// `POST /cart/coupon`: the server validates and applies
    async fn apply_coupon(&self, code: &str) -> StoreResult<CartSnapshot>;

    /// `DELETE /cart/coupon`
    async fn remove_coupon(&self) -> StoreResult<CartSnapshot>;

    /// `GET /coupons/:code`: coupon lookup for guest-mode validation
    async fn fetch_coupon(&self, code: &str) -> StoreResult<Coupon>;
}

/// Configuration for the cart API client
#[derive(Debug, Clone)]
pub struct CartApiConfig {
    /// API base URL (e.g., "https://api.sokocart.dev")
    pub base_url: String,

    /// Bearer token of the authenticated session, if any
    pub auth_token: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl CartApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `CART_API_BASE_URL`
    ///
    /// Optional:
    /// - `CART_API_TOKEN`
    pub fn from_env() -> StoreResult<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let base_url = env::var("CART_API_BASE_URL")
            .map_err(|_| StoreError::Configuration("CART_API_BASE_URL not set".to_string()))?;

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(StoreError::Configuration(
                "CART_API_BASE_URL must be an http(s) URL".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            auth_token: env::var("CART_API_TOKEN").ok(),
            timeout_secs: 30,
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: None,
            timeout_secs: 30,
        }
    }

    /// Builder: set the bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}

/// HTTP implementation of `CartBackend` against the storefront REST API
pub struct HttpCartBackend {
    config: CartApiConfig,
    client: Client,
}

/// Error body the API returns on non-2xx responses
#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

#[derive(Debug, Serialize)]
struct CouponRequest<'a> {
    code: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RemoveItemRequest<'a> {
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    selected_options: &'a [SelectedOption],
}

impl HttpCartBackend {
    /// Create a new backend client
    pub fn new(config: CartApiConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Create from environment variables
    pub fn from_env() -> StoreResult<Self> {
        let config = CartApiConfig::from_env()?;
        Ok(Self::new(config))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and decode the authoritative cart snapshot
    async fn send_for_cart(&self, request: reqwest::RequestBuilder) -> StoreResult<CartSnapshot> {
        let response = self
            .with_auth(request)
            .send()
            .await
            .map_err(|e| StoreError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Cart API error: status={}, body={}", status, body);
            return Err(Self::map_api_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| StoreError::Serialization(format!("Failed to parse cart snapshot: {e}")))
    }

    /// Map a non-2xx API response into the error taxonomy
    fn map_api_error(status: u16, body: &str) -> StoreError {
        let message = serde_json::from_str::<ApiError>(body)
            .map(|e| e.error)
            .unwrap_or_else(|_| body.to_string());

        match status {
            404 if message.to_ascii_lowercase().contains("coupon") => StoreError::CouponInvalid {
                code: message,
            },
            410 => StoreError::CouponExpired { code: message },
            409 => StoreError::StockExceeded {
                product_id: message,
                requested: 0,
                available: 0,
            },
            _ => StoreError::ServerError { status, message },
        }
    }
}

#[async_trait]
impl CartBackend for HttpCartBackend {
    #[instrument(skip(self))]
    async fn fetch_cart(&self) -> StoreResult<CartSnapshot> {
        self.send_for_cart(self.client.get(self.url("/cart"))).await
    }

    #[instrument(skip(self, request), fields(product_id = %request.product_id, quantity = request.quantity))]
    async fn add_item(&self, request: &LineItemRequest) -> StoreResult<CartSnapshot> {
        debug!("Adding item via cart API");
        self.send_for_cart(self.client.post(self.url("/cart/add")).json(request))
            .await
    }

    #[instrument(skip(self, request), fields(product_id = %request.product_id, quantity = request.quantity))]
    async fn update_quantity(&self, request: &LineItemRequest) -> StoreResult<CartSnapshot> {
        self.send_for_cart(self.client.put(self.url("/cart/update")).json(request))
            .await
    }

    #[instrument(skip(self, options))]
    async fn remove_item(
        &self,
        product_id: &str,
        options: &[SelectedOption],
    ) -> StoreResult<CartSnapshot> {
        let request = self
            .client
            .delete(self.url(&format!("/cart/remove/{product_id}")))
            .json(&RemoveItemRequest {
                selected_options: options,
            });
        self.send_for_cart(request).await
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> StoreResult<CartSnapshot> {
        self.send_for_cart(self.client.delete(self.url("/cart/clear")))
            .await
    }

    #[instrument(skip(self))]
    async fn apply_coupon(&self, code: &str) -> StoreResult<CartSnapshot> {
        self.send_for_cart(
            self.client
                .post(self.url("/cart/coupon"))
                .json(&CouponRequest { code }),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn remove_coupon(&self) -> StoreResult<CartSnapshot> {
        self.send_for_cart(self.client.delete(self.url("/cart/coupon")))
            .await
    }

    #[instrument(skip(self))]
    async fn fetch_coupon(&self, code: &str) -> StoreResult<Coupon> {
        let response = self
            .with_auth(self.client.get(self.url(&format!("/coupons/{code}"))))
            .send()
            .await
            .map_err(|e| StoreError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(StoreError::CouponInvalid {
                code: code.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| StoreError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            return Err(Self::map_api_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| StoreError::Serialization(format!("Failed to parse coupon: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_rejects_non_http_url() {
        std::env::set_var("CART_API_BASE_URL", "ftp://example.com");
        let result = CartApiConfig::from_env();
        assert!(matches!(result, Err(StoreError::Configuration(_))));
        std::env::remove_var("CART_API_BASE_URL");
    }

    #[test]
    fn test_map_api_error_statuses() {
        let err = HttpCartBackend::map_api_error(410, r#"{"error":"SAVE10"}"#);
        assert!(matches!(err, StoreError::CouponExpired { .. }));

        let err = HttpCartBackend::map_api_error(503, "upstream down");
        assert!(err.is_retryable());

        let err = HttpCartBackend::map_api_error(404, r#"{"error":"coupon KARIBU10 not found"}"#);
        assert!(matches!(err, StoreError::CouponInvalid { .. }));
    }

    #[test]
    fn test_line_item_request_wire_shape() {
        let request = LineItemRequest {
            product_id: "shuka".into(),
            quantity: 2,
            selected_options: vec![SelectedOption::new("Color", "Red")],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["productId"], "shuka");
        assert_eq!(json["selectedOptions"][0]["name"], "Color");
    }
}
