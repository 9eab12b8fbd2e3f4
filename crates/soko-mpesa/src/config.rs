//! # M-Pesa Configuration
//!
//! Configuration for the STK push client and the confirmation polling
//! policy. Loaded from environment variables.

use soko_core::{StoreError, StoreResult};
use std::env;
use std::time::Duration;

/// Default interval between status polls
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;

/// Default number of polls before the confirmation times out.
/// Together with the default interval this gives a ~5-minute window,
/// matching the gateway's human-confirmation latency.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

/// M-Pesa payments API configuration
#[derive(Debug, Clone)]
pub struct MpesaConfig {
    /// Payments API base URL
    pub api_base_url: String,

    /// Fixed interval between status polls (not exponential)
    pub poll_interval: Duration,

    /// Polls allowed before the session times out
    pub max_attempts: u32,

    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
}

impl MpesaConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `MPESA_API_BASE_URL`
    ///
    /// Optional:
    /// - `MPESA_POLL_INTERVAL_MS` (default 10000)
    /// - `MPESA_MAX_ATTEMPTS` (default 30)
    pub fn from_env() -> StoreResult<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let api_base_url = env::var("MPESA_API_BASE_URL")
            .map_err(|_| StoreError::Configuration("MPESA_API_BASE_URL not set".to_string()))?;

        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(StoreError::Configuration(
                "MPESA_API_BASE_URL must be an http(s) URL".to_string(),
            ));
        }

        let poll_interval_ms = match env::var("MPESA_POLL_INTERVAL_MS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                StoreError::Configuration("MPESA_POLL_INTERVAL_MS must be an integer".to_string())
            })?,
            Err(_) => DEFAULT_POLL_INTERVAL_MS,
        };

        let max_attempts = match env::var("MPESA_MAX_ATTEMPTS") {
            Ok(raw) => raw.parse::<u32>().map_err(|_| {
                StoreError::Configuration("MPESA_MAX_ATTEMPTS must be an integer".to_string())
            })?,
            Err(_) => DEFAULT_MAX_ATTEMPTS,
        };

        if max_attempts == 0 {
            return Err(StoreError::Configuration(
                "MPESA_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            api_base_url,
            poll_interval: Duration::from_millis(poll_interval_ms),
            max_attempts,
            timeout_secs: 30,
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout_secs: 30,
        }
    }

    /// Total confirmation window: `poll_interval * max_attempts`
    pub fn confirmation_window(&self) -> Duration {
        self.poll_interval * self.max_attempts
    }
}
