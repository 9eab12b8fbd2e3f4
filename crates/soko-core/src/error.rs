//! # Storefront Error Types
//!
//! Typed error handling for the sokocart engines.
//! All cart and payment operations return `Result<T, StoreError>`.

use thiserror::Error;

/// Core error type for cart and payment operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Configuration errors (missing env vars, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Product not found in catalog
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    /// Requested quantity exceeds tracked stock
    #[error("Stock exceeded for {product_id}: requested {requested}, available {available}")]
    StockExceeded {
        product_id: String,
        requested: u32,
        available: u32,
    },

    /// Coupon code does not exist or is not applicable
    #[error("Invalid coupon: {code}")]
    CouponInvalid { code: String },

    /// Coupon exists but has expired
    #[error("Coupon expired: {code}")]
    CouponExpired { code: String },

    /// Coupon minimum order amount not met
    #[error("Coupon {code} requires a minimum order of {minimum}, cart subtotal is {subtotal}")]
    CouponMinimumNotMet {
        code: String,
        minimum: i64,
        subtotal: i64,
    },

    /// Phone number failed normalization/validation
    #[error("Invalid phone number: {input}")]
    InvalidPhoneNumber { input: String },

    /// Payment gateway declined the payment (synchronous failure)
    #[error("Payment declined: {reason}")]
    PaymentDeclined { reason: String },

    /// Remote API error (non-transport failure reported by the server)
    #[error("Server error [{status}]: {message}")]
    ServerError { status: u16, message: String },

    /// Network/HTTP error communicating with a collaborator service
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Returns true if this error is transient and the action may be re-issued.
    ///
    /// Validation errors are never retryable; the cart is left unchanged and
    /// the caller must correct the input. Transport and 5xx failures are
    /// recoverable: re-issuing the same mutation is safe because line items
    /// merge by identity.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::NetworkError(_)
                | StoreError::ServerError {
                    status: 500..=599,
                    ..
                }
        )
    }

    /// Returns true for synchronous validation failures: reported once,
    /// never retried automatically, state left unchanged.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StoreError::StockExceeded { .. }
                | StoreError::CouponInvalid { .. }
                | StoreError::CouponExpired { .. }
                | StoreError::CouponMinimumNotMet { .. }
                | StoreError::InvalidPhoneNumber { .. }
                | StoreError::InvalidRequest(_)
        )
    }
}

/// Result type alias for storefront operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(StoreError::NetworkError("timeout".into()).is_retryable());
        assert!(StoreError::ServerError {
            status: 503,
            message: "unavailable".into()
        }
        .is_retryable());
        assert!(!StoreError::ServerError {
            status: 400,
            message: "bad request".into()
        }
        .is_retryable());
        assert!(!StoreError::StockExceeded {
            product_id: "p1".into(),
            requested: 5,
            available: 2
        }
        .is_retryable());
    }

    #[test]
    fn test_validation_classification() {
        assert!(StoreError::InvalidPhoneNumber {
            input: "0812345678".into()
        }
        .is_validation());
        assert!(StoreError::CouponExpired {
            code: "SAVE10".into()
        }
        .is_validation());
        assert!(!StoreError::NetworkError("reset".into()).is_validation());
    }
}
