//! # Pricing Calculator
//!
//! Pure price breakdown computation: no I/O, no state.
//!
//! Invalid inputs (negative quantities, unknown coupon kinds) are rejected
//! by callers before reaching here; `compute` itself has no error
//! conditions.

use crate::cart::{Coupon, CouponKind, LineItem};
use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};

/// Constant rate parameters for a storefront.
///
/// Loaded from `config/pricing.toml`; amounts are in smallest currency
/// units, `tax_rate` is a fraction (0.16 = 16% VAT).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRates {
    /// Orders at or above this net amount ship free
    pub free_shipping_threshold: i64,
    /// Flat shipping cost below the threshold
    pub standard_shipping_cost: i64,
    /// Tax rate applied to the discounted subtotal
    pub tax_rate: f64,
}

impl Default for PricingRates {
    fn default() -> Self {
        Self {
            free_shipping_threshold: 500_000,
            standard_shipping_cost: 30_000,
            tax_rate: 0.16,
        }
    }
}

impl PricingRates {
    /// Load rates from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Load rates from `config/pricing.toml`, searching upward from the
    /// working directory. Falls back to the defaults when no config file
    /// exists.
    pub fn load() -> StoreResult<Self> {
        let config_paths = [
            "config/pricing.toml",
            "../config/pricing.toml",
            "../../config/pricing.toml",
        ];

        for path in config_paths {
            if let Ok(content) = std::fs::read_to_string(path) {
                let rates = Self::from_toml(&content).map_err(|e| {
                    StoreError::Configuration(format!("Failed to parse {path}: {e}"))
                })?;
                tracing::info!(?rates, "Loaded pricing rates from {}", path);
                return Ok(rates);
            }
        }

        tracing::warn!("No pricing config found, using default rates");
        Ok(Self::default())
    }
}

/// The computed price breakdown, all amounts in smallest currency units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub subtotal: i64,
    pub discount: i64,
    pub shipping: i64,
    pub tax: i64,
    pub total: i64,
}

/// Discount granted by a coupon against a subtotal.
///
/// A coupon whose minimum order amount is not met yields a discount of
/// zero rather than an error: the coupon stays applied but inert, matching
/// the storefront's observed behavior (the UI may warn separately).
/// The result never exceeds the subtotal.
pub fn discount_amount(coupon: Option<&Coupon>, subtotal: i64) -> i64 {
    let Some(coupon) = coupon else {
        return 0;
    };
    if let Some(minimum) = coupon.minimum_order_amount {
        if subtotal < minimum {
            return 0;
        }
    }
    let raw = match coupon.kind {
        // Integer round-half-up of subtotal * value%
        CouponKind::Percentage => {
            let discount = (subtotal * coupon.value + 50) / 100;
            match coupon.maximum_discount {
                Some(max) => discount.min(max),
                None => discount,
            }
        }
        CouponKind::FixedAmount => coupon.value,
    };
    raw.min(subtotal).max(0)
}

/// Compute the full price breakdown for a set of line items.
///
/// Pure and deterministic: identical inputs always yield identical output.
/// `total` is never negative because the discount is capped at the
/// subtotal.
pub fn compute(items: &[LineItem], coupon: Option<&Coupon>, rates: &PricingRates) -> PriceBreakdown {
    let subtotal: i64 = items.iter().map(|i| i.line_total().amount).sum();
    let discount = discount_amount(coupon, subtotal);
    let net = subtotal - discount;

    let shipping = if net >= rates.free_shipping_threshold {
        0
    } else {
        rates.standard_shipping_cost
    };

    let tax = round_half_up(net as f64 * rates.tax_rate);

    PriceBreakdown {
        subtotal,
        discount,
        shipping,
        tax,
        total: net + shipping + tax,
    }
}

/// Round to the nearest minor unit, halves up. Inputs are non-negative.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}
