//! # Order Types
//!
//! A finalized order produced at checkout and handed to the payment
//! confirmation engine.

use crate::pricing::PriceBreakdown;
use crate::product::Price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An order placed from a cart snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Unique order ID (generated)
    pub id: String,

    /// Amount to charge (the breakdown total)
    pub amount: Price,

    /// Price breakdown at the time of placement
    pub breakdown: PriceBreakdown,

    /// Unit count at the time of placement
    pub item_count: u32,

    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Create a new order with a generated ID
    pub fn new(amount: Price, breakdown: PriceBreakdown, item_count: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            amount,
            breakdown,
            item_count,
            created_at: Utc::now(),
        }
    }
}
