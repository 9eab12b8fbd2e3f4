//! # Cart Types
//!
//! Line items, coupons, and the cart data model.
//!
//! A line item's identity within a cart is the pair
//! `(product_id, selected_options)`: adding the same product with the same
//! options twice merges by summing quantities, while different option
//! selections stay distinct lines even for the same product.

use crate::pricing;
use crate::product::{Price, Product};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single chosen option on a line item, e.g. ("Size", "M")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    pub name: String,
    pub value: String,
}

impl SelectedOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A line item in a cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Product ID
    pub product_id: String,

    /// Product name (denormalized for display)
    pub name: String,

    /// Unit price frozen at the time of adding
    pub unit_price: Price,

    /// Quantity, always >= 1 (a zero/negative target removes the line)
    pub quantity: u32,

    /// Ordered option selections; part of the line's identity
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,

    /// Optional image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl LineItem {
    /// Create a line item from a product
    pub fn from_product(product: &Product, quantity: u32, options: Vec<SelectedOption>) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.price.clone(),
            quantity,
            selected_options: options,
            image_url: product.image_url.clone(),
        }
    }

    /// Whether this line has the given identity
    pub fn matches(&self, product_id: &str, options: &[SelectedOption]) -> bool {
        self.product_id == product_id && self.selected_options == options
    }

    /// Total price for this line (unit price x quantity)
    pub fn line_total(&self) -> Price {
        Price {
            amount: self.unit_price.amount * self.quantity as i64,
            currency: self.unit_price.currency,
        }
    }
}

/// Discount kind for a coupon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponKind {
    /// `value` is a percentage of the subtotal (e.g. 50 = 50%)
    Percentage,
    /// `value` is a fixed amount in smallest currency units
    FixedAmount,
}

/// A discount coupon. At most one coupon may be active per cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    /// Coupon code as entered (e.g. "KARIBU10")
    pub code: String,

    /// Discount kind
    pub kind: CouponKind,

    /// Percentage points or fixed amount, depending on `kind`
    pub value: i64,

    /// Subtotal below which the coupon is inert (discount of zero)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_order_amount: Option<i64>,

    /// Upper bound on the discount a percentage coupon may grant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_discount: Option<i64>,

    /// Expiry timestamp, if the coupon expires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Coupon {
    /// Create a percentage coupon
    pub fn percentage(code: impl Into<String>, percent: i64) -> Self {
        Self {
            code: code.into(),
            kind: CouponKind::Percentage,
            value: percent,
            minimum_order_amount: None,
            maximum_discount: None,
            expires_at: None,
        }
    }

    /// Create a fixed-amount coupon
    pub fn fixed_amount(code: impl Into<String>, amount: i64) -> Self {
        Self {
            code: code.into(),
            kind: CouponKind::FixedAmount,
            value: amount,
            minimum_order_amount: None,
            maximum_discount: None,
            expires_at: None,
        }
    }

    /// Builder: set the minimum order amount
    pub fn with_minimum(mut self, minimum: i64) -> Self {
        self.minimum_order_amount = Some(minimum);
        self
    }

    /// Builder: cap the discount
    pub fn with_maximum_discount(mut self, maximum: i64) -> Self {
        self.maximum_discount = Some(maximum);
        self
    }

    /// Builder: set the expiry
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether the coupon has expired
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| exp <= now).unwrap_or(false)
    }
}

/// The cart: an ordered sequence of line items plus at most one coupon.
///
/// Insertion order is irrelevant to pricing and relevant only for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub items: Vec<LineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_coupon: Option<Coupon>,
}

impl Cart {
    /// Create an empty cart
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of unit price x quantity over all items, in smallest units
    pub fn subtotal(&self) -> i64 {
        self.items.iter().map(|i| i.line_total().amount).sum()
    }

    /// Total unit count across all lines
    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Whether the cart holds no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find the line with the given identity
    pub fn find(&self, product_id: &str, options: &[SelectedOption]) -> Option<&LineItem> {
        self.items.iter().find(|i| i.matches(product_id, options))
    }

    /// Merge a line item in: an existing line with the same identity has the
    /// quantities summed, otherwise the item is appended. Returns the
    /// resulting quantity of the line.
    pub fn merge_item(&mut self, item: LineItem) -> u32 {
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|i| i.matches(&item.product_id, &item.selected_options))
        {
            existing.quantity += item.quantity;
            existing.quantity
        } else {
            let quantity = item.quantity;
            self.items.push(item);
            quantity
        }
    }

    /// Replace the quantity of an existing line. A target below 1 removes
    /// the line. Returns false if no line matched.
    pub fn set_quantity(
        &mut self,
        product_id: &str,
        options: &[SelectedOption],
        quantity: u32,
    ) -> bool {
        if quantity < 1 {
            return self.remove_item(product_id, options);
        }
        match self
            .items
            .iter_mut()
            .find(|i| i.matches(product_id, options))
        {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove the matching line. Returns false (not an error) if absent.
    pub fn remove_item(&mut self, product_id: &str, options: &[SelectedOption]) -> bool {
        let before = self.items.len();
        self.items
            .retain(|i| !i.matches(product_id, options));
        self.items.len() != before
    }

    /// Empty the cart: all items removed, coupon cleared
    pub fn clear(&mut self) {
        self.items.clear();
        self.applied_coupon = None;
    }
}

/// An immutable cart snapshot with computed totals.
///
/// This is also the wire/persisted shape the collaborator cart API returns
/// and the guest cart is cached under locally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    pub items: Vec<LineItem>,
    pub total_items: u32,
    /// Subtotal before discount, in smallest units
    pub total_price: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_coupon: Option<Coupon>,
    /// Discount granted by the applied coupon (0 when inert or absent)
    pub discount_amount: i64,
    /// `total_price - discount_amount`, never negative
    pub final_price: i64,
}

impl CartSnapshot {
    /// Compute a snapshot from a cart. Upholds the invariants
    /// `discount_amount <= total_price` and `final_price >= 0`.
    pub fn from_cart(cart: &Cart) -> Self {
        let total_price = cart.subtotal();
        let discount_amount = pricing::discount_amount(cart.applied_coupon.as_ref(), total_price);
        Self {
            items: cart.items.clone(),
            total_items: cart.total_items(),
            total_price,
            applied_coupon: cart.applied_coupon.clone(),
            discount_amount,
            final_price: total_price - discount_amount,
        }
    }

    /// Rebuild a mutable cart from this snapshot
    pub fn to_cart(&self) -> Cart {
        Cart {
            items: self.items.clone(),
            applied_coupon: self.applied_coupon.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::Currency;

    fn item(product_id: &str, price: i64, quantity: u32, options: &[(&str, &str)]) -> LineItem {
        LineItem {
            product_id: product_id.to_string(),
            name: product_id.to_string(),
            unit_price: Price::from_cents(price, Currency::KES),
            quantity,
            selected_options: options
                .iter()
                .map(|(n, v)| SelectedOption::new(*n, *v))
                .collect(),
            image_url: None,
        }
    }

    #[test]
    fn test_merge_by_identity() {
        let mut cart = Cart::new();
        cart.merge_item(item("shuka", 120000, 2, &[("Color", "Red")]));
        cart.merge_item(item("shuka", 120000, 3, &[("Color", "Red")]));

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
    }

    #[test]
    fn test_distinct_options_distinct_lines() {
        let mut cart = Cart::new();
        cart.merge_item(item("shuka", 120000, 1, &[("Color", "Red")]));
        cart.merge_item(item("shuka", 120000, 1, &[("Color", "Blue")]));

        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.total_items(), 2);
    }

    #[test]
    fn test_set_quantity_below_one_removes() {
        let mut cart = Cart::new();
        cart.merge_item(item("tea-500g", 45000, 2, &[]));

        assert!(cart.set_quantity("tea-500g", &[], 0));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::new();
        cart.merge_item(item("tea-500g", 45000, 1, &[]));

        assert!(!cart.remove_item("coffee-250g", &[]));
        assert_eq!(cart.items.len(), 1);
    }

    #[test]
    fn test_snapshot_totals() {
        let mut cart = Cart::new();
        cart.merge_item(item("tea-500g", 45000, 2, &[]));
        cart.applied_coupon = Some(Coupon::fixed_amount("CHAI50", 5000));

        let snapshot = CartSnapshot::from_cart(&cart);
        assert_eq!(snapshot.total_price, 90000);
        assert_eq!(snapshot.discount_amount, 5000);
        assert_eq!(snapshot.final_price, 85000);
        assert_eq!(snapshot.total_items, 2);
    }

    #[test]
    fn test_snapshot_discount_never_exceeds_subtotal() {
        let mut cart = Cart::new();
        cart.merge_item(item("pin", 1000, 1, &[]));
        cart.applied_coupon = Some(Coupon::fixed_amount("BIG", 50000));

        let snapshot = CartSnapshot::from_cart(&cart);
        assert_eq!(snapshot.discount_amount, 1000);
        assert_eq!(snapshot.final_price, 0);
    }

    #[test]
    fn test_snapshot_wire_shape() {
        let mut cart = Cart::new();
        cart.merge_item(item("shuka", 120000, 1, &[("Color", "Red")]));

        let json = serde_json::to_value(CartSnapshot::from_cart(&cart)).unwrap();
        assert!(json.get("totalPrice").is_some());
        assert!(json.get("finalPrice").is_some());
        assert!(json.get("discountAmount").is_some());
        assert_eq!(json["items"][0]["productId"], "shuka");
    }

    #[test]
    fn test_coupon_expiry() {
        let coupon = Coupon::percentage("OLD", 10).with_expiry(Utc::now() - chrono::Duration::days(1));
        assert!(coupon.is_expired(Utc::now()));

        let fresh = Coupon::percentage("NEW", 10);
        assert!(!fresh.is_expired(Utc::now()));
    }
}
