//! # soko-core
//!
//! Core types and pricing for the sokocart storefront engines.
//!
//! This crate provides:
//! - `Product` and `ProductCatalog` for the product catalog
//! - `Cart`, `LineItem`, `Coupon`, and `CartSnapshot` for the cart model
//! - `pricing::compute`, the pure price breakdown calculator
//! - `Order` for finalized checkouts
//! - `StoreError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use soko_core::{Cart, CartSnapshot, Coupon, LineItem, Product, Price, Currency, pricing};
//!
//! let product = Product::new("kitenge-tote", "Kitenge Tote", Price::new(950.0, Currency::KES));
//!
//! let mut cart = Cart::new();
//! cart.merge_item(LineItem::from_product(&product, 2, vec![]));
//! cart.applied_coupon = Some(Coupon::percentage("KARIBU10", 10));
//!
//! let snapshot = CartSnapshot::from_cart(&cart);
//! let breakdown = pricing::compute(&cart.items, cart.applied_coupon.as_ref(), &rates);
//! ```

pub mod cart;
pub mod error;
pub mod order;
pub mod pricing;
pub mod product;

// Re-exports for convenience
pub use cart::{Cart, CartSnapshot, Coupon, CouponKind, LineItem, SelectedOption};
pub use error::{StoreError, StoreResult};
pub use order::Order;
pub use pricing::{PriceBreakdown, PricingRates};
pub use product::{Currency, Price, Product, ProductCatalog, ProductOption};
