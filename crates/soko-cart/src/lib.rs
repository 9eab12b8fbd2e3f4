//! # soko-cart
//!
//! The cart consistency engine for sokocart-rs.
//!
//! A cart can exist in two places: an anonymous local cart and a
//! server-backed cart tied to an authenticated session. `CartEngine`
//! reconciles the two, keeps price/discount/quantity invariants correct
//! under interleaved asynchronous actions, and publishes immutable
//! snapshots for the UI.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use soko_cart::{CartEngine, HttpCartBackend, FileStore, AuthSession};
//! use std::sync::Arc;
//!
//! let backend = Arc::new(HttpCartBackend::from_env()?);
//! let store = Arc::new(FileStore::new(".sokocart")?);
//! let engine = CartEngine::new(backend, store, catalog, rates);
//!
//! // Guest mutations act locally
//! engine.add_item(&product, 2, vec![]).await?;
//!
//! // Login merges the guest cart into the server cart
//! let report = engine.login(AuthSession::new("amina@example.com", token)).await?;
//! if let Some(code) = report.dropped_coupon {
//!     // tell the user their coupon no longer applies
//! }
//!
//! // Checkout finalizes an Order for the payment engine
//! let order = engine.checkout().await?;
//! ```

pub mod backend;
pub mod engine;
pub mod store;

// Re-exports
pub use backend::{CartApiConfig, CartBackend, HttpCartBackend, LineItemRequest};
pub use engine::{CartEngine, CartMode, ReconcileReport};
pub use store::{AuthSession, FileStore, LocalStore, MemoryStore, AUTH_KEY, CART_KEY};
