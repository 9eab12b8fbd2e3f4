//! # soko-mpesa
//!
//! M-Pesa STK push payments for sokocart-rs.
//!
//! Initiating a push is the easy half; the hard half is that the
//! outcome arrives out of band, whenever the payer reacts to the
//! handset prompt. This crate wraps both: a thin gateway client for the
//! payments API and `PaymentConfirmationEngine`, a polling state
//! machine that waits out the confirmation window (10s x 30 polls by
//! default) and settles on exactly one terminal state.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use soko_mpesa::{ConfirmationPolicy, HttpStkGateway, PaymentConfirmationEngine, PaymentState};
//! use std::sync::Arc;
//!
//! let gateway = Arc::new(HttpStkGateway::from_env()?);
//! let engine = PaymentConfirmationEngine::new(
//!     gateway,
//!     order.id.clone(),
//!     order.amount.clone(),
//!     ConfirmationPolicy::default(),
//! );
//!
//! match engine.submit("0712345678").await? {
//!     PaymentState::Succeeded => println!("paid"),
//!     PaymentState::Failed { reason } => println!("declined: {reason}"),
//!     PaymentState::TimedOut => println!("no confirmation, try again"),
//!     _ => {}
//! }
//! ```

pub mod config;
pub mod confirm;
pub mod gateway;
pub mod phone;

// Re-exports
pub use config::{MpesaConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL_MS};
pub use confirm::{
    CancelHandle, ConfirmationPolicy, PaymentConfirmationEngine, PaymentSession, PaymentState,
};
pub use gateway::{HttpStkGateway, PaymentStatus, StkGateway};
pub use phone::PhoneNumber;
