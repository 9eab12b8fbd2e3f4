//! # Payment Confirmation Engine
//!
//! An STK push does not complete synchronously: initiation sends a
//! prompt to the payer's handset, and the outcome (confirmed, declined,
//! or nothing) only becomes visible later through the status endpoint.
//! `PaymentConfirmationEngine` drives that wait as a polling state
//! machine with a bounded confirmation window and cooperative
//! cancellation.

use crate::gateway::{PaymentStatus, StkGateway};
use crate::phone::PhoneNumber;
use chrono::{DateTime, Utc};
use soko_core::{Price, StoreError, StoreResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing::{info, instrument, warn};

/// Polling policy for the confirmation window
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationPolicy {
    /// Fixed interval between status polls
    pub poll_interval: Duration,
    /// Polls allowed before the session times out
    pub max_attempts: u32,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(crate::config::DEFAULT_POLL_INTERVAL_MS),
            max_attempts: crate::config::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ConfirmationPolicy {
    /// Total confirmation window: `poll_interval * max_attempts`
    pub fn window(&self) -> Duration {
        self.poll_interval * self.max_attempts
    }
}

/// Observable state of a payment session.
///
/// `Succeeded`, `Failed` and `TimedOut` are terminal; once reached the
/// engine makes no further gateway calls and the state never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentState {
    /// Waiting for the payer's phone number
    Input,
    /// STK push request in flight
    Initiating,
    /// Push delivered, polling for handset confirmation
    AwaitingConfirmation,
    /// Payment confirmed
    Succeeded,
    /// Payment declined, cancelled at the handset, or rejected at initiation
    Failed { reason: String },
    /// Confirmation window elapsed without a terminal answer
    TimedOut,
}

impl PaymentState {
    /// Whether this state admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentState::Succeeded | PaymentState::Failed { .. } | PaymentState::TimedOut
        )
    }
}

/// Mutable session record for one payment attempt
#[derive(Debug, Clone)]
pub struct PaymentSession {
    pub order_id: String,
    pub amount: Price,
    pub phone: Option<PhoneNumber>,
    pub checkout_request_id: Option<String>,
    pub attempts_made: u32,
    pub created_at: DateTime<Utc>,
}

/// Handle for cancelling a confirmation wait from another task.
///
/// Cancellation is cooperative and inert: it stops further polling and
/// leaves the session in its current non-terminal state. It never marks
/// the payment failed, because the payer may still confirm at the
/// handset after the client stops watching.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelHandle {
    fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Drives one payment from phone entry to a terminal outcome
pub struct PaymentConfirmationEngine {
    gateway: Arc<dyn StkGateway>,
    policy: ConfirmationPolicy,
    session: Mutex<PaymentSession>,
    state_tx: watch::Sender<PaymentState>,
    cancel: CancelHandle,
}

impl PaymentConfirmationEngine {
    /// Create an engine for one order in the `Input` state
    pub fn new(
        gateway: Arc<dyn StkGateway>,
        order_id: impl Into<String>,
        amount: Price,
        policy: ConfirmationPolicy,
    ) -> Self {
        let (state_tx, _) = watch::channel(PaymentState::Input);
        Self {
            gateway,
            policy,
            session: Mutex::new(PaymentSession {
                order_id: order_id.into(),
                amount,
                phone: None,
                checkout_request_id: None,
                attempts_made: 0,
                created_at: Utc::now(),
            }),
            state_tx,
            cancel: CancelHandle::new(),
        }
    }

    /// Current state
    pub fn state(&self) -> PaymentState {
        self.state_tx.borrow().clone()
    }

    /// Subscribe to state transitions
    pub fn subscribe(&self) -> watch::Receiver<PaymentState> {
        self.state_tx.subscribe()
    }

    /// Handle for cancelling the confirmation wait
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Snapshot of the session record
    pub fn session(&self) -> PaymentSession {
        self.lock_session().clone()
    }

    /// Submit the payer's phone number and run the payment to a
    /// terminal state (or until cancelled).
    ///
    /// Returns the final state. Payment outcomes such as declined or
    /// timed out are states, not errors; `Err` is reserved for being
    /// unable to start at all (bad phone number, session not in `Input`).
    #[instrument(skip(self, raw_phone))]
    pub async fn submit(&self, raw_phone: &str) -> StoreResult<PaymentState> {
        if self.state() != PaymentState::Input {
            return Err(StoreError::InvalidRequest(
                "payment already submitted".to_string(),
            ));
        }

        // A rejected phone number keeps the session in Input so the
        // user can correct it.
        let phone = PhoneNumber::normalize(raw_phone)?;

        let (order_id, amount) = {
            let mut session = self.lock_session();
            session.phone = Some(phone.clone());
            (session.order_id.clone(), session.amount.clone())
        };

        self.transition(PaymentState::Initiating);

        match self
            .gateway
            .initiate_push(&order_id, &phone, &amount)
            .await
        {
            Ok(checkout_request_id) => {
                self.lock_session().checkout_request_id = Some(checkout_request_id);
            }
            Err(e) => {
                // Synchronous rejection: terminal, no polling
                let reason = match e {
                    StoreError::PaymentDeclined { reason } => reason,
                    other => other.to_string(),
                };
                warn!(%order_id, %reason, "STK push rejected at initiation");
                let state = PaymentState::Failed { reason };
                self.transition(state.clone());
                return Ok(state);
            }
        }

        self.transition(PaymentState::AwaitingConfirmation);
        Ok(self.poll_until_terminal(&order_id).await)
    }

    /// Abandon this engine and return a fresh one for the same order,
    /// back in `Input`. The abandoned wait is cancelled so no stale
    /// poll can touch the new session.
    pub fn restart(&self) -> Self {
        self.cancel.cancel();
        let session = self.lock_session();
        Self::new(
            Arc::clone(&self.gateway),
            session.order_id.clone(),
            session.amount.clone(),
            self.policy,
        )
    }

    async fn poll_until_terminal(&self, order_id: &str) -> PaymentState {
        loop {
            if self.cancel.is_cancelled() {
                info!(%order_id, "Confirmation wait cancelled");
                return self.state();
            }

            tokio::select! {
                _ = tokio::time::sleep(self.policy.poll_interval) => {}
                _ = self.cancel.notify.notified() => {
                    info!(%order_id, "Confirmation wait cancelled");
                    return self.state();
                }
            }

            if self.cancel.is_cancelled() {
                return self.state();
            }

            let polled = self.gateway.payment_status(order_id).await;

            // A result that lands after cancellation must not change state
            if self.cancel.is_cancelled() {
                return self.state();
            }

            match polled {
                Ok(PaymentStatus::Completed) => {
                    info!(%order_id, "Payment confirmed");
                    self.transition(PaymentState::Succeeded);
                    return PaymentState::Succeeded;
                }
                Ok(PaymentStatus::Failed) => {
                    let state = PaymentState::Failed {
                        reason: "Declined or cancelled at the handset".to_string(),
                    };
                    warn!(%order_id, "Payment failed at the handset");
                    self.transition(state.clone());
                    return state;
                }
                Ok(PaymentStatus::Pending) => {}
                Err(e) => {
                    // Transient poll failures burn an attempt but do
                    // not fail the payment
                    warn!(%order_id, error = %e, "Status poll failed");
                }
            }

            let attempts = {
                let mut session = self.lock_session();
                session.attempts_made += 1;
                session.attempts_made
            };

            if attempts >= self.policy.max_attempts {
                warn!(%order_id, attempts, "Confirmation window elapsed");
                self.transition(PaymentState::TimedOut);
                return PaymentState::TimedOut;
            }
        }
    }

    fn transition(&self, next: PaymentState) {
        self.state_tx.send_replace(next);
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, PaymentSession> {
        self.session.lock().expect("payment session lock poisoned")
    }
}
