//! # Cart Engine
//!
//! Owns the authoritative in-memory cart for the current session and
//! decides, at a single dispatch point, whether a mutation acts on local
//! state (Guest) or on the remote cart API (Authenticated).
//!
//! Every mutation produces a new immutable `CartSnapshot`, published
//! through a `watch` channel and persisted to the local store. In
//! Authenticated mode the server's post-mutation snapshot replaces local
//! state wholesale; the client never recomputes pricing itself there, so
//! client and server rounding/coupon logic cannot drift.
//!
//! Mutations are serialized per cart with a monotonically increasing
//! request sequence number: a response is applied only if it answers the
//! most recently issued request, otherwise it is discarded. No lock is
//! needed beyond that rule in the single-flow model.

use crate::backend::{CartBackend, LineItemRequest};
use crate::store::{self, AuthSession, LocalStore};
use chrono::Utc;
use soko_core::{
    pricing, Cart, CartSnapshot, LineItem, Order, Price, PricingRates, Product, ProductCatalog,
    SelectedOption, StoreError, StoreResult,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// Who owns the truth about the cart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartMode {
    /// Local state is authoritative; persisted under the local cart key
    Guest,
    /// The server is authoritative; the local copy is a read cache
    Authenticated,
}

/// Outcome of merging a guest cart into the server cart on login
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    /// Guest lines merged server-side (summed or appended)
    pub merged_lines: usize,
    /// Product ids of guest lines the server rejected for stock
    pub skipped_lines: Vec<String>,
    /// Guest coupon code dropped because it no longer validated
    pub dropped_coupon: Option<String>,
}

struct EngineInner {
    mode: CartMode,
    cart: Cart,
}

/// The cart consistency engine
pub struct CartEngine {
    backend: Arc<dyn CartBackend>,
    store: Arc<dyn LocalStore>,
    catalog: ProductCatalog,
    rates: PricingRates,
    inner: Mutex<EngineInner>,
    /// Monotonic sequence for the stale-response guard
    seq: AtomicU64,
    snapshot_tx: watch::Sender<CartSnapshot>,
}

impl CartEngine {
    /// Create an engine, restoring any cached cart and session.
    ///
    /// A cached authenticated session puts the engine straight into
    /// Authenticated mode with the cached snapshot as last-known-good.
    pub fn new(
        backend: Arc<dyn CartBackend>,
        store: Arc<dyn LocalStore>,
        catalog: ProductCatalog,
        rates: PricingRates,
    ) -> Self {
        let session = store::load_session(store.as_ref()).ok().flatten();
        let mode = match session {
            Some(ref s) if s.is_authenticated => CartMode::Authenticated,
            _ => CartMode::Guest,
        };

        let cart = store::load_cart(store.as_ref())
            .ok()
            .flatten()
            .map(|s| s.to_cart())
            .unwrap_or_default();

        debug!(?mode, items = cart.items.len(), "Cart engine restored");

        let snapshot = CartSnapshot::from_cart(&cart);
        let (snapshot_tx, _) = watch::channel(snapshot);

        Self {
            backend,
            store,
            catalog,
            rates,
            inner: Mutex::new(EngineInner { mode, cart }),
            seq: AtomicU64::new(0),
            snapshot_tx,
        }
    }

    /// Current cart mode
    pub fn mode(&self) -> CartMode {
        self.lock_inner().mode
    }

    /// The last published immutable snapshot
    pub fn snapshot(&self) -> CartSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Subscribe to snapshot changes (UI re-render hook)
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Pricing rates this engine quotes checkout breakdowns with
    pub fn rates(&self) -> &PricingRates {
        &self.rates
    }

    // =========================================================================
    // Mutators
    // =========================================================================

    /// Add a product to the cart, merging into an existing line with the
    /// same `(product, options)` identity. Fails with `StockExceeded` when
    /// the resulting quantity would exceed tracked stock; the cart is left
    /// unchanged.
    #[instrument(skip(self, product, options), fields(product_id = %product.id, quantity))]
    pub async fn add_item(
        &self,
        product: &Product,
        quantity: u32,
        options: Vec<SelectedOption>,
    ) -> StoreResult<CartSnapshot> {
        if quantity < 1 {
            return Err(StoreError::InvalidRequest(
                "Quantity must be at least 1".to_string(),
            ));
        }

        match self.mode() {
            CartMode::Guest => {
                let mut cart = self.lock_inner().cart.clone();
                let current = cart
                    .find(&product.id, &options)
                    .map(|i| i.quantity)
                    .unwrap_or(0);
                ensure_stock(product, current + quantity)?;

                cart.merge_item(LineItem::from_product(product, quantity, options));
                Ok(self.commit_guest(cart))
            }
            CartMode::Authenticated => {
                let seq = self.begin_request();
                let request = LineItemRequest {
                    product_id: product.id.clone(),
                    quantity,
                    selected_options: options,
                };
                let remote = self.backend.add_item(&request).await?;
                Ok(self.apply_remote(seq, remote))
            }
        }
    }

    /// Replace the quantity of a line. A target below 1 behaves as
    /// `remove_item`; otherwise the same stock constraint as `add_item`
    /// applies.
    #[instrument(skip(self, options))]
    pub async fn update_quantity(
        &self,
        product_id: &str,
        options: &[SelectedOption],
        new_quantity: u32,
    ) -> StoreResult<CartSnapshot> {
        if new_quantity < 1 {
            return self.remove_item(product_id, options).await;
        }

        match self.mode() {
            CartMode::Guest => {
                if let Some(product) = self.catalog.get(product_id) {
                    ensure_stock(product, new_quantity)?;
                }
                let mut cart = self.lock_inner().cart.clone();
                cart.set_quantity(product_id, options, new_quantity);
                Ok(self.commit_guest(cart))
            }
            CartMode::Authenticated => {
                let seq = self.begin_request();
                let request = LineItemRequest {
                    product_id: product_id.to_string(),
                    quantity: new_quantity,
                    selected_options: options.to_vec(),
                };
                let remote = self.backend.update_quantity(&request).await?;
                Ok(self.apply_remote(seq, remote))
            }
        }
    }

    /// Remove the matching line; a no-op (not an error) if absent
    #[instrument(skip(self, options))]
    pub async fn remove_item(
        &self,
        product_id: &str,
        options: &[SelectedOption],
    ) -> StoreResult<CartSnapshot> {
        match self.mode() {
            CartMode::Guest => {
                let mut cart = self.lock_inner().cart.clone();
                cart.remove_item(product_id, options);
                Ok(self.commit_guest(cart))
            }
            CartMode::Authenticated => {
                let seq = self.begin_request();
                let remote = self.backend.remove_item(product_id, options).await?;
                Ok(self.apply_remote(seq, remote))
            }
        }
    }

    /// Apply a coupon by code, replacing any currently applied coupon.
    ///
    /// Validation is delegated: in Guest mode the coupon is fetched from
    /// the order service and checked here; in Authenticated mode the
    /// server validates and applies. On failure the cart is unchanged.
    #[instrument(skip(self))]
    pub async fn apply_coupon(&self, code: &str) -> StoreResult<CartSnapshot> {
        match self.mode() {
            CartMode::Guest => {
                let coupon = self.backend.fetch_coupon(code).await?;
                if coupon.is_expired(Utc::now()) {
                    return Err(StoreError::CouponExpired {
                        code: code.to_string(),
                    });
                }

                let mut cart = self.lock_inner().cart.clone();
                let subtotal = cart.subtotal();
                if let Some(minimum) = coupon.minimum_order_amount {
                    if subtotal < minimum {
                        return Err(StoreError::CouponMinimumNotMet {
                            code: code.to_string(),
                            minimum,
                            subtotal,
                        });
                    }
                }

                info!(code, "Coupon applied to guest cart");
                cart.applied_coupon = Some(coupon);
                Ok(self.commit_guest(cart))
            }
            CartMode::Authenticated => {
                let seq = self.begin_request();
                let remote = self.backend.apply_coupon(code).await?;
                Ok(self.apply_remote(seq, remote))
            }
        }
    }

    /// Clear the applied coupon; idempotent
    #[instrument(skip(self))]
    pub async fn remove_coupon(&self) -> StoreResult<CartSnapshot> {
        match self.mode() {
            CartMode::Guest => {
                let mut cart = self.lock_inner().cart.clone();
                cart.applied_coupon = None;
                Ok(self.commit_guest(cart))
            }
            CartMode::Authenticated => {
                let seq = self.begin_request();
                let remote = self.backend.remove_coupon().await?;
                Ok(self.apply_remote(seq, remote))
            }
        }
    }

    /// Empty the cart: all items removed, coupon cleared
    #[instrument(skip(self))]
    pub async fn clear(&self) -> StoreResult<CartSnapshot> {
        match self.mode() {
            CartMode::Guest => {
                let mut cart = self.lock_inner().cart.clone();
                cart.clear();
                Ok(self.commit_guest(cart))
            }
            CartMode::Authenticated => {
                let seq = self.begin_request();
                let remote = self.backend.clear_cart().await?;
                Ok(self.apply_remote(seq, remote))
            }
        }
    }

    // =========================================================================
    // Session transitions
    // =========================================================================

    /// Merge the guest cart into the server cart and switch to
    /// Authenticated mode.
    ///
    /// Each local line is pushed server-side; the server merges by line
    /// identity, summing quantities. A line the server accepts is removed
    /// from the local cart at that moment, so a login retried after a
    /// transport failure pushes only the unmerged remainder and never
    /// double-counts a quantity. Lines the server rejects for stock are
    /// skipped and reported, not fatal. The guest coupon is re-applied if
    /// it still validates server-side, otherwise silently dropped (to
    /// avoid double-discount inconsistency) and reported so the UI can
    /// notify. A transport failure aborts the login and leaves the engine
    /// in Guest mode holding the unmerged lines.
    #[instrument(skip(self, session), fields(user = %session.user))]
    pub async fn login(&self, session: AuthSession) -> StoreResult<ReconcileReport> {
        if self.mode() == CartMode::Authenticated {
            return Err(StoreError::InvalidRequest(
                "Already authenticated".to_string(),
            ));
        }

        let local = self.lock_inner().cart.clone();
        let mut report = ReconcileReport::default();

        for item in &local.items {
            let request = LineItemRequest {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                selected_options: item.selected_options.clone(),
            };
            match self.backend.add_item(&request).await {
                Ok(_) => {
                    report.merged_lines += 1;
                    // The server owns this line now; a retried login must
                    // push only the unmerged remainder.
                    let snapshot = {
                        let mut inner = self.lock_inner();
                        inner
                            .cart
                            .remove_item(&item.product_id, &item.selected_options);
                        CartSnapshot::from_cart(&inner.cart)
                    };
                    self.persist(&snapshot);
                }
                Err(StoreError::StockExceeded { product_id, .. }) => {
                    warn!(product_id, "Line skipped during reconciliation: stock");
                    report.skipped_lines.push(product_id);
                }
                Err(e) => {
                    let snapshot = CartSnapshot::from_cart(&self.lock_inner().cart);
                    self.snapshot_tx.send_replace(snapshot);
                    return Err(e);
                }
            }
        }

        if let Some(coupon) = &local.applied_coupon {
            match self.backend.apply_coupon(&coupon.code).await {
                Ok(_) => {}
                Err(e) if e.is_validation() => {
                    info!(code = %coupon.code, "Guest coupon dropped during reconciliation");
                    report.dropped_coupon = Some(coupon.code.clone());
                }
                Err(e) => return Err(e),
            }
        }

        let remote = self.backend.fetch_cart().await?;

        {
            let mut inner = self.lock_inner();
            inner.mode = CartMode::Authenticated;
            inner.cart = remote.to_cart();
        }
        self.begin_request(); // invalidate any in-flight guest-era responses

        if let Err(e) = store::save_session(self.store.as_ref(), &session) {
            warn!("Failed to persist auth session: {e}");
        }
        self.persist(&remote);
        self.snapshot_tx.send_replace(remote);

        info!(
            merged = report.merged_lines,
            skipped = report.skipped_lines.len(),
            "Cart reconciliation complete"
        );
        Ok(report)
    }

    /// Drop the authenticated session and return to an empty guest cart
    #[instrument(skip(self))]
    pub async fn logout(&self) -> StoreResult<CartSnapshot> {
        if let Err(e) = self.store.remove(store::AUTH_KEY) {
            warn!("Failed to clear auth session: {e}");
        }

        {
            let mut inner = self.lock_inner();
            inner.mode = CartMode::Guest;
            inner.cart = Cart::new();
        }
        self.begin_request();

        Ok(self.commit_guest(Cart::new()))
    }

    /// Finalize the cart into an `Order` and clear it.
    ///
    /// The checkout breakdown (shipping, tax) is computed from the current
    /// snapshot's items and coupon with this engine's rates; the order
    /// amount is the breakdown total.
    #[instrument(skip(self))]
    pub async fn checkout(&self) -> StoreResult<Order> {
        let snapshot = self.snapshot();
        if snapshot.items.is_empty() {
            return Err(StoreError::InvalidRequest("Cart is empty".to_string()));
        }

        let breakdown = pricing::compute(
            &snapshot.items,
            snapshot.applied_coupon.as_ref(),
            &self.rates,
        );
        let currency = snapshot.items[0].unit_price.currency;
        let order = Order::new(
            Price::from_cents(breakdown.total, currency),
            breakdown,
            snapshot.total_items,
        );

        self.clear().await?;

        info!(order_id = %order.id, total = breakdown.total, "Order placed");
        Ok(order)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lock_inner(&self) -> MutexGuard<'_, EngineInner> {
        self.inner.lock().expect("cart state lock poisoned")
    }

    /// Issue a new request sequence number
    fn begin_request(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply a server snapshot if it answers the most recently issued
    /// request; otherwise discard it and keep the last-known-good state.
    fn apply_remote(&self, seq: u64, remote: CartSnapshot) -> CartSnapshot {
        if seq != self.seq.load(Ordering::SeqCst) {
            debug!(seq, "Discarding stale cart response");
            return self.snapshot();
        }

        self.lock_inner().cart = remote.to_cart();
        self.persist(&remote);
        self.snapshot_tx.send_replace(remote.clone());
        remote
    }

    /// Commit a guest-mode cart: recompute totals, persist, publish
    fn commit_guest(&self, cart: Cart) -> CartSnapshot {
        let snapshot = CartSnapshot::from_cart(&cart);
        self.lock_inner().cart = cart;
        self.persist(&snapshot);
        self.snapshot_tx.send_replace(snapshot.clone());
        snapshot
    }

    /// Best-effort cache write; failures are logged, never surfaced
    fn persist(&self, snapshot: &CartSnapshot) {
        if let Err(e) = store::save_cart(self.store.as_ref(), snapshot) {
            warn!("Failed to persist cart: {e}");
        }
    }
}

fn ensure_stock(product: &Product, requested: u32) -> StoreResult<()> {
    if product.track_quantity && requested > product.available_quantity {
        return Err(StoreError::StockExceeded {
            product_id: product.id.clone(),
            requested,
            available: product.available_quantity,
        });
    }
    Ok(())
}
