//! Checkout: convert the cart into an immutable order record.
//!
//! The flow here is a local simulation - no payment processor is ever
//! contacted. The load-bearing invariant is side-effect ordering: the order
//! is appended to the persisted history *before* the cart is cleared, never
//! the reverse, so a failure can't record an order and keep the cart, or
//! clear the cart without a record.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use revline_core::{Email, OrderId, Price};

use crate::cart::{CartItem, CartStore};
use crate::storage::{Storage, StorageError, StorageExt, keys};

/// Shipping and contact details supplied at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    /// Customer name.
    pub name: String,
    /// Contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    /// Contact phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Shipping address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Shipping city.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Free-form order notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CustomerInfo {
    /// Customer info with just a name, all other fields empty.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
            phone: None,
            address: None,
            city: None,
            notes: None,
        }
    }
}

/// Order lifecycle status.
///
/// Only `Completed` exists: checkout is simulated, so there are no partial
/// or failed payment states to model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// The order went through.
    Completed,
}

/// An immutable snapshot of a completed checkout.
///
/// Orders are append-only: once persisted, a record is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Time-based order ID; unique per process, not cryptographic.
    pub id: OrderId,
    /// Deep copy of the cart at checkout time.
    pub items: Vec<CartItem>,
    /// Cart subtotal at checkout time; no tax or fees at this layer.
    pub total: Price,
    /// Customer details supplied by the caller.
    pub customer: CustomerInfo,
    /// When the order was created.
    pub created_at: DateTime<Utc>,
    /// Order status.
    pub status: OrderStatus,
}

/// Errors that can occur during checkout.
///
/// Any of these leaves the cart exactly as it was before the call.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout was attempted with no items in the cart.
    #[error("cart is empty")]
    EmptyCart,

    /// The order history could not be written.
    #[error("failed to record order: {0}")]
    Storage(#[from] StorageError),
}

/// Drives the cart-to-order conversion.
pub struct CheckoutOrchestrator {
    cart: CartStore,
    storage: Arc<dyn Storage>,
    latency: Duration,
}

impl CheckoutOrchestrator {
    /// Create an orchestrator over the given cart and order history store.
    ///
    /// `latency` simulates the payment round-trip; tests pass
    /// `Duration::ZERO`.
    #[must_use]
    pub const fn new(cart: CartStore, storage: Arc<dyn Storage>, latency: Duration) -> Self {
        Self {
            cart,
            storage,
            latency,
        }
    }

    /// Convert the current cart into a completed [`Order`].
    ///
    /// Captures the cart snapshot and subtotal, simulates payment latency,
    /// appends the order to the persisted history, and only then clears the
    /// cart. If anything fails before the order is persisted, the cart is
    /// left untouched so the user can retry.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::EmptyCart`] for an empty cart and
    /// [`CheckoutError::Storage`] if the order history write fails; in both
    /// cases no order is recorded and the cart is unchanged.
    pub async fn checkout(&self, customer: CustomerInfo) -> Result<Order, CheckoutError> {
        let items = self.cart.items();
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        // Derived from the captured snapshot, not re-read from the cart: a
        // concurrent cart mutation must not desynchronize an order's total
        // from its items.
        let total: Price = items.iter().map(CartItem::line_total).sum();

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let order = Order {
            id: next_order_id(),
            items,
            total,
            customer,
            created_at: Utc::now(),
            status: OrderStatus::Completed,
        };

        // Persist order, then clear cart - never the reverse. The append is
        // one atomic read-modify-write, so concurrent checkouts over the
        // same store cannot drop each other's records.
        self.storage
            .modify::<Vec<Order>>(keys::ORDERS, |orders| orders.push(order.clone()))?;

        self.cart.clear();

        tracing::info!(order = %order.id, total = %order.total, "checkout completed");
        Ok(order)
    }
}

/// Millisecond timestamp plus a process-local sequence number.
fn next_order_id() -> OrderId {
    static SEQUENCE: AtomicU64 = AtomicU64::new(0);
    let millis = Utc::now().timestamp_millis();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    OrderId::new(format!("ord_{millis}_{seq}"))
}
