//! Shopping cart store.
//!
//! Owns the list of cart line items. Every mutation re-persists the full
//! collection in the same logical step, so a crash can only lose the next
//! unsaved mutation, never corrupt a committed one. Totals and counts are
//! derived fresh on every read, never cached.

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use revline_core::{ItemKind, Price, ProductId};

use crate::checkout::Order;
use crate::storage::{Storage, StorageExt, keys};

/// One entry in the shopping cart.
///
/// Identity is the compound `(kind, id)` key: a restomod and a package may
/// share a raw ID without colliding. No two items in a cart share a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product kind, half of the identity key.
    pub kind: ItemKind,
    /// Product ID, the other half of the identity key.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Price per unit.
    pub unit_price: Price,
    /// Product image URL, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Units of this item in the cart; never stored as zero.
    pub quantity: u32,
}

impl CartItem {
    /// Whether this line matches the given identity key.
    #[must_use]
    pub fn matches(&self, kind: ItemKind, id: &ProductId) -> bool {
        self.kind == kind && self.id == *id
    }

    /// Price of this line: unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price * self.quantity
    }
}

/// The cart store.
///
/// Cheaply cloneable; clones share the same cart. UI code reads through
/// [`items`](Self::items)/[`subtotal`](Self::subtotal)/[`item_count`](Self::item_count)
/// and mutates only through the methods here.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartInner>,
}

struct CartInner {
    items: RwLock<Vec<CartItem>>,
    storage: Arc<dyn Storage>,
}

impl CartStore {
    /// Create a store, hydrating once from persisted state.
    ///
    /// A persisted value that fails to parse is discarded (empty cart) and
    /// logged; it is not a user-facing error.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let mut items = storage.load::<Vec<CartItem>>(keys::CART).unwrap_or_default();

        // Zero quantities are never persisted by this store; drop any that
        // show up anyway (hand-edited or pre-migration state).
        let before = items.len();
        items.retain(|item| item.quantity > 0);
        if items.len() < before {
            tracing::warn!(
                dropped = before - items.len(),
                "discarded persisted cart lines with zero quantity"
            );
        }

        Self {
            inner: Arc::new(CartInner {
                items: RwLock::new(items),
                storage,
            }),
        }
    }

    /// Add an item to the cart.
    ///
    /// If a line with the same `(kind, id)` key exists, its quantity is
    /// incremented by `item.quantity`; otherwise the item is appended.
    /// Adding zero units is a no-op.
    pub fn add_item(&self, item: CartItem) {
        if item.quantity == 0 {
            return;
        }

        let mut items = self.lock_items();
        if let Some(existing) = items
            .iter_mut()
            .find(|line| line.matches(item.kind, &item.id))
        {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            items.push(item);
        }
        self.persist(&items);
    }

    /// Remove the line with the given key. Absent key is a no-op.
    pub fn remove_item(&self, kind: ItemKind, id: &ProductId) {
        let mut items = self.lock_items();
        let before = items.len();
        items.retain(|line| !line.matches(kind, id));
        if items.len() < before {
            self.persist(&items);
        }
    }

    /// Set the quantity of the line with the given key.
    ///
    /// A quantity of zero removes the line entirely; a zero is never
    /// stored. Absent key is a no-op.
    pub fn update_quantity(&self, kind: ItemKind, id: &ProductId, quantity: u32) {
        if quantity == 0 {
            self.remove_item(kind, id);
            return;
        }

        let mut items = self.lock_items();
        if let Some(line) = items.iter_mut().find(|line| line.matches(kind, id)) {
            line.quantity = quantity;
            self.persist(&items);
        }
    }

    /// Empty the cart and persist the empty state.
    pub fn clear(&self) {
        let mut items = self.lock_items();
        items.clear();
        self.persist(&items);
    }

    /// Cloned snapshot of the cart lines, in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.lock_items_read().clone()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lock_items_read()
            .iter()
            .map(|line| u64::from(line.quantity))
            .sum()
    }

    /// Sum of unit price times quantity across all lines, recomputed fresh.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.lock_items_read()
            .iter()
            .map(CartItem::line_total)
            .sum()
    }

    /// Read the persisted order history.
    ///
    /// Absent or corrupt storage reads as an empty list.
    #[must_use]
    pub fn list_orders(&self) -> Vec<Order> {
        self.inner
            .storage
            .load::<Vec<Order>>(keys::ORDERS)
            .unwrap_or_default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn lock_items(&self) -> std::sync::RwLockWriteGuard<'_, Vec<CartItem>> {
        self.inner
            .items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_items_read(&self) -> std::sync::RwLockReadGuard<'_, Vec<CartItem>> {
        self.inner
            .items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Re-serialize the full cart. Called with the write lock held so the
    /// in-memory mutation and its persistence form one logical step.
    fn persist(&self, items: &[CartItem]) {
        if let Err(err) = self.inner.storage.save(keys::CART, items) {
            tracing::warn!(error = %err, "failed to persist cart");
        }
    }
}
