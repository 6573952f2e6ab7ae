//! Local cart state: a reducer over cart lines plus a persisting store.
//!
//! The cart holds denormalized product snapshots captured at add-to-cart
//! time, one line per product id, and mirrors every mutation into the local
//! key-value slot. The in-memory collection is authoritative for the
//! session; persistence is best-effort and failures are logged, never
//! surfaced.
//!
//! Mutations go through the pure [`apply`] reducer so the clamping rules are
//! testable in isolation; [`CartStore`] adds locking and persistence.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::warn;

use mebius_core::{Price, ProductId};

use crate::api::types::Product;
use crate::storage::{KvStore, keys};

/// One product-quantity pairing in the local cart.
///
/// `product` is a snapshot, not a live reference: later server-side price or
/// stock changes are only observed through the check-stock endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    /// Line total: snapshot price times quantity.
    #[must_use]
    pub fn total(&self) -> Price {
        self.product.price.line_total(self.quantity)
    }
}

/// A cart mutation.
#[derive(Debug, Clone)]
pub enum CartAction {
    /// Add one unit of a product, inserting a new line if needed.
    Add(Product),
    /// Set the quantity of an existing line.
    UpdateQuantity {
        product_id: ProductId,
        quantity: u32,
    },
    /// Drop the line for a product.
    Remove(ProductId),
    /// Empty the cart.
    Clear,
}

/// What a mutation did to the collection.
///
/// The store treats a rejection as a silent no-op, matching the original
/// behavior; the outcome is surfaced so callers that *want* to notify the
/// user can do so.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOutcome {
    /// State changed (or a `Remove`/`Clear` ran, which always apply).
    Applied,
    /// The requested quantity would exceed the product's last-known stock.
    RejectedOutOfStock,
}

/// Apply a mutation to the line collection.
///
/// Invariants maintained:
/// - at most one line per distinct product id
/// - a line's quantity never exceeds its snapshot's stock
pub fn apply(lines: &mut Vec<CartLine>, action: CartAction) -> CartOutcome {
    match action {
        CartAction::Add(product) => {
            if let Some(line) = lines.iter_mut().find(|line| line.product.id == product.id) {
                if line.quantity >= product.stock {
                    return CartOutcome::RejectedOutOfStock;
                }
                line.quantity += 1;
            } else {
                lines.push(CartLine {
                    product,
                    quantity: 1,
                });
            }
            CartOutcome::Applied
        }
        CartAction::UpdateQuantity {
            product_id,
            quantity,
        } => {
            let Some(line) = lines.iter_mut().find(|line| line.product.id == product_id) else {
                // Nothing to update; treat as applied like the original did.
                return CartOutcome::Applied;
            };
            if quantity > line.product.stock {
                return CartOutcome::RejectedOutOfStock;
            }
            line.quantity = quantity;
            CartOutcome::Applied
        }
        CartAction::Remove(product_id) => {
            lines.retain(|line| line.product.id != product_id);
            CartOutcome::Applied
        }
        CartAction::Clear => {
            lines.clear();
            CartOutcome::Applied
        }
    }
}

// =============================================================================
// CartStore
// =============================================================================

/// The local cart store: reducer state plus the persisted slot.
pub struct CartStore {
    lines: Mutex<Vec<CartLine>>,
    storage: Arc<dyn KvStore>,
}

impl CartStore {
    /// Load the cart from the key-value slot.
    ///
    /// A missing or unreadable slot starts the cart empty; the error is
    /// logged and the session continues.
    #[must_use]
    pub fn load(storage: Arc<dyn KvStore>) -> Self {
        let lines = match storage.get(keys::CART) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<CartLine>>(&raw) {
                Ok(lines) => lines,
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable persisted cart");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read persisted cart");
                Vec::new()
            }
        };

        Self {
            lines: Mutex::new(lines),
            storage,
        }
    }

    /// Add one unit of `product` to the cart.
    ///
    /// Incrementing past the snapshot's stock is rejected; the outcome tells
    /// the caller which happened.
    pub fn add(&self, product: Product) -> CartOutcome {
        self.mutate(CartAction::Add(product))
    }

    /// Set the quantity of the line for `product_id`.
    ///
    /// Quantities above the snapshot's stock are rejected. Zero is applied
    /// as-is; callers are expected to use [`CartStore::remove`] to drop a
    /// line.
    pub fn update_quantity(&self, product_id: &ProductId, quantity: u32) -> CartOutcome {
        self.mutate(CartAction::UpdateQuantity {
            product_id: product_id.clone(),
            quantity,
        })
    }

    /// Remove the line for `product_id` unconditionally.
    pub fn remove(&self, product_id: &ProductId) {
        self.mutate(CartAction::Remove(product_id.clone()));
    }

    /// Empty the cart and delete the persisted slot entirely.
    pub fn clear(&self) {
        let mut lines = self.lines.lock().expect("cart lock poisoned");
        lines.clear();
        drop(lines);

        if let Err(e) = self.storage.remove(keys::CART) {
            warn!(error = %e, "Failed to remove persisted cart slot");
        }
    }

    fn mutate(&self, action: CartAction) -> CartOutcome {
        let mut lines = self.lines.lock().expect("cart lock poisoned");
        let outcome = apply(&mut lines, action);
        if outcome == CartOutcome::Applied {
            self.persist(&lines);
        }
        outcome
    }

    fn persist(&self, lines: &[CartLine]) {
        match serde_json::to_string(lines) {
            Ok(json) => {
                if let Err(e) = self.storage.set(keys::CART, &json) {
                    warn!(error = %e, "Failed to persist cart");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize cart"),
        }
    }

    /// Snapshot of the current lines, in insertion order.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.lines.lock().expect("cart lock poisoned").clone()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.lock().expect("cart lock poisoned").is_empty()
    }

    /// Subtotal over all lines, computed freshly on each read.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        let lines = self.lines.lock().expect("cart lock poisoned");
        Price::sum(lines.iter().map(CartLine::total))
    }

    /// Total unit count across lines, for the cart badge.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        let lines = self.lines.lock().expect("cart lock poisoned");
        lines.iter().map(|line| line.quantity).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn product(id: &str, price: i64, stock: u32) -> Product {
        serde_json::from_value(json!({
            "_id": id,
            "name": format!("Product {id}"),
            "price": price,
            "stock": stock,
            "categoryId": "c1",
        }))
        .unwrap()
    }

    fn store() -> (CartStore, Arc<MemoryStore>) {
        let storage = Arc::new(MemoryStore::new());
        (CartStore::load(Arc::clone(&storage) as Arc<dyn KvStore>), storage)
    }

    #[test]
    fn test_add_inserts_then_increments() {
        let (cart, _) = store();
        assert_eq!(cart.add(product("a", 10, 5)), CartOutcome::Applied);
        assert_eq!(cart.add(product("a", 10, 5)), CartOutcome::Applied);

        let lines = cart.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 2);
    }

    #[test]
    fn test_add_never_exceeds_stock() {
        let (cart, _) = store();
        let p = product("a", 10, 1);
        assert_eq!(cart.add(p.clone()), CartOutcome::Applied);
        assert_eq!(cart.add(p), CartOutcome::RejectedOutOfStock);

        assert_eq!(cart.lines()[0].quantity, 1);
    }

    #[test]
    fn test_repeated_adds_clamp_at_stock() {
        let (cart, _) = store();
        let p = product("a", 10, 3);
        for _ in 0..10 {
            cart.add(p.clone());
        }
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[test]
    fn test_update_quantity_within_stock() {
        let (cart, _) = store();
        cart.add(product("a", 10, 5));

        assert_eq!(
            cart.update_quantity(&ProductId::new("a"), 4),
            CartOutcome::Applied
        );
        assert_eq!(cart.lines()[0].quantity, 4);
    }

    #[test]
    fn test_update_quantity_beyond_stock_is_no_op() {
        let (cart, _) = store();
        cart.add(product("a", 10, 5));

        assert_eq!(
            cart.update_quantity(&ProductId::new("a"), 6),
            CartOutcome::RejectedOutOfStock
        );
        assert_eq!(cart.lines()[0].quantity, 1);
    }

    #[test]
    fn test_remove_is_unconditional() {
        let (cart, _) = store();
        cart.add(product("a", 10, 5));
        cart.add(product("b", 5, 5));

        cart.remove(&ProductId::new("a"));

        let lines = cart.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product.id, ProductId::new("b"));
    }

    #[test]
    fn test_subtotal_and_item_count() {
        let (cart, _) = store();
        cart.add(product("a", 10, 5));
        cart.add(product("a", 10, 5));
        cart.add(product("b", 5, 5));

        // {A: 10 x 2, B: 5 x 1} => 25
        assert_eq!(cart.subtotal(), Price::from(25));
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_clear_empties_and_removes_slot() {
        let (cart, storage) = store();
        cart.add(product("a", 10, 5));
        assert!(storage.get(keys::CART).unwrap().is_some());

        cart.clear();

        assert!(cart.is_empty());
        assert_eq!(storage.get(keys::CART).unwrap(), None);
    }

    #[test]
    fn test_mutations_persist_to_slot() {
        let (cart, storage) = store();
        cart.add(product("a", 10, 5));

        let raw = storage.get(keys::CART).unwrap().unwrap();
        let persisted: Vec<CartLine> = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted, cart.lines());
    }

    #[test]
    fn test_load_restores_persisted_cart() {
        let storage = Arc::new(MemoryStore::new());
        {
            let cart = CartStore::load(Arc::clone(&storage) as Arc<dyn KvStore>);
            cart.add(product("a", 10, 5));
            cart.add(product("a", 10, 5));
        }

        let reloaded = CartStore::load(storage as Arc<dyn KvStore>);
        assert_eq!(reloaded.item_count(), 2);
        assert_eq!(reloaded.subtotal(), Price::from(20));
    }

    #[test]
    fn test_load_tolerates_corrupt_slot() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(keys::CART, "definitely not json").unwrap();

        let cart = CartStore::load(storage as Arc<dyn KvStore>);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_rejected_mutation_does_not_persist() {
        let (cart, storage) = store();
        cart.add(product("a", 10, 1));
        let before = storage.get(keys::CART).unwrap();

        cart.add(product("a", 10, 1));

        assert_eq!(storage.get(keys::CART).unwrap(), before);
    }
}
