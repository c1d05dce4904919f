use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, ProductId};

use crate::{Inventory, NewInventory, NewOrder, Order, OrderStatus, Reservation, Result};

/// Maximum rows returned by the listing endpoints.
pub const DEFAULT_LIST_LIMIT: usize = 20;

/// Persistence contract for orders.
///
/// Lookups and updates report a missing row as
/// [`StoreError::NotFound`](crate::StoreError::NotFound).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<()>;

    /// Inserts an order and returns it with its assigned surrogate id.
    async fn insert(&self, order: NewOrder) -> Result<Order>;

    /// Loads an order by surrogate id.
    async fn get(&self, id: i64) -> Result<Order>;

    /// Loads an order by its order identifier.
    async fn get_by_order_id(&self, order_id: OrderId) -> Result<Order>;

    /// Returns up to `limit` orders, lowest id first.
    async fn list(&self, limit: usize) -> Result<Vec<Order>>;

    /// Sets the status of the order matching `order_id`.
    ///
    /// The write is unconditional: it does not look at the current status, so
    /// repeating it is harmless.
    async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<()>;
}

/// Persistence contract for stock levels.
///
/// The product reference is the natural key. It is not unique at the schema
/// level; when several rows share a product, lookups and reservations act on
/// the one with the lowest surrogate id.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<()>;

    /// Inserts a stock row and returns it with its assigned surrogate id.
    async fn insert(&self, inventory: NewInventory) -> Result<Inventory>;

    /// Loads a stock row by surrogate id.
    async fn get(&self, id: i64) -> Result<Inventory>;

    /// Loads the stock row for a product.
    async fn get_by_product(&self, product_id: &ProductId) -> Result<Inventory>;

    /// Returns up to `limit` stock rows, lowest id first.
    async fn list(&self, limit: usize) -> Result<Vec<Inventory>>;

    /// Overwrites the quantity of a stock row.
    async fn update_quantity(&self, id: i64, quantity: i64) -> Result<Inventory>;

    /// Decrements stock for a product by `quantity` if, and only if, at least
    /// that much is on hand.
    ///
    /// The check and the decrement are one atomic step, so concurrent
    /// reservations against the same product never drive stock negative.
    /// A missing product is reported as `NotFound`.
    async fn reserve(&self, product_id: &ProductId, quantity: i64) -> Result<Reservation>;
}

#[async_trait]
impl<T: OrderStore + ?Sized> OrderStore for Arc<T> {
    async fn ping(&self) -> Result<()> {
        (**self).ping().await
    }

    async fn insert(&self, order: NewOrder) -> Result<Order> {
        (**self).insert(order).await
    }

    async fn get(&self, id: i64) -> Result<Order> {
        (**self).get(id).await
    }

    async fn get_by_order_id(&self, order_id: OrderId) -> Result<Order> {
        (**self).get_by_order_id(order_id).await
    }

    async fn list(&self, limit: usize) -> Result<Vec<Order>> {
        (**self).list(limit).await
    }

    async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<()> {
        (**self).update_status(order_id, status).await
    }
}

#[async_trait]
impl<T: InventoryStore + ?Sized> InventoryStore for Arc<T> {
    async fn ping(&self) -> Result<()> {
        (**self).ping().await
    }

    async fn insert(&self, inventory: NewInventory) -> Result<Inventory> {
        (**self).insert(inventory).await
    }

    async fn get(&self, id: i64) -> Result<Inventory> {
        (**self).get(id).await
    }

    async fn get_by_product(&self, product_id: &ProductId) -> Result<Inventory> {
        (**self).get_by_product(product_id).await
    }

    async fn list(&self, limit: usize) -> Result<Vec<Inventory>> {
        (**self).list(limit).await
    }

    async fn update_quantity(&self, id: i64, quantity: i64) -> Result<Inventory> {
        (**self).update_quantity(id, quantity).await
    }

    async fn reserve(&self, product_id: &ProductId, quantity: i64) -> Result<Reservation> {
        (**self).reserve(product_id, quantity).await
    }
}
