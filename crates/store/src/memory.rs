use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::{OrderId, ProductId};
use tokio::sync::RwLock;

use crate::{
    Inventory, InventoryStore, NewInventory, NewOrder, Order, OrderStatus, OrderStore,
    Reservation, Result, StoreError,
};

struct Table<T> {
    rows: Vec<T>,
    last_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            last_id: 0,
        }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

fn check_available(unavailable: &AtomicBool) -> Result<()> {
    if unavailable.load(Ordering::SeqCst) {
        return Err(StoreError::Unavailable(
            "in-memory store marked unavailable".to_string(),
        ));
    }
    Ok(())
}

/// In-memory order store for testing.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    table: Arc<RwLock<Table<Order>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryOrderStore {
    /// Creates a new empty order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every operation fail with `Unavailable` until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.table.read().await.rows.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn ping(&self) -> Result<()> {
        check_available(&self.unavailable)
    }

    async fn insert(&self, order: NewOrder) -> Result<Order> {
        check_available(&self.unavailable)?;
        let mut table = self.table.write().await;
        let order = order.into_order(table.next_id());
        table.rows.push(order.clone());
        Ok(order)
    }

    async fn get(&self, id: i64) -> Result<Order> {
        check_available(&self.unavailable)?;
        self.table
            .read()
            .await
            .rows
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Order", id))
    }

    async fn get_by_order_id(&self, order_id: OrderId) -> Result<Order> {
        check_available(&self.unavailable)?;
        self.table
            .read()
            .await
            .rows
            .iter()
            .find(|o| o.order_id == order_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Order", order_id))
    }

    async fn list(&self, limit: usize) -> Result<Vec<Order>> {
        check_available(&self.unavailable)?;
        Ok(self.table.read().await.rows.iter().take(limit).cloned().collect())
    }

    async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<()> {
        check_available(&self.unavailable)?;
        let mut table = self.table.write().await;
        let mut matched = false;
        for order in table.rows.iter_mut().filter(|o| o.order_id == order_id) {
            order.status = status;
            matched = true;
        }

        if matched {
            Ok(())
        } else {
            Err(StoreError::not_found("Order", order_id))
        }
    }
}

/// In-memory inventory store for testing.
///
/// A single write lock covers the check and the decrement in `reserve`.
#[derive(Clone, Default)]
pub struct InMemoryInventoryStore {
    table: Arc<RwLock<Table<Inventory>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryInventoryStore {
    /// Creates a new empty inventory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every operation fail with `Unavailable` until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the number of stored rows.
    pub async fn row_count(&self) -> usize {
        self.table.read().await.rows.len()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn ping(&self) -> Result<()> {
        check_available(&self.unavailable)
    }

    async fn insert(&self, inventory: NewInventory) -> Result<Inventory> {
        check_available(&self.unavailable)?;
        let mut table = self.table.write().await;
        let row = Inventory {
            id: table.next_id(),
            product_id: inventory.product_id,
            quantity: inventory.quantity,
        };
        table.rows.push(row.clone());
        Ok(row)
    }

    async fn get(&self, id: i64) -> Result<Inventory> {
        check_available(&self.unavailable)?;
        self.table
            .read()
            .await
            .rows
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Inventory", id))
    }

    async fn get_by_product(&self, product_id: &ProductId) -> Result<Inventory> {
        check_available(&self.unavailable)?;
        // Rows are kept in id order, so the first match has the lowest id.
        self.table
            .read()
            .await
            .rows
            .iter()
            .find(|i| &i.product_id == product_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Inventory", product_id))
    }

    async fn list(&self, limit: usize) -> Result<Vec<Inventory>> {
        check_available(&self.unavailable)?;
        Ok(self.table.read().await.rows.iter().take(limit).cloned().collect())
    }

    async fn update_quantity(&self, id: i64, quantity: i64) -> Result<Inventory> {
        check_available(&self.unavailable)?;
        let mut table = self.table.write().await;
        let row = table
            .rows
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| StoreError::not_found("Inventory", id))?;
        row.quantity = quantity;
        Ok(row.clone())
    }

    async fn reserve(&self, product_id: &ProductId, quantity: i64) -> Result<Reservation> {
        check_available(&self.unavailable)?;
        if quantity <= 0 {
            return Err(StoreError::InvalidQuantity(quantity));
        }

        let mut table = self.table.write().await;
        let row = table
            .rows
            .iter_mut()
            .find(|i| &i.product_id == product_id)
            .ok_or_else(|| StoreError::not_found("Inventory", product_id))?;

        if row.quantity < quantity {
            return Ok(Reservation::Insufficient {
                available: row.quantity,
            });
        }

        row.quantity -= quantity;
        Ok(Reservation::Reserved {
            remaining: row.quantity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_order(product: &str, quantity: i64) -> NewOrder {
        NewOrder {
            order_id: OrderId::new(),
            price: 10.0,
            product_id: ProductId::new(product),
            quantity,
            status: OrderStatus::Pending,
            user_id: 1,
        }
    }

    fn new_inventory(product: &str, quantity: i64) -> NewInventory {
        NewInventory {
            product_id: ProductId::new(product),
            quantity,
        }
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = InMemoryOrderStore::new();
        let first = store.insert(new_order("SKU-1", 1)).await.unwrap();
        let second = store.insert(new_order("SKU-1", 1)).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.order_count().await, 2);
    }

    #[tokio::test]
    async fn default_stores_start_empty() {
        let orders = InMemoryOrderStore::default();
        let inventory = InMemoryInventoryStore::default();

        assert_eq!(orders.order_count().await, 0);
        assert_eq!(inventory.row_count().await, 0);
        assert_eq!(orders.insert(new_order("SKU-1", 1)).await.unwrap().id, 1);
        assert_eq!(inventory.insert(new_inventory("SKU-1", 1)).await.unwrap().id, 1);
    }

    #[tokio::test]
    async fn get_missing_order_is_not_found() {
        let store = InMemoryOrderStore::new();
        assert!(store.get(42).await.unwrap_err().is_not_found());
        assert!(
            store
                .get_by_order_id(OrderId::new())
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn update_status_is_repeatable() {
        let store = InMemoryOrderStore::new();
        let order = store.insert(new_order("SKU-1", 1)).await.unwrap();

        store
            .update_status(order.order_id, OrderStatus::Canceled)
            .await
            .unwrap();
        store
            .update_status(order.order_id, OrderStatus::Canceled)
            .await
            .unwrap();

        let loaded = store.get_by_order_id(order.order_id).await.unwrap();
        assert_eq!(loaded.status, OrderStatus::Canceled);
    }

    #[tokio::test]
    async fn update_status_of_unknown_order_is_not_found() {
        let store = InMemoryOrderStore::new();
        let result = store
            .update_status(OrderId::new(), OrderStatus::Canceled)
            .await;
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn list_respects_limit() {
        let store = InMemoryOrderStore::new();
        for _ in 0..5 {
            store.insert(new_order("SKU-1", 1)).await.unwrap();
        }
        let orders = store.list(3).await.unwrap();
        assert_eq!(orders.len(), 3);
        assert_eq!(orders[0].id, 1);
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = InMemoryOrderStore::new();
        store.set_unavailable(true);
        assert!(matches!(store.ping().await, Err(StoreError::Unavailable(_))));
        assert!(store.insert(new_order("SKU-1", 1)).await.is_err());

        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn reserve_decrements_when_stock_suffices() {
        let store = InMemoryInventoryStore::new();
        store.insert(new_inventory("SKU-1", 10)).await.unwrap();

        let product = ProductId::new("SKU-1");
        let reservation = store.reserve(&product, 4).await.unwrap();
        assert_eq!(reservation, Reservation::Reserved { remaining: 6 });

        let reservation = store.reserve(&product, 6).await.unwrap();
        assert_eq!(reservation, Reservation::Reserved { remaining: 0 });
        assert_eq!(store.get_by_product(&product).await.unwrap().quantity, 0);
    }

    #[tokio::test]
    async fn reserve_leaves_stock_untouched_when_short() {
        let store = InMemoryInventoryStore::new();
        store.insert(new_inventory("SKU-1", 3)).await.unwrap();

        let product = ProductId::new("SKU-1");
        let reservation = store.reserve(&product, 4).await.unwrap();
        assert_eq!(reservation, Reservation::Insufficient { available: 3 });
        assert_eq!(store.get_by_product(&product).await.unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn reserve_unknown_product_is_not_found() {
        let store = InMemoryInventoryStore::new();
        let result = store.reserve(&ProductId::new("missing"), 1).await;
        assert!(result.unwrap_err().is_not_found());
        assert_eq!(store.row_count().await, 0);
    }

    #[tokio::test]
    async fn reserve_rejects_non_positive_quantity() {
        let store = InMemoryInventoryStore::new();
        store.insert(new_inventory("SKU-1", 3)).await.unwrap();

        let product = ProductId::new("SKU-1");
        assert!(matches!(
            store.reserve(&product, 0).await,
            Err(StoreError::InvalidQuantity(0))
        ));
        assert!(matches!(
            store.reserve(&product, -2).await,
            Err(StoreError::InvalidQuantity(-2))
        ));
        assert_eq!(store.get_by_product(&product).await.unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn duplicate_products_resolve_to_lowest_id() {
        let store = InMemoryInventoryStore::new();
        let first = store.insert(new_inventory("SKU-1", 1)).await.unwrap();
        store.insert(new_inventory("SKU-1", 100)).await.unwrap();

        let product = ProductId::new("SKU-1");
        assert_eq!(store.get_by_product(&product).await.unwrap().id, first.id);
        assert_eq!(
            store.reserve(&product, 2).await.unwrap(),
            Reservation::Insufficient { available: 1 }
        );
    }

    #[tokio::test]
    async fn concurrent_reservations_never_oversell() {
        let store = InMemoryInventoryStore::new();
        store.insert(new_inventory("SKU-1", 5)).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.reserve(&ProductId::new("SKU-1"), 1).await.unwrap()
            }));
        }

        let mut reserved = 0;
        for task in tasks {
            if task.await.unwrap().is_reserved() {
                reserved += 1;
            }
        }

        assert_eq!(reserved, 5);
        let row = store.get_by_product(&ProductId::new("SKU-1")).await.unwrap();
        assert_eq!(row.quantity, 0);
    }

    #[tokio::test]
    async fn update_quantity_overwrites() {
        let store = InMemoryInventoryStore::new();
        let row = store.insert(new_inventory("SKU-1", 3)).await.unwrap();

        let updated = store.update_quantity(row.id, 50).await.unwrap();
        assert_eq!(updated.quantity, 50);
        assert!(store.update_quantity(99, 1).await.unwrap_err().is_not_found());
    }
}
