//! Order side of the saga: apply compensations.

use async_trait::async_trait;
use messaging::Message;
use store::{OrderStatus, OrderStore};

use crate::events::{EventKey, RevertOrder};
use crate::reactor::{Dispatch, Reactor};
use crate::Result;

/// Consumes `RevertOrder` from the `inventory` topic.
pub struct OrderReactor<S> {
    store: S,
}

impl<S: OrderStore> OrderReactor<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Cancels the order named by a `RevertOrder` payload.
    ///
    /// The update does not look at the current status, so delivering the same
    /// revert twice leaves the order Canceled both times.
    #[tracing::instrument(skip(self, payload))]
    pub async fn handle_order_reverted(&self, payload: &[u8]) -> Result<()> {
        let RevertOrder { order_id } = RevertOrder::decode(payload)?;

        self.store
            .update_status(order_id, OrderStatus::Canceled)
            .await?;

        metrics::counter!("orders_canceled_total").increment(1);
        tracing::info!(%order_id, "order canceled");
        Ok(())
    }
}

#[async_trait]
impl<S: OrderStore + 'static> Reactor for OrderReactor<S> {
    fn name(&self) -> &'static str {
        "orders"
    }

    async fn health_check(&self) -> store::Result<()> {
        self.store.ping().await
    }

    async fn dispatch(&self, message: &Message) -> Result<Dispatch> {
        match EventKey::parse(&message.key) {
            Some(EventKey::RevertOrder) => {
                self.handle_order_reverted(&message.value).await?;
                Ok(Dispatch::Handled)
            }
            Some(EventKey::InventoryCreated) => {
                tracing::debug!(key = %message.key, "no consumer for inventory announcements");
                Ok(Dispatch::Handled)
            }
            _ => Ok(Dispatch::Ignored),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{OrderId, ProductId};
    use store::{InMemoryOrderStore, NewOrder, Order};

    use crate::SagaError;

    async fn pending_order(store: &InMemoryOrderStore) -> Order {
        store
            .insert(NewOrder {
                order_id: OrderId::new(),
                price: 2.5,
                product_id: ProductId::new("SKU-1"),
                quantity: 1,
                status: OrderStatus::Pending,
                user_id: 1,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn revert_cancels_order() {
        let store = InMemoryOrderStore::new();
        let order = pending_order(&store).await;
        let reactor = OrderReactor::new(store.clone());

        let message = RevertOrder::new(order.order_id).to_message();
        reactor.handle_order_reverted(&message.value).await.unwrap();

        let loaded = store.get_by_order_id(order.order_id).await.unwrap();
        assert_eq!(loaded.status, OrderStatus::Canceled);
    }

    #[tokio::test]
    async fn duplicate_revert_is_idempotent() {
        let store = InMemoryOrderStore::new();
        let order = pending_order(&store).await;
        let reactor = OrderReactor::new(store.clone());
        let message = RevertOrder::new(order.order_id).to_message();

        reactor.handle_order_reverted(&message.value).await.unwrap();
        reactor.handle_order_reverted(&message.value).await.unwrap();

        let loaded = store.get_by_order_id(order.order_id).await.unwrap();
        assert_eq!(loaded.status, OrderStatus::Canceled);
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn revert_for_unknown_order_is_an_error() {
        let reactor = OrderReactor::new(InMemoryOrderStore::new());
        let message = RevertOrder::new(OrderId::new()).to_message();

        let err = reactor.handle_order_reverted(&message.value).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn garbage_payload_leaves_orders_untouched() {
        let store = InMemoryOrderStore::new();
        let order = pending_order(&store).await;
        let reactor = OrderReactor::new(store.clone());

        let result = reactor.handle_order_reverted(b"not-an-id").await;

        assert!(matches!(result, Err(SagaError::Decode { .. })));
        let loaded = store.get(order.id).await.unwrap();
        assert_eq!(loaded.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn inventory_created_is_accepted_without_effect() {
        let store = InMemoryOrderStore::new();
        let order = pending_order(&store).await;
        let reactor = OrderReactor::new(store.clone());

        let message = Message::new("inventory", "InventoryCreated", r#"{"id":1}"#);
        assert_eq!(reactor.dispatch(&message).await.unwrap(), Dispatch::Handled);
        assert_eq!(
            store.get(order.id).await.unwrap().status,
            OrderStatus::Pending
        );
    }
}
