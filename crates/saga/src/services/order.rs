//! Order creation and queries.

use common::{OrderId, ProductId};
use messaging::MessageChannel;
use serde::{Deserialize, Serialize};
use store::{DEFAULT_LIST_LIMIT, NewOrder, Order, OrderStatus, OrderStore};

use crate::Result;
use crate::events::OrderCreated;

/// Request to create an order.
///
/// No field is validated here. A non-positive quantity is compensated by the
/// inventory side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrder {
    pub price: f64,
    pub product: ProductId,
    pub quantity: i64,
    pub user_id: i64,
}

/// Creates orders and publishes `OrderCreated`.
pub struct OrderService<S, P> {
    store: S,
    publisher: P,
}

impl<S, P> OrderService<S, P>
where
    S: OrderStore,
    P: MessageChannel,
{
    pub fn new(store: S, publisher: P) -> Self {
        Self { store, publisher }
    }

    /// Persists a Pending order under a fresh order id, then publishes
    /// `OrderCreated` for it.
    ///
    /// The event is sent only after the insert succeeds. If sending fails the
    /// error is returned and the row stays Pending with no event sent.
    #[tracing::instrument(skip(self, cmd), fields(product = %cmd.product, quantity = cmd.quantity))]
    pub async fn create_order(&self, cmd: CreateOrder) -> Result<Order> {
        let order = self
            .store
            .insert(NewOrder {
                order_id: OrderId::new(),
                price: cmd.price,
                product_id: cmd.product,
                quantity: cmd.quantity,
                status: OrderStatus::Pending,
                user_id: cmd.user_id,
            })
            .await?;
        metrics::counter!("orders_created_total").increment(1);

        let message = OrderCreated::from_order(&order).to_message()?;
        if let Err(error) = self.publisher.send(message).await {
            tracing::error!(order_id = %order.order_id, %error, "failed to publish OrderCreated");
            return Err(error.into());
        }

        tracing::info!(order_id = %order.order_id, id = order.id, "order created");
        Ok(order)
    }

    pub async fn get_order(&self, id: i64) -> Result<Order> {
        Ok(self.store.get(id).await?)
    }

    /// Returns the first page of orders.
    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        Ok(self.store.list(DEFAULT_LIST_LIMIT).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use messaging::FakeChannel;
    use store::InMemoryOrderStore;

    use crate::SagaError;
    use crate::events::{ORDER_CREATED_KEY, ORDERS_TOPIC};

    fn create_cmd() -> CreateOrder {
        CreateOrder {
            price: 12.0,
            product: ProductId::new("SKU-1"),
            quantity: 2,
            user_id: 8,
        }
    }

    #[tokio::test]
    async fn create_order_persists_then_publishes() {
        let store = InMemoryOrderStore::new();
        let channel = FakeChannel::new();
        let service = OrderService::new(store.clone(), channel.clone());

        let order = service.create_order(create_cmd()).await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(store.order_count().await, 1);

        let sent = channel.sent_to(ORDERS_TOPIC);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].key, ORDER_CREATED_KEY);
        let event = OrderCreated::decode(&sent[0].value).unwrap();
        assert_eq!(event, OrderCreated::from_order(&order));
    }

    #[tokio::test]
    async fn each_order_gets_a_fresh_order_id() {
        let service = OrderService::new(InMemoryOrderStore::new(), FakeChannel::new());
        let first = service.create_order(create_cmd()).await.unwrap();
        let second = service.create_order(create_cmd()).await.unwrap();
        assert_ne!(first.order_id, second.order_id);
    }

    #[tokio::test]
    async fn publish_failure_returns_error_and_keeps_row() {
        let store = InMemoryOrderStore::new();
        let channel = FakeChannel::new();
        channel.fail_sends(true);
        let service = OrderService::new(store.clone(), channel.clone());

        let result = service.create_order(create_cmd()).await;

        assert!(matches!(result, Err(SagaError::Channel(_))));
        let orders = store.list(10).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn store_failure_publishes_nothing() {
        let store = InMemoryOrderStore::new();
        store.set_unavailable(true);
        let channel = FakeChannel::new();
        let service = OrderService::new(store, channel.clone());

        let result = service.create_order(create_cmd()).await;

        assert!(matches!(result, Err(SagaError::Store(_))));
        assert!(channel.sent().is_empty());
    }

    #[tokio::test]
    async fn get_missing_order_is_not_found() {
        let service = OrderService::new(InMemoryOrderStore::new(), FakeChannel::new());
        assert!(service.get_order(5).await.unwrap_err().is_not_found());
        assert!(service.list_orders().await.unwrap().is_empty());
    }
}
