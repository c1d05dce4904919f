//! Inventory side of the saga: reserve stock or ask for compensation.

use async_trait::async_trait;
use common::OrderId;
use messaging::{Message, MessageChannel};
use store::{InventoryStore, Reservation, StoreError};

use crate::events::{EventKey, OrderCreated, RevertOrder};
use crate::reactor::{Dispatch, Reactor};
use crate::Result;

/// Why an order was compensated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertReason {
    /// No inventory row exists for the product.
    ProductNotFound,
    /// Stock on hand is below the requested quantity.
    InsufficientStock,
    /// The requested quantity is zero or negative.
    InvalidQuantity,
    /// The store failed during the reservation.
    StoreFailure,
}

impl RevertReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevertReason::ProductNotFound => "product_not_found",
            RevertReason::InsufficientStock => "insufficient_stock",
            RevertReason::InvalidQuantity => "invalid_quantity",
            RevertReason::StoreFailure => "store_failure",
        }
    }
}

/// Result of handling one `OrderCreated` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationOutcome {
    /// Stock was decremented. Nothing is published.
    Reserved { remaining: i64 },
    /// A `RevertOrder` was published (or attempted) for the order.
    Reverted(RevertReason),
}

/// Consumes `OrderCreated` from the `orders` topic.
pub struct InventoryReactor<S, P> {
    store: S,
    publisher: P,
}

impl<S, P> InventoryReactor<S, P>
where
    S: InventoryStore,
    P: MessageChannel,
{
    /// Creates a reactor that reserves stock in `store` and publishes
    /// compensations through `publisher`.
    pub fn new(store: S, publisher: P) -> Self {
        Self { store, publisher }
    }

    /// Reserves stock for a newly created order.
    ///
    /// A payload that cannot be decoded is returned as an error and nothing is
    /// published. Every data failure after decoding publishes `RevertOrder`.
    /// A store fault publishes `RevertOrder` and is also returned as an error.
    #[tracing::instrument(skip(self, payload))]
    pub async fn handle_order_created(&self, payload: &[u8]) -> Result<ReservationOutcome> {
        let event = OrderCreated::decode(payload)?;
        let order_id = event.order_id;

        match self.store.reserve(&event.product, event.quantity).await {
            Ok(Reservation::Reserved { remaining }) => {
                metrics::counter!("inventory_reservations_total").increment(1);
                tracing::info!(
                    %order_id,
                    product = %event.product,
                    quantity = event.quantity,
                    remaining,
                    "stock reserved"
                );
                Ok(ReservationOutcome::Reserved { remaining })
            }
            Ok(Reservation::Insufficient { available }) => {
                tracing::warn!(
                    %order_id,
                    product = %event.product,
                    quantity = event.quantity,
                    available,
                    "insufficient stock"
                );
                self.revert(order_id, RevertReason::InsufficientStock).await;
                Ok(ReservationOutcome::Reverted(RevertReason::InsufficientStock))
            }
            Err(StoreError::InvalidQuantity(quantity)) => {
                tracing::warn!(
                    %order_id,
                    product = %event.product,
                    quantity,
                    "invalid order quantity"
                );
                self.revert(order_id, RevertReason::InvalidQuantity).await;
                Ok(ReservationOutcome::Reverted(RevertReason::InvalidQuantity))
            }
            Err(error) if error.is_not_found() => {
                tracing::warn!(%order_id, product = %event.product, "product not found");
                self.revert(order_id, RevertReason::ProductNotFound).await;
                Ok(ReservationOutcome::Reverted(RevertReason::ProductNotFound))
            }
            Err(error) => {
                tracing::error!(
                    %order_id,
                    product = %event.product,
                    %error,
                    "stock reservation failed"
                );
                self.revert(order_id, RevertReason::StoreFailure).await;
                Err(error.into())
            }
        }
    }

    /// Publishes `RevertOrder`. A publish failure is logged, never retried.
    async fn revert(&self, order_id: OrderId, reason: RevertReason) {
        metrics::counter!("saga_compensations_total", "reason" => reason.as_str()).increment(1);

        match self.publisher.send(RevertOrder::new(order_id).to_message()).await {
            Ok(()) => {
                tracing::info!(%order_id, reason = reason.as_str(), "RevertOrder published");
            }
            Err(error) => {
                metrics::counter!("saga_compensation_publish_failures_total").increment(1);
                tracing::error!(
                    %order_id,
                    reason = reason.as_str(),
                    %error,
                    "failed to publish RevertOrder"
                );
            }
        }
    }
}

#[async_trait]
impl<S, P> Reactor for InventoryReactor<S, P>
where
    S: InventoryStore + 'static,
    P: MessageChannel + 'static,
{
    fn name(&self) -> &'static str {
        "inventory"
    }

    async fn health_check(&self) -> store::Result<()> {
        self.store.ping().await
    }

    async fn dispatch(&self, message: &Message) -> Result<Dispatch> {
        match EventKey::parse(&message.key) {
            Some(EventKey::OrderCreated) => {
                self.handle_order_created(&message.value).await?;
                Ok(Dispatch::Handled)
            }
            _ => Ok(Dispatch::Ignored),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProductId;
    use messaging::FakeChannel;
    use store::{InMemoryInventoryStore, NewInventory};

    use crate::SagaError;
    use crate::events::{INVENTORY_TOPIC, REVERT_ORDER_KEY};

    async fn reactor_with_stock(
        product: &str,
        quantity: i64,
    ) -> (
        InventoryReactor<InMemoryInventoryStore, FakeChannel>,
        InMemoryInventoryStore,
        FakeChannel,
    ) {
        let store = InMemoryInventoryStore::new();
        store
            .insert(NewInventory {
                product_id: ProductId::new(product),
                quantity,
            })
            .await
            .unwrap();
        let channel = FakeChannel::new();
        let reactor = InventoryReactor::new(store.clone(), channel.clone());
        (reactor, store, channel)
    }

    fn order_created(product: &str, quantity: i64) -> OrderCreated {
        OrderCreated {
            id: 1,
            order_id: OrderId::new(),
            user_id: 1,
            product: ProductId::new(product),
            quantity,
            price: 5.0,
        }
    }

    fn payload(event: &OrderCreated) -> Vec<u8> {
        event.to_message().unwrap().value
    }

    #[tokio::test]
    async fn reserves_stock_without_publishing() {
        let (reactor, store, channel) = reactor_with_stock("SKU-1", 10).await;
        let event = order_created("SKU-1", 4);

        let outcome = reactor.handle_order_created(&payload(&event)).await.unwrap();

        assert_eq!(outcome, ReservationOutcome::Reserved { remaining: 6 });
        assert!(channel.sent().is_empty());
        let row = store.get_by_product(&ProductId::new("SKU-1")).await.unwrap();
        assert_eq!(row.quantity, 6);
    }

    #[tokio::test]
    async fn exact_stock_is_reservable() {
        let (reactor, _, channel) = reactor_with_stock("SKU-1", 4).await;
        let outcome = reactor
            .handle_order_created(&payload(&order_created("SKU-1", 4)))
            .await
            .unwrap();

        assert_eq!(outcome, ReservationOutcome::Reserved { remaining: 0 });
        assert!(channel.sent().is_empty());
    }

    #[tokio::test]
    async fn insufficient_stock_reverts_and_leaves_stock() {
        let (reactor, store, channel) = reactor_with_stock("SKU-1", 3).await;
        let event = order_created("SKU-1", 4);

        let outcome = reactor.handle_order_created(&payload(&event)).await.unwrap();

        assert_eq!(
            outcome,
            ReservationOutcome::Reverted(RevertReason::InsufficientStock)
        );
        let sent = channel.sent_to(INVENTORY_TOPIC);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].key, REVERT_ORDER_KEY);
        assert_eq!(sent[0].value, event.order_id.to_string().into_bytes());
        let row = store.get_by_product(&ProductId::new("SKU-1")).await.unwrap();
        assert_eq!(row.quantity, 3);
    }

    #[tokio::test]
    async fn missing_product_reverts() {
        let (reactor, store, channel) = reactor_with_stock("SKU-1", 3).await;
        let event = order_created("SKU-404", 1);

        let outcome = reactor.handle_order_created(&payload(&event)).await.unwrap();

        assert_eq!(
            outcome,
            ReservationOutcome::Reverted(RevertReason::ProductNotFound)
        );
        assert_eq!(channel.sent().len(), 1);
        assert_eq!(store.row_count().await, 1);
    }

    #[tokio::test]
    async fn non_positive_quantity_reverts() {
        let (reactor, store, channel) = reactor_with_stock("SKU-1", 3).await;

        let outcome = reactor
            .handle_order_created(&payload(&order_created("SKU-1", 0)))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ReservationOutcome::Reverted(RevertReason::InvalidQuantity)
        );
        assert_eq!(channel.sent().len(), 1);
        let row = store.get_by_product(&ProductId::new("SKU-1")).await.unwrap();
        assert_eq!(row.quantity, 3);
    }

    #[tokio::test]
    async fn malformed_payload_is_not_compensated() {
        let (reactor, _, channel) = reactor_with_stock("SKU-1", 3).await;

        let result = reactor.handle_order_created(b"{\"broken\":").await;

        assert!(matches!(result, Err(SagaError::Decode { .. })));
        assert!(channel.sent().is_empty());
    }

    #[tokio::test]
    async fn store_failure_reverts_and_propagates() {
        let (reactor, store, channel) = reactor_with_stock("SKU-1", 3).await;
        store.set_unavailable(true);

        let result = reactor
            .handle_order_created(&payload(&order_created("SKU-1", 1)))
            .await;

        assert!(matches!(result, Err(SagaError::Store(StoreError::Unavailable(_)))));
        assert_eq!(channel.sent_to(INVENTORY_TOPIC).len(), 1);
    }

    #[tokio::test]
    async fn failed_compensation_publish_is_swallowed() {
        let (reactor, _, channel) = reactor_with_stock("SKU-1", 1).await;
        channel.fail_sends(true);

        let outcome = reactor
            .handle_order_created(&payload(&order_created("SKU-1", 2)))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ReservationOutcome::Reverted(RevertReason::InsufficientStock)
        );
        assert!(channel.sent().is_empty());
    }

    #[tokio::test]
    async fn dispatch_ignores_other_keys() {
        let (reactor, store, channel) = reactor_with_stock("SKU-1", 3).await;

        let dispatch = reactor
            .dispatch(&Message::new("orders", "OrderShipped", "{}"))
            .await
            .unwrap();

        assert_eq!(dispatch, Dispatch::Ignored);
        assert!(channel.sent().is_empty());
        let row = store.get_by_product(&ProductId::new("SKU-1")).await.unwrap();
        assert_eq!(row.quantity, 3);
    }
}
