//! Inventory administration.

use common::ProductId;
use messaging::MessageChannel;
use serde::{Deserialize, Serialize};
use store::{DEFAULT_LIST_LIMIT, Inventory, InventoryStore, NewInventory};

use crate::Result;
use crate::events::InventoryCreated;

/// Request to create a stock row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInventory {
    pub product: ProductId,
    pub quantity: i64,
}

/// Request to overwrite the quantity of a stock row.
///
/// `product` is accepted for symmetry with creation but not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateInventory {
    #[serde(default)]
    pub product: Option<ProductId>,
    pub quantity: i64,
}

/// Creates and updates stock rows.
pub struct InventoryService<S, P> {
    store: S,
    publisher: P,
}

impl<S, P> InventoryService<S, P>
where
    S: InventoryStore,
    P: MessageChannel,
{
    pub fn new(store: S, publisher: P) -> Self {
        Self { store, publisher }
    }

    /// Inserts a stock row and publishes `InventoryCreated`.
    ///
    /// A publish failure is returned to the caller; the row stays in place.
    #[tracing::instrument(skip(self, cmd), fields(product = %cmd.product, quantity = cmd.quantity))]
    pub async fn create_inventory(&self, cmd: CreateInventory) -> Result<Inventory> {
        let inventory = self
            .store
            .insert(NewInventory {
                product_id: cmd.product,
                quantity: cmd.quantity,
            })
            .await?;

        let message = InventoryCreated::from_inventory(&inventory).to_message()?;
        if let Err(error) = self.publisher.send(message).await {
            tracing::error!(id = inventory.id, %error, "failed to publish InventoryCreated");
            return Err(error.into());
        }

        tracing::info!(id = inventory.id, "inventory created");
        Ok(inventory)
    }

    pub async fn get_inventory(&self, id: i64) -> Result<Inventory> {
        Ok(self.store.get(id).await?)
    }

    /// Returns the first page of stock rows.
    pub async fn list_inventory(&self) -> Result<Vec<Inventory>> {
        Ok(self.store.list(DEFAULT_LIST_LIMIT).await?)
    }

    /// Overwrites the quantity of a stock row. No event is published.
    #[tracing::instrument(skip(self, cmd), fields(quantity = cmd.quantity))]
    pub async fn update_inventory(&self, id: i64, cmd: UpdateInventory) -> Result<Inventory> {
        let inventory = self.store.update_quantity(id, cmd.quantity).await?;
        tracing::info!(id, product = %inventory.product_id, "inventory updated");
        Ok(inventory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use messaging::FakeChannel;
    use store::InMemoryInventoryStore;

    use crate::SagaError;
    use crate::events::{INVENTORY_CREATED_KEY, INVENTORY_TOPIC};

    fn create_cmd(quantity: i64) -> CreateInventory {
        CreateInventory {
            product: ProductId::new("SKU-1"),
            quantity,
        }
    }

    #[tokio::test]
    async fn create_publishes_inventory_created() {
        let channel = FakeChannel::new();
        let service = InventoryService::new(InMemoryInventoryStore::new(), channel.clone());

        let inventory = service.create_inventory(create_cmd(5)).await.unwrap();

        let sent = channel.sent_to(INVENTORY_TOPIC);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].key, INVENTORY_CREATED_KEY);
        assert_eq!(
            InventoryCreated::decode(&sent[0].value).unwrap(),
            InventoryCreated::from_inventory(&inventory)
        );
    }

    #[tokio::test]
    async fn publish_failure_keeps_row() {
        let store = InMemoryInventoryStore::new();
        let channel = FakeChannel::new();
        channel.fail_sends(true);
        let service = InventoryService::new(store.clone(), channel);

        let result = service.create_inventory(create_cmd(5)).await;

        assert!(matches!(result, Err(SagaError::Channel(_))));
        assert_eq!(store.row_count().await, 1);
    }

    #[tokio::test]
    async fn update_overwrites_quantity_silently() {
        let channel = FakeChannel::new();
        let service = InventoryService::new(InMemoryInventoryStore::new(), channel.clone());
        let inventory = service.create_inventory(create_cmd(5)).await.unwrap();

        let updated = service
            .update_inventory(
                inventory.id,
                UpdateInventory {
                    product: None,
                    quantity: 40,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.quantity, 40);
        assert_eq!(service.get_inventory(inventory.id).await.unwrap().quantity, 40);
        assert_eq!(channel.sent().len(), 1);
    }

    #[tokio::test]
    async fn update_missing_row_is_not_found() {
        let service = InventoryService::new(InMemoryInventoryStore::new(), FakeChannel::new());
        let err = service
            .update_inventory(
                3,
                UpdateInventory {
                    product: None,
                    quantity: 1,
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn list_is_capped() {
        let service = InventoryService::new(InMemoryInventoryStore::new(), FakeChannel::new());
        for _ in 0..25 {
            service.create_inventory(create_cmd(1)).await.unwrap();
        }
        assert_eq!(service.list_inventory().await.unwrap().len(), DEFAULT_LIST_LIMIT);
    }
}
