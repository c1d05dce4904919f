//! Saga events and their wire formats.
//!
//! | Topic       | Key                | Payload                                              |
//! |-------------|--------------------|------------------------------------------------------|
//! | `orders`    | `OrderCreated`     | JSON `{id, order_id, user_id, product, quantity, price}` |
//! | `inventory` | `RevertOrder`      | bare UTF-8 order id                                  |
//! | `inventory` | `InventoryCreated` | JSON `{id, product, quantity}`                       |
//!
//! The key alone decides how a payload is decoded.

use common::{OrderId, ProductId};
use messaging::Message;
use serde::{Deserialize, Serialize};
use store::{Inventory, Order};

use crate::{Result, SagaError};

pub const ORDERS_TOPIC: &str = "orders";
pub const INVENTORY_TOPIC: &str = "inventory";

pub const ORDER_CREATED_KEY: &str = "OrderCreated";
pub const REVERT_ORDER_KEY: &str = "RevertOrder";
pub const INVENTORY_CREATED_KEY: &str = "InventoryCreated";

/// The event keys known to the saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKey {
    OrderCreated,
    RevertOrder,
    InventoryCreated,
}

impl EventKey {
    /// The key as written on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKey::OrderCreated => ORDER_CREATED_KEY,
            EventKey::RevertOrder => REVERT_ORDER_KEY,
            EventKey::InventoryCreated => INVENTORY_CREATED_KEY,
        }
    }

    /// The topic events with this key are published to.
    pub fn topic(&self) -> &'static str {
        match self {
            EventKey::OrderCreated => ORDERS_TOPIC,
            EventKey::RevertOrder | EventKey::InventoryCreated => INVENTORY_TOPIC,
        }
    }

    /// Parses a wire key. Keys are case-sensitive.
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            ORDER_CREATED_KEY => Some(EventKey::OrderCreated),
            REVERT_ORDER_KEY => Some(EventKey::RevertOrder),
            INVENTORY_CREATED_KEY => Some(EventKey::InventoryCreated),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Published by the order service once an order row is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreated {
    /// Surrogate id of the stored order row.
    pub id: i64,
    pub order_id: OrderId,
    pub user_id: i64,
    pub product: ProductId,
    pub quantity: i64,
    pub price: f64,
}

impl OrderCreated {
    /// Builds the event from a persisted order.
    pub fn from_order(order: &Order) -> Self {
        Self {
            id: order.id,
            order_id: order.order_id,
            user_id: order.user_id,
            product: order.product_id.clone(),
            quantity: order.quantity,
            price: order.price,
        }
    }

    pub fn to_message(&self) -> Result<Message> {
        let value = serde_json::to_vec(self)?;
        Ok(Message::new(ORDERS_TOPIC, ORDER_CREATED_KEY, value))
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(|e| SagaError::Decode {
            key: ORDER_CREATED_KEY,
            reason: e.to_string(),
        })
    }
}

/// Compensation request: cancel the named order.
///
/// Unlike the other events the payload is not JSON, only the order id text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevertOrder {
    pub order_id: OrderId,
}

impl RevertOrder {
    pub fn new(order_id: OrderId) -> Self {
        Self { order_id }
    }

    pub fn to_message(&self) -> Message {
        Message::new(INVENTORY_TOPIC, REVERT_ORDER_KEY, self.order_id.to_string())
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(payload).map_err(|e| SagaError::Decode {
            key: REVERT_ORDER_KEY,
            reason: e.to_string(),
        })?;
        let order_id = text.parse::<OrderId>().map_err(|e| SagaError::Decode {
            key: REVERT_ORDER_KEY,
            reason: format!("invalid order id '{text}': {e}"),
        })?;
        Ok(Self { order_id })
    }
}

/// Published by the inventory service when a stock row is created.
/// Nothing in the saga consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCreated {
    pub id: i64,
    pub product: ProductId,
    pub quantity: i64,
}

impl InventoryCreated {
    pub fn from_inventory(inventory: &Inventory) -> Self {
        Self {
            id: inventory.id,
            product: inventory.product_id.clone(),
            quantity: inventory.quantity,
        }
    }

    pub fn to_message(&self) -> Result<Message> {
        let value = serde_json::to_vec(self)?;
        Ok(Message::new(INVENTORY_TOPIC, INVENTORY_CREATED_KEY, value))
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(|e| SagaError::Decode {
            key: INVENTORY_CREATED_KEY,
            reason: e.to_string(),
        })
    }
}
