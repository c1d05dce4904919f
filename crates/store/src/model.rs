//! Persisted rows for the order and inventory stores.

use common::{OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// The state of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Confirmed
///           └──► Canceled
/// ```
///
/// Persisted as its integer index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Created, stock not yet known to be reserved.
    #[default]
    Pending,

    /// Stock reservation confirmed (terminal state).
    Confirmed,

    /// Reverted by a compensation (terminal state).
    Canceled,
}

impl OrderStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Confirmed | OrderStatus::Canceled)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Canceled => "Canceled",
        }
    }

    /// The persisted integer value.
    pub fn as_i32(&self) -> i32 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Confirmed => 1,
            OrderStatus::Canceled => 2,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i32> for OrderStatus {
    type Error = StoreError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(OrderStatus::Pending),
            1 => Ok(OrderStatus::Confirmed),
            2 => Ok(OrderStatus::Canceled),
            other => Err(StoreError::InvalidStatus(other)),
        }
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Store-assigned surrogate id.
    pub id: i64,
    pub order_id: OrderId,
    pub price: f64,
    /// Product reference, kept as a plain string rather than a foreign key.
    pub product_id: ProductId,
    pub quantity: i64,
    pub status: OrderStatus,
    /// User reference, kept as a plain number rather than a foreign key.
    pub user_id: i64,
}

/// An order about to be inserted. The store assigns the surrogate id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub price: f64,
    pub product_id: ProductId,
    pub quantity: i64,
    pub status: OrderStatus,
    pub user_id: i64,
}

impl NewOrder {
    pub(crate) fn into_order(self, id: i64) -> Order {
        Order {
            id,
            order_id: self.order_id,
            price: self.price,
            product_id: self.product_id,
            quantity: self.quantity,
            status: self.status,
            user_id: self.user_id,
        }
    }
}

/// Stock on hand for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub id: i64,
    pub product_id: ProductId,
    pub quantity: i64,
}

/// An inventory row about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInventory {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Outcome of an atomic check-and-decrement of stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// The stock was decremented; `remaining` is the quantity left.
    Reserved { remaining: i64 },

    /// Not enough stock; nothing was changed.
    Insufficient { available: i64 },
}

impl Reservation {
    /// Returns true if stock was decremented.
    pub fn is_reserved(&self) -> bool {
        matches!(self, Reservation::Reserved { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn terminal_states() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(OrderStatus::Confirmed.is_terminal());
        assert!(OrderStatus::Canceled.is_terminal());
    }

    #[test]
    fn status_integer_mapping() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Canceled,
        ] {
            assert_eq!(OrderStatus::try_from(status.as_i32()).unwrap(), status);
        }
        assert!(matches!(
            OrderStatus::try_from(7),
            Err(StoreError::InvalidStatus(7))
        ));
    }

    #[test]
    fn display() {
        assert_eq!(OrderStatus::Pending.to_string(), "Pending");
        assert_eq!(OrderStatus::Canceled.to_string(), "Canceled");
    }

    #[test]
    fn order_json_uses_snake_case_fields() {
        let order = NewOrder {
            order_id: OrderId::new(),
            price: 9.5,
            product_id: ProductId::new("SKU-1"),
            quantity: 2,
            status: OrderStatus::Pending,
            user_id: 7,
        }
        .into_order(1);

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["product_id"], "SKU-1");
        assert_eq!(json["status"], "Pending");
        assert_eq!(json["user_id"], 7);
    }
}
