//! Choreographed saga between the order and inventory services.
//!
//! There is no coordinator. Each side reacts to the other's events:
//! 1. The order service persists a Pending order and publishes `OrderCreated`
//! 2. The inventory reactor reserves stock for it, atomically
//! 3. If the reservation cannot be made it publishes `RevertOrder`
//! 4. The order reactor cancels the order named by the revert
//!
//! A successful reservation publishes nothing, so the order stays Pending.

pub mod error;
pub mod events;
pub mod inventory_reactor;
pub mod order_reactor;
pub mod reactor;
pub mod services;

pub use error::{Result, SagaError};
pub use events::{
    EventKey, INVENTORY_CREATED_KEY, INVENTORY_TOPIC, InventoryCreated, ORDER_CREATED_KEY,
    ORDERS_TOPIC, OrderCreated, REVERT_ORDER_KEY, RevertOrder,
};
pub use inventory_reactor::{InventoryReactor, ReservationOutcome, RevertReason};
pub use order_reactor::OrderReactor;
pub use reactor::{Dispatch, Reactor, ReactorHandle};
pub use services::{
    CreateInventory, CreateOrder, InventoryService, OrderService, UpdateInventory,
};
