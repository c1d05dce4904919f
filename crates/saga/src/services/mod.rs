//! Producer-side services: write a row, then publish its event.

pub mod inventory;
pub mod order;

pub use inventory::{CreateInventory, InventoryService, UpdateInventory};
pub use order::{CreateOrder, OrderService};
