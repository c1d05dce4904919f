//! Order and inventory stores.
//!
//! The two aggregates are owned independently: nothing here spans both stores
//! in one transaction. Each store exposes lookups that report a missing row as
//! [`StoreError::NotFound`], separate from connection or query failures.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use common::{OrderId, ProductId};
pub use error::{Result, StoreError};
pub use memory::{InMemoryInventoryStore, InMemoryOrderStore};
pub use model::{Inventory, NewInventory, NewOrder, Order, OrderStatus, Reservation};
pub use postgres::{PostgresInventoryStore, PostgresOrderStore};
pub use store::{DEFAULT_LIST_LIMIT, InventoryStore, OrderStore};
