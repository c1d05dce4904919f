//! Identifier types shared by the order and inventory services.

mod types;

pub use types::{OrderId, ProductId};
