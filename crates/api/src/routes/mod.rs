//! HTTP handlers, one module per resource.

pub mod inventory;
pub mod ops;
pub mod orders;
