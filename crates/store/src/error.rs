use thiserror::Error;

/// Errors that can occur when interacting with a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row matched the lookup key.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A reservation was requested for a non-positive quantity.
    #[error("Invalid quantity: {0} (must be greater than 0)")]
    InvalidQuantity(i64),

    /// A persisted status value does not map to a known status.
    #[error("Invalid order status value: {0}")]
    InvalidStatus(i32),

    /// The store cannot be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, key: impl std::fmt::Display) -> Self {
        StoreError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Returns true if the error means the row does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
