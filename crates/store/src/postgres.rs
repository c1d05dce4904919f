use async_trait::async_trait;
use common::{OrderId, ProductId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Inventory, InventoryStore, NewInventory, NewOrder, Order, OrderStatus, OrderStore,
    Reservation, Result, StoreError,
};

/// Opens a connection pool for `database_url`.
pub async fn connect(database_url: &str) -> Result<PgPool> {
    let pool = PgPool::connect(database_url).await?;
    Ok(pool)
}

/// Runs the database migrations for both tables.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// PostgreSQL-backed order store.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status: i32 = row.try_get("status")?;
        let product_id: String = row.try_get("product_id")?;

        Ok(Order {
            id: row.try_get("id")?,
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            price: row.try_get("price")?,
            product_id: ProductId::new(product_id),
            quantity: row.try_get("quantity")?,
            status: OrderStatus::try_from(status)?,
            user_id: row.try_get("user_id")?,
        })
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn insert(&self, order: NewOrder) -> Result<Order> {
        let row = sqlx::query(
            r#"
            INSERT INTO orders (order_id, price, product_id, quantity, status, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(order.order_id.as_uuid())
        .bind(order.price)
        .bind(order.product_id.as_str())
        .bind(order.quantity)
        .bind(order.status.as_i32())
        .bind(order.user_id)
        .fetch_one(&self.pool)
        .await?;

        let id: i64 = row.try_get("id")?;
        Ok(order.into_order(id))
    }

    async fn get(&self, id: i64) -> Result<Order> {
        let row = sqlx::query(
            r#"
            SELECT id, order_id, price, product_id, quantity, status, user_id
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_order(row),
            None => Err(StoreError::not_found("Order", id)),
        }
    }

    async fn get_by_order_id(&self, order_id: OrderId) -> Result<Order> {
        let row = sqlx::query(
            r#"
            SELECT id, order_id, price, product_id, quantity, status, user_id
            FROM orders
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_order(row),
            None => Err(StoreError::not_found("Order", order_id)),
        }
    }

    async fn list(&self, limit: usize) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, price, product_id, quantity, status, user_id
            FROM orders
            ORDER BY id ASC
            LIMIT $1
            "#,
        )
        .bind(limit_param(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn update_status(&self, order_id: OrderId, status: OrderStatus) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .bind(status.as_i32())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Order", order_id));
        }
        Ok(())
    }
}

/// PostgreSQL-backed inventory store.
#[derive(Clone)]
pub struct PostgresInventoryStore {
    pool: PgPool,
}

impl PostgresInventoryStore {
    /// Creates a new PostgreSQL inventory store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_inventory(row: PgRow) -> Result<Inventory> {
        let product_id: String = row.try_get("product_id")?;
        Ok(Inventory {
            id: row.try_get("id")?,
            product_id: ProductId::new(product_id),
            quantity: row.try_get("quantity")?,
        })
    }
}

#[async_trait]
impl InventoryStore for PostgresInventoryStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn insert(&self, inventory: NewInventory) -> Result<Inventory> {
        let row = sqlx::query(
            r#"
            INSERT INTO inventory (product_id, quantity)
            VALUES ($1, $2)
            RETURNING id, product_id, quantity
            "#,
        )
        .bind(inventory.product_id.as_str())
        .bind(inventory.quantity)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_inventory(row)
    }

    async fn get(&self, id: i64) -> Result<Inventory> {
        let row = sqlx::query("SELECT id, product_id, quantity FROM inventory WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_inventory(row),
            None => Err(StoreError::not_found("Inventory", id)),
        }
    }

    async fn get_by_product(&self, product_id: &ProductId) -> Result<Inventory> {
        let row = sqlx::query(
            r#"
            SELECT id, product_id, quantity
            FROM inventory
            WHERE product_id = $1
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(product_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_inventory(row),
            None => Err(StoreError::not_found("Inventory", product_id)),
        }
    }

    async fn list(&self, limit: usize) -> Result<Vec<Inventory>> {
        let rows = sqlx::query(
            "SELECT id, product_id, quantity FROM inventory ORDER BY id ASC LIMIT $1",
        )
        .bind(limit_param(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_inventory).collect()
    }

    async fn update_quantity(&self, id: i64, quantity: i64) -> Result<Inventory> {
        let row = sqlx::query(
            r#"
            UPDATE inventory SET quantity = $2
            WHERE id = $1
            RETURNING id, product_id, quantity
            "#,
        )
        .bind(id)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_inventory(row),
            None => Err(StoreError::not_found("Inventory", id)),
        }
    }

    async fn reserve(&self, product_id: &ProductId, quantity: i64) -> Result<Reservation> {
        if quantity <= 0 {
            return Err(StoreError::InvalidQuantity(quantity));
        }

        // The row lock taken by UPDATE makes the guard and the decrement one step.
        let reserved = sqlx::query(
            r#"
            UPDATE inventory SET quantity = quantity - $2
            WHERE id = (
                SELECT id FROM inventory WHERE product_id = $1 ORDER BY id ASC LIMIT 1
            )
            AND quantity >= $2
            RETURNING quantity
            "#,
        )
        .bind(product_id.as_str())
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = reserved {
            return Ok(Reservation::Reserved {
                remaining: row.try_get("quantity")?,
            });
        }

        // Nothing updated: either the product is unknown or stock is short.
        let current = self.get_by_product(product_id).await?;
        Ok(Reservation::Insufficient {
            available: current.quantity,
        })
    }
}
