//! Committed orders.
//!
//! Orders are only ever written by checkout, through [`insert_header`] and
//! [`append_line`] on the checkout's scope connection. [`OrderLedger`] is the
//! read side.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::instrument;

use shoplab_catalog::UnitPrice;
use shoplab_core::OrderId;
use shoplab_orders::{Order, OrderLine, Quantity};

use crate::error::{map_sqlx_error, CommandError, StoreError};

pub const ORDER_NOT_FOUND: &str = "order not found";

/// Write the order header row.
pub async fn insert_header(
    conn: &mut SqliteConnection,
    id: OrderId,
    created_at: DateTime<Utc>,
) -> Result<(), StoreError> {
    sqlx::query("INSERT INTO orders (id, created_at) VALUES (?1, ?2)")
        .bind(id.to_string())
        .bind(created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;
    Ok(())
}

/// Write one order line with its frozen price.
pub async fn append_line(conn: &mut SqliteConnection, line: &OrderLine) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO order_items (id, order_id, product_id, qty, price) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(line.id.to_string())
    .bind(line.order_id.to_string())
    .bind(line.product_id.to_string())
    .bind(line.qty.value())
    .bind(line.price.value())
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("insert_order_item", e))?;
    Ok(())
}

fn decode<T, E: std::fmt::Display>(operation: &'static str, value: Result<T, E>) -> Result<T, StoreError> {
    value.map_err(|e| StoreError::decode(operation, format!("{e}")))
}

fn header_from_row(row: &SqliteRow) -> Result<Order, StoreError> {
    let id: String = row
        .try_get("id")
        .map_err(|e| map_sqlx_error("decode_order", e))?;
    let created_at: String = row
        .try_get("created_at")
        .map_err(|e| map_sqlx_error("decode_order", e))?;

    Ok(Order {
        id: decode("decode_order", id.parse())?,
        created_at: decode("decode_order", DateTime::parse_from_rfc3339(&created_at))?.with_timezone(&Utc),
        lines: Vec::new(),
    })
}

fn line_from_row(row: &SqliteRow) -> Result<OrderLine, StoreError> {
    let get = |col: &str| -> Result<String, StoreError> {
        row.try_get(col)
            .map_err(|e| map_sqlx_error("decode_order_item", e))
    };
    let qty: i64 = row
        .try_get("qty")
        .map_err(|e| map_sqlx_error("decode_order_item", e))?;
    let price: f64 = row
        .try_get("price")
        .map_err(|e| map_sqlx_error("decode_order_item", e))?;

    Ok(OrderLine {
        id: decode("decode_order_item", get("id")?.parse())?,
        order_id: decode("decode_order_item", get("order_id")?.parse())?,
        product_id: decode("decode_order_item", get("product_id")?.parse())?,
        qty: decode("decode_order_item", Quantity::new(qty))?,
        price: decode("decode_order_item", UnitPrice::new(price))?,
    })
}

/// Read access to committed orders.
#[derive(Debug, Clone)]
pub struct OrderLedger {
    pool: SqlitePool,
}

impl OrderLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All orders, newest first, each with its lines ordered by product id.
    #[instrument(skip(self), err)]
    pub async fn list(&self) -> Result<Vec<Order>, StoreError> {
        let headers = sqlx::query("SELECT id, created_at FROM orders ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_orders", e))?;
        let mut orders = headers
            .iter()
            .map(header_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let rows = sqlx::query(
            "SELECT id, order_id, product_id, qty, price FROM order_items ORDER BY order_id, product_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_order_items", e))?;

        let mut by_order: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
        for row in &rows {
            let line = line_from_row(row)?;
            by_order.entry(line.order_id).or_default().push(line);
        }
        for order in &mut orders {
            order.lines = by_order.remove(&order.id).unwrap_or_default();
        }
        Ok(orders)
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    pub async fn get(&self, id: OrderId) -> Result<Order, CommandError> {
        let header = sqlx::query("SELECT id, created_at FROM orders WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_order", e))?
            .ok_or_else(|| CommandError::not_found(ORDER_NOT_FOUND))?;
        let mut order = header_from_row(&header)?;

        let rows = sqlx::query(
            "SELECT id, order_id, product_id, qty, price FROM order_items WHERE order_id = ?1 ORDER BY product_id",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_order_items", e))?;
        order.lines = rows.iter().map(line_from_row).collect::<Result<_, _>>()?;
        Ok(order)
    }

    /// Number of committed orders.
    #[instrument(skip(self), err)]
    pub async fn count(&self) -> Result<i64, StoreError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_orders", e))
    }
}
