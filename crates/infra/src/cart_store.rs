//! SQLite-backed cart store.
//!
//! Every operation is scoped to a [`CartId`]. Lines are always listed ordered by
//! product id so checkout builds order lines in a reproducible order.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::instrument;

use shoplab_catalog::UnitPrice;
use shoplab_core::{CartId, ProductId};
use shoplab_orders::{CartItemView, CartLine, CartView, Quantity};

use crate::atomic::atomically;
use crate::catalog_store::{self, PRODUCT_NOT_FOUND};
use crate::error::{map_sqlx_error, CommandError, StoreError};

pub const CART_ITEM_NOT_FOUND: &str = "cart item not found";

/// Lines of `cart`, ordered by product id.
pub async fn lines(conn: &mut SqliteConnection, cart: &CartId) -> Result<Vec<CartLine>, StoreError> {
    let rows = sqlx::query(
        "SELECT product_id, qty FROM cart_items WHERE cart_id = ?1 ORDER BY product_id",
    )
    .bind(cart.as_str())
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("list_cart_lines", e))?;

    rows.iter().map(line_from_row).collect()
}

/// Remove every line of `cart`. Returns how many were removed.
pub async fn clear(conn: &mut SqliteConnection, cart: &CartId) -> Result<u64, StoreError> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = ?1")
        .bind(cart.as_str())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("clear_cart", e))?;
    Ok(result.rows_affected())
}

/// Lines of `cart` priced at current catalog prices.
///
/// A cart whose priced total is not a finite number is a validation error.
pub async fn view(conn: &mut SqliteConnection, cart: &CartId) -> Result<CartView, CommandError> {
    let rows = sqlx::query(
        r#"
        SELECT ci.product_id, p.name, p.price, ci.qty
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.cart_id = ?1
        ORDER BY ci.product_id
        "#,
    )
    .bind(cart.as_str())
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("view_cart", e))?;

    let items = rows
        .iter()
        .map(item_from_row)
        .collect::<Result<Vec<_>, CommandError>>()?;
    Ok(CartView::from_items(items)?)
}

async fn find_qty(
    conn: &mut SqliteConnection,
    cart: &CartId,
    product_id: ProductId,
) -> Result<Option<Quantity>, StoreError> {
    let qty: Option<i64> =
        sqlx::query_scalar("SELECT qty FROM cart_items WHERE cart_id = ?1 AND product_id = ?2")
            .bind(cart.as_str())
            .bind(product_id.to_string())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("find_cart_line", e))?;

    qty.map(|q| Quantity::new(q).map_err(|e| StoreError::decode("find_cart_line", format!("{e}"))))
        .transpose()
}

fn line_from_row(row: &SqliteRow) -> Result<CartLine, StoreError> {
    let product_id: String = row
        .try_get("product_id")
        .map_err(|e| map_sqlx_error("decode_cart_line", e))?;
    let qty: i64 = row
        .try_get("qty")
        .map_err(|e| map_sqlx_error("decode_cart_line", e))?;

    Ok(CartLine {
        product_id: product_id
            .parse()
            .map_err(|e| StoreError::decode("decode_cart_line", format!("{e}")))?,
        qty: Quantity::new(qty).map_err(|e| StoreError::decode("decode_cart_line", format!("{e}")))?,
    })
}

fn item_from_row(row: &SqliteRow) -> Result<CartItemView, CommandError> {
    let line = line_from_row(row)?;
    let name: String = row
        .try_get("name")
        .map_err(|e| map_sqlx_error("decode_cart_item", e))?;
    let price: f64 = row
        .try_get("price")
        .map_err(|e| map_sqlx_error("decode_cart_item", e))?;
    let price = UnitPrice::new(price).map_err(|e| StoreError::decode("decode_cart_item", format!("{e}")))?;

    Ok(CartItemView::new(line.product_id, name, price, line.qty)?)
}

async fn add_in_scope(
    conn: &mut SqliteConnection,
    cart: CartId,
    product_id: ProductId,
    qty: Quantity,
) -> Result<CartView, CommandError> {
    if catalog_store::find(conn, product_id).await?.is_none() {
        return Err(CommandError::not_found(PRODUCT_NOT_FOUND));
    }

    match find_qty(conn, &cart, product_id).await? {
        Some(existing) => {
            let merged = existing.checked_add(qty)?;
            sqlx::query("UPDATE cart_items SET qty = ?1 WHERE cart_id = ?2 AND product_id = ?3")
                .bind(merged.value())
                .bind(cart.as_str())
                .bind(product_id.to_string())
                .execute(&mut *conn)
                .await
                .map_err(|e| map_sqlx_error("update_cart_line", e))?;
        }
        None => {
            sqlx::query("INSERT INTO cart_items (cart_id, product_id, qty) VALUES (?1, ?2, ?3)")
                .bind(cart.as_str())
                .bind(product_id.to_string())
                .bind(qty.value())
                .execute(&mut *conn)
                .await
                .map_err(|e| map_sqlx_error("insert_cart_line", e))?;
        }
    }

    view(conn, &cart).await
}

async fn set_quantity_in_scope(
    conn: &mut SqliteConnection,
    cart: CartId,
    product_id: ProductId,
    qty: Quantity,
) -> Result<CartView, CommandError> {
    let result = sqlx::query("UPDATE cart_items SET qty = ?1 WHERE cart_id = ?2 AND product_id = ?3")
        .bind(qty.value())
        .bind(cart.as_str())
        .bind(product_id.to_string())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("update_cart_line", e))?;

    if result.rows_affected() == 0 {
        return Err(CommandError::not_found(CART_ITEM_NOT_FOUND));
    }
    view(conn, &cart).await
}

async fn remove_in_scope(
    conn: &mut SqliteConnection,
    cart: CartId,
    product_id: ProductId,
) -> Result<CartView, CommandError> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = ?1 AND product_id = ?2")
        .bind(cart.as_str())
        .bind(product_id.to_string())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("delete_cart_line", e))?;

    if result.rows_affected() == 0 {
        return Err(CommandError::not_found(CART_ITEM_NOT_FOUND));
    }
    view(conn, &cart).await
}

/// Cart operations over the shared pool.
#[derive(Debug, Clone)]
pub struct CartStore {
    pool: SqlitePool,
}

impl CartStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self), fields(cart_id = %cart), err)]
    pub async fn view(&self, cart: &CartId) -> Result<CartView, CommandError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        view(&mut *conn, cart).await
    }

    #[instrument(skip(self), fields(cart_id = %cart), err)]
    pub async fn lines(&self, cart: &CartId) -> Result<Vec<CartLine>, StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        lines(&mut *conn, cart).await
    }

    /// Add `qty` of a product; repeated adds of the same product accumulate.
    #[instrument(skip(self), fields(cart_id = %cart, product_id = %product_id, qty = qty.value()), err)]
    pub async fn add(
        &self,
        cart: &CartId,
        product_id: ProductId,
        qty: Quantity,
    ) -> Result<CartView, CommandError> {
        let cart = cart.clone();
        atomically(&self.pool, "cart_add", move |conn| {
            Box::pin(add_in_scope(conn, cart, product_id, qty))
        })
        .await
    }

    /// Set the absolute quantity of an existing line.
    #[instrument(skip(self), fields(cart_id = %cart, product_id = %product_id, qty = qty.value()), err)]
    pub async fn set_quantity(
        &self,
        cart: &CartId,
        product_id: ProductId,
        qty: Quantity,
    ) -> Result<CartView, CommandError> {
        let cart = cart.clone();
        atomically(&self.pool, "cart_set_quantity", move |conn| {
            Box::pin(set_quantity_in_scope(conn, cart, product_id, qty))
        })
        .await
    }

    /// Remove one line.
    #[instrument(skip(self), fields(cart_id = %cart, product_id = %product_id), err)]
    pub async fn remove(&self, cart: &CartId, product_id: ProductId) -> Result<CartView, CommandError> {
        let cart = cart.clone();
        atomically(&self.pool, "cart_remove", move |conn| {
            Box::pin(remove_in_scope(conn, cart, product_id))
        })
        .await
    }

    /// Remove every line of `cart`.
    #[instrument(skip(self), fields(cart_id = %cart), err)]
    pub async fn clear(&self, cart: &CartId) -> Result<u64, StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        clear(&mut *conn, cart).await
    }
}
