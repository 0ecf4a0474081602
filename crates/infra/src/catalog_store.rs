//! SQLite-backed catalog store.
//!
//! Connection-level functions (`find`) can be called from inside any atomic
//! scope; [`CatalogStore`] wraps them for single-shot use against the pool.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{info, instrument};

use shoplab_catalog::{NewProduct, Product, UnitPrice};
use shoplab_core::ProductId;

use crate::atomic::atomically;
use crate::error::{map_sqlx_error, CommandError, StoreError};

pub const PRODUCT_NOT_FOUND: &str = "product not found";

/// Look up a product by id.
pub async fn find(conn: &mut SqliteConnection, id: ProductId) -> Result<Option<Product>, StoreError> {
    let row = sqlx::query("SELECT id, name, price FROM products WHERE id = ?1")
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("find_product", e))?;

    row.map(|r| product_from_row(&r)).transpose()
}

fn product_from_row(row: &SqliteRow) -> Result<Product, StoreError> {
    let id: String = row
        .try_get("id")
        .map_err(|e| map_sqlx_error("decode_product", e))?;
    let name: String = row
        .try_get("name")
        .map_err(|e| map_sqlx_error("decode_product", e))?;
    let price: f64 = row
        .try_get("price")
        .map_err(|e| map_sqlx_error("decode_product", e))?;

    Ok(Product {
        id: id
            .parse()
            .map_err(|e| StoreError::decode("decode_product", format!("{e}")))?,
        name,
        price: UnitPrice::new(price).map_err(|e| StoreError::decode("decode_product", format!("{e}")))?,
    })
}

/// Catalog operations over the shared pool.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    pool: SqlitePool,
}

impl CatalogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All products, newest first.
    #[instrument(skip(self), err)]
    pub async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query("SELECT id, name, price FROM products ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter().map(product_from_row).collect()
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn get(&self, id: ProductId) -> Result<Product, CommandError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        find(&mut *conn, id)
            .await?
            .ok_or_else(|| CommandError::not_found(PRODUCT_NOT_FOUND))
    }

    #[instrument(skip(self, product), fields(name = product.name()), err)]
    pub async fn create(&self, product: NewProduct) -> Result<Product, CommandError> {
        let product = product.into_product(ProductId::new());

        sqlx::query("INSERT INTO products (id, name, price) VALUES (?1, ?2, ?3)")
            .bind(product.id.to_string())
            .bind(&product.name)
            .bind(product.price.value())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_product", e))?;

        info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Replace name and price. Committed order lines keep their own price.
    #[instrument(skip(self, fields_in), fields(product_id = %id), err)]
    pub async fn update(&self, id: ProductId, fields_in: NewProduct) -> Result<Product, CommandError> {
        let product = fields_in.into_product(id);

        let result = sqlx::query("UPDATE products SET name = ?1, price = ?2 WHERE id = ?3")
            .bind(&product.name)
            .bind(product.price.value())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;

        if result.rows_affected() == 0 {
            return Err(CommandError::not_found(PRODUCT_NOT_FOUND));
        }
        Ok(product)
    }

    /// Delete a product. Its cart lines go with it (schema cascade); a product
    /// that appears on a committed order cannot be deleted.
    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn delete(&self, id: ProductId) -> Result<(), CommandError> {
        atomically(&self.pool, "delete_product", move |conn| Box::pin(delete_in_scope(conn, id))).await
    }
}

async fn delete_in_scope(conn: &mut SqliteConnection, id: ProductId) -> Result<(), CommandError> {
    let result = sqlx::query("DELETE FROM products WHERE id = ?1")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("delete_product", e));

    match result {
        Ok(r) if r.rows_affected() == 0 => Err(CommandError::not_found(PRODUCT_NOT_FOUND)),
        Ok(_) => Ok(()),
        Err(e) if e.is_foreign_key_violation() => Err(CommandError::conflict("product is referenced by an order")),
        Err(e) => Err(e.into()),
    }
}
