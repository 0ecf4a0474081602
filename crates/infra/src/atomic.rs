//! Atomic scope: a unit of work whose writes all take effect or none do.
//!
//! [`atomically`] acquires a transaction, hands its connection to the scope body,
//! and then releases it on every exit path:
//!
//! 1. body returns `Ok` → commit
//! 2. body returns `Err` → rollback, then the error is surfaced
//! 3. body panics or the future is dropped mid-way → the transaction handle is
//!    dropped un-committed and sqlx rolls it back
//!
//! Nothing written inside the scope is visible to other connections before the
//! commit.
//!
//! Scopes start with `BEGIN IMMEDIATE`: the write lock is taken up front, under
//! the connection's busy timeout, so concurrent writers queue instead of failing
//! with `SQLITE_BUSY` when a read inside the scope is followed by a write.

use std::future::Future;
use std::pin::Pin;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, error, warn};

use crate::error::{map_sqlx_error, StoreError};

/// Future returned by a scope body, borrowing the scope's connection.
pub type ScopeFuture<'c, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>;

/// Run `work` inside a transaction on `pool`.
///
/// ```ignore
/// let view = atomically(&pool, "cart_add", move |conn| {
///     Box::pin(add_in_scope(conn, cart, product_id, qty))
/// })
/// .await?;
/// ```
pub async fn atomically<T, E, F>(pool: &SqlitePool, scope: &'static str, work: F) -> Result<T, E>
where
    F: for<'c> FnOnce(&'c mut SqliteConnection) -> ScopeFuture<'c, T, E>,
    E: From<StoreError> + std::fmt::Display,
{
    let mut tx = pool
        .begin_with("BEGIN IMMEDIATE")
        .await
        .map_err(|e| E::from(map_sqlx_error("begin_transaction", e)))?;
    debug!(scope, "atomic scope opened");

    let outcome = work(&mut *tx).await;

    match outcome {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(|e| E::from(map_sqlx_error("commit_transaction", e)))?;
            debug!(scope, "atomic scope committed");
            Ok(value)
        }
        Err(err) => {
            warn!(scope, error = %err, "atomic scope rolled back");
            if let Err(rollback_err) = tx.rollback().await {
                // The connection is discarded by the pool; nothing was committed.
                error!(scope, error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{connect_and_migrate, DbConfig};
    use crate::error::CommandError;

    async fn count_orders(pool: &SqlitePool) -> i64 {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
            .fetch_one(pool)
            .await
            .unwrap();
        n
    }

    async fn insert_order(conn: &mut SqliteConnection, id: &str) -> Result<(), CommandError> {
        sqlx::query("INSERT INTO orders (id, created_at) VALUES (?1, '2026-01-01T00:00:00Z')")
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("insert_order", e))?;
        Ok(())
    }

    #[tokio::test]
    async fn ok_body_commits() {
        let pool = connect_and_migrate(&DbConfig::in_memory()).await.unwrap();

        let out: Result<u8, CommandError> = atomically(&pool, "test", |conn| {
            Box::pin(async move {
                insert_order(conn, "a").await?;
                insert_order(conn, "b").await?;
                Ok::<_, CommandError>(7)
            })
        })
        .await;

        assert_eq!(out.unwrap(), 7);
        assert_eq!(count_orders(&pool).await, 2);
    }

    #[tokio::test]
    async fn err_body_rolls_back_every_write() {
        let pool = connect_and_migrate(&DbConfig::in_memory()).await.unwrap();

        let out: Result<(), CommandError> = atomically(&pool, "test", |conn| {
            Box::pin(async move {
                insert_order(conn, "a").await?;
                Err(CommandError::conflict("abort"))
            })
        })
        .await;

        assert!(matches!(out, Err(CommandError::Conflict(msg)) if msg == "abort"));
        assert_eq!(count_orders(&pool).await, 0);
    }

    #[tokio::test]
    async fn store_error_inside_body_rolls_back() {
        let pool = connect_and_migrate(&DbConfig::in_memory()).await.unwrap();

        // Second insert hits the primary key.
        let out: Result<(), CommandError> = atomically(&pool, "test", |conn| {
            Box::pin(async move {
                insert_order(conn, "a").await?;
                insert_order(conn, "a").await?;
                Ok::<_, CommandError>(())
            })
        })
        .await;

        assert!(matches!(out, Err(CommandError::Store(StoreError::Constraint { .. }))));
        assert_eq!(count_orders(&pool).await, 0);
    }
}
