//! SQLite connection pool and schema.
//!
//! The whole shop lives in a single SQLite file. Foreign keys are switched on
//! for every pooled connection; referential cleanup (cart lines of a deleted
//! product) is done by the schema, not by application code.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{info, instrument};

use crate::error::{map_sqlx_error, StoreError};

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbTarget {
    /// A database file, created (with its parent directory) if missing.
    File(PathBuf),
    /// A private in-memory database. Always served by a single connection,
    /// since every SQLite in-memory connection is a separate database.
    Memory,
}

/// Connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub target: DbTarget,
    pub max_connections: u32,
}

impl DbConfig {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

    /// How long a connection waits on a locked database before giving up.
    pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            target: DbTarget::File(path.into()),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            target: DbTarget::Memory,
            max_connections: 1,
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }
}

/// Open the pool described by `config`.
#[instrument(skip(config), fields(target = ?config.target), err)]
pub async fn connect(config: &DbConfig) -> Result<SqlitePool, StoreError> {
    let pool = match &config.target {
        DbTarget::File(path) => {
            ensure_parent_dir(path)?;
            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .busy_timeout(DbConfig::BUSY_TIMEOUT)
                .foreign_keys(true);
            SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .connect_with(options)
                .await
                .map_err(|e| map_sqlx_error("connect", e))?
        }
        DbTarget::Memory => {
            let options = SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| map_sqlx_error("connect", e))?
                .foreign_keys(true);
            // The database disappears with its connection, so keep it forever.
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
                .map_err(|e| map_sqlx_error("connect", e))?
        }
    };

    info!(max_connections = config.max_connections, "database pool ready");
    Ok(pool)
}

/// Open the pool and create the schema.
pub async fn connect_and_migrate(config: &DbConfig) -> Result<SqlitePool, StoreError> {
    let pool = connect(config).await?;
    migrate(&pool).await?;
    Ok(pool)
}

const SCHEMA: [&str; 5] = [
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id    TEXT PRIMARY KEY,
        name  TEXT NOT NULL,
        price REAL NOT NULL CHECK (price >= 0)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id         TEXT PRIMARY KEY,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS order_items (
        id         TEXT PRIMARY KEY,
        order_id   TEXT NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
        product_id TEXT NOT NULL REFERENCES products(id),
        qty        INTEGER NOT NULL CHECK (qty >= 1),
        price      REAL NOT NULL CHECK (price >= 0)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cart_items (
        cart_id    TEXT NOT NULL,
        product_id TEXT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
        qty        INTEGER NOT NULL CHECK (qty >= 1),
        PRIMARY KEY (cart_id, product_id)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS order_items_order_id ON order_items(order_id)
    "#,
];

/// Create tables if they do not exist yet. Idempotent.
#[instrument(skip(pool), err)]
pub async fn migrate(pool: &SqlitePool) -> Result<(), StoreError> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
    }
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<(), StoreError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .map_err(|e| StoreError::Open(format!("failed to create directory {parent:?}: {e}"))),
        _ => Ok(()),
    }
}
