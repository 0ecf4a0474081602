//! Infrastructure layer: SQLite persistence for catalog, carts and orders.
//!
//! Every multi-step write runs inside an [`atomic::atomically`] scope.

pub mod atomic;
pub mod cart_store;
pub mod catalog_store;
pub mod checkout;
pub mod db;
pub mod error;
pub mod order_ledger;

pub use atomic::{atomically, ScopeFuture};
pub use cart_store::CartStore;
pub use catalog_store::CatalogStore;
pub use checkout::{CheckoutCoordinator, CheckoutReceipt};
pub use db::{connect, connect_and_migrate, migrate, DbConfig, DbTarget};
pub use error::{map_sqlx_error, CommandError, ConstraintKind, StoreError};
pub use order_ledger::OrderLedger;
