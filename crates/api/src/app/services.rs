use sqlx::SqlitePool;

use shoplab_infra::{
    connect_and_migrate, CartStore, CatalogStore, CheckoutCoordinator, DbConfig, OrderLedger,
    StoreError,
};

/// Everything the handlers talk to. All stores share one pool.
#[derive(Debug, Clone)]
pub struct AppServices {
    pub catalog: CatalogStore,
    pub cart: CartStore,
    pub orders: OrderLedger,
    pub checkout: CheckoutCoordinator,
}

impl AppServices {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            catalog: CatalogStore::new(pool.clone()),
            cart: CartStore::new(pool.clone()),
            orders: OrderLedger::new(pool.clone()),
            checkout: CheckoutCoordinator::new(pool),
        }
    }

    /// Open (and migrate) the database described by `config`.
    pub async fn connect(config: &DbConfig) -> Result<Self, StoreError> {
        let pool = connect_and_migrate(config).await?;
        Ok(Self::new(pool))
    }
}
