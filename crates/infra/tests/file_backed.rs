use shoplab_catalog::NewProduct;
use shoplab_core::{CartId, ProductId};
use shoplab_infra::{
    connect_and_migrate, CartStore, CatalogStore, CheckoutCoordinator, DbConfig, OrderLedger,
};
use shoplab_orders::Quantity;
use sqlx::SqlitePool;
use tempfile::tempdir;

const CARTS: usize = 20;

struct Shop {
    pool: SqlitePool,
    catalog: CatalogStore,
    cart: CartStore,
    ledger: OrderLedger,
    checkout: CheckoutCoordinator,
}

async fn open(path: &std::path::Path) -> Shop {
    let pool = connect_and_migrate(&DbConfig::file(path).with_max_connections(5))
        .await
        .expect("open file database");
    Shop {
        catalog: CatalogStore::new(pool.clone()),
        cart: CartStore::new(pool.clone()),
        ledger: OrderLedger::new(pool.clone()),
        checkout: CheckoutCoordinator::new(pool.clone()),
        pool,
    }
}

async fn product(shop: &Shop, name: &str, price: f64) -> ProductId {
    shop.catalog
        .create(NewProduct::new(name, price).unwrap())
        .await
        .unwrap()
        .id
}

fn cart(i: usize) -> CartId {
    CartId::parse(format!("cart-{i}")).unwrap()
}

#[tokio::test]
async fn file_database_is_created_with_its_directory() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("nested").join("shop.db");

    let shop = open(&path).await;
    assert!(path.exists());

    // Reopening an existing file keeps its data.
    let id = product(&shop, "Mug", 10.0).await;
    shop.pool.close().await;
    let reopened = open(&path).await;
    assert_eq!(reopened.catalog.get(id).await.unwrap().name, "Mug");
}

#[tokio::test]
async fn every_pooled_connection_enforces_foreign_keys() {
    let dir = tempdir().expect("temp dir");
    let shop = open(&dir.path().join("shop.db")).await;

    let mut held = Vec::new();
    for _ in 0..5 {
        held.push(shop.pool.acquire().await.unwrap());
    }
    for conn in &mut held {
        let on: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&mut **conn)
            .await
            .unwrap();
        assert_eq!(on, 1);
    }
}

#[tokio::test]
async fn product_delete_cascades_to_cart_lines_through_the_pool() {
    let dir = tempdir().expect("temp dir");
    let shop = open(&dir.path().join("shop.db")).await;
    let mug = product(&shop, "Mug", 10.0).await;

    shop.cart
        .add(&CartId::default_cart(), mug, Quantity::new(2).unwrap())
        .await
        .unwrap();
    shop.catalog.delete(mug).await.unwrap();

    assert!(shop.cart.lines(&CartId::default_cart()).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cart_adds_on_distinct_carts_all_succeed() {
    let dir = tempdir().expect("temp dir");
    let shop = open(&dir.path().join("shop.db")).await;
    let mug = product(&shop, "Mug", 2.0).await;

    let mut tasks = Vec::new();
    for i in 0..CARTS {
        let store = shop.cart.clone();
        tasks.push(tokio::spawn(async move {
            store.add(&cart(i), mug, Quantity::new(1).unwrap()).await
        }));
    }

    for task in tasks {
        task.await.unwrap().expect("cart add failed");
    }
    for i in 0..CARTS {
        assert_eq!(shop.cart.lines(&cart(i)).await.unwrap().len(), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_on_distinct_carts_all_commit() {
    let dir = tempdir().expect("temp dir");
    let shop = open(&dir.path().join("shop.db")).await;
    let mug = product(&shop, "Mug", 2.0).await;
    for i in 0..CARTS {
        shop.cart
            .add(&cart(i), mug, Quantity::new(1).unwrap())
            .await
            .unwrap();
    }

    let mut tasks = Vec::new();
    for i in 0..CARTS {
        let checkout = shop.checkout.clone();
        tasks.push(tokio::spawn(async move { checkout.checkout(&cart(i)).await }));
    }

    for task in tasks {
        let receipt = task.await.unwrap().expect("checkout failed");
        assert_eq!(receipt.total, 2.0);
    }
    assert_eq!(shop.ledger.count().await.unwrap(), CARTS as i64);
    for i in 0..CARTS {
        assert!(shop.cart.lines(&cart(i)).await.unwrap().is_empty());
    }
}
