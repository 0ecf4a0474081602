//! Checkout: turn a cart into a committed order in one atomic scope.
//!
//! Inside the scope, in order: read the cart lines, refuse an empty cart,
//! write the order header, then for each line resolve the product, freeze its
//! current price and write the order line, and finally empty the cart. Any
//! failure (a product deleted since it was added, a storage error) rolls the
//! whole scope back: no header, no lines, cart untouched.

use chrono::Utc;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, instrument};

use shoplab_core::{CartId, OrderId};
use shoplab_orders::OrderDraft;

use crate::atomic::atomically;
use crate::error::CommandError;
use crate::{cart_store, catalog_store, order_ledger};

pub const CART_IS_EMPTY: &str = "cart is empty";

/// What a successful checkout hands back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub total: f64,
}

#[derive(Debug, Clone)]
pub struct CheckoutCoordinator {
    pool: SqlitePool,
}

impl CheckoutCoordinator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Convert `cart` into an order. All-or-nothing.
    #[instrument(skip(self), fields(cart_id = %cart), err)]
    pub async fn checkout(&self, cart: &CartId) -> Result<CheckoutReceipt, CommandError> {
        let cart = cart.clone();
        let (receipt, lines) = atomically(&self.pool, "checkout", move |conn| {
            Box::pin(checkout_in_scope(conn, cart))
        })
        .await?;

        info!(order_id = %receipt.order_id, lines, total = receipt.total, "order committed");
        Ok(receipt)
    }
}

async fn checkout_in_scope(
    conn: &mut SqliteConnection,
    cart: CartId,
) -> Result<(CheckoutReceipt, usize), CommandError> {
    let lines = cart_store::lines(conn, &cart).await?;
    if lines.is_empty() {
        return Err(CommandError::conflict(CART_IS_EMPTY));
    }

    let mut draft = OrderDraft::new(OrderId::new(), Utc::now());
    order_ledger::insert_header(conn, draft.id(), draft.created_at()).await?;

    for line in lines {
        let product = catalog_store::find(conn, line.product_id)
            .await?
            .ok_or_else(|| CommandError::conflict(format!("product missing: {}", line.product_id)))?;
        let order_line = draft.add_line(product.id, line.qty, product.price)?;
        order_ledger::append_line(conn, order_line).await?;
    }

    cart_store::clear(conn, &cart).await?;

    let total = draft.total();
    let order = draft.finish()?;
    let receipt = CheckoutReceipt {
        order_id: order.id,
        total,
    };
    Ok((receipt, order.lines.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart_store::CartStore;
    use crate::catalog_store::CatalogStore;
    use crate::db::{connect_and_migrate, DbConfig};
    use crate::order_ledger::OrderLedger;
    use shoplab_catalog::NewProduct;
    use shoplab_core::ProductId;
    use shoplab_orders::Quantity;

    struct Shop {
        pool: SqlitePool,
        catalog: CatalogStore,
        cart: CartStore,
        ledger: OrderLedger,
        checkout: CheckoutCoordinator,
    }

    async fn shop() -> Shop {
        let pool = connect_and_migrate(&DbConfig::in_memory()).await.unwrap();
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

    fn qty(v: i64) -> Quantity {
        Quantity::new(v).unwrap()
    }

    /// Delete a product behind the schema's back, leaving its cart lines behind.
    async fn delete_bypassing_cascade(shop: &Shop, id: ProductId) {
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(&shop.pool)
            .await
            .unwrap();
        sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id.to_string())
            .execute(&shop.pool)
            .await
            .unwrap();
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&shop.pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn checkout_commits_order_and_empties_cart() {
        let shop = shop().await;
        let cart = CartId::default_cart();
        let a = product(&shop, "A", 10.0).await;
        let b = product(&shop, "B", 5.5).await;

        shop.cart.add(&cart, a, qty(2)).await.unwrap();
        shop.cart.add(&cart, b, qty(1)).await.unwrap();

        let receipt = shop.checkout.checkout(&cart).await.unwrap();
        assert_eq!(receipt.total, 25.5);

        let order = shop.ledger.get(receipt.order_id).await.unwrap();
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.total(), 25.5);
        for line in &order.lines {
            let expected = if line.product_id == a { (2, 10.0) } else { (1, 5.5) };
            assert_eq!((line.qty.value(), line.price.value()), expected);
        }
        assert!(shop.cart.view(&cart).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_cart_is_refused_without_writing() {
        let shop = shop().await;

        let err = shop.checkout.checkout(&CartId::default_cart()).await.unwrap_err();
        assert!(matches!(err, CommandError::Conflict(msg) if msg == CART_IS_EMPTY));
        assert_eq!(shop.ledger.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_product_rolls_back_everything() {
        let shop = shop().await;
        let cart = CartId::default_cart();
        let a = product(&shop, "A", 10.0).await;
        let b = product(&shop, "B", 5.5).await;
        shop.cart.add(&cart, a, qty(2)).await.unwrap();
        shop.cart.add(&cart, b, qty(1)).await.unwrap();

        delete_bypassing_cascade(&shop, b).await;

        let err = shop.checkout.checkout(&cart).await.unwrap_err();
        assert!(matches!(err, CommandError::Conflict(msg) if msg == format!("product missing: {b}")));

        assert_eq!(shop.ledger.count().await.unwrap(), 0);
        let (items,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM order_items")
            .fetch_one(&shop.pool)
            .await
            .unwrap();
        assert_eq!(items, 0);
        assert_eq!(shop.cart.lines(&cart).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn second_checkout_sees_an_empty_cart() {
        let shop = shop().await;
        let cart = CartId::default_cart();
        let a = product(&shop, "A", 3.0).await;
        shop.cart.add(&cart, a, qty(1)).await.unwrap();

        shop.checkout.checkout(&cart).await.unwrap();
        let err = shop.checkout.checkout(&cart).await.unwrap_err();

        assert!(matches!(err, CommandError::Conflict(msg) if msg == CART_IS_EMPTY));
        assert_eq!(shop.ledger.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn committed_prices_ignore_later_catalog_edits() {
        let shop = shop().await;
        let cart = CartId::default_cart();
        let a = product(&shop, "A", 10.0).await;
        shop.cart.add(&cart, a, qty(3)).await.unwrap();

        let receipt = shop.checkout.checkout(&cart).await.unwrap();
        shop.catalog
            .update(a, NewProduct::new("A", 99.0).unwrap())
            .await
            .unwrap();

        let order = shop.ledger.get(receipt.order_id).await.unwrap();
        assert_eq!(order.lines[0].price.value(), 10.0);
        assert_eq!(order.total(), 30.0);
    }

    #[tokio::test]
    async fn checkout_only_touches_its_own_cart() {
        let shop = shop().await;
        let alice = CartId::parse("alice").unwrap();
        let bob = CartId::parse("bob").unwrap();
        let a = product(&shop, "A", 1.0).await;
        shop.cart.add(&alice, a, qty(1)).await.unwrap();
        shop.cart.add(&bob, a, qty(4)).await.unwrap();

        let receipt = shop.checkout.checkout(&alice).await.unwrap();

        assert_eq!(receipt.total, 1.0);
        assert_eq!(shop.cart.lines(&bob).await.unwrap()[0].qty.value(), 4);
    }

    #[tokio::test]
    async fn out_of_range_order_total_rolls_back() {
        let shop = shop().await;
        let cart = CartId::default_cart();
        let a = product(&shop, "A", 1.0).await;
        shop.cart.add(&cart, a, qty(10_000_000_000)).await.unwrap();
        shop.catalog
            .update(a, NewProduct::new("A", 1e300).unwrap())
            .await
            .unwrap();

        let err = shop.checkout.checkout(&cart).await.unwrap_err();
        assert!(matches!(err, CommandError::Validation(msg) if msg == "line total is out of range"));
        assert_eq!(shop.ledger.count().await.unwrap(), 0);
        assert_eq!(shop.cart.lines(&cart).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ordered_product_cannot_be_deleted() {
        let shop = shop().await;
        let cart = CartId::default_cart();
        let a = product(&shop, "A", 1.0).await;
        shop.cart.add(&cart, a, qty(1)).await.unwrap();
        shop.checkout.checkout(&cart).await.unwrap();

        assert!(matches!(shop.catalog.delete(a).await, Err(CommandError::Conflict(_))));
        assert!(shop.catalog.get(a).await.is_ok());
    }
}
