use axum::{
    routing::{get, patch, post},
    Router,
};

pub mod cart;
pub mod checkout;
pub mod orders;
pub mod products;
pub mod system;

/// Router for catalog and order endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/products", products::router())
        .nest("/orders", orders::router())
}

/// Router for endpoints that act on the request's cart.
pub fn cart_router() -> Router {
    Router::new()
        .route("/cart", get(cart::get_cart))
        .route("/cart/add", post(cart::add_to_cart))
        .route("/cart/item", patch(cart::update_cart_item))
        .route("/cart/item/:product_id", axum::routing::delete(cart::remove_cart_item))
        .route("/checkout", post(checkout::checkout))
}
