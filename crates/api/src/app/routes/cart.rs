use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CartContext;

pub async fn get_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(cart): Extension<CartContext>,
) -> axum::response::Response {
    match services.cart.view(cart.cart_id()).await {
        Ok(view) => (StatusCode::OK, Json(dto::cart_to_json(view))).into_response(),
        Err(e) => errors::command_error_to_response(e),
    }
}

pub async fn add_to_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(cart): Extension<CartContext>,
    Json(body): Json<dto::CartItemRequest>,
) -> axum::response::Response {
    let (product_id, qty) = match body.parse() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.cart.add(cart.cart_id(), product_id, qty).await {
        Ok(view) => (StatusCode::OK, Json(dto::cart_to_json(view))).into_response(),
        Err(e) => errors::command_error_to_response(e),
    }
}

pub async fn update_cart_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(cart): Extension<CartContext>,
    Json(body): Json<dto::CartItemRequest>,
) -> axum::response::Response {
    let (product_id, qty) = match body.parse() {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.cart.set_quantity(cart.cart_id(), product_id, qty).await {
        Ok(view) => (StatusCode::OK, Json(dto::cart_to_json(view))).into_response(),
        Err(e) => errors::command_error_to_response(e),
    }
}

pub async fn remove_cart_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(cart): Extension<CartContext>,
    Path(product_id): Path<String>,
) -> axum::response::Response {
    let product_id = match dto::parse_product_id(&product_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.cart.remove(cart.cart_id(), product_id).await {
        Ok(view) => (StatusCode::OK, Json(dto::cart_to_json(view))).into_response(),
        Err(e) => errors::command_error_to_response(e),
    }
}
