use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::CartContext;

/// Turn the request's cart into an order. Responds with `{order_id, total}`.
pub async fn checkout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(cart): Extension<CartContext>,
) -> axum::response::Response {
    match services.checkout.checkout(cart.cart_id()).await {
        Ok(receipt) => (StatusCode::CREATED, Json(receipt)).into_response(),
        Err(e) => errors::command_error_to_response(e),
    }
}
