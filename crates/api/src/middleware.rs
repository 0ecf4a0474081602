use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use shoplab_core::CartId;

use crate::app::errors;
use crate::context::CartContext;

pub const CART_ID_HEADER: &str = "x-cart-id";

/// Resolve the request's cart from `x-cart-id` (or the default cart).
pub async fn cart_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let cart_id = extract_cart_id(req.headers())
        .map_err(|msg| errors::json_error(StatusCode::BAD_REQUEST, "invalid_cart_id", msg))?;

    req.extensions_mut().insert(CartContext::new(cart_id));

    Ok(next.run(req).await)
}

fn extract_cart_id(headers: &HeaderMap) -> Result<CartId, String> {
    let Some(header) = headers.get(CART_ID_HEADER) else {
        return Ok(CartId::default_cart());
    };

    let header = header
        .to_str()
        .map_err(|_| format!("{CART_ID_HEADER} must be visible ASCII"))?;

    CartId::parse(header).map_err(|e| e.to_string())
}
