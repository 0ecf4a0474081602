use axum::http::StatusCode;
use serde::Deserialize;

use shoplab_catalog::{NewProduct, Product};
use shoplab_core::{OrderId, ProductId};
use shoplab_orders::{CartView, Order, Quantity};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

/// Body of product create and update.
#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    pub price: f64,
}

impl ProductRequest {
    pub fn into_new_product(self) -> Result<NewProduct, axum::response::Response> {
        NewProduct::new(&self.name, self.price).map_err(errors::domain_error_to_response)
    }
}

/// Body of cart add and cart item update.
#[derive(Debug, Deserialize)]
pub struct CartItemRequest {
    pub product_id: String,
    pub qty: i64,
}

impl CartItemRequest {
    pub fn parse(self) -> Result<(ProductId, Quantity), axum::response::Response> {
        let product_id = parse_product_id(&self.product_id)?;
        let qty = Quantity::new(self.qty).map_err(errors::domain_error_to_response)?;
        Ok((product_id, qty))
    }
}

// -------------------------
// Path parsing
// -------------------------

pub fn parse_product_id(raw: &str) -> Result<ProductId, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"))
}

pub fn parse_order_id(raw: &str) -> Result<OrderId, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"))
}

// -------------------------
// Response mapping
// -------------------------

pub fn product_to_json(p: Product) -> serde_json::Value {
    serde_json::json!({
        "id": p.id.to_string(),
        "name": p.name,
        "price": p.price.value(),
    })
}

pub fn cart_to_json(view: CartView) -> serde_json::Value {
    let items = view
        .items
        .into_iter()
        .map(|item| {
            serde_json::json!({
                "product_id": item.product_id.to_string(),
                "name": item.name,
                "price": item.price.value(),
                "qty": item.qty.value(),
                "line_total": item.line_total,
            })
        })
        .collect::<Vec<_>>();

    serde_json::json!({
        "items": items,
        "total": view.total,
    })
}

pub fn order_to_json(order: Order) -> serde_json::Value {
    let total = order.total();
    let items = order
        .lines
        .iter()
        .map(|line| {
            serde_json::json!({
                "id": line.id.to_string(),
                "product_id": line.product_id.to_string(),
                "qty": line.qty.value(),
                "price": line.price.value(),
                "line_total": line.line_total(),
            })
        })
        .collect::<Vec<_>>();

    serde_json::json!({
        "id": order.id.to_string(),
        "created_at": order.created_at.to_rfc3339(),
        "items": items,
        "total": total,
    })
}
