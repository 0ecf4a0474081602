//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store wiring over one SQLite pool
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>) -> Router {
    // Cart-scoped routes: require a resolvable cart.
    let cart_scoped = routes::cart_router()
        .route_layer(axum::middleware::from_fn(middleware::cart_middleware));

    let api = routes::router().merge(cart_scoped);

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(cors_layer())
                .layer(Extension(services)),
        )
}

/// Browser front-ends may be served from any origin and send any header
/// (including `x-cart-id`).
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
