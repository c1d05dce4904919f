//! HTTP front end and process wiring for the order/inventory saga.
//!
//! Each role exposes its producer service over REST and runs its reactor in
//! the background. Structured logging goes through tracing, metrics through
//! the Prometheus exporter.

pub mod config;
pub mod error;
pub mod routes;
pub mod runtime;

use axum::Router;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{Config, LogFormat, ServiceRole, TransportKind};
pub use error::{ApiError, StartupError};
pub use routes::inventory::SharedInventoryService;
pub use routes::orders::SharedOrderService;
pub use runtime::Runtime;

/// Routes of the order role.
pub fn create_orders_router(service: SharedOrderService) -> Router {
    Router::new()
        .route(
            "/orders",
            get(routes::orders::list).post(routes::orders::create),
        )
        .route("/orders/{id}", get(routes::orders::get))
        .with_state(service)
}

/// Routes of the inventory role.
pub fn create_inventory_router(service: SharedInventoryService) -> Router {
    Router::new()
        .route(
            "/inventory",
            get(routes::inventory::list).post(routes::inventory::create),
        )
        .route(
            "/inventory/{id}",
            get(routes::inventory::get).put(routes::inventory::update),
        )
        .with_state(service)
}

/// Adds the operational endpoints and middleware around the role routes.
pub fn create_app(
    service_name: &'static str,
    role_routes: Router,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::ops::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::ops::health))
        .with_state(service_name)
        .merge(metrics_router)
        .merge(role_routes)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
