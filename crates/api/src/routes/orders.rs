//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use messaging::MessageChannel;
use saga::{CreateOrder, OrderService};
use store::OrderStore;

use crate::error::ApiError;

/// Order service as held by the router.
pub type SharedOrderService = Arc<OrderService<Arc<dyn OrderStore>, Arc<dyn MessageChannel>>>;

/// GET /orders: first page of orders, `204` when there are none.
#[tracing::instrument(skip(service))]
pub async fn list(State(service): State<SharedOrderService>) -> Result<Response, ApiError> {
    let orders = service.list_orders().await?;
    if orders.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(Json(orders).into_response())
}

/// GET /orders/{id}: load an order by surrogate id.
#[tracing::instrument(skip(service))]
pub async fn get(
    State(service): State<SharedOrderService>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id?;
    let order = service.get_order(id).await?;
    Ok(Json(order).into_response())
}

/// POST /orders: create a Pending order and publish `OrderCreated`.
#[tracing::instrument(skip(service, body))]
pub async fn create(
    State(service): State<SharedOrderService>,
    body: Result<Json<CreateOrder>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(cmd) = body?;
    let order = service.create_order(cmd).await?;
    Ok((StatusCode::CREATED, Json(order)).into_response())
}
