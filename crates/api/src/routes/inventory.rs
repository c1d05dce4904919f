//! Inventory endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use messaging::MessageChannel;
use saga::{CreateInventory, InventoryService, UpdateInventory};
use store::InventoryStore;

use crate::error::ApiError;

/// Inventory service as held by the router.
pub type SharedInventoryService =
    Arc<InventoryService<Arc<dyn InventoryStore>, Arc<dyn MessageChannel>>>;

/// GET /inventory: first page of stock rows, `204` when there are none.
#[tracing::instrument(skip(service))]
pub async fn list(State(service): State<SharedInventoryService>) -> Result<Response, ApiError> {
    let rows = service.list_inventory().await?;
    if rows.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(Json(rows).into_response())
}

/// GET /inventory/{id}
#[tracing::instrument(skip(service))]
pub async fn get(
    State(service): State<SharedInventoryService>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id?;
    Ok(Json(service.get_inventory(id).await?).into_response())
}

/// POST /inventory: create a stock row and publish `InventoryCreated`.
#[tracing::instrument(skip(service, body))]
pub async fn create(
    State(service): State<SharedInventoryService>,
    body: Result<Json<CreateInventory>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(cmd) = body?;
    let inventory = service.create_inventory(cmd).await?;
    Ok(Json(inventory).into_response())
}

/// PUT /inventory/{id}: overwrite the quantity of a stock row.
#[tracing::instrument(skip(service, body))]
pub async fn update(
    State(service): State<SharedInventoryService>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateInventory>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id?;
    let Json(cmd) = body?;
    Ok(Json(service.update_inventory(id, cmd).await?).into_response())
}
