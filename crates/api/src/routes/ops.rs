//! Operational endpoints shared by every role.

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

/// GET /health: process liveness plus the name of the running role.
pub async fn health(State(service): State<&'static str>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service,
    })
}

/// GET /metrics: saga counters and handler latencies in Prometheus text format.
pub async fn metrics(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        handle.render(),
    )
}
