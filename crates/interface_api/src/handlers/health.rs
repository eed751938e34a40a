//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use futures::future::join_all;

use core_kernel::AdapterHealth;

use crate::dto::{HealthResponse, ReadinessResponse};
use crate::AppState;

/// Liveness
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness: every registered adapter must report healthy
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let checks = join_all(state.health_checks.iter().map(|c| c.health_check())).await;
    let ready = checks.iter().all(|c| c.status == AdapterHealth::Healthy);

    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (
        status,
        Json(ReadinessResponse {
            status: if ready { "ready" } else { "unavailable" }.to_string(),
            checks,
        }),
    )
}
