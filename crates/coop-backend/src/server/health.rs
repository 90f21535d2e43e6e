//! Liveness probe.

use axum::Json;
use coop_proto::HealthResponse;

/// If this handler runs, the backend is accepting requests.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "serving".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
