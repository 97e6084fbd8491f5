//! services/api/src/web/rest.rs
//!
//! Plain HTTP handlers that sit beside the client WebSocket.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct HealthResponse {
    status: &'static str,
}

/// Liveness probe.
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}
