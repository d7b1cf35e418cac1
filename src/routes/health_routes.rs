//! Health check endpoints.

use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};

use crate::state::AppState;
use crate::utils::envelope::ApiResponse;

/// Registers health check routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

/// Simple health check endpoint.
async fn health_check() -> ApiResponse<Value> {
    ApiResponse::ok(json!({ "status": "ok" }), "service is healthy")
}
