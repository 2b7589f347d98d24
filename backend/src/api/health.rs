//! Health check and preflight handlers

use axum::Json;
use serde_json::{json, Value};

/// `GET /health`
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// `OPTIONS /*path`
///
/// The CORS layer answers real preflights before this runs; this covers bare
/// OPTIONS requests.
pub async fn options_handler() -> Json<Value> {
    Json(json!({ "message": "OK" }))
}
