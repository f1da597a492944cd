use axum::Json;
use serde_json::{json, Value};

/// Liveness probe. Deliberately does not touch the backend.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
