use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

/// Wraps handler output in the canonical success envelope.
pub fn ok(data: impl Serialize) -> Json<Value> {
    Json(json!({ "ok": true, "data": data }))
}
