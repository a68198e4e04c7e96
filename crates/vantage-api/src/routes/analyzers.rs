use axum::Json;
use serde_json::{json, Value};
use vantage_scoring::analyzer_catalog;

pub async fn info() -> Json<Value> {
    Json(json!({ "analyzers": analyzer_catalog() }))
}
