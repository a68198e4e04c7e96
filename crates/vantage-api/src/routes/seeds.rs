use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use vantage_types::SearchEngineSeed;

use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CollectRequest {
    search_engine_seeds: Vec<SearchEngineSeed>,
}

pub async fn collect(
    State(state): State<AppState>,
    Json(req): Json<CollectRequest>,
) -> Result<Json<Value>, ApiError> {
    let seed_urls = state.seed_fetcher.collect(&req.search_engine_seeds).await?;
    Ok(Json(json!({ "seed_urls": seed_urls })))
}
