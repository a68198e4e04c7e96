use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use vantage_types::VantageError;

use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RecordsRequest {
    record_count: usize,
    score_type: String,
}

/// `id` is the crawl_id; the results bucket it maps to is looked up through
/// the engine rather than accepted directly, so callers never need to know
/// the internal `(collection_id, data_id)` pair.
pub async fn records(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RecordsRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.record_count == 0 {
        return Err(ApiError::from(VantageError::InvalidInput(
            "record_count must be > 0".to_string(),
        )));
    }
    let results_id = state.engine.results_id_for(&id)?;
    let records = state
        .engine
        .results_manager()
        .get_records(&results_id, req.record_count, &req.score_type)
        .await?;
    Ok(Json(json!({ "records": records })))
}
