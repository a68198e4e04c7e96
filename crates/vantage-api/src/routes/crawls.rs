use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use vantage_types::CrawlSpec;

use crate::errors::ApiError;
use crate::state::AppState;

pub async fn create(
    State(state): State<AppState>,
    Json(spec): Json<CrawlSpec>,
) -> Result<Response, ApiError> {
    let crawl_id = state.engine.create(spec).await?;
    let run_state = state.engine.status(&crawl_id).await?.current_state;
    Ok(Json(json!({ "crawl_id": crawl_id, "run_state": run_state })).into_response())
}

pub async fn start(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let run_state = state.engine.start(&id).await?;
    Ok(Json(json!({ "crawl_id": id, "run_state": run_state })))
}

pub async fn stop(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let run_state = state.engine.stop(&id).await?;
    Ok(Json(json!({ "crawl_id": id, "run_state": run_state })))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let crawl_deleted_time = state.engine.delete(&id).await?;
    Ok(Json(json!({ "crawl_id": id, "crawl_deleted_time": crawl_deleted_time })))
}

pub async fn list_info(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let crawls = state.engine.list_info().await?;
    Ok(Json(json!({ "crawls": crawls })))
}

pub async fn list_status(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let crawls = state.engine.list_status().await?;
    Ok(Json(json!({ "crawls": crawls })))
}

pub async fn get_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let info = state.engine.info(&id).await?;
    Ok(Json(json!({ "info": info })))
}

pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let status = state.engine.status(&id).await?;
    Ok(Json(json!({ "status": status })))
}

pub async fn download_spec(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let spec = state.engine.spec(&id)?;
    let body = Json(spec).into_response();
    let (mut parts, body) = body.into_parts();
    parts.headers.insert(
        axum::http::header::CONTENT_DISPOSITION,
        axum::http::HeaderValue::from_str(&format!("attachment; filename=\"{id}.json\""))
            .unwrap_or_else(|_| axum::http::HeaderValue::from_static("attachment")),
    );
    Ok(Response::from_parts(parts, body))
}
