pub mod analyzers;
pub mod crawls;
pub mod health;
pub mod results;
pub mod seeds;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/api/v1/crawls", post(crawls::create).get(crawls::list_info))
        .route("/api/v1/crawls/status", get(crawls::list_status))
        .route(
            "/api/v1/crawls/:id",
            get(crawls::get_info).delete(crawls::delete),
        )
        .route("/api/v1/crawls/:id/start", post(crawls::start))
        .route("/api/v1/crawls/:id/stop", post(crawls::stop))
        .route("/api/v1/crawls/:id/status", get(crawls::get_status))
        .route(
            "/api/v1/crawls/:id/spec/download",
            get(crawls::download_spec),
        )
        .route("/api/v1/results/:id/records", post(results::records))
        .route("/api/v1/seeds/collect", post(seeds::collect))
        .route("/api/v1/analyzers/info", get(analyzers::info))
        .with_state(state)
}
