use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use vantage_types::VantageError;

/// Thin wrapper so route handlers can return `Result<_, ApiError>` and get
/// the status-code mapping and JSON error body for free via `IntoResponse`.
pub struct ApiError(pub VantageError);

impl From<VantageError> for ApiError {
    fn from(err: VantageError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.0 {
            VantageError::NotFound(_) => StatusCode::NOT_FOUND,
            VantageError::AlreadyExists(_)
            | VantageError::AlreadyRunning
            | VantageError::NotRunning
            | VantageError::RunningCannotDelete
            | VantageError::InvalidScoreType(_)
            | VantageError::UnknownAnalyzer(_)
            | VantageError::InvalidAnalyzerParams(_)
            | VantageError::Unsupported(_)
            | VantageError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            VantageError::InvalidSpec(_) => StatusCode::UNPROCESSABLE_ENTITY,
            VantageError::BackendUnavailable(_) | VantageError::StorageError(_) => {
                StatusCode::BAD_GATEWAY
            }
            VantageError::ScrapeError { .. } | VantageError::AnalyzerFailure { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let kind = self.0.kind();
        let message = self.0.to_string();

        if status.is_server_error() {
            tracing::error!(kind, message = %message, "request failed");
        } else {
            tracing::warn!(kind, message = %message, "request rejected");
        }

        let body = Json(json!({
            "error": {
                "kind": kind,
                "message": message,
                "retryable": self.0.is_retryable(),
            }
        }));
        (status, body).into_response()
    }
}
