use thiserror::Error;

/// Error surface shared by every core contract (state store, analyzers,
/// results manager, engine). Kinds mirror the ones named in the HTTP layer's
/// status mapping; not every variant is reachable from every component.
#[derive(Error, Debug)]
pub enum VantageError {
    #[error("crawl not found: {0}")]
    NotFound(String),

    #[error("crawl already exists: {0}")]
    AlreadyExists(String),

    #[error("crawl is already running")]
    AlreadyRunning,

    #[error("crawl is not running")]
    NotRunning,

    #[error("cannot delete a running crawl")]
    RunningCannotDelete,

    #[error("invalid crawl spec: {0}")]
    InvalidSpec(String),

    #[error("unknown analyzer kind: {0}")]
    UnknownAnalyzer(String),

    #[error("invalid analyzer params: {0}")]
    InvalidAnalyzerParams(String),

    #[error("invalid score type: {0}")]
    InvalidScoreType(String),

    #[error("scrape failed for {url}: {reason}")]
    ScrapeError { url: String, reason: String },

    #[error("analyzer {name} failed: {reason}")]
    AnalyzerFailure { name: String, reason: String },

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("state store backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("operation unsupported by this backend: {0}")]
    Unsupported(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl VantageError {
    /// Coarse classification used to decide retry behavior in the worker loop.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VantageError::ScrapeError { .. } | VantageError::BackendUnavailable(_)
        )
    }

    /// Stable, lowercase kind tag for logging and the JSON error body.
    pub fn kind(&self) -> &'static str {
        match self {
            VantageError::NotFound(_) => "not_found",
            VantageError::AlreadyExists(_) => "already_exists",
            VantageError::AlreadyRunning => "already_running",
            VantageError::NotRunning => "not_running",
            VantageError::RunningCannotDelete => "running_cannot_delete",
            VantageError::InvalidSpec(_) => "invalid_spec",
            VantageError::UnknownAnalyzer(_) => "unknown_analyzer",
            VantageError::InvalidAnalyzerParams(_) => "invalid_analyzer_params",
            VantageError::InvalidScoreType(_) => "invalid_score_type",
            VantageError::ScrapeError { .. } => "scrape_error",
            VantageError::AnalyzerFailure { .. } => "analyzer_failure",
            VantageError::StorageError(_) => "storage_error",
            VantageError::BackendUnavailable(_) => "backend_unavailable",
            VantageError::Unsupported(_) => "unsupported",
            VantageError::InvalidInput(_) => "invalid_input",
        }
    }
}

pub type VantageResult<T> = Result<T, VantageError>;
