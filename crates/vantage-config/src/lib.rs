//! Typed, environment-driven configuration for every deployable concern.
//!
//! Each concern gets its own struct with a `from_env()` constructor and a
//! sensible `Default`; [`AppConfig`] composes all of them into the single
//! value loaded once at process start and threaded through shared state.

pub mod env;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hard ceiling on the shared worker pool, independent of any one
    /// crawl's requested `worker_count`.
    pub max_workers: usize,
    /// How long `pop_next_url` backs off before retrying an empty frontier.
    pub idle_poll_ms: u64,
    /// Grace period given to in-flight workers during shutdown before they
    /// are abandoned.
    pub shutdown_grace_s: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            max_workers: cores.saturating_sub(2).max(1),
            idle_poll_ms: 1_000,
            shutdown_grace_s: 30,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_workers: env::parse_or("VANTAGE_MAX_WORKERS", defaults.max_workers),
            idle_poll_ms: env::parse_or("VANTAGE_IDLE_POLL_MS", defaults.idle_poll_ms),
            shutdown_grace_s: env::parse_or(
                "VANTAGE_SHUTDOWN_GRACE_S",
                defaults.shutdown_grace_s,
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub timeout_s: u64,
    pub user_agent: String,
    pub javascript_enabled: bool,
    pub proxy_server: Option<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            timeout_s: 30,
            user_agent: "VantageCrawler/1.0".to_string(),
            javascript_enabled: false,
            proxy_server: None,
        }
    }
}

impl ScraperConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout_s: env::parse_or("VANTAGE_SCRAPER_TIMEOUT_S", defaults.timeout_s),
            user_agent: env::var_or("VANTAGE_SCRAPER_USER_AGENT", &defaults.user_agent),
            javascript_enabled: env::parse_or(
                "VANTAGE_SCRAPER_JAVASCRIPT_ENABLED",
                defaults.javascript_enabled,
            ),
            proxy_server: env::var_opt("VANTAGE_SCRAPER_PROXY_SERVER"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAnalyzerConfig {
    pub service_url: String,
    pub request_timeout_s: u64,
    pub default_prompt_template: String,
    /// The `output_format` object sent on every scoring request, describing
    /// the shape the LLM service should return its score in.
    pub output_format: serde_json::Value,
}

impl Default for LlmAnalyzerConfig {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:8088/score".to_string(),
            request_timeout_s: 15,
            default_prompt_template: "Rate how relevant this content is to the following topics:"
                .to_string(),
            output_format: serde_json::json!({"type": "number"}),
        }
    }
}

impl LlmAnalyzerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let output_format = env::var_opt("VANTAGE_LLM_OUTPUT_FORMAT")
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or(defaults.output_format);
        Self {
            service_url: env::var_or("VANTAGE_LLM_SERVICE_URL", &defaults.service_url),
            request_timeout_s: env::parse_or(
                "VANTAGE_LLM_REQUEST_TIMEOUT_S",
                defaults.request_timeout_s,
            ),
            default_prompt_template: env::var_or(
                "VANTAGE_LLM_DEFAULT_PROMPT_TEMPLATE",
                &defaults.default_prompt_template,
            ),
            output_format,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateStoreBackend {
    Memory,
    External,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateStoreConfig {
    pub backend: StateStoreBackend,
    pub connection_url: String,
    pub key_prefix: String,
}

impl Default for StateStoreConfig {
    fn default() -> Self {
        Self {
            backend: StateStoreBackend::Memory,
            connection_url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "vantage".to_string(),
        }
    }
}

impl StateStoreConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let backend = match env::var_or("VANTAGE_STATE_BACKEND", "memory").as_str() {
            "external" => StateStoreBackend::External,
            _ => StateStoreBackend::Memory,
        };
        Self {
            backend,
            connection_url: env::var_or(
                "VANTAGE_STATE_CONNECTION_URL",
                &defaults.connection_url,
            ),
            key_prefix: env::var_or("VANTAGE_STATE_KEY_PREFIX", &defaults.key_prefix),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultsBackend {
    Fs,
    Sql,
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsConfig {
    pub backend: ResultsBackend,
    pub crawl_data_dir: String,
    pub database_path: String,
    pub service_url: String,
    pub service_timeout_s: u64,
    pub service_max_retries: u32,
    pub service_retry_exponential_base: f64,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            backend: ResultsBackend::Fs,
            crawl_data_dir: "./crawl_data".to_string(),
            database_path: "./vantage.sqlite".to_string(),
            service_url: "http://localhost:9090".to_string(),
            service_timeout_s: 15,
            service_max_retries: 3,
            service_retry_exponential_base: 2.0,
        }
    }
}

impl ResultsConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let backend = match env::var_or("VANTAGE_RESULTS_BACKEND", "fs").as_str() {
            "sql" => ResultsBackend::Sql,
            "remote" => ResultsBackend::Remote,
            _ => ResultsBackend::Fs,
        };
        Self {
            backend,
            crawl_data_dir: env::var_or(
                "VANTAGE_RESULTS_CRAWL_DATA_DIR",
                &defaults.crawl_data_dir,
            ),
            database_path: env::var_or(
                "VANTAGE_RESULTS_DATABASE_PATH",
                &defaults.database_path,
            ),
            service_url: env::var_or("VANTAGE_RESULTS_SERVICE_URL", &defaults.service_url),
            service_timeout_s: env::parse_or(
                "VANTAGE_RESULTS_SERVICE_TIMEOUT_S",
                defaults.service_timeout_s,
            ),
            service_max_retries: env::parse_or(
                "VANTAGE_RESULTS_SERVICE_MAX_RETRIES",
                defaults.service_max_retries,
            ),
            service_retry_exponential_base: env::parse_or(
                "VANTAGE_RESULTS_SERVICE_RETRY_EXPONENTIAL_BASE",
                defaults.service_retry_exponential_base,
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedFetcherConfig {
    pub request_timeout_s: u64,
    pub rate_limit_delay_s: f64,
    pub max_retries: u32,
    pub user_agent: String,
}

impl Default for SeedFetcherConfig {
    fn default() -> Self {
        Self {
            request_timeout_s: 10,
            rate_limit_delay_s: 0.5,
            max_retries: 3,
            user_agent:
                "Mozilla/5.0 (compatible; VantageSeedFetcher/1.0; +https://example.invalid/bot)"
                    .to_string(),
        }
    }
}

impl SeedFetcherConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            request_timeout_s: env::parse_or(
                "VANTAGE_SEEDS_REQUEST_TIMEOUT_S",
                defaults.request_timeout_s,
            ),
            rate_limit_delay_s: env::parse_or(
                "VANTAGE_SEEDS_RATE_LIMIT_DELAY_S",
                defaults.rate_limit_delay_s,
            ),
            max_retries: env::parse_or("VANTAGE_SEEDS_MAX_RETRIES", defaults.max_retries),
            user_agent: env::var_or("VANTAGE_SEEDS_USER_AGENT", &defaults.user_agent),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub request_timeout_s: u64,
    pub log_format: LogFormat,
    pub log_level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            request_timeout_s: 30,
            log_format: LogFormat::Pretty,
            log_level: "info".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let log_format = match env::var_or("VANTAGE_LOG_FORMAT", "pretty").as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };
        Self {
            bind_addr: env::var_or("VANTAGE_BIND_ADDR", &defaults.bind_addr),
            request_timeout_s: env::parse_or(
                "VANTAGE_REQUEST_TIMEOUT_S",
                defaults.request_timeout_s,
            ),
            log_format,
            log_level: env::var_or("VANTAGE_LOG_LEVEL", &defaults.log_level),
        }
    }
}

/// Top-level configuration, loaded once at process start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub engine: EngineConfig,
    pub scraper: ScraperConfig,
    pub llm_analyzer: LlmAnalyzerConfig,
    pub state_store: StateStoreConfig,
    pub results: ResultsConfig,
    pub seed_fetcher: SeedFetcherConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            engine: EngineConfig::from_env(),
            scraper: ScraperConfig::from_env(),
            llm_analyzer: LlmAnalyzerConfig::from_env(),
            state_store: StateStoreConfig::from_env(),
            results: ResultsConfig::from_env(),
            seed_fetcher: SeedFetcherConfig::from_env(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            engine: EngineConfig::default(),
            scraper: ScraperConfig::default(),
            llm_analyzer: LlmAnalyzerConfig::default(),
            state_store: StateStoreConfig::default(),
            results: ResultsConfig::default(),
            seed_fetcher: SeedFetcherConfig::default(),
        }
    }
}
