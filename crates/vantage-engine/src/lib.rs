//! Owns every crawl, routes lifecycle operations, and dispatches worker
//! loops against a bounded, shared execution pool.

mod handle;
mod worker;

pub use handle::CrawlHandle;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, Notify, Semaphore};
use tracing::Instrument;
use vantage_config::{EngineConfig, LlmAnalyzerConfig};
use vantage_results::ResultsManager;
use vantage_scoring::build_analyzer;
use vantage_scrape::Scraper;
use vantage_state::StateStore;
use vantage_types::{
    CrawlInfo, CrawlResultsId, CrawlSpec, CrawlStatus, RunState, RunStateKind, VantageError,
    VantageResult,
};

/// Owns every `CrawlHandle` by `crawl_id`, plus the one execution pool shared
/// across all crawls. Never holds the registry lock across a network call:
/// lookups clone an `Arc<CrawlHandle>` and release immediately.
pub struct Engine {
    state_store: Arc<dyn StateStore>,
    results_manager: Arc<dyn ResultsManager>,
    scraper: Arc<dyn Scraper>,
    registry: DashMap<String, Arc<CrawlHandle>>,
    pool: Arc<Semaphore>,
    config: EngineConfig,
    llm_config: LlmAnalyzerConfig,
}

impl Engine {
    pub fn new(
        state_store: Arc<dyn StateStore>,
        results_manager: Arc<dyn ResultsManager>,
        scraper: Arc<dyn Scraper>,
        config: EngineConfig,
        llm_config: LlmAnalyzerConfig,
    ) -> Arc<Self> {
        let pool = Arc::new(Semaphore::new(config.max_workers));
        Arc::new(Self {
            state_store,
            results_manager,
            scraper,
            registry: DashMap::new(),
            pool,
            config,
            llm_config,
        })
    }

    fn get(&self, crawl_id: &str) -> VantageResult<Arc<CrawlHandle>> {
        self.registry
            .get(crawl_id)
            .map(|e| e.value().clone())
            .ok_or_else(|| VantageError::NotFound(crawl_id.to_string()))
    }

    /// Validates the spec, instantiates its analyzers, seeds the frontier at
    /// score 0, and creates the results bucket. Two specs with the same name
    /// always map to the same `crawl_id`; creating twice fails with
    /// `AlreadyExists`.
    pub async fn create(&self, spec: CrawlSpec) -> VantageResult<String> {
        spec.validate().map_err(VantageError::InvalidSpec)?;
        let crawl_id = spec.crawl_id();

        if self.registry.contains_key(&crawl_id) {
            return Err(VantageError::AlreadyExists(crawl_id));
        }

        let mut analyzers = Vec::with_capacity(spec.analyzer_specs.len());
        let mut analyzer_weights = HashMap::with_capacity(spec.analyzer_specs.len());
        for analyzer_spec in &spec.analyzer_specs {
            let analyzer = build_analyzer(analyzer_spec, &self.llm_config)?;
            analyzer_weights.insert(analyzer_spec.name().to_string(), analyzer_spec.composite_weight());
            analyzers.push(analyzer);
        }

        let results_id = spec.results_id.clone().unwrap_or_else(CrawlResultsId::generate);

        self.state_store.create(&crawl_id).await?;
        self.state_store
            .add_state(&crawl_id, RunState::now(RunStateKind::Created))
            .await?;
        self.state_store
            .add_urls(
                &crawl_id,
                spec.seeds
                    .iter()
                    .map(|url| vantage_state::ScoredUrl {
                        score: 0.0,
                        url: url.clone(),
                    })
                    .collect(),
            )
            .await?;
        self.results_manager.create_crawl(&spec, &results_id).await?;

        let handle = Arc::new(CrawlHandle::new(crawl_id.clone(), spec, results_id, analyzers, analyzer_weights));
        self.registry.insert(crawl_id.clone(), handle);
        Ok(crawl_id)
    }

    /// Spawns `min(spec.worker_count, max_workers)` worker tasks against the
    /// shared pool. Each task loops until the crawl stops.
    pub async fn start(&self, crawl_id: &str) -> VantageResult<RunStateKind> {
        let handle = self.get(crawl_id)?;
        match self.state_store.current_state(crawl_id).await? {
            RunStateKind::Running => return Err(VantageError::AlreadyRunning),
            RunStateKind::Created | RunStateKind::Stopped => {}
        }

        self.state_store
            .add_state(crawl_id, RunState::now(RunStateKind::Running))
            .await?;

        let worker_count = handle.spec.worker_count.min(self.config.max_workers as u32).max(1);
        let mut tasks = handle.worker_tasks.lock().await;
        for worker_index in 0..worker_count {
            let span = tracing::info_span!("crawl_worker", crawl_id = %crawl_id, worker_index);
            let task = tokio::spawn(
                worker::run_worker(
                    handle.clone(),
                    self.state_store.clone(),
                    self.scraper.clone(),
                    self.results_manager.clone(),
                    self.pool.clone(),
                    std::time::Duration::from_millis(self.config.idle_poll_ms),
                )
                .instrument(span),
            );
            tasks.push(task);
        }

        Ok(RunStateKind::Running)
    }

    /// Flips the crawl's state so running workers exit at their next
    /// iteration boundary; does not wait for in-flight network calls.
    pub async fn stop(&self, crawl_id: &str) -> VantageResult<RunStateKind> {
        let handle = self.get(crawl_id)?;
        if self.state_store.current_state(crawl_id).await? != RunStateKind::Running {
            return Err(VantageError::NotRunning);
        }
        self.state_store
            .add_state(crawl_id, RunState::now(RunStateKind::Stopped))
            .await?;
        handle.shutdown_notify.notify_waiters();
        Ok(RunStateKind::Stopped)
    }

    /// Removes the `CrawlState` and the results bucket. Refuses a running
    /// crawl; callers stop first and allow workers to drain.
    pub async fn delete(&self, crawl_id: &str) -> VantageResult<DateTime<Utc>> {
        let handle = self.get(crawl_id)?;
        if self.state_store.current_state(crawl_id).await? == RunStateKind::Running {
            return Err(VantageError::RunningCannotDelete);
        }
        self.results_manager.delete_crawl(&handle.results_id).await?;
        self.state_store.delete(crawl_id).await?;
        self.registry.remove(crawl_id);
        Ok(Utc::now())
    }

    pub async fn status(&self, crawl_id: &str) -> VantageResult<CrawlStatus> {
        let handle = self.get(crawl_id)?;
        let current_state = self.state_store.current_state(crawl_id).await?;
        let state_history = self.state_store.state_history(crawl_id).await?;
        let counters = self.state_store.counters(crawl_id).await?;
        Ok(CrawlStatus {
            crawl_id: crawl_id.to_string(),
            crawl_name: handle.spec.name.clone(),
            current_state,
            state_history,
            crawled_count: counters.crawled,
            processed_count: counters.processed,
            error_count: counters.errors,
            frontier_size: counters.frontier_size,
        })
    }

    pub async fn info(&self, crawl_id: &str) -> VantageResult<CrawlInfo> {
        let handle = self.get(crawl_id)?;
        let current_state = self.state_store.current_state(crawl_id).await?;
        Ok(CrawlInfo {
            crawl_id: crawl_id.to_string(),
            crawl_name: handle.spec.name.clone(),
            results_id: handle.results_id.clone(),
            current_state,
        })
    }

    pub fn spec(&self, crawl_id: &str) -> VantageResult<CrawlSpec> {
        Ok(self.get(crawl_id)?.spec.clone())
    }

    pub async fn list_info(&self) -> VantageResult<Vec<CrawlInfo>> {
        let ids: Vec<String> = self.registry.iter().map(|e| e.key().clone()).collect();
        let mut infos = Vec::with_capacity(ids.len());
        for id in ids {
            infos.push(self.info(&id).await?);
        }
        Ok(infos)
    }

    pub async fn list_status(&self) -> VantageResult<Vec<CrawlStatus>> {
        let ids: Vec<String> = self.registry.iter().map(|e| e.key().clone()).collect();
        let mut statuses = Vec::with_capacity(ids.len());
        for id in ids {
            statuses.push(self.status(&id).await?);
        }
        Ok(statuses)
    }

    pub fn results_manager(&self) -> Arc<dyn ResultsManager> {
        self.results_manager.clone()
    }

    pub fn results_id_for(&self, crawl_id: &str) -> VantageResult<CrawlResultsId> {
        Ok(self.get(crawl_id)?.results_id.clone())
    }

    /// Stops every running crawl, then waits for the pool to drain up to
    /// `shutdown_grace_s`; tasks still running past the grace period are
    /// abandoned (the runtime cannot preempt them mid-await).
    pub async fn shutdown(&self) {
        let ids: Vec<String> = self.registry.iter().map(|e| e.key().clone()).collect();
        for id in &ids {
            if let Ok(RunStateKind::Running) = self.state_store.current_state(id).await {
                let _ = self.stop(id).await;
            }
        }

        let grace = std::time::Duration::from_secs(self.config.shutdown_grace_s);
        let drain = async {
            for id in &ids {
                if let Ok(handle) = self.get(id) {
                    let mut tasks = handle.worker_tasks.lock().await;
                    for task in tasks.drain(..) {
                        let _ = task.await;
                    }
                }
            }
        };

        if tokio::time::timeout(grace, drain).await.is_err() {
            tracing::warn!("shutdown grace period elapsed with workers still draining");
        }
    }
}

/// The idle-wait primitive shared between the engine (which notifies on
/// `stop`) and a worker loop (which otherwise sleeps a fixed poll interval).
pub(crate) struct ShutdownNotify(Notify);

impl Default for ShutdownNotify {
    fn default() -> Self {
        Self(Notify::new())
    }
}

impl ShutdownNotify {
    pub fn notify_waiters(&self) {
        self.0.notify_waiters();
    }

    pub async fn notified(&self) {
        self.0.notified().await;
    }
}

pub(crate) type WorkerTasks = Mutex<Vec<tokio::task::JoinHandle<()>>>;
