//! Per-crawl state store: ordered frontier, visited set, counters, and
//! append-only run-state history, behind one interface with pluggable
//! in-memory and Redis-backed implementations.

mod factory;
mod memory;
mod redis_store;

pub use factory::build_state_store;
pub use memory::MemoryStateStore;
pub use redis_store::RedisStateStore;

use async_trait::async_trait;
use vantage_types::{Counters, RunState, RunStateKind, VantageResult};

/// A single `(score, url)` pair to enqueue. Mirrors [`vantage_types::FrontierEntry`]
/// but without the internal sequence field, since callers never need it.
#[derive(Debug, Clone)]
pub struct ScoredUrl {
    pub score: f64,
    pub url: String,
}

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Registers a new crawl. Fails with `AlreadyExists` if `crawl_id` is
    /// already present.
    async fn create(&self, crawl_id: &str) -> VantageResult<()>;

    /// Removes a crawl and all of its state. Idempotent: absent ids just log
    /// a warning rather than erroring.
    async fn delete(&self, crawl_id: &str) -> VantageResult<()>;

    /// Appends a run state to the crawl's history.
    async fn add_state(&self, crawl_id: &str, state: RunState) -> VantageResult<()>;

    /// The crawl's current state, `Created` if no history exists yet.
    async fn current_state(&self, crawl_id: &str) -> VantageResult<RunStateKind>;

    /// The crawl's full, time-ordered state history.
    async fn state_history(&self, crawl_id: &str) -> VantageResult<Vec<RunState>>;

    /// Enqueues URLs, skipping any already present in the visited set.
    async fn add_urls(&self, crawl_id: &str, urls: Vec<ScoredUrl>) -> VantageResult<()>;

    /// Atomically pops the highest-scoring frontier entry and marks it
    /// visited, or returns `None` if the frontier is empty.
    async fn pop_next_url(&self, crawl_id: &str) -> VantageResult<Option<String>>;

    async fn is_visited(&self, crawl_id: &str, url: &str) -> VantageResult<bool>;

    async fn inc_crawled(&self, crawl_id: &str) -> VantageResult<()>;
    async fn inc_processed(&self, crawl_id: &str) -> VantageResult<()>;
    async fn inc_errors(&self, crawl_id: &str) -> VantageResult<()>;

    /// Consistent snapshot of crawled/processed/errors/frontier_size.
    async fn counters(&self, crawl_id: &str) -> VantageResult<Counters>;
}
