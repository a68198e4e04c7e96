//! Durable and remote storage for crawl records, with a common top-N-by-score
//! query facility.

mod factory;
mod fs_backend;
mod remote_backend;
mod sql_backend;

pub use factory::build_results_manager;
pub use fs_backend::FsResultsManager;
pub use remote_backend::RemoteResultsManager;
pub use sql_backend::SqlResultsManager;

use async_trait::async_trait;
use vantage_types::{CrawlRecord, CrawlResultsId, CrawlSpec, VantageResult};

#[async_trait]
pub trait ResultsManager: Send + Sync {
    /// Idempotent-create the bucket that will hold `spec`'s records.
    async fn create_crawl(&self, spec: &CrawlSpec, results_id: &CrawlResultsId) -> VantageResult<()>;

    /// Upsert by `record.record_id()`.
    async fn store_record(
        &self,
        record: &CrawlRecord,
        results_id: &CrawlResultsId,
        crawl_id: &str,
    ) -> VantageResult<()>;

    async fn delete_crawl(&self, results_id: &CrawlResultsId) -> VantageResult<()>;

    /// Top `count` records ordered strictly descending by `score_type`
    /// (`"composite"` or an analyzer name); records missing that score sort
    /// as 0.
    async fn get_records(
        &self,
        results_id: &CrawlResultsId,
        count: usize,
        score_type: &str,
    ) -> VantageResult<Vec<CrawlRecord>>;
}

/// Extracts the score a record should be ranked by for a given `score_type`.
pub fn score_for(record: &CrawlRecord, score_type: &str) -> f64 {
    if score_type == "composite" {
        record.composite_score
    } else {
        record.scores.get(score_type).copied().unwrap_or(0.0)
    }
}

pub(crate) fn sort_and_take(
    mut records: Vec<CrawlRecord>,
    count: usize,
    score_type: &str,
) -> Vec<CrawlRecord> {
    records.sort_by(|a, b| {
        score_for(b, score_type)
            .partial_cmp(&score_for(a, score_type))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    records.truncate(count);
    records
}
