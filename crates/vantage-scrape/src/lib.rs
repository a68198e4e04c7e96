//! URL → `CrawlRecord` contract, plus a default static-HTML implementation.

mod default_scraper;

pub use default_scraper::DefaultScraper;

use async_trait::async_trait;
use vantage_types::{CrawlRecord, VantageResult};

#[async_trait]
pub trait Scraper: Send + Sync {
    /// Fetches `url` and returns a record with `scores` empty and
    /// `composite_score` at 0 — scoring happens downstream in the worker
    /// loop. Timeouts and unrecoverable fetch errors surface as
    /// `VantageError::ScrapeError`.
    async fn scrape(&self, url: &str) -> VantageResult<CrawlRecord>;
}
