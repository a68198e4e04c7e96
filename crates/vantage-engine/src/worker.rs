use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use vantage_results::ResultsManager;
use vantage_scrape::Scraper;
use vantage_state::{ScoredUrl, StateStore};
use vantage_types::RunStateKind;

use crate::CrawlHandle;

/// Drains the frontier while the crawl is `Running`. Mirrors §4.5 of the
/// design exactly, including two load-bearing quirks: `inc_crawled` happens
/// at pop time regardless of the later blacklist check, and a failed
/// analyzer's weight still counts toward the composite denominator.
pub(crate) async fn run_worker(
    handle: Arc<CrawlHandle>,
    state_store: Arc<dyn StateStore>,
    scraper: Arc<dyn Scraper>,
    results_manager: Arc<dyn ResultsManager>,
    pool: Arc<Semaphore>,
    idle_poll: Duration,
) {
    let crawl_id = handle.crawl_id.clone();

    loop {
        match state_store.current_state(&crawl_id).await {
            Ok(RunStateKind::Running) => {}
            _ => return,
        }

        let next_url = match state_store.pop_next_url(&crawl_id).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(crawl_id = %crawl_id, error = %e, "state store error while popping; treating as transient");
                let _ = state_store.inc_errors(&crawl_id).await;
                wait_idle_or_stop(&handle, idle_poll).await;
                continue;
            }
        };

        let Some(url) = next_url else {
            wait_idle_or_stop(&handle, idle_poll).await;
            continue;
        };

        // §9(b): crawled is counted at pop time, independent of the allow-check below.
        let _ = state_store.inc_crawled(&crawl_id).await;

        if handle.is_blacklisted(&url) {
            tracing::debug!(crawl_id = %crawl_id, url, "skipping blacklisted url");
            continue;
        }

        let Ok(_permit) = pool.acquire().await else {
            return;
        };

        let record = match scraper.scrape(&url).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(crawl_id = %crawl_id, url, error = %e, "scrape failed");
                let _ = state_store.inc_errors(&crawl_id).await;
                continue;
            }
        };

        let mut record = record;
        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for analyzer in &handle.analyzers {
            let weight = handle
                .analyzer_weights
                .get(analyzer.name())
                .copied()
                .unwrap_or(0.0);
            let score = match analyzer.score(&record.extracted_content).await {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(
                        crawl_id = %crawl_id,
                        analyzer = analyzer.name(),
                        error = %e,
                        "analyzer failed, scoring as 0"
                    );
                    0.0
                }
            };
            record.scores.insert(analyzer.name().to_string(), score);
            numerator += score * weight;
            denominator += weight;
        }
        record.composite_score = if denominator > 0.0 {
            numerator / denominator
        } else {
            0.0
        };

        let child_urls: Vec<ScoredUrl> = record
            .links
            .iter()
            .filter(|link| handle.is_allowed_scheme(link) && !handle.is_blacklisted(link))
            .map(|link| ScoredUrl {
                score: record.composite_score,
                url: link.clone(),
            })
            .collect();
        if let Err(e) = state_store.add_urls(&crawl_id, child_urls).await {
            tracing::warn!(crawl_id = %crawl_id, error = %e, "failed to enqueue discovered links");
            let _ = state_store.inc_errors(&crawl_id).await;
        }

        if let Err(e) = results_manager
            .store_record(&record, &handle.results_id, &crawl_id)
            .await
        {
            tracing::warn!(crawl_id = %crawl_id, url, error = %e, "failed to store record");
            let _ = state_store.inc_errors(&crawl_id).await;
        }

        let _ = state_store.inc_processed(&crawl_id).await;
    }
}

/// Sleeps for `idle_poll`, waking early if the crawl is stopped in the
/// meantime, so `stop` is observed promptly rather than only after the
/// sleep elapses.
async fn wait_idle_or_stop(handle: &CrawlHandle, idle_poll: Duration) {
    tokio::select! {
        _ = tokio::time::sleep(idle_poll) => {}
        _ = handle.shutdown_notify.notified() => {}
    }
}
