use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use vantage_config::ResultsConfig;
use vantage_types::{CrawlRecord, CrawlResultsId, CrawlSpec, VantageError, VantageResult};

use crate::ResultsManager;

/// `create_crawl`/`delete_crawl` are unsupported; `store_record` PATCHes a
/// remote workbook endpoint with exponential-backoff retry and drops the
/// record (logged) on final failure — storage here is best-effort.
/// `get_records` has no remote retrieval path and returns `[]` with a
/// warning.
pub struct RemoteResultsManager {
    client: reqwest::Client,
    service_url: String,
    max_retries: u32,
    retry_exponential_base: f64,
}

impl RemoteResultsManager {
    pub fn new(config: &ResultsConfig) -> VantageResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.service_timeout_s))
            .build()
            .map_err(|e| VantageError::InvalidInput(e.to_string()))?;
        Ok(Self {
            client,
            service_url: config.service_url.clone(),
            max_retries: config.service_max_retries,
            retry_exponential_base: config.service_retry_exponential_base,
        })
    }
}

#[async_trait]
impl ResultsManager for RemoteResultsManager {
    async fn create_crawl(
        &self,
        _spec: &CrawlSpec,
        _results_id: &CrawlResultsId,
    ) -> VantageResult<()> {
        Err(VantageError::Unsupported(
            "remote results manager does not support create_crawl".to_string(),
        ))
    }

    async fn store_record(
        &self,
        record: &CrawlRecord,
        results_id: &CrawlResultsId,
        crawl_id: &str,
    ) -> VantageResult<()> {
        let url = format!(
            "{}/workbook/{}/bin/{}",
            self.service_url, results_id.collection_id, results_id.data_id
        );
        let body = json!({
            "operation": "add_from_docs",
            "operation_info": {
                "documents": [record],
                "source": crawl_id,
            }
        });

        let mut attempt = 0;
        loop {
            let result = self.client.patch(&url).json(&body).send().await;
            match result {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    tracing::warn!(status = %response.status(), attempt, "remote store_record non-success");
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "remote store_record request failed");
                }
            }

            attempt += 1;
            if attempt > self.max_retries {
                tracing::error!(
                    url = %record.url,
                    "remote store_record exhausted retries, dropping record"
                );
                return Ok(());
            }
            let backoff = self.retry_exponential_base.powi(attempt as i32);
            tokio::time::sleep(Duration::from_secs_f64(backoff)).await;
        }
    }

    async fn delete_crawl(&self, _results_id: &CrawlResultsId) -> VantageResult<()> {
        Err(VantageError::Unsupported(
            "remote results manager does not support delete_crawl".to_string(),
        ))
    }

    async fn get_records(
        &self,
        results_id: &CrawlResultsId,
        _count: usize,
        _score_type: &str,
    ) -> VantageResult<Vec<CrawlRecord>> {
        tracing::warn!(
            collection_id = %results_id.collection_id,
            data_id = %results_id.data_id,
            "remote results manager has no retrieval path; returning no records"
        );
        Ok(Vec::new())
    }
}
