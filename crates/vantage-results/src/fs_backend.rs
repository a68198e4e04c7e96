use std::path::PathBuf;

use async_trait::async_trait;
use vantage_types::{CrawlRecord, CrawlResultsId, CrawlSpec, VantageError, VantageResult};

use crate::{sort_and_take, ResultsManager};

/// `<base>/<collection_id>/<data_id>/{crawl_spec.json, results_id.json, records/<record_id>.json}`.
/// Each record is a single self-contained JSON document; `get_records`
/// streams all record files and sorts in memory.
pub struct FsResultsManager {
    base_dir: PathBuf,
}

impl FsResultsManager {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn bucket_dir(&self, results_id: &CrawlResultsId) -> PathBuf {
        self.base_dir
            .join(&results_id.collection_id)
            .join(&results_id.data_id)
    }

    fn records_dir(&self, results_id: &CrawlResultsId) -> PathBuf {
        self.bucket_dir(results_id).join("records")
    }
}

fn io_err(e: std::io::Error) -> VantageError {
    VantageError::StorageError(e.to_string())
}
fn json_err(e: serde_json::Error) -> VantageError {
    VantageError::StorageError(e.to_string())
}

#[async_trait]
impl ResultsManager for FsResultsManager {
    async fn create_crawl(
        &self,
        spec: &CrawlSpec,
        results_id: &CrawlResultsId,
    ) -> VantageResult<()> {
        let bucket = self.bucket_dir(results_id);
        tokio::fs::create_dir_all(bucket.join("records"))
            .await
            .map_err(io_err)?;
        let spec_json = serde_json::to_vec_pretty(spec).map_err(json_err)?;
        tokio::fs::write(bucket.join("crawl_spec.json"), spec_json)
            .await
            .map_err(io_err)?;
        let results_id_json = serde_json::to_vec_pretty(results_id).map_err(json_err)?;
        tokio::fs::write(bucket.join("results_id.json"), results_id_json)
            .await
            .map_err(io_err)?;
        Ok(())
    }

    async fn store_record(
        &self,
        record: &CrawlRecord,
        results_id: &CrawlResultsId,
        _crawl_id: &str,
    ) -> VantageResult<()> {
        let path = self
            .records_dir(results_id)
            .join(format!("{}.json", record.record_id()));
        let body = serde_json::to_vec_pretty(record).map_err(json_err)?;
        tokio::fs::write(path, body).await.map_err(io_err)
    }

    async fn delete_crawl(&self, results_id: &CrawlResultsId) -> VantageResult<()> {
        let bucket = self.bucket_dir(results_id);
        match tokio::fs::remove_dir_all(&bucket).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(?bucket, "delete_crawl called on unknown bucket");
                Ok(())
            }
            Err(e) => Err(io_err(e)),
        }
    }

    async fn get_records(
        &self,
        results_id: &CrawlResultsId,
        count: usize,
        score_type: &str,
    ) -> VantageResult<Vec<CrawlRecord>> {
        let dir = self.records_dir(results_id);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VantageError::NotFound(format!(
                    "{}/{}",
                    results_id.collection_id, results_id.data_id
                )))
            }
            Err(e) => return Err(io_err(e)),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let body = tokio::fs::read(&path).await.map_err(io_err)?;
            let record: CrawlRecord = serde_json::from_slice(&body).map_err(json_err)?;
            records.push(record);
        }

        Ok(sort_and_take(records, count, score_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vantage_types::AnalyzerSpec;

    fn sample_record(url: &str, composite: f64) -> CrawlRecord {
        CrawlRecord {
            url: url.to_string(),
            page_source: "<html></html>".to_string(),
            extracted_content: "hello".to_string(),
            links: vec![],
            scores: [("K".to_string(), composite)].into_iter().collect(),
            composite_score: composite,
            timestamp: Utc::now(),
        }
    }

    fn sample_spec() -> CrawlSpec {
        CrawlSpec {
            name: "t".into(),
            seeds: vec!["https://e/".into()],
            analyzer_specs: vec![AnalyzerSpec::Keyword {
                name: "K".into(),
                composite_weight: 1.0,
                keywords: vec![],
                regexes: vec![],
            }],
            worker_count: 1,
            domain_blacklist: vec![],
            results_id: None,
        }
    }

    #[tokio::test]
    async fn round_trips_a_record() {
        let dir = tempfile::tempdir().unwrap();
        let manager = FsResultsManager::new(dir.path());
        let results_id = CrawlResultsId::generate();
        manager.create_crawl(&sample_spec(), &results_id).await.unwrap();

        let record = sample_record("https://e/", 0.5);
        manager
            .store_record(&record, &results_id, "crawl1")
            .await
            .unwrap();

        let fetched = manager.get_records(&results_id, 10, "composite").await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].url, record.url);
        assert_eq!(fetched[0].extracted_content, record.extracted_content);
        assert_eq!(fetched[0].composite_score, record.composite_score);
    }

    #[tokio::test]
    async fn get_records_orders_descending_and_limits() {
        let dir = tempfile::tempdir().unwrap();
        let manager = FsResultsManager::new(dir.path());
        let results_id = CrawlResultsId::generate();
        manager.create_crawl(&sample_spec(), &results_id).await.unwrap();

        for (url, score) in [("a", 0.1), ("b", 0.9), ("c", 0.5)] {
            manager
                .store_record(&sample_record(url, score), &results_id, "crawl1")
                .await
                .unwrap();
        }

        let top = manager.get_records(&results_id, 2, "composite").await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].url, "b");
        assert_eq!(top[1].url, "c");
    }

    #[tokio::test]
    async fn delete_crawl_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let manager = FsResultsManager::new(dir.path());
        let results_id = CrawlResultsId::generate();
        manager.delete_crawl(&results_id).await.unwrap();
        manager.delete_crawl(&results_id).await.unwrap();
    }
}
