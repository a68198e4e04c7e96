//! Exercises the engine end to end against in-memory/filesystem backends
//! and a test-double `Scraper`, covering the concrete scenarios the design
//! calls out: happy path, blacklist skip, duplicate-seed dedup, lifecycle
//! error sequencing, and analyzer-failure recovery.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use vantage_config::{EngineConfig, LlmAnalyzerConfig};
use vantage_engine::Engine;
use vantage_results::{build_results_manager, ResultsManager};
use vantage_scrape::Scraper;
use vantage_state::build_state_store;
use vantage_types::{
    AnalyzerSpec, CrawlRecord, CrawlSpec, ScoringInput, VantageResult, WeightedKeyword,
};
use vantage_config::{ResultsBackend, ResultsConfig, StateStoreBackend, StateStoreConfig};

/// A scraper whose pages and outbound links are fixed ahead of time; any
/// url not in `pages` returns an empty page with no links.
struct FixtureScraper {
    pages: HashMap<String, (&'static str, Vec<String>)>,
}

impl FixtureScraper {
    fn new(pages: HashMap<String, (&'static str, Vec<String>)>) -> Self {
        Self { pages }
    }
}

#[async_trait]
impl Scraper for FixtureScraper {
    async fn scrape(&self, url: &str) -> VantageResult<CrawlRecord> {
        let (content, links) = self
            .pages
            .get(url)
            .cloned()
            .unwrap_or(("", Vec::new()));
        Ok(CrawlRecord {
            url: url.to_string(),
            page_source: content.to_string(),
            extracted_content: content.to_string(),
            links,
            scores: HashMap::new(),
            composite_score: 0.0,
            timestamp: chrono::Utc::now(),
        })
    }
}

async fn build_engine(scraper: Arc<dyn Scraper>) -> (Arc<Engine>, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let state_store = build_state_store(&StateStoreConfig {
        backend: StateStoreBackend::Memory,
        ..StateStoreConfig::default()
    })
    .await
    .unwrap();
    let results_manager = build_results_manager(&ResultsConfig {
        backend: ResultsBackend::Fs,
        crawl_data_dir: tmp.path().to_string_lossy().to_string(),
        ..ResultsConfig::default()
    })
    .await
    .unwrap();
    let engine = Engine::new(
        state_store,
        results_manager,
        scraper,
        EngineConfig {
            max_workers: 4,
            idle_poll_ms: 20,
            shutdown_grace_s: 5,
        },
        LlmAnalyzerConfig::default(),
    );
    (engine, tmp)
}

fn keyword_spec(name: &str, seeds: Vec<String>, worker_count: u32) -> CrawlSpec {
    CrawlSpec {
        name: name.to_string(),
        seeds,
        analyzer_specs: vec![AnalyzerSpec::Keyword {
            name: "kw".to_string(),
            composite_weight: 1.0,
            keywords: vec![WeightedKeyword {
                keyword: "rust".to_string(),
                weight: 1.0,
            }],
            regexes: vec![],
        }],
        worker_count,
        domain_blacklist: vec![],
        results_id: None,
    }
}

async fn run_to_quiescence(engine: &Arc<Engine>, crawl_id: &str, target_processed: u64) {
    for _ in 0..200 {
        let status = engine.status(crawl_id).await.unwrap();
        if status.processed_count >= target_processed {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("crawl did not reach {target_processed} processed records in time");
}

#[tokio::test]
async fn happy_path_scores_and_stores_records() {
    let mut pages = HashMap::new();
    pages.insert(
        "https://a.example/".to_string(),
        ("go go rust", vec!["https://a.example/child".to_string()]),
    );
    pages.insert(
        "https://a.example/child".to_string(),
        ("nothing interesting", vec![]),
    );
    let scraper = Arc::new(FixtureScraper::new(pages));
    let (engine, _tmp) = build_engine(scraper).await;

    let spec = keyword_spec("happy", vec!["https://a.example/".to_string()], 1);
    let crawl_id = engine.create(spec).await.unwrap();
    engine.start(&crawl_id).await.unwrap();

    run_to_quiescence(&engine, &crawl_id, 2).await;
    engine.stop(&crawl_id).await.unwrap();

    let results_id = engine.results_id_for(&crawl_id).unwrap();
    let records = engine
        .results_manager()
        .get_records(&results_id, 10, "composite")
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    let top = &records[0];
    assert_eq!(top.url, "https://a.example/");
    assert!(top.composite_score > records[1].composite_score);
}

#[tokio::test]
async fn blacklisted_domain_is_skipped_without_counting_an_error() {
    let mut pages = HashMap::new();
    pages.insert(
        "https://a.example/".to_string(),
        (
            "go go rust",
            vec!["https://blocked.example/evil".to_string()],
        ),
    );
    let scraper = Arc::new(FixtureScraper::new(pages));
    let (engine, _tmp) = build_engine(scraper).await;

    let mut spec = keyword_spec("blacklist", vec!["https://a.example/".to_string()], 1);
    spec.domain_blacklist = vec!["blocked.example".to_string()];
    let crawl_id = engine.create(spec).await.unwrap();
    engine.start(&crawl_id).await.unwrap();

    run_to_quiescence(&engine, &crawl_id, 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    engine.stop(&crawl_id).await.unwrap();

    let status = engine.status(&crawl_id).await.unwrap();
    assert_eq!(status.processed_count, 1);
    assert_eq!(status.error_count, 0);
}

#[tokio::test]
async fn lifecycle_rejects_invalid_transitions() {
    let scraper = Arc::new(FixtureScraper::new(HashMap::new()));
    let (engine, _tmp) = build_engine(scraper).await;

    let spec = keyword_spec("lifecycle", vec!["https://a.example/".to_string()], 1);
    let crawl_id = engine.create(spec.clone()).await.unwrap();

    assert!(engine.create(spec).await.is_err());
    assert!(engine.stop(&crawl_id).await.is_err());

    engine.start(&crawl_id).await.unwrap();
    assert!(engine.start(&crawl_id).await.is_err());
    assert!(engine.delete(&crawl_id).await.is_err());

    engine.stop(&crawl_id).await.unwrap();
    engine.delete(&crawl_id).await.unwrap();
    assert!(engine.status(&crawl_id).await.is_err());
}

/// P1 (uniqueness): even when the same URL is popped and scraped more than
/// once (here via two identical seeds, since the frontier only dedupes
/// against the visited set, not against itself), at most one record is ever
/// stored for it — `store_record` upserts by `record_id`.
#[tokio::test]
async fn duplicate_seed_urls_store_at_most_one_record() {
    let mut pages = HashMap::new();
    pages.insert("https://a.example/".to_string(), ("go go rust", vec![]));
    let scraper = Arc::new(FixtureScraper::new(pages));
    let (engine, _tmp) = build_engine(scraper).await;

    let spec = keyword_spec(
        "dedup",
        vec![
            "https://a.example/".to_string(),
            "https://a.example/".to_string(),
        ],
        1,
    );
    let crawl_id = engine.create(spec).await.unwrap();
    engine.start(&crawl_id).await.unwrap();
    run_to_quiescence(&engine, &crawl_id, 2).await;
    engine.stop(&crawl_id).await.unwrap();

    let results_id = engine.results_id_for(&crawl_id).unwrap();
    let records = engine
        .results_manager()
        .get_records(&results_id, 10, "composite")
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, "https://a.example/");
}

#[tokio::test]
async fn failed_analyzer_degrades_score_but_does_not_abort_worker() {
    // The LLM analyzer is configured against its default, unreachable
    // service URL, so the analyzer call fails and the worker must recover
    // per §9(a): the failed weight still counts toward the denominator,
    // leaving the record at composite_score == 0 rather than erroring out.
    let mut pages = HashMap::new();
    pages.insert("https://a.example/".to_string(), ("content", vec![]));
    let scraper = Arc::new(FixtureScraper::new(pages));
    let (engine, _tmp) = build_engine(scraper).await;

    let spec = CrawlSpec {
        name: "llm-failure".to_string(),
        seeds: vec!["https://a.example/".to_string()],
        analyzer_specs: vec![AnalyzerSpec::Llm {
            name: "llm".to_string(),
            composite_weight: 1.0,
            scoring_input: ScoringInput::TopicList {
                topics: vec!["rust".to_string()],
            },
        }],
        worker_count: 1,
        domain_blacklist: vec![],
        results_id: None,
    };
    let crawl_id = engine.create(spec).await.unwrap();
    engine.start(&crawl_id).await.unwrap();
    run_to_quiescence(&engine, &crawl_id, 1).await;
    engine.stop(&crawl_id).await.unwrap();

    let results_id = engine.results_id_for(&crawl_id).unwrap();
    let records = engine
        .results_manager()
        .get_records(&results_id, 10, "composite")
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].composite_score, 0.0);
}
