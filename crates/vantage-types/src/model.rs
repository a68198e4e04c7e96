use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single literal keyword contributing to a keyword/regex analyzer's raw score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedKeyword {
    pub keyword: String,
    pub weight: f64,
}

/// A precompiled-once regex contributing to a keyword/regex analyzer's raw score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedRegex {
    pub pattern: String,
    pub weight: f64,
    /// Bitmask of regex flags; bit 0 = case-insensitive, bit 1 = multi-line.
    #[serde(default)]
    pub flags: u32,
}

pub const REGEX_FLAG_CASE_INSENSITIVE: u32 = 0b01;
pub const REGEX_FLAG_MULTI_LINE: u32 = 0b10;

/// Either a caller-supplied prompt or a topic list the analyzer turns into a
/// default prompt template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoringInput {
    Prompt { prompt: String },
    TopicList { topics: Vec<String> },
}

/// Tagged-union analyzer configuration. The `name` field is both the
/// discriminator key used elsewhere (composite score map, introspection) and
/// a caller-chosen label, so two analyzers of different kinds in the same
/// spec must still carry distinct names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "analyzer_type", rename_all = "snake_case")]
pub enum AnalyzerSpec {
    Keyword {
        name: String,
        composite_weight: f64,
        #[serde(default)]
        keywords: Vec<WeightedKeyword>,
        #[serde(default)]
        regexes: Vec<WeightedRegex>,
    },
    Llm {
        name: String,
        composite_weight: f64,
        scoring_input: ScoringInput,
    },
}

impl AnalyzerSpec {
    pub fn name(&self) -> &str {
        match self {
            AnalyzerSpec::Keyword { name, .. } => name,
            AnalyzerSpec::Llm { name, .. } => name,
        }
    }

    pub fn composite_weight(&self) -> f64 {
        match self {
            AnalyzerSpec::Keyword {
                composite_weight, ..
            } => *composite_weight,
            AnalyzerSpec::Llm {
                composite_weight, ..
            } => *composite_weight,
        }
    }
}

/// Opaque pair naming the persistence bucket a crawl's records live in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrawlResultsId {
    pub collection_id: String,
    pub data_id: String,
}

impl CrawlResultsId {
    pub fn generate() -> Self {
        Self {
            collection_id: format!("collection_{}", Uuid::new_v4()),
            data_id: format!("data_{}", Uuid::new_v4()),
        }
    }
}

/// Client-submitted description of a crawl to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSpec {
    pub name: String,
    pub seeds: Vec<String>,
    #[serde(default)]
    pub analyzer_specs: Vec<AnalyzerSpec>,
    pub worker_count: u32,
    #[serde(default)]
    pub domain_blacklist: Vec<String>,
    #[serde(default)]
    pub results_id: Option<CrawlResultsId>,
}

impl CrawlSpec {
    /// `crawl_id = MD5_hex(name)`: two specs with the same name always map to
    /// the same identifier.
    pub fn crawl_id(&self) -> String {
        md5_hex(&self.name)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".into());
        }
        if self.seeds.is_empty() {
            return Err("seeds must not be empty".into());
        }
        if self.worker_count < 1 {
            return Err("worker_count must be >= 1".into());
        }
        for spec in &self.analyzer_specs {
            if let AnalyzerSpec::Keyword {
                keywords, regexes, ..
            } = spec
            {
                if keywords.is_empty() && regexes.is_empty() {
                    return Err(format!(
                        "keyword analyzer '{}' needs at least one keyword or regex",
                        spec.name()
                    ));
                }
            }
        }
        Ok(())
    }
}

pub fn md5_hex(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// A fetched-and-scored page, keyed by URL identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlRecord {
    pub url: String,
    pub page_source: String,
    pub extracted_content: String,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub scores: HashMap<String, f64>,
    #[serde(default)]
    pub composite_score: f64,
    pub timestamp: DateTime<Utc>,
}

impl CrawlRecord {
    pub fn record_id(&self) -> String {
        md5_hex(&self.url)
    }
}

/// A crawl's current lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStateKind {
    Created,
    Running,
    Stopped,
}

/// One entry in a crawl's append-only state history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub state: RunStateKind,
    pub timestamp: DateTime<Utc>,
}

impl RunState {
    pub fn now(state: RunStateKind) -> Self {
        Self {
            state,
            timestamp: Utc::now(),
        }
    }
}

/// One frontier entry. Ordering is descending by score so this type can back
/// a `BinaryHeap` directly (the heap's natural max-first order matches the
/// store's "largest score first" contract).
#[derive(Debug, Clone, PartialEq)]
pub struct FrontierEntry {
    pub url: String,
    pub score: f64,
    /// Monotonically increasing insertion sequence, used only to break ties
    /// deterministically (older entries win on equal score).
    pub sequence: u64,
}

impl Eq for FrontierEntry {}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Aggregated lifecycle view returned by status endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlStatus {
    pub crawl_id: String,
    pub crawl_name: String,
    pub current_state: RunStateKind,
    pub state_history: Vec<RunState>,
    pub crawled_count: u64,
    pub processed_count: u64,
    pub error_count: u64,
    pub frontier_size: usize,
}

/// Lightweight listing view (spec + identity, no counters).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlInfo {
    pub crawl_id: String,
    pub crawl_name: String,
    pub results_id: CrawlResultsId,
    pub current_state: RunStateKind,
}

/// One field of an analyzer kind's configurable shape, for client-side spec
/// construction without consulting source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerFieldInfo {
    pub field: String,
    pub field_type: String,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerInfo {
    pub kind: String,
    pub fields: Vec<AnalyzerFieldInfo>,
}

/// Snapshot of the four counters tracked per crawl.
#[derive(Debug, Clone, Copy, Default)]
pub struct Counters {
    pub crawled: u64,
    pub processed: u64,
    pub errors: u64,
    pub frontier_size: usize,
}

/// Search engines the default seed fetcher knows how to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    Google,
    Bing,
    DuckDuckGo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchEngineSeed {
    pub search_engine: SearchEngine,
    pub query: String,
    pub result_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crawl_id_is_stable_md5_of_name() {
        let a = CrawlSpec {
            name: "t".into(),
            seeds: vec!["https://e/".into()],
            analyzer_specs: vec![],
            worker_count: 1,
            domain_blacklist: vec![],
            results_id: None,
        };
        let b = a.clone();
        assert_eq!(a.crawl_id(), b.crawl_id());
        assert_eq!(a.crawl_id(), md5_hex("t"));
    }

    #[test]
    fn frontier_entry_orders_by_score_descending() {
        let mut heap = std::collections::BinaryHeap::new();
        heap.push(FrontierEntry {
            url: "a".into(),
            score: 0.1,
            sequence: 0,
        });
        heap.push(FrontierEntry {
            url: "b".into(),
            score: 0.9,
            sequence: 1,
        });
        heap.push(FrontierEntry {
            url: "c".into(),
            score: 0.5,
            sequence: 2,
        });
        assert_eq!(heap.pop().unwrap().url, "b");
        assert_eq!(heap.pop().unwrap().url, "c");
        assert_eq!(heap.pop().unwrap().url, "a");
    }

    #[test]
    fn validate_rejects_empty_seeds() {
        let spec = CrawlSpec {
            name: "t".into(),
            seeds: vec![],
            analyzer_specs: vec![],
            worker_count: 1,
            domain_blacklist: vec![],
            results_id: None,
        };
        assert!(spec.validate().is_err());
    }
}
