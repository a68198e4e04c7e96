use std::collections::{HashMap, HashSet};

use vantage_scoring::ScoreAnalyzer;
use vantage_types::{CrawlResultsId, CrawlSpec};

use crate::{ShutdownNotify, WorkerTasks};

/// Read-only (after construction) shared state for one crawl: its spec,
/// results bucket, and instantiated analyzers. Workers hold a clone of this
/// `Arc` plus a handle to the state store; they never reach back into the
/// engine's registry.
pub struct CrawlHandle {
    pub crawl_id: String,
    pub spec: CrawlSpec,
    pub results_id: CrawlResultsId,
    pub analyzers: Vec<std::sync::Arc<dyn ScoreAnalyzer>>,
    pub analyzer_weights: HashMap<String, f64>,
    pub domain_blacklist: HashSet<String>,
    pub(crate) shutdown_notify: ShutdownNotify,
    pub(crate) worker_tasks: WorkerTasks,
}

impl CrawlHandle {
    pub fn new(
        crawl_id: String,
        spec: CrawlSpec,
        results_id: CrawlResultsId,
        analyzers: Vec<std::sync::Arc<dyn ScoreAnalyzer>>,
        analyzer_weights: HashMap<String, f64>,
    ) -> Self {
        let domain_blacklist = spec.domain_blacklist.iter().cloned().collect();
        Self {
            crawl_id,
            spec,
            results_id,
            analyzers,
            analyzer_weights,
            domain_blacklist,
            shutdown_notify: ShutdownNotify::default(),
            worker_tasks: WorkerTasks::default(),
        }
    }

    /// True if `url`'s host matches (or is a subdomain of) any blacklisted
    /// domain.
    pub fn is_blacklisted(&self, url: &str) -> bool {
        let Ok(parsed) = url::Url::parse(url) else {
            return true;
        };
        let Some(host) = parsed.host_str() else {
            return true;
        };
        self.domain_blacklist
            .iter()
            .any(|domain| host == domain || host.ends_with(&format!(".{domain}")))
    }

    pub fn is_allowed_scheme(&self, url: &str) -> bool {
        url::Url::parse(url)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false)
    }
}
