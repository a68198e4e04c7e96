//! Search-engine query → merged URL list, used only to help clients build
//! seed lists; never invoked by the worker loop itself.

mod default_fetcher;
mod engines;

pub use default_fetcher::DefaultSeedFetcher;

use async_trait::async_trait;
use vantage_types::{SearchEngineSeed, VantageResult};

#[async_trait]
pub trait SeedFetcher: Send + Sync {
    /// Concurrently queries every requested engine, deduplicates the merged
    /// result across engines (preserving first occurrence), and returns the
    /// combined URL list. A persistently-failing engine contributes `[]`
    /// rather than failing the whole call.
    async fn collect(&self, seeds: &[SearchEngineSeed]) -> VantageResult<Vec<String>>;
}

/// Deduplicates `urls`, keeping the first occurrence of each.
pub(crate) fn dedupe_preserve_order(urls: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    urls.into_iter().filter(|u| seen.insert(u.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let urls = vec!["a".to_string(), "b".to_string(), "a".to_string(), "c".to_string()];
        assert_eq!(dedupe_preserve_order(urls), vec!["a", "b", "c"]);
    }
}
