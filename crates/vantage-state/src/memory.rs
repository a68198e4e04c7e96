use std::collections::{BinaryHeap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use vantage_types::{Counters, FrontierEntry, RunState, RunStateKind, VantageError, VantageResult};

use crate::{ScoredUrl, StateStore};

/// All mutable state for one crawl, guarded by a single coarse mutex so every
/// multi-field operation (`add_urls`, `pop_next_url`, `counters`) is atomic
/// without needing per-field locks.
struct CrawlData {
    frontier: BinaryHeap<FrontierEntry>,
    frontier_urls: HashSet<String>,
    visited: HashSet<String>,
    history: Vec<RunState>,
    crawled: u64,
    processed: u64,
    errors: u64,
    next_sequence: u64,
}

impl CrawlData {
    fn new() -> Self {
        Self {
            frontier: BinaryHeap::new(),
            frontier_urls: HashSet::new(),
            visited: HashSet::new(),
            history: Vec::new(),
            crawled: 0,
            processed: 0,
            errors: 0,
            next_sequence: 0,
        }
    }

    fn current_state(&self) -> RunStateKind {
        self.history
            .last()
            .map(|s| s.state)
            .unwrap_or(RunStateKind::Created)
    }
}

/// In-memory state store: a score-ordered `BinaryHeap` plus a `HashSet` per
/// crawl, each guarded by its own `tokio::sync::Mutex` so crawls never
/// contend with one another.
pub struct MemoryStateStore {
    crawls: DashMap<String, Arc<Mutex<CrawlData>>>,
    total_crawls_created: AtomicU64,
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self {
            crawls: DashMap::new(),
            total_crawls_created: AtomicU64::new(0),
        }
    }

    fn get(&self, crawl_id: &str) -> VantageResult<Arc<Mutex<CrawlData>>> {
        self.crawls
            .get(crawl_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| VantageError::NotFound(crawl_id.to_string()))
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn create(&self, crawl_id: &str) -> VantageResult<()> {
        if self.crawls.contains_key(crawl_id) {
            return Err(VantageError::AlreadyExists(crawl_id.to_string()));
        }
        self.crawls
            .insert(crawl_id.to_string(), Arc::new(Mutex::new(CrawlData::new())));
        self.total_crawls_created.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn delete(&self, crawl_id: &str) -> VantageResult<()> {
        if self.crawls.remove(crawl_id).is_none() {
            tracing::warn!(crawl_id, "delete called on unknown crawl");
        }
        Ok(())
    }

    async fn add_state(&self, crawl_id: &str, state: RunState) -> VantageResult<()> {
        let data = self.get(crawl_id)?;
        data.lock().await.history.push(state);
        Ok(())
    }

    async fn current_state(&self, crawl_id: &str) -> VantageResult<RunStateKind> {
        let data = self.get(crawl_id)?;
        let result = data.lock().await.current_state();
        Ok(result)
    }

    async fn state_history(&self, crawl_id: &str) -> VantageResult<Vec<RunState>> {
        let data = self.get(crawl_id)?;
        let result = data.lock().await.history.clone();
        Ok(result)
    }

    async fn add_urls(&self, crawl_id: &str, urls: Vec<ScoredUrl>) -> VantageResult<()> {
        let data = self.get(crawl_id)?;
        let mut guard = data.lock().await;
        for scored in urls {
            if guard.visited.contains(&scored.url) || guard.frontier_urls.contains(&scored.url) {
                continue;
            }
            let sequence = guard.next_sequence;
            guard.next_sequence += 1;
            guard.frontier_urls.insert(scored.url.clone());
            guard.frontier.push(FrontierEntry {
                url: scored.url,
                score: scored.score,
                sequence,
            });
        }
        Ok(())
    }

    async fn pop_next_url(&self, crawl_id: &str) -> VantageResult<Option<String>> {
        let data = self.get(crawl_id)?;
        let mut guard = data.lock().await;
        match guard.frontier.pop() {
            Some(entry) => {
                guard.frontier_urls.remove(&entry.url);
                guard.visited.insert(entry.url.clone());
                Ok(Some(entry.url))
            }
            None => Ok(None),
        }
    }

    async fn is_visited(&self, crawl_id: &str, url: &str) -> VantageResult<bool> {
        let data = self.get(crawl_id)?;
        let result = data.lock().await.visited.contains(url);
        Ok(result)
    }

    async fn inc_crawled(&self, crawl_id: &str) -> VantageResult<()> {
        let data = self.get(crawl_id)?;
        data.lock().await.crawled += 1;
        Ok(())
    }

    async fn inc_processed(&self, crawl_id: &str) -> VantageResult<()> {
        let data = self.get(crawl_id)?;
        data.lock().await.processed += 1;
        Ok(())
    }

    async fn inc_errors(&self, crawl_id: &str) -> VantageResult<()> {
        let data = self.get(crawl_id)?;
        data.lock().await.errors += 1;
        Ok(())
    }

    async fn counters(&self, crawl_id: &str) -> VantageResult<Counters> {
        let data = self.get(crawl_id)?;
        let guard = data.lock().await;
        Ok(Counters {
            crawled: guard.crawled,
            processed: guard.processed,
            errors: guard.errors,
            frontier_size: guard.frontier.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_types::RunStateKind;

    #[tokio::test]
    async fn create_then_duplicate_create_fails() {
        let store = MemoryStateStore::new();
        store.create("c1").await.unwrap();
        let err = store.create("c1").await.unwrap_err();
        assert!(matches!(err, VantageError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn pop_next_url_respects_score_order_and_marks_visited() {
        let store = MemoryStateStore::new();
        store.create("c1").await.unwrap();
        store
            .add_urls(
                "c1",
                vec![
                    ScoredUrl {
                        score: 0.1,
                        url: "a".into(),
                    },
                    ScoredUrl {
                        score: 0.9,
                        url: "b".into(),
                    },
                ],
            )
            .await
            .unwrap();
        assert_eq!(store.pop_next_url("c1").await.unwrap(), Some("b".into()));
        assert_eq!(store.pop_next_url("c1").await.unwrap(), Some("a".into()));
        assert_eq!(store.pop_next_url("c1").await.unwrap(), None);
        assert!(store.is_visited("c1", "a").await.unwrap());
        assert!(store.is_visited("c1", "b").await.unwrap());
    }

    #[tokio::test]
    async fn add_urls_skips_already_visited() {
        let store = MemoryStateStore::new();
        store.create("c1").await.unwrap();
        store
            .add_urls(
                "c1",
                vec![ScoredUrl {
                    score: 0.5,
                    url: "a".into(),
                }],
            )
            .await
            .unwrap();
        store.pop_next_url("c1").await.unwrap();
        store
            .add_urls(
                "c1",
                vec![ScoredUrl {
                    score: 0.9,
                    url: "a".into(),
                }],
            )
            .await
            .unwrap();
        let counters = store.counters("c1").await.unwrap();
        assert_eq!(counters.frontier_size, 0);
    }

    #[tokio::test]
    async fn add_urls_dedupes_against_unvisited_frontier_entries() {
        let store = MemoryStateStore::new();
        store.create("c1").await.unwrap();
        store
            .add_urls(
                "c1",
                vec![
                    ScoredUrl {
                        score: 0.5,
                        url: "a".into(),
                    },
                    ScoredUrl {
                        score: 0.9,
                        url: "a".into(),
                    },
                ],
            )
            .await
            .unwrap();
        let counters = store.counters("c1").await.unwrap();
        assert_eq!(counters.frontier_size, 1);
        assert_eq!(store.pop_next_url("c1").await.unwrap(), Some("a".into()));
        assert_eq!(store.pop_next_url("c1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn state_history_is_append_only_and_current_state_is_last() {
        let store = MemoryStateStore::new();
        store.create("c1").await.unwrap();
        assert_eq!(
            store.current_state("c1").await.unwrap(),
            RunStateKind::Created
        );
        store
            .add_state("c1", RunState::now(RunStateKind::Running))
            .await
            .unwrap();
        assert_eq!(
            store.current_state("c1").await.unwrap(),
            RunStateKind::Running
        );
        assert_eq!(store.state_history("c1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn counters_increment_independently() {
        let store = MemoryStateStore::new();
        store.create("c1").await.unwrap();
        store.inc_crawled("c1").await.unwrap();
        store.inc_crawled("c1").await.unwrap();
        store.inc_processed("c1").await.unwrap();
        store.inc_errors("c1").await.unwrap();
        let counters = store.counters("c1").await.unwrap();
        assert_eq!(counters.crawled, 2);
        assert_eq!(counters.processed, 1);
        assert_eq!(counters.errors, 1);
    }

    #[tokio::test]
    async fn operations_on_unknown_crawl_return_not_found() {
        let store = MemoryStateStore::new();
        let err = store.pop_next_url("missing").await.unwrap_err();
        assert!(matches!(err, VantageError::NotFound(_)));
    }
}
