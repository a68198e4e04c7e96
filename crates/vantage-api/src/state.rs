use std::sync::Arc;

use vantage_config::SeedFetcherConfig;
use vantage_engine::Engine;
use vantage_search::{DefaultSeedFetcher, SeedFetcher};

/// Shared handles threaded through every route via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub seed_fetcher: Arc<dyn SeedFetcher>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, seed_fetcher_config: &SeedFetcherConfig) -> anyhow::Result<Self> {
        let seed_fetcher: Arc<dyn SeedFetcher> = Arc::new(DefaultSeedFetcher::new(seed_fetcher_config)?);
        Ok(Self { engine, seed_fetcher })
    }
}
