use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use scraper::{Html, Selector};
use vantage_config::SeedFetcherConfig;
use vantage_types::{SearchEngineSeed, VantageResult};

use crate::engines::strategy_for;
use crate::{dedupe_preserve_order, SeedFetcher};

/// One shared HTTP client across engines; each engine query runs
/// concurrently with a rate-limit delay between successive requests to the
/// same engine and capped exponential backoff on HTTP 429.
pub struct DefaultSeedFetcher {
    client: reqwest::Client,
    config: SeedFetcherConfig,
}

impl DefaultSeedFetcher {
    pub fn new(config: &SeedFetcherConfig) -> VantageResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_s))
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| vantage_types::VantageError::InvalidInput(e.to_string()))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    async fn fetch_one(&self, seed: &SearchEngineSeed) -> Vec<String> {
        let strategy = strategy_for(seed.search_engine);
        let url = strategy.build_url(&seed.query, seed.result_count);

        let mut attempt = 0;
        loop {
            tokio::time::sleep(Duration::from_secs_f64(self.config.rate_limit_delay_s)).await;
            match self.client.get(&url).send().await {
                Ok(response) if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    attempt += 1;
                    if attempt > self.config.max_retries {
                        tracing::warn!(engine = ?seed.search_engine, "seed fetcher rate-limited past retry budget");
                        return Vec::new();
                    }
                    let backoff = 2f64.powi(attempt as i32);
                    tokio::time::sleep(Duration::from_secs_f64(backoff)).await;
                }
                Ok(response) if response.status().is_success() => {
                    return match response.text().await {
                        Ok(body) => parse_results(&body, strategy.result_selector, seed.result_count),
                        Err(e) => {
                            tracing::warn!(engine = ?seed.search_engine, error = %e, "failed to read seed fetcher response body");
                            Vec::new()
                        }
                    };
                }
                Ok(response) => {
                    tracing::warn!(engine = ?seed.search_engine, status = %response.status(), "seed fetcher non-success status");
                    return Vec::new();
                }
                Err(e) => {
                    tracing::warn!(engine = ?seed.search_engine, error = %e, "seed fetcher request failed");
                    return Vec::new();
                }
            }
        }
    }
}

fn parse_results(html: &str, selector_str: &str, result_count: u32) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector_str) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .filter(|href| href.starts_with("http://") || href.starts_with("https://"))
        .take(result_count as usize)
        .map(|href| href.to_string())
        .collect()
}

#[async_trait]
impl SeedFetcher for DefaultSeedFetcher {
    async fn collect(&self, seeds: &[SearchEngineSeed]) -> VantageResult<Vec<String>> {
        let futures = seeds.iter().map(|seed| self.fetch_one(seed));
        let per_engine = join_all(futures).await;
        Ok(dedupe_preserve_order(per_engine.into_iter().flatten().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_results_extracts_absolute_links_up_to_limit() {
        let html = r#"
            <div class="g"><a href="https://a.example/">A</a></div>
            <div class="g"><a href="https://b.example/">B</a></div>
            <div class="g"><a href="/relative">skip</a></div>
        "#;
        let urls = parse_results(html, "div.g a[href]", 1);
        assert_eq!(urls, vec!["https://a.example/".to_string()]);
    }
}
