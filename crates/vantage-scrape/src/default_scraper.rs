use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use scraper::{Html, Selector};
use url::Url;
use vantage_config::ScraperConfig;
use vantage_types::{CrawlRecord, VantageError, VantageResult};

use crate::Scraper;

/// Fetches static HTML over HTTP and parses it: visible text with
/// `<script>`/`<style>` subtrees removed, and absolute http(s) links walked
/// from `a[href]`. Does not execute JavaScript — `javascript_enabled` is
/// accepted for forward compatibility with a render-capable `Scraper`
/// substitute but logged and ignored here.
pub struct DefaultScraper {
    client: reqwest::Client,
}

impl DefaultScraper {
    pub fn new(config: &ScraperConfig) -> VantageResult<Self> {
        if config.javascript_enabled {
            tracing::warn!(
                "javascript_enabled is set but the default scraper does not render JavaScript"
            );
        }
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_s))
            .user_agent(&config.user_agent);
        if let Some(proxy) = &config.proxy_server {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| VantageError::InvalidInput(format!("invalid proxy_server: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| VantageError::InvalidInput(e.to_string()))?;
        Ok(Self { client })
    }
}

fn extract_text(document: &Html) -> String {
    let skip = Selector::parse("script, style").unwrap();
    let skip_ids: std::collections::HashSet<_> = document
        .select(&skip)
        .flat_map(|el| el.descendants().map(|n| n.id()))
        .collect();

    document
        .root_element()
        .descendants()
        .filter(|n| !skip_ids.contains(&n.id()))
        .filter_map(|n| n.value().as_text().map(|t| t.trim()))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_links(document: &Html, base: &Url) -> Vec<String> {
    let selector = Selector::parse("a[href]").unwrap();
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(|url| url.to_string())
        .collect()
}

#[async_trait]
impl Scraper for DefaultScraper {
    async fn scrape(&self, url: &str) -> VantageResult<CrawlRecord> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| VantageError::ScrapeError {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(VantageError::ScrapeError {
                url: url.to_string(),
                reason: format!("status {}", response.status()),
            });
        }

        let final_url = response.url().clone();
        let page_source = response
            .text()
            .await
            .map_err(|e| VantageError::ScrapeError {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let document = Html::parse_document(&page_source);
        let extracted_content = extract_text(&document);
        let links = extract_links(&document, &final_url);

        Ok(CrawlRecord {
            url: url.to_string(),
            page_source,
            extracted_content,
            links,
            scores: Default::default(),
            composite_score: 0.0,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn extracts_text_and_links_while_skipping_script_and_style() {
        let server = MockServer::start().await;
        let body = r#"
            <html><body>
                <style>.x { color: red }</style>
                <script>var x = 1;</script>
                <p>hello world</p>
                <a href="/a">A</a>
                <a href="https://other.example/b">B</a>
                <a href="javascript:void(0)">skip</a>
            </body></html>
        "#;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let scraper = DefaultScraper::new(&ScraperConfig::default()).unwrap();
        let record = scraper.scrape(&server.uri()).await.unwrap();

        assert!(record.extracted_content.contains("hello world"));
        assert!(!record.extracted_content.contains("color: red"));
        assert!(!record.extracted_content.contains("var x"));
        assert!(record.links.iter().any(|l| l.ends_with("/a")));
        assert!(record
            .links
            .iter()
            .any(|l| l == "https://other.example/b"));
        assert_eq!(record.links.len(), 2);
    }

    #[tokio::test]
    async fn non_success_status_is_a_scrape_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let scraper = DefaultScraper::new(&ScraperConfig::default()).unwrap();
        let err = scraper.scrape(&server.uri()).await.unwrap_err();
        assert!(matches!(err, VantageError::ScrapeError { .. }));
    }
}
