use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use vantage_config::LlmAnalyzerConfig;
use vantage_types::{AnalyzerSpec, ScoringInput, VantageError, VantageResult};

use crate::ScoreAnalyzer;

#[derive(Debug, Serialize)]
struct GenerationInput {
    prompt: String,
    output_format: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ScoreRequest {
    generation_input: GenerationInput,
    text_inputs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    score: serde_json::Value,
}

/// Remote-LLM analyzer. Built once from its spec; every `score()` call issues
/// a single HTTP POST and degrades to `0.0` (logged, never propagated) for
/// any non-2xx, timeout, parse failure, or out-of-range result.
pub struct LlmAnalyzer {
    name: String,
    prompt: String,
    service_url: String,
    output_format: serde_json::Value,
    client: reqwest::Client,
}

impl std::fmt::Debug for LlmAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmAnalyzer")
            .field("name", &self.name)
            .field("service_url", &self.service_url)
            .finish()
    }
}

impl LlmAnalyzer {
    pub fn from_spec(spec: &AnalyzerSpec, config: &LlmAnalyzerConfig) -> VantageResult<Self> {
        let AnalyzerSpec::Llm {
            name,
            scoring_input,
            ..
        } = spec
        else {
            return Err(VantageError::InvalidAnalyzerParams(
                "expected an LLM analyzer spec".to_string(),
            ));
        };
        let prompt = match scoring_input {
            ScoringInput::Prompt { prompt } => prompt.clone(),
            ScoringInput::TopicList { topics } => {
                if topics.is_empty() {
                    return Err(VantageError::InvalidAnalyzerParams(
                        "topic list must not be empty".to_string(),
                    ));
                }
                format!("{} {}", config.default_prompt_template, topics.join(", "))
            }
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_s))
            .build()
            .map_err(|e| VantageError::InvalidAnalyzerParams(e.to_string()))?;
        Ok(Self {
            name: name.clone(),
            prompt,
            service_url: config.service_url.clone(),
            output_format: config.output_format.clone(),
            client,
        })
    }
}

#[async_trait]
impl ScoreAnalyzer for LlmAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, content: &str) -> VantageResult<f64> {
        let request = ScoreRequest {
            generation_input: GenerationInput {
                prompt: self.prompt.clone(),
                output_format: self.output_format.clone(),
            },
            text_inputs: vec![content.to_string()],
        };

        let response = match self.client.post(&self.service_url).json(&request).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(analyzer = %self.name, error = %e, "LLM analyzer request failed");
                return Ok(0.0);
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                analyzer = %self.name,
                status = %response.status(),
                "LLM analyzer returned non-success status"
            );
            return Ok(0.0);
        }

        let parsed: ScoreResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(analyzer = %self.name, error = %e, "LLM analyzer response parse failed");
                return Ok(0.0);
            }
        };

        let score = match parsed.score.as_f64() {
            Some(s) => s,
            None => {
                tracing::warn!(analyzer = %self.name, "LLM analyzer response missing numeric score");
                return Ok(0.0);
            }
        };

        if !(0.0..=1.0).contains(&score) {
            tracing::warn!(analyzer = %self.name, score, "LLM analyzer score out of range");
            return Ok(0.0);
        }

        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_config::LlmAnalyzerConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn spec() -> AnalyzerSpec {
        AnalyzerSpec::Llm {
            name: "LLM".into(),
            composite_weight: 1.0,
            scoring_input: ScoringInput::Prompt {
                prompt: "rate this".into(),
            },
        }
    }

    #[tokio::test]
    async fn scores_from_successful_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/score"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"score": 0.75})))
            .mount(&server)
            .await;

        let mut config = LlmAnalyzerConfig::default();
        config.service_url = format!("{}/score", server.uri());
        let analyzer = LlmAnalyzer::from_spec(&spec(), &config).unwrap();
        assert_eq!(analyzer.score("content").await.unwrap(), 0.75);
    }

    #[tokio::test]
    async fn server_error_degrades_to_zero_without_failing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/score"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut config = LlmAnalyzerConfig::default();
        config.service_url = format!("{}/score", server.uri());
        let analyzer = LlmAnalyzer::from_spec(&spec(), &config).unwrap();
        assert_eq!(analyzer.score("content").await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn out_of_range_score_degrades_to_zero() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/score"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"score": 4.2})))
            .mount(&server)
            .await;

        let mut config = LlmAnalyzerConfig::default();
        config.service_url = format!("{}/score", server.uri());
        let analyzer = LlmAnalyzer::from_spec(&spec(), &config).unwrap();
        assert_eq!(analyzer.score("content").await.unwrap(), 0.0);
    }
}
