//! Content → score∈[0,1] pipeline: a polymorphic `ScoreAnalyzer` contract
//! with a keyword/regex built-in and a remote-LLM built-in, plus a read-only
//! introspection catalog of analyzer kinds.

mod factory;
mod introspection;
mod keyword;
mod llm;

pub use factory::build_analyzer;
pub use introspection::analyzer_catalog;
pub use keyword::KeywordAnalyzer;
pub use llm::LlmAnalyzer;

use async_trait::async_trait;
use vantage_types::VantageResult;

#[async_trait]
pub trait ScoreAnalyzer: Send + Sync {
    /// The analyzer's configured name, used as the key in a record's
    /// per-analyzer `scores` map.
    fn name(&self) -> &str;

    /// Scores `content` in [0.0, 1.0]. Implementations must not let a
    /// transient failure (network, parse) propagate as an error that would
    /// abort the whole scoring pipeline: degrade to `Ok(0.0)` and log instead,
    /// reserving `Err` for genuinely invalid input.
    async fn score(&self, content: &str) -> VantageResult<f64>;
}

/// `log10(1 + raw) / log10(101)`, clamped to `[0, 1]`. Shared by every
/// analyzer that reduces an unbounded raw count to a normalized score.
pub fn normalize_log10(raw: f64) -> f64 {
    let normalized = (1.0 + raw).log10() / 101f64.log10();
    normalized.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_zero_raw_is_zero() {
        assert_eq!(normalize_log10(0.0), 0.0);
    }

    #[test]
    fn normalize_matches_spec_example() {
        // log10(1+2)/log10(101) from the "go go rust" scenario.
        let score = normalize_log10(2.0);
        assert!((score - 0.2375).abs() < 0.001);
    }

    #[test]
    fn normalize_clamps_to_one() {
        assert_eq!(normalize_log10(1_000_000.0), 1.0);
    }
}
