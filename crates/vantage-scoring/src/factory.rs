use std::sync::Arc;

use vantage_config::LlmAnalyzerConfig;
use vantage_types::{AnalyzerSpec, VantageResult};

use crate::{KeywordAnalyzer, LlmAnalyzer, ScoreAnalyzer};

/// Constructs the concrete analyzer behind an `AnalyzerSpec`'s discriminator.
pub fn build_analyzer(
    spec: &AnalyzerSpec,
    llm_config: &LlmAnalyzerConfig,
) -> VantageResult<Arc<dyn ScoreAnalyzer>> {
    match spec {
        AnalyzerSpec::Keyword { .. } => Ok(Arc::new(KeywordAnalyzer::from_spec(spec)?)),
        AnalyzerSpec::Llm { .. } => Ok(Arc::new(LlmAnalyzer::from_spec(spec, llm_config)?)),
    }
}
