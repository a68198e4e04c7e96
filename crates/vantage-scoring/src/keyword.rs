use async_trait::async_trait;
use regex::RegexBuilder;
use vantage_types::{
    AnalyzerSpec, VantageError, VantageResult, WeightedKeyword, WeightedRegex,
    REGEX_FLAG_CASE_INSENSITIVE, REGEX_FLAG_MULTI_LINE,
};

use crate::{normalize_log10, ScoreAnalyzer};

#[derive(Debug)]
struct CompiledRegex {
    regex: regex::Regex,
    weight: f64,
}

/// Weighted keyword/regex occurrence counter, normalized via log10
/// compression. Keywords and regexes are precompiled once at construction.
#[derive(Debug)]
pub struct KeywordAnalyzer {
    name: String,
    keywords: Vec<WeightedKeyword>,
    regexes: Vec<CompiledRegex>,
}

impl KeywordAnalyzer {
    pub fn from_spec(spec: &AnalyzerSpec) -> VantageResult<Self> {
        let AnalyzerSpec::Keyword {
            name,
            keywords,
            regexes,
            ..
        } = spec
        else {
            return Err(VantageError::InvalidAnalyzerParams(
                "expected a keyword analyzer spec".to_string(),
            ));
        };
        if keywords.is_empty() && regexes.is_empty() {
            return Err(VantageError::InvalidAnalyzerParams(format!(
                "keyword analyzer '{name}' needs at least one keyword or regex"
            )));
        }
        let compiled = regexes
            .iter()
            .map(|wr| compile(wr))
            .collect::<VantageResult<Vec<_>>>()?;
        Ok(Self {
            name: name.clone(),
            keywords: keywords.clone(),
            regexes: compiled,
        })
    }

    fn raw_score(&self, content: &str) -> f64 {
        let lower = content.to_lowercase();
        let mut raw = 0.0;
        for kw in &self.keywords {
            let needle = kw.keyword.to_lowercase();
            if needle.is_empty() {
                continue;
            }
            let occurrences = lower.matches(&needle).count() as f64;
            raw += occurrences * kw.weight;
        }
        for compiled in &self.regexes {
            let occurrences = compiled.regex.find_iter(content).count() as f64;
            raw += occurrences * compiled.weight;
        }
        raw
    }
}

fn compile(wr: &WeightedRegex) -> VantageResult<CompiledRegex> {
    let mut builder = RegexBuilder::new(&wr.pattern);
    builder.case_insensitive(wr.flags & REGEX_FLAG_CASE_INSENSITIVE != 0);
    builder.multi_line(wr.flags & REGEX_FLAG_MULTI_LINE != 0);
    let regex = builder
        .build()
        .map_err(|e| VantageError::InvalidAnalyzerParams(format!("bad regex '{}': {e}", wr.pattern)))?;
    Ok(CompiledRegex {
        regex,
        weight: wr.weight,
    })
}

#[async_trait]
impl ScoreAnalyzer for KeywordAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, content: &str) -> VantageResult<f64> {
        if content.is_empty() {
            return Ok(0.0);
        }
        Ok(normalize_log10(self.raw_score(content)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_types::WeightedKeyword;

    fn spec(keywords: Vec<WeightedKeyword>) -> AnalyzerSpec {
        AnalyzerSpec::Keyword {
            name: "K".into(),
            composite_weight: 1.0,
            keywords,
            regexes: vec![],
        }
    }

    #[tokio::test]
    async fn counts_non_overlapping_case_insensitive_occurrences() {
        let analyzer = KeywordAnalyzer::from_spec(&spec(vec![WeightedKeyword {
            keyword: "go".into(),
            weight: 1.0,
        }]))
        .unwrap();
        let score = analyzer.score("go go rust").await.unwrap();
        assert!((score - 0.2375).abs() < 0.001);
    }

    #[tokio::test]
    async fn empty_content_scores_zero() {
        let analyzer = KeywordAnalyzer::from_spec(&spec(vec![WeightedKeyword {
            keyword: "go".into(),
            weight: 1.0,
        }]))
        .unwrap();
        assert_eq!(analyzer.score("").await.unwrap(), 0.0);
    }

    #[test]
    fn rejects_spec_with_no_keywords_or_regexes() {
        let err = KeywordAnalyzer::from_spec(&spec(vec![])).unwrap_err();
        assert!(matches!(err, VantageError::InvalidAnalyzerParams(_)));
    }
}
