use vantage_types::{AnalyzerFieldInfo, AnalyzerInfo};

/// Enumerates the analyzer kinds this build knows how to construct, along
/// with their configurable field shapes. Kept in lockstep with
/// [`crate::factory::build_analyzer`]'s match arms by convention — adding a
/// new kind means adding one entry here and one arm there.
pub fn analyzer_catalog() -> Vec<AnalyzerInfo> {
    vec![
        AnalyzerInfo {
            kind: "keyword".to_string(),
            fields: vec![
                field("name", "string", true),
                field("composite_weight", "number", true),
                field("keywords", "list<WeightedKeyword>", false),
                field("regexes", "list<WeightedRegex>", false),
            ],
        },
        AnalyzerInfo {
            kind: "llm".to_string(),
            fields: vec![
                field("name", "string", true),
                field("composite_weight", "number", true),
                field("scoring_input", "PromptInput|TopicListInput", true),
            ],
        },
    ]
}

fn field(name: &str, field_type: &str, required: bool) -> AnalyzerFieldInfo {
    AnalyzerFieldInfo {
        field: name.to_string(),
        field_type: field_type.to_string(),
        required,
    }
}
