use vantage_types::SearchEngine;

/// Per-engine query template and result-anchor selector. Neither is
/// validated against the live site here — which selector still matches is an
/// operational concern, not a correctness one for this crate.
pub struct EngineStrategy {
    pub engine: SearchEngine,
    pub search_url_template: &'static str,
    pub result_selector: &'static str,
}

pub fn strategy_for(engine: SearchEngine) -> EngineStrategy {
    match engine {
        SearchEngine::Google => EngineStrategy {
            engine,
            search_url_template: "https://www.google.com/search?q={query}&num={count}",
            result_selector: "div.g a[href]",
        },
        SearchEngine::Bing => EngineStrategy {
            engine,
            search_url_template: "https://www.bing.com/search?q={query}&count={count}",
            result_selector: "li.b_algo a[href]",
        },
        SearchEngine::DuckDuckGo => EngineStrategy {
            engine,
            search_url_template: "https://html.duckduckgo.com/html/?q={query}",
            result_selector: "a.result__a[href]",
        },
    }
}

impl EngineStrategy {
    pub fn build_url(&self, query: &str, result_count: u32) -> String {
        self.search_url_template
            .replace("{query}", &urlencoding_encode(query))
            .replace("{count}", &result_count.to_string())
    }
}

/// Minimal percent-encoding for query strings; avoids pulling in a dedicated
/// crate for the handful of characters search query text actually needs.
fn urlencoding_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
