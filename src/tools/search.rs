//! Ranked search handler.

use super::HTML_SUFFIX;
use crate::config::Config;
use crate::index::SearchIndex;
use crate::search::{ResultKind, SearchEngine, SearchResult, parse_query, suggest};
use crate::state::IndexState;
use rmcp::schemars;
use serde::Deserialize;
use std::fmt::Write as _;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchRequest {
    /// Search query; prefix a word with `-` to exclude pages containing it
    pub query: String,
    /// Maximum number of results to return (default from configuration, usually 10)
    #[serde(default)]
    pub limit: Option<usize>,
    /// Index to search (defaults to the loaded index)
    #[serde(default)]
    pub path: Option<String>,
}

pub async fn handle_search(
    state: &IndexState,
    config: &Config,
    request: SearchRequest,
) -> Result<String, String> {
    let loaded = state.get(request.path.as_deref()).await?;
    let limit = request.limit.unwrap_or(config.default_limit);
    let engine = SearchEngine::new(&loaded.index, &config.scorer, config.language);
    let results = engine.search(&request.query, limit);

    if results.is_empty() {
        return Ok(format_no_results(&loaded.index, config, &request.query));
    }

    Ok(format_search_results(&results, &request.query))
}

/// Formats ranked results with their links.
pub fn format_search_results(results: &[SearchResult], query: &str) -> String {
    let mut output = format!("Search results for '{}':\n\n", query);
    let max_score = results.iter().map(|r| r.score).max().unwrap_or(0).max(1);

    for (idx, result) in results.iter().enumerate() {
        let relevance = (result.score.max(0) * 100 / max_score).min(100);
        let kind = match result.kind {
            ResultKind::Object => "object",
            ResultKind::Document => "page",
        };
        let _ = writeln!(
            output,
            "{}. `{}` ({}) - relevance: {}%",
            idx + 1,
            result.title,
            kind,
            relevance
        );

        let link = match &result.anchor {
            Some(anchor) if !anchor.is_empty() => {
                format!("{}{}#{}", result.docname, HTML_SUFFIX, anchor)
            }
            _ => format!("{}{}", result.docname, HTML_SUFFIX),
        };
        let _ = writeln!(output, "   {}", link);
        if let Some(description) = &result.description {
            let _ = writeln!(output, "   {}", description);
        }
        output.push('\n');
    }

    output
}

fn format_no_results(index: &SearchIndex, config: &Config, query: &str) -> String {
    let mut msg = format!("No results found for '{}'.\n\n", query);

    let terms = parse_query(query, config.language);
    let candidates = || {
        index
            .terms
            .keys()
            .chain(index.titleterms.iter().flat_map(|t| t.keys()))
            .map(String::as_str)
    };
    let mut suggestions: Vec<&str> = vec![];
    for word in &terms.search {
        for (candidate, _) in suggest(word, candidates(), 3) {
            if candidate != word.as_str() && !suggestions.contains(&candidate) {
                suggestions.push(candidate);
            }
        }
    }
    if !suggestions.is_empty() {
        let _ = writeln!(msg, "Did you mean one of these indexed terms? {}\n", suggestions.join(", "));
    }

    msg.push_str("Search tips:\n");
    msg.push_str("• Every word must appear on a page; try fewer words\n");
    msg.push_str("• Search uses stemming: 'tables' matches 'table'\n");
    msg.push_str("• Words starting with '-' exclude pages\n");
    msg.push_str("• Object names (directives, modules, settings) match by substring\n");

    msg
}
