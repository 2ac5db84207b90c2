//! Ranked search over a loaded index.
//!
//! Two passes run per query: object names (directives, options, modules,
//! configuration settings) and the term/title-term postings. Their results are
//! merged and ordered by score.

use super::scoring::Scorer;
use super::tokenize::{Language, QueryTerms, parse_query};
use crate::index::{Postings, SearchIndex};
use ahash::AHashMap;
use std::collections::BTreeMap;

/// Whether a result is an object entry or a whole page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Object,
    Document,
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub kind: ResultKind,
    pub doc: usize,
    pub docname: String,
    /// Object full name, or page title
    pub title: String,
    pub anchor: Option<String>,
    pub description: Option<String>,
    pub filename: Option<String>,
    pub score: i64,
}

/// Query executor bound to one index.
pub struct SearchEngine<'a> {
    index: &'a SearchIndex,
    scorer: &'a Scorer,
    language: Language,
}

impl<'a> SearchEngine<'a> {
    pub const fn new(index: &'a SearchIndex, scorer: &'a Scorer, language: Language) -> Self {
        Self {
            index,
            scorer,
            language,
        }
    }

    /// Runs `query` and returns at most `limit` results, best first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        let terms = parse_query(query, self.language);
        if terms.is_empty() {
            return vec![];
        }

        let mut results = self.search_objects(&terms);
        results.extend(self.search_terms(&terms));

        results.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
                .then_with(|| kind_order(a.kind).cmp(&kind_order(b.kind)))
        });
        results.truncate(limit);

        tracing::debug!(
            "Query {:?}: {} search terms, {} excluded, {} results",
            query,
            terms.search.len(),
            terms.excluded.len(),
            results.len()
        );

        results
    }

    /// Matches every object term against object full names.
    fn search_objects(&self, terms: &QueryTerms) -> Vec<SearchResult> {
        let mut results: Vec<SearchResult> = vec![];
        // (doc, anchor, fullname) -> position in `results`
        let mut seen: AHashMap<(usize, String, String), usize> = AHashMap::new();
        let objects = self.index.objects();

        for (i, term) in terms.objects.iter().enumerate() {
            let others: Vec<&str> = terms
                .objects
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, t)| t.as_str())
                .collect();

            for object in &objects {
                if object.priority < 0 {
                    continue;
                }
                let Some(document) = object.document else {
                    continue;
                };
                let fullname_lower = object.fullname.to_lowercase();
                if !fullname_lower.contains(term.as_str()) {
                    continue;
                }

                let label = object.label();
                if !others.is_empty() {
                    let haystack = format!(
                        "{} {} {} {}",
                        object.prefix, object.name, label, document.title
                    )
                    .to_lowercase();
                    if !others.iter().all(|other| haystack.contains(other)) {
                        continue;
                    }
                }

                let score = self.scorer.object_name(&fullname_lower, term)
                    + self.scorer.priority(object.priority);

                let key = (
                    document.doc,
                    object.anchor.clone(),
                    object.fullname.clone(),
                );
                if let Some(&at) = seen.get(&key) {
                    results[at].score = results[at].score.max(score);
                    continue;
                }
                seen.insert(key, results.len());
                results.push(SearchResult {
                    kind: ResultKind::Object,
                    doc: document.doc,
                    docname: document.docname.to_string(),
                    title: object.fullname.clone(),
                    anchor: Some(object.anchor.clone()),
                    description: Some(format!("{}, in {}", label, document.title)),
                    filename: document.filename.map(str::to_string),
                    score,
                });
            }
        }

        results
    }

    /// Matches stemmed search terms against body and title postings.
    fn search_terms(&self, terms: &QueryTerms) -> Vec<SearchResult> {
        if terms.search.is_empty() {
            return vec![];
        }

        let empty = BTreeMap::new();
        let body = &self.index.terms;
        let titles = self.index.titleterms.as_ref().unwrap_or(&empty);

        // doc -> words matched; doc -> word -> best score
        let mut matched: AHashMap<usize, Vec<&str>> = AHashMap::new();
        let mut scores: AHashMap<usize, AHashMap<&str, i64>> = AHashMap::new();

        for word in terms.search.iter().map(String::as_str) {
            let mut sources: Vec<(&Postings, i64)> = vec![];
            if let Some(p) = body.get(word) {
                sources.push((p, self.scorer.term));
            }
            if let Some(p) = titles.get(word) {
                sources.push((p, self.scorer.title));
            }

            if word.chars().count() > 2 {
                if !body.contains_key(word) {
                    sources.extend(
                        body.iter()
                            .filter(|(key, _)| key.contains(word))
                            .map(|(_, p)| (p, self.scorer.partial_term)),
                    );
                }
                if !titles.contains_key(word) {
                    sources.extend(
                        titles
                            .iter()
                            .filter(|(key, _)| key.contains(word))
                            .map(|(_, p)| (p, self.scorer.partial_title)),
                    );
                }
            }

            // A required word with no hits ends matching; later words cannot be satisfied.
            if sources.is_empty() {
                break;
            }

            for (postings, score) in sources {
                for doc in postings.docs() {
                    let best = scores.entry(doc).or_default().entry(word).or_insert(score);
                    *best = (*best).max(score);
                    let words = matched.entry(doc).or_default();
                    if !words.contains(&word) {
                        words.push(word);
                    }
                }
            }
        }

        let required = terms.search.len();
        let required_long = terms.search.iter().filter(|t| t.chars().count() > 2).count();

        let mut results = vec![];
        for (doc, words) in matched {
            if words.len() != required && words.len() != required_long {
                continue;
            }
            let excluded = terms.excluded.iter().any(|ex| {
                body.get(ex).is_some_and(|p| p.contains(doc))
                    || titles.get(ex).is_some_and(|p| p.contains(doc))
            });
            if excluded {
                continue;
            }
            let Some(document) = self.index.document(doc) else {
                continue;
            };
            let score = scores
                .get(&doc)
                .and_then(|s| s.values().max().copied())
                .unwrap_or_default();

            results.push(SearchResult {
                kind: ResultKind::Document,
                doc,
                docname: document.docname.to_string(),
                title: document.title.to_string(),
                anchor: None,
                description: None,
                filename: document.filename.map(str::to_string),
                score,
            });
        }

        results
    }
}

const fn kind_order(kind: ResultKind) -> u8 {
    match kind {
        ResultKind::Object => 0,
        ResultKind::Document => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use serde_json::json;

    fn fixture() -> SearchIndex {
        SearchIndex::from_value(&json!({
            "docnames": ["grid", "minicylc", "slides"],
            "filenames": ["grid.rst", "minicylc.rst", "slides.rst"],
            "titles": ["grid_table", "minicylc", "hieroglyph_addons"],
            "terms": {
                "tabl": [0, 2],
                "graph": 1,
                "theme": [1, 2],
                "slide": 2,
                "configur": [0, 1, 2]
            },
            "titleterms": {"grid_tabl": 0, "minicylc": 1, "graph": 1},
            "objects": {
                "": {"minicylc": [1, 0, 1, "-"], "minicylc:theme": [1, 1, 1, "directive-option-minicylc-theme"]},
                "cylc.sphinx_ext": {"minicylc": [1, 2, 0, "-"], "grid_table": [0, 2, 0, "-"]}
            },
            "objtypes": {"0": "rst:directive", "1": "rst:directive:option", "2": "py:module"},
            "objnames": {
                "0": ["rst", "directive", "reStructuredText directive"],
                "1": ["rst", "directive:option", "reStructuredText directive-option"],
                "2": ["py", "module", "Python module"]
            }
        }))
        .unwrap()
    }

    fn search(query: &str) -> Vec<SearchResult> {
        let index = fixture();
        let scorer = Scorer::default();
        SearchEngine::new(&index, &scorer, Language::English).search(query, 20)
    }

    #[test]
    fn title_hit_outranks_body_hit() {
        let results = search("graph");
        let documents: Vec<_> = results
            .iter()
            .filter(|r| r.kind == ResultKind::Document)
            .collect();
        check!(documents.len() == 1);
        check!(documents[0].docname == "minicylc");
        check!(documents[0].score == 15);
    }

    #[test]
    fn all_words_required() {
        let results = search("theme slides");
        let docs: Vec<_> = results
            .iter()
            .filter(|r| r.kind == ResultKind::Document)
            .map(|r| r.docname.as_str())
            .collect();
        check!(docs == vec!["slides"]);
    }

    #[test]
    fn exclusion_removes_documents() {
        let results = search("configuration -slides");
        let docs: Vec<_> = results
            .iter()
            .filter(|r| r.kind == ResultKind::Document)
            .map(|r| r.docname.as_str())
            .collect();
        check!(docs == vec!["grid", "minicylc"]);
    }

    #[test]
    fn object_ranking_uses_priority() {
        let results = search("minicylc");
        check!(results[0].kind == ResultKind::Object);
        check!(results[0].title == "cylc.sphinx_ext.minicylc");
        check!(results[0].score == 11 + 15);
        check!(results[0].anchor.as_deref() == Some("module-cylc.sphinx_ext.minicylc"));

        let directive = results
            .iter()
            .find(|r| r.title == "minicylc")
            .expect("directive result");
        check!(directive.score == 11 + 5);
        check!(directive.anchor.as_deref() == Some("directive-minicylc"));
        check!(directive.description.as_deref() == Some("reStructuredText directive, in minicylc"));
    }

    #[test]
    fn partial_matches_score_lower() {
        let results = search("grid");
        let page = results
            .iter()
            .find(|r| r.kind == ResultKind::Document)
            .expect("document result");
        check!(page.docname == "grid");
        check!(page.score == 7);
    }

    #[test]
    fn ties_break_on_title() {
        let results = search("configuration");
        let titles: Vec<_> = results.iter().map(|r| r.title.as_str()).collect();
        check!(titles == vec!["grid_table", "hieroglyph_addons", "minicylc"]);
    }

    #[test]
    fn limit_and_empty_query() {
        let index = fixture();
        let scorer = Scorer::default();
        let engine = SearchEngine::new(&index, &scorer, Language::English);
        check!(engine.search("configuration", 1).len() == 1);
        check!(engine.search("", 10).is_empty());
        check!(engine.search("   ", 10).is_empty());
    }

    #[test]
    fn multi_term_object_search_checks_other_terms() {
        let results = search("minicylc theme");
        let objects: Vec<_> = results
            .iter()
            .filter(|r| r.kind == ResultKind::Object)
            .map(|r| r.title.as_str())
            .collect();
        check!(objects == vec!["minicylc:theme"]);
    }
}
