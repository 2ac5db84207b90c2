//! Raw term postings and object resolution.

use super::HTML_SUFFIX;
use crate::config::Config;
use crate::index::{ResolvedObject, SearchIndex, TermHit};
use crate::namespace::{Namespace, resolve_conf};
use crate::search::{split_words, stem_word, suggest};
use crate::state::IndexState;
use rmcp::schemars;
use serde::Deserialize;
use std::fmt::Write as _;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LookupTermRequest {
    /// Word to look up; tried as written, then lowercased and stemmed
    pub term: String,
    /// Only report title matches
    #[serde(default)]
    pub titles_only: Option<bool>,
    /// Index to query (defaults to the loaded index)
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ResolveObjectRequest {
    /// Full object name, e.g. 'cylc.sphinx_ext.minicylc', 'spoiler', or a
    /// configuration reference such as 'flow.cylc[scheduling]graph'
    pub name: String,
    /// Enclosing configuration namespace for relative references, e.g. 'flow.cylc[runtime]'
    #[serde(default)]
    pub context: Option<String>,
    /// Index to query (defaults to the loaded index)
    #[serde(default)]
    pub path: Option<String>,
}

pub async fn handle_lookup_term(
    state: &IndexState,
    config: &Config,
    request: LookupTermRequest,
) -> Result<String, String> {
    let loaded = state.get(request.path.as_deref()).await?;
    let index = &loaded.index;
    let titles_only = request.titles_only.unwrap_or(false);

    let Some(key) = term_key(index, config, &request.term) else {
        let mut msg = format!("Term '{}' is not in the index.\n", request.term);
        let candidates = index
            .terms
            .keys()
            .chain(index.titleterms.iter().flat_map(|t| t.keys()))
            .map(String::as_str);
        let suggestions = suggest(&request.term.to_lowercase(), candidates, 5);
        if !suggestions.is_empty() {
            msg.push_str("\nDid you mean one of these?\n");
            for (candidate, _) in suggestions {
                let _ = writeln!(msg, "• `{}`", candidate);
            }
        }
        return Ok(msg);
    };

    let mut output = if key == request.term {
        format!("Term '{}':\n\n", key)
    } else {
        format!("Term '{}' (indexed as '{}'):\n\n", request.term, key)
    };

    if !titles_only {
        write_hits(&mut output, "Body matches", &index.lookup_term(&key));
    }
    write_hits(&mut output, "Title matches", &index.lookup_title_term(&key));

    Ok(output)
}

/// Finds the index key for a user supplied word: exact, lowercased, then stemmed.
fn term_key(index: &SearchIndex, config: &Config, term: &str) -> Option<String> {
    let present = |key: &str| {
        index.terms.contains_key(key)
            || index.titleterms.as_ref().is_some_and(|t| t.contains_key(key))
    };
    if present(term) {
        return Some(term.to_string());
    }
    let lower = term.to_lowercase();
    if present(&lower) {
        return Some(lower);
    }
    let stemmer = config.language.stemmer();
    split_words(&lower)
        .next()
        .map(|word| stem_word(word, &stemmer))
        .filter(|stemmed| present(stemmed))
}

fn write_hits(out: &mut String, heading: &str, hits: &[TermHit<'_>]) {
    let _ = writeln!(out, "{} ({}):", heading, hits.len());
    for hit in hits {
        let _ = write!(out, "  • {} ({})", hit.document.title, hit.document.docname);
        let posting = &hit.posting;
        if posting.weight.is_some() || posting.flags.is_some() {
            let _ = write!(out, " weight {}", posting.weight());
            if posting.flags() != 0 {
                let _ = write!(out, ", flags {}", posting.flags());
            }
        }
        if !posting.anchor().is_empty() {
            let _ = write!(out, " #{}", posting.anchor());
        }
        out.push('\n');
    }
    out.push('\n');
}

pub async fn handle_resolve_object(
    state: &IndexState,
    request: ResolveObjectRequest,
) -> Result<String, String> {
    let loaded = state.get(request.path.as_deref()).await?;
    let index = &loaded.index;
    let name = request.name.trim();

    let mut objects = index.resolve_object(name);
    let mut resolved_name = None;

    if objects.is_empty() {
        let context = request
            .context
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .map(Namespace::parse)
            .transpose()
            .map_err(|e| format!("Invalid context: {}", e))?;
        if let Ok((namespace, matches)) = resolve_conf(index, name, None, context.as_ref()) {
            resolved_name = Some(namespace.to_string());
            objects = matches;
        }
    }

    if objects.is_empty() {
        let mut msg = format!("No object named '{}' found.\n", name);
        if let Some(resolved) = resolved_name.filter(|r| r != name) {
            let _ = writeln!(msg, "(resolved as configuration reference '{}')", resolved);
        }
        let all = index.objects();
        let suggestions = suggest(name, all.iter().map(|o| o.fullname.as_str()), 5);
        if !suggestions.is_empty() {
            msg.push_str("\nDid you mean one of these?\n");
            for (candidate, _) in suggestions {
                let _ = writeln!(msg, "• `{}`", candidate);
            }
        }
        return Ok(msg);
    }

    let mut output = String::new();
    if let Some(resolved) = resolved_name.filter(|r| r != name) {
        let _ = writeln!(output, "Resolved '{}' as '{}'\n", name, resolved);
    }
    for object in &objects {
        write_object(&mut output, object);
    }
    Ok(output)
}

fn write_object(out: &mut String, object: &ResolvedObject<'_>) {
    let _ = writeln!(
        out,
        "`{}` ({}, priority {})",
        object.fullname,
        object.label(),
        object.priority
    );
    if let Some(objtype) = object.objtype {
        let _ = writeln!(out, "  Type: {}", objtype);
    }
    match object.document {
        Some(document) => {
            let _ = writeln!(out, "  Page: {} ({})", document.title, document.docname);
        }
        None => out.push_str("  Page: <missing document>\n"),
    }
    if let Some(link) = object.link(HTML_SUFFIX) {
        let _ = writeln!(out, "  Link: {}", link);
    }
    out.push('\n');
}
