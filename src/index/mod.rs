//! Search index file format: reading, writing, validation and lookups.

pub mod literal;
pub mod model;
pub mod validate;
pub mod writer;

pub use literal::{Dialect, parse_index_text};
pub use model::{EnvVersion, ObjectEntry, ObjectName, Objects, Posting, Postings, SearchIndex};
pub use validate::{Report, validate};

use crate::error::IndexError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name the documentation builder writes into its output directory.
pub const INDEX_FILE_NAME: &str = "searchindex.js";

/// One page of the documentation site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentRef<'a> {
    pub doc: usize,
    pub docname: &'a str,
    pub title: &'a str,
    pub filename: Option<&'a str>,
}

/// A term posting resolved to its document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermHit<'a> {
    pub document: DocumentRef<'a>,
    pub posting: Posting,
}

/// An object entry with its names and anchor resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedObject<'a> {
    pub prefix: &'a str,
    pub name: &'a str,
    pub fullname: String,
    /// `domain:role` from `objtypes`
    pub objtype: Option<&'a str>,
    pub kind: Option<&'a ObjectName>,
    pub priority: i64,
    pub anchor: String,
    pub document: Option<DocumentRef<'a>>,
}

impl ResolvedObject<'_> {
    /// Human readable type label, e.g. "reStructuredText directive".
    pub fn label(&self) -> &str {
        self.kind
            .map(|k| k.label.as_str())
            .or(self.objtype)
            .unwrap_or("object")
    }

    /// Link target relative to the site root: `docname.html#anchor`.
    pub fn link(&self, suffix: &str) -> Option<String> {
        self.document.map(|d| {
            if self.anchor.is_empty() {
                format!("{}{}", d.docname, suffix)
            } else {
                format!("{}{}#{}", d.docname, suffix, self.anchor)
            }
        })
    }
}

/// Counts describing an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub documents: usize,
    pub terms: usize,
    pub title_terms: usize,
    pub objects: usize,
    /// Object count per `domain:role`
    pub objects_by_type: BTreeMap<String, usize>,
    pub envversion: Option<EnvVersion>,
}

impl SearchIndex {
    /// Page metadata for document index `doc`.
    pub fn document(&self, doc: usize) -> Option<DocumentRef<'_>> {
        let docname = self.docnames.get(doc)?;
        Some(DocumentRef {
            doc,
            docname,
            title: self.titles.get(doc).map_or("", String::as_str),
            filename: self
                .filenames
                .as_ref()
                .and_then(|f| f.get(doc))
                .map(String::as_str),
        })
    }

    /// Reverse lookup from page identifier to its index.
    pub fn find_document(&self, docname: &str) -> Option<DocumentRef<'_>> {
        let doc = self.docnames.iter().position(|d| d == docname)?;
        self.document(doc)
    }

    pub fn documents(&self) -> impl Iterator<Item = DocumentRef<'_>> {
        (0..self.docnames.len()).filter_map(|doc| self.document(doc))
    }

    /// Resolves the body postings stored for `term` (an already stemmed key).
    pub fn lookup_term(&self, term: &str) -> Vec<TermHit<'_>> {
        self.resolve_postings(self.terms.get(term))
    }

    /// Resolves the title postings stored for `term`.
    pub fn lookup_title_term(&self, term: &str) -> Vec<TermHit<'_>> {
        self.resolve_postings(self.titleterms.as_ref().and_then(|t| t.get(term)))
    }

    fn resolve_postings(&self, postings: Option<&Postings>) -> Vec<TermHit<'_>> {
        postings
            .map(Postings::records)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|posting| {
                let document = self.document(posting.doc)?;
                Some(TermHit { document, posting })
            })
            .collect()
    }

    /// Every object with resolved names and anchors, in prefix order.
    pub fn objects(&self) -> Vec<ResolvedObject<'_>> {
        self.objects
            .iter()
            .flat_map(Objects::iter)
            .map(|(prefix, entry)| self.resolve_entry(prefix, entry))
            .collect()
    }

    /// Objects whose full name is exactly `fullname`.
    pub fn resolve_object(&self, fullname: &str) -> Vec<ResolvedObject<'_>> {
        self.objects()
            .into_iter()
            .filter(|o| o.fullname == fullname)
            .collect()
    }

    fn resolve_entry<'a>(&'a self, prefix: &'a str, entry: &'a ObjectEntry) -> ResolvedObject<'a> {
        let fullname = if prefix.is_empty() {
            entry.name.clone()
        } else {
            format!("{}.{}", prefix, entry.name)
        };
        let key = entry.objtype.to_string();
        let kind = self.objnames.as_ref().and_then(|n| n.get(&key));
        let anchor = match entry.anchor.as_str() {
            "" => fullname.clone(),
            "-" => match kind {
                Some(kind) => format!("{}-{}", kind.role, fullname),
                None => fullname.clone(),
            },
            other => other.to_string(),
        };
        ResolvedObject {
            prefix,
            name: &entry.name,
            fullname,
            objtype: self
                .objtypes
                .as_ref()
                .and_then(|t| t.get(&key))
                .map(String::as_str),
            kind,
            priority: entry.priority,
            anchor,
            document: self.document(entry.doc),
        }
    }

    pub fn summary(&self) -> Summary {
        let objects = self.objects();
        let mut objects_by_type = BTreeMap::new();
        for object in &objects {
            let key = object.objtype.unwrap_or("unknown").to_string();
            *objects_by_type.entry(key).or_insert(0) += 1;
        }
        Summary {
            documents: self.docnames.len(),
            terms: self.terms.len(),
            title_terms: self.titleterms.as_ref().map_or(0, BTreeMap::len),
            objects: objects.len(),
            objects_by_type,
            envversion: self.envversion.clone(),
        }
    }

    /// Serializes the index in the given dialect, wrapped in `Search.setIndex(...)`.
    pub fn to_text(&self, dialect: Dialect) -> String {
        writer::write_index_text(&self.to_value(), dialect)
    }
}

/// Parses index text into the typed model, returning the dialect it was written in.
pub fn parse_index(source: &str) -> Result<(SearchIndex, Dialect), IndexError> {
    let parsed = parse_index_text(source)?;
    let index = SearchIndex::from_value(&parsed.value)?;
    Ok((index, parsed.dialect))
}

/// Reads and parses an index file from disk.
pub fn read_index_file(path: &Path) -> Result<(SearchIndex, Dialect, String), IndexError> {
    let source = std::fs::read_to_string(path).map_err(|source| IndexError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (index, dialect) = parse_index(&source)?;
    Ok((index, dialect, source))
}

/// Resolves a user supplied path to an index file.
///
/// Files are used as-is. Directories are searched recursively for
/// `searchindex.js`; the shallowest match wins, ties broken by path order.
pub fn locate_index_file(path: &Path) -> Result<PathBuf, IndexError> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    if !path.is_dir() {
        return Err(IndexError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let mut candidates: Vec<PathBuf> = ignore::WalkBuilder::new(path)
        .standard_filters(false)
        .hidden(true)
        .build()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_some_and(|t| t.is_file()))
        .filter(|e| e.file_name() == INDEX_FILE_NAME)
        .map(ignore::DirEntry::into_path)
        .collect();

    candidates.sort_by(|a, b| {
        a.components()
            .count()
            .cmp(&b.components().count())
            .then_with(|| a.cmp(b))
    });

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| IndexError::NotFound {
            path: path.to_path_buf(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use serde_json::json;

    fn sample() -> SearchIndex {
        SearchIndex::from_value(&json!({
            "docnames": ["a", "b"],
            "titles": ["A", "B"],
            "terms": {"foo": [[0, 1, 1, ""]], "bar": [0, 1]},
            "titleterms": {"b": 1},
            "objects": {
                "": {"spoiler": [1, 0, 1, "-"], "practical": [1, 0, 0, ""]},
                "cylc.sphinx_ext": {"minicylc": [0, 1, 0, "module-x"]}
            },
            "objtypes": {"0": "rst:directive", "1": "py:module"},
            "objnames": {
                "0": ["rst", "directive", "reStructuredText directive"],
                "1": ["py", "module", "Python module"]
            }
        }))
        .unwrap()
    }

    #[test]
    fn lookup_resolves_document_and_title() {
        let index = sample();
        let hits = index.lookup_term("foo");
        check!(hits.len() == 1);
        check!(hits[0].document.docname == "a");
        check!(hits[0].document.title == "A");
        check!(hits[0].posting.weight() == 1);
    }

    #[test]
    fn lookup_missing_term_is_empty() {
        check!(sample().lookup_term("nope").is_empty());
    }

    #[test]
    fn title_term_lookup() {
        let index = sample();
        let hits = index.lookup_title_term("b");
        check!(hits.len() == 1);
        check!(hits[0].document.docname == "b");
    }

    #[test]
    fn object_anchor_rules() {
        let index = sample();
        let spoilers = index.resolve_object("spoiler");
        let_assert!([spoiler] = spoilers.as_slice());
        check!(spoiler.anchor == "directive-spoiler");
        check!(spoiler.label() == "reStructuredText directive");
        check!(spoiler.link(".html").as_deref() == Some("b.html#directive-spoiler"));

        let practicals = index.resolve_object("practical");
        let_assert!([practical] = practicals.as_slice());
        check!(practical.anchor == "practical");

        let modules = index.resolve_object("cylc.sphinx_ext.minicylc");
        let_assert!([module] = modules.as_slice());
        check!(module.anchor == "module-x");
        check!(module.objtype == Some("py:module"));
    }

    #[test]
    fn summary_counts() {
        let summary = sample().summary();
        check!(summary.documents == 2);
        check!(summary.terms == 2);
        check!(summary.title_terms == 1);
        check!(summary.objects == 3);
        check!(summary.objects_by_type["rst:directive"] == 2);
    }

    #[test]
    fn find_document_by_name() {
        let index = sample();
        check!(index.find_document("b").map(|d| d.doc) == Some(1));
        check!(index.find_document("zzz").is_none());
    }

    #[test]
    fn locate_prefers_shallowest_index() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("build/html/_nested");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join(INDEX_FILE_NAME), "{}").unwrap();
        std::fs::write(dir.path().join("build/html").join(INDEX_FILE_NAME), "{}").unwrap();

        let found = locate_index_file(dir.path()).unwrap();
        check!(found == dir.path().join("build/html").join(INDEX_FILE_NAME));
    }

    #[test]
    fn locate_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        let_assert!(Err(IndexError::NotFound { .. }) = locate_index_file(dir.path()));
    }
}
