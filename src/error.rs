//! Error handling types and utilities.

use std::path::PathBuf;

/// A specialized Result type for application-level operations.
///
/// This is an alias for `anyhow::Result` with context added via `.context()` and
/// `.with_context()` methods in the CLI, server and state layers.
pub type Result<T> = anyhow::Result<T>;

/// Error raised while reading the text of an index file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at line {line}, column {column} (byte {offset})")]
pub struct ParseError {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    /// Builds an error for `offset` within `source`, computing line and column.
    pub(crate) fn at(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let offset = offset.min(source.len());
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let column = before
            .rfind('\n')
            .map_or(before.chars().count(), |nl| before[nl + 1..].chars().count())
            + 1;
        Self {
            offset,
            line,
            column,
            message: message.into(),
        }
    }
}

/// A field of the parsed literal did not have the shape the index model expects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid `{path}`: expected {expected}")]
pub struct ModelError {
    /// Dotted path of the offending value, e.g. `terms.foo[1]`
    pub path: String,
    pub expected: &'static str,
}

impl ModelError {
    pub(crate) fn new(path: impl Into<String>, expected: &'static str) -> Self {
        Self {
            path: path.into(),
            expected,
        }
    }
}

/// Error returned when loading a search index fails.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// No index file exists at (or below) the given path.
    #[error("no searchindex.js found at {}", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// A single broken invariant of a loaded index.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} has {actual} entries but docnames has {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{field} entry {term:?} references document {doc}, but only {len} documents exist")]
    PostingOutOfRange {
        field: &'static str,
        term: String,
        doc: usize,
        len: usize,
    },
    #[error("{field} contains an empty term")]
    EmptyTerm { field: &'static str },
    #[error("object {name:?} references document {doc}, but only {len} documents exist")]
    ObjectDocOutOfRange { name: String, doc: usize, len: usize },
    #[error("object {name:?} has type {objtype}, which is missing from {table}")]
    UnknownObjectType {
        name: String,
        objtype: usize,
        table: &'static str,
    },
    #[error("object type {objtype} is listed in {present_in} but not in {missing_from}")]
    ObjectTypeTableMismatch {
        objtype: String,
        present_in: &'static str,
        missing_from: &'static str,
    },
}

/// Error returned for strings that are not configuration namespaces.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Not a valid namespace \"{0}\"")]
pub struct NamespaceError(pub String);
