//! MCP tool handlers. Each returns formatted text for the assistant.

pub mod inspect;
pub mod load_index;
pub mod lookup;
pub mod search;

pub use inspect::{InspectIndexRequest, handle_inspect_index};
pub use load_index::{LoadIndexRequest, handle_load_index};
pub use lookup::{LookupTermRequest, ResolveObjectRequest, handle_lookup_term, handle_resolve_object};
pub use search::{SearchRequest, handle_search};

use crate::index::{Report, Summary};
use std::fmt::Write as _;

/// Page suffix of the HTML builder; links are `docname + suffix + #anchor`.
pub const HTML_SUFFIX: &str = ".html";

/// Appends index counts, one per line.
pub(crate) fn write_summary(out: &mut String, summary: &Summary) {
    let _ = writeln!(out, "Documents: {}", summary.documents);
    let _ = writeln!(
        out,
        "Terms: {} (title terms: {})",
        summary.terms, summary.title_terms
    );
    let _ = writeln!(out, "Objects: {}", summary.objects);
    for (objtype, count) in &summary.objects_by_type {
        let _ = writeln!(out, "  - {}: {}", objtype, count);
    }
}

/// Appends validation findings.
pub(crate) fn write_report(out: &mut String, report: &Report) {
    if report.is_valid() {
        out.push_str("Validation: OK\n");
    } else {
        let _ = writeln!(out, "Validation: {} errors", report.errors.len());
        for error in &report.errors {
            let _ = writeln!(out, "  • {}", error);
        }
    }
    if !report.warnings.is_empty() {
        out.push_str("Warnings:\n");
        for warning in &report.warnings {
            let _ = writeln!(out, "  • {}", warning);
        }
    }
}
