//! Index overview: counts, pages and validation.

use super::{write_report, write_summary};
use crate::state::IndexState;
use rmcp::schemars;
use serde::Deserialize;
use std::fmt::Write as _;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct InspectIndexRequest {
    /// Index to inspect (defaults to the loaded index)
    #[serde(default)]
    pub path: Option<String>,
}

pub async fn handle_inspect_index(
    state: &IndexState,
    request: InspectIndexRequest,
) -> Result<String, String> {
    let loaded = state.get(request.path.as_deref()).await?;
    let index = &loaded.index;

    let mut output = format!(
        "Index: {} ({} dialect)\n\n",
        loaded.path.display(),
        loaded.dialect
    );
    write_summary(&mut output, &index.summary());

    if let Some(envversion) = &index.envversion {
        let _ = writeln!(output, "Environment: {}", envversion);
    }
    if !index.extra.is_empty() {
        let keys: Vec<&str> = index.extra.keys().map(String::as_str).collect();
        let _ = writeln!(output, "Other fields: {}", keys.join(", "));
    }

    output.push_str("\nDocuments:\n");
    for document in index.documents() {
        let _ = write!(output, "  {}. {}", document.doc, document.docname);
        if !document.title.is_empty() {
            let _ = write!(output, " - {}", document.title);
        }
        if let Some(filename) = document.filename {
            let _ = write!(output, " ({})", filename);
        }
        output.push('\n');
    }

    output.push('\n');
    write_report(&mut output, &loaded.report);

    Ok(output)
}
