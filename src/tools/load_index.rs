//! Load an index and make it the default for later tool calls.

use super::{write_report, write_summary};
use crate::state::{IndexState, LoadedIndex};
use rmcp::schemars;
use serde::Deserialize;
use std::fmt::Write as _;
use std::path::Path;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LoadIndexRequest {
    /// Path to a searchindex.js file, or a documentation build directory containing one
    pub path: String,
}

pub async fn handle_load_index(
    state: &IndexState,
    request: LoadIndexRequest,
) -> Result<String, String> {
    let previous = state.active_path().await;
    let loaded = state
        .load_and_activate(&request.path)
        .await
        .map_err(|e| format!("Failed to load index: {}", e))?;

    Ok(format_response(&loaded, previous.as_deref()))
}

/// Formats the load confirmation with counts and validation findings.
pub fn format_response(loaded: &LoadedIndex, previous: Option<&Path>) -> String {
    let mut response = format!("Index loaded: {}\n", loaded.path.display());

    let _ = write!(response, "Dialect: {}", loaded.dialect);
    if let Some(schema) = loaded.index.envversion.as_ref().and_then(|v| v.sphinx()) {
        let _ = write!(response, ", environment schema {}", schema);
    }
    response.push('\n');

    if let Some(previous) = previous
        && previous != loaded.path
    {
        let _ = writeln!(response, "Previous index: {}", previous.display());
    }
    response.push('\n');

    write_summary(&mut response, &loaded.index.summary());
    response.push('\n');
    write_report(&mut response, &loaded.report);

    response
}
