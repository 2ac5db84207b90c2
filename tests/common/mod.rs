//! Shared test fixtures and utilities for integration tests.
//!
//! # Available Fixtures
//!
//! - `fixture_source`: text of the bundled real index (`tests/fixtures/searchindex.js`)
//! - `fixture_index`: the same index parsed into the typed model
//! - `html_build`: a temporary build directory holding a copy of the real index
//!
//! [`TempWorkspace`] provides a reusable temp directory abstraction for any test
//! that needs filesystem isolation.

use rstest::fixture;
use searchindex_mcp::index::{INDEX_FILE_NAME, SearchIndex, parse_index};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Returns the project root directory (where Cargo.toml lives).
pub fn project_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

/// Path of the bundled real index.
pub fn fixture_path() -> PathBuf {
    project_root().join("tests/fixtures").join(INDEX_FILE_NAME)
}

/// A temporary directory that is removed when dropped.
#[allow(dead_code)] // Methods used across different integration test crates
pub struct TempWorkspace {
    _temp: TempDir,
    root: PathBuf,
}

#[allow(dead_code)] // Methods used across different integration test crates
impl TempWorkspace {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = temp.path().to_path_buf();
        Self { _temp: temp, root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Creates a file, and any missing parent directories, within this workspace.
    ///
    /// # Panics
    /// Panics if file creation fails.
    pub fn create_file(&self, path: &str, content: &str) -> PathBuf {
        let full_path = self.root.join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap_or_else(|e| {
                panic!("Failed to create parent directory for '{}': {}", path, e)
            });
        }
        std::fs::write(&full_path, content)
            .unwrap_or_else(|e| panic!("Failed to write file '{}': {}", path, e));
        full_path
    }

    /// Copies a file from the real filesystem into this workspace.
    ///
    /// # Panics
    /// Panics if copying fails.
    pub fn copy_file(&self, source: &Path, dest_relative: &str) -> PathBuf {
        let dest = self.root.join(dest_relative);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).unwrap_or_else(|e| {
                panic!(
                    "Failed to create parent directory for '{}': {}",
                    dest_relative, e
                )
            });
        }
        std::fs::copy(source, &dest).unwrap_or_else(|e| {
            panic!(
                "Failed to copy '{}' to '{}': {}",
                source.display(),
                dest_relative,
                e
            )
        });
        dest
    }

    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.root.join(path))
            .unwrap_or_else(|e| panic!("Failed to read '{}': {}", path, e))
    }
}

#[fixture]
pub fn fixture_source() -> String {
    std::fs::read_to_string(fixture_path()).expect("bundled index fixture is readable")
}

#[fixture]
pub fn fixture_index(fixture_source: String) -> SearchIndex {
    parse_index(&fixture_source)
        .expect("bundled index fixture parses")
        .0
}

/// A documentation build tree, `build/html/searchindex.js`, in a temp directory.
#[fixture]
pub fn html_build() -> TempWorkspace {
    let workspace = TempWorkspace::new();
    workspace.copy_file(&fixture_path(), "build/html/searchindex.js");
    workspace
}
