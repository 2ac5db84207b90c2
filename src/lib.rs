//! Reader, validator, writer and query engine for documentation search
//! indexes (`searchindex.js`), served to assistants over MCP.

pub mod cli;
pub mod config;
pub mod error;
pub mod index;
pub mod namespace;
pub mod search;
pub mod server;
pub mod state;
pub mod tools;
pub mod tracing;

pub use config::Config;
pub use error::{IndexError, NamespaceError, ParseError, Result, ValidationError};
pub use index::{Dialect, SearchIndex, parse_index, read_index_file};
pub use namespace::Namespace;
pub use search::{SearchEngine, SearchResult};
pub use server::IndexServer;
pub use state::{IndexState, LoadedIndex};
