//! Query parsing and ranking over a loaded search index.

mod porter;
pub mod query;
pub mod scoring;
pub mod tokenize;

pub use query::{ResultKind, SearchEngine, SearchResult};
pub use scoring::{Scorer, suggest};
pub use tokenize::{Language, QueryTerms, WordStemmer, parse_query, split_words, stem_word};
