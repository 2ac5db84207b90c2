//! Query tokenization and stemming, mirroring the site's search widget.

use super::porter;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Stop words the widget drops before stemming (English sites only).
pub(crate) const STOP_WORDS: &[&str] = &[
    "a", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "near", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there",
    "these", "they", "this", "to", "was", "will", "with",
];

/// Stemmed words shorter than this fall back to the unstemmed word.
const MIN_STEM_LENGTH: usize = 3;

/// Language used for stemming queries; must match the language the site was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Arabic,
    Danish,
    Dutch,
    #[default]
    English,
    Finnish,
    French,
    German,
    Greek,
    Hungarian,
    Italian,
    Norwegian,
    Portuguese,
    Romanian,
    Russian,
    Spanish,
    Swedish,
    Tamil,
    Turkish,
}

impl Language {
    /// Snowball algorithm for the language. English sites use Porter instead.
    const fn snowball(self) -> Option<Algorithm> {
        Some(match self {
            Self::English => return None,
            Self::Arabic => Algorithm::Arabic,
            Self::Danish => Algorithm::Danish,
            Self::Dutch => Algorithm::Dutch,
            Self::Finnish => Algorithm::Finnish,
            Self::French => Algorithm::French,
            Self::German => Algorithm::German,
            Self::Greek => Algorithm::Greek,
            Self::Hungarian => Algorithm::Hungarian,
            Self::Italian => Algorithm::Italian,
            Self::Norwegian => Algorithm::Norwegian,
            Self::Portuguese => Algorithm::Portuguese,
            Self::Romanian => Algorithm::Romanian,
            Self::Russian => Algorithm::Russian,
            Self::Spanish => Algorithm::Spanish,
            Self::Swedish => Algorithm::Swedish,
            Self::Tamil => Algorithm::Tamil,
            Self::Turkish => Algorithm::Turkish,
        })
    }

    pub fn stemmer(self) -> WordStemmer {
        match self.snowball() {
            Some(algorithm) => WordStemmer::Snowball(Stemmer::create(algorithm)),
            None => WordStemmer::Porter,
        }
    }

    fn stop_words(self) -> &'static [&'static str] {
        match self {
            Self::English => STOP_WORDS,
            _ => &[],
        }
    }
}

/// Stemmer matching the one the index was built with.
pub enum WordStemmer {
    Porter,
    Snowball(Stemmer),
}

impl WordStemmer {
    pub fn stem<'a>(&self, word: &'a str) -> Cow<'a, str> {
        match self {
            Self::Porter => Cow::Owned(porter::stem(word)),
            Self::Snowball(stemmer) => stemmer.stem(word),
        }
    }
}

/// A query split into the term sets the search passes consume.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryTerms {
    /// Stemmed words every result must contain
    pub search: Vec<String>,
    /// Stemmed words no result may contain (written `-word`)
    pub excluded: Vec<String>,
    /// Lowercased whitespace-separated chunks matched against object names
    pub objects: Vec<String>,
}

impl QueryTerms {
    pub fn is_empty(&self) -> bool {
        self.search.is_empty() && self.objects.is_empty()
    }
}

/// Splits and stems a free-text query.
pub fn parse_query(query: &str, language: Language) -> QueryTerms {
    let stemmer = language.stemmer();
    let stop_words = language.stop_words();
    let mut terms = QueryTerms::default();

    for chunk in query.split_whitespace() {
        let lower = chunk.to_lowercase();
        if !terms.objects.contains(&lower) {
            terms.objects.push(lower.clone());
        }

        let (excluded, body) = match lower.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, lower.as_str()),
        };

        for word in split_words(body) {
            if stop_words.contains(&word) {
                continue;
            }
            let stemmed = stem_word(word, &stemmer);
            let target = if excluded {
                &mut terms.excluded
            } else {
                &mut terms.search
            };
            if !target.contains(&stemmed) {
                target.push(stemmed);
            }
        }
    }

    terms
}

/// Splits on anything that is not a letter, digit or underscore.
pub fn split_words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
}

/// Stems one lowercased word, keeping the word when stemming cuts it too short.
pub fn stem_word(word: &str, stemmer: &WordStemmer) -> String {
    let stemmed = stemmer.stem(word);
    if stemmed.chars().count() < MIN_STEM_LENGTH && word.chars().count() >= MIN_STEM_LENGTH {
        word.to_string()
    } else {
        stemmed.into_owned()
    }
}
