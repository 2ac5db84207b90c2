//! Relevance weights used to rank search results.
//!
//! Defaults reproduce the ranking of the documentation site's own search page,
//! so results come back in the order a reader of the site would see them.

use rapidfuzz::distance::jaro_winkler;
use serde::{Deserialize, Serialize};

/// Score contributions for each kind of match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Scorer {
    /// Query equals the object's full name or its last dotted component
    pub obj_name_match: i64,
    /// Query is contained in the object's last dotted component
    pub obj_partial_match: i64,
    /// Object priority 0
    pub obj_prio_important: i64,
    /// Object priority 1
    pub obj_prio_normal: i64,
    /// Object priority 2
    pub obj_prio_unimportant: i64,
    /// Any other priority
    pub obj_prio_default: i64,
    pub title: i64,
    pub partial_title: i64,
    pub term: i64,
    pub partial_term: i64,
}

impl Default for Scorer {
    fn default() -> Self {
        Self {
            obj_name_match: 11,
            obj_partial_match: 6,
            obj_prio_important: 15,
            obj_prio_normal: 5,
            obj_prio_unimportant: -5,
            obj_prio_default: 0,
            title: 15,
            partial_title: 7,
            term: 5,
            partial_term: 2,
        }
    }
}

impl Scorer {
    /// Contribution of an object's priority.
    pub const fn priority(&self, priority: i64) -> i64 {
        match priority {
            0 => self.obj_prio_important,
            1 => self.obj_prio_normal,
            2 => self.obj_prio_unimportant,
            _ => self.obj_prio_default,
        }
    }

    /// Name component of an object score for one query term.
    ///
    /// `fullname` and `term` are both lowercase.
    pub fn object_name(&self, fullname: &str, term: &str) -> i64 {
        let last = fullname.rsplit('.').next().unwrap_or(fullname);
        if fullname == term || last == term {
            self.obj_name_match
        } else if last.contains(term) {
            self.obj_partial_match
        } else {
            0
        }
    }
}

/// Similarity threshold for "did you mean" suggestions.
pub const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Ranks `candidates` by similarity to `word`, best first, dropping weak matches.
pub fn suggest<'a>(
    word: &str,
    candidates: impl IntoIterator<Item = &'a str>,
    limit: usize,
) -> Vec<(&'a str, f64)> {
    let mut scored: Vec<(&str, f64)> = candidates
        .into_iter()
        .map(|candidate| {
            (
                candidate,
                jaro_winkler::similarity(word.chars(), candidate.chars()),
            )
        })
        .filter(|(_, score)| *score > SUGGESTION_THRESHOLD)
        .collect();
    scored.sort_by(|(a_name, a), (b_name, b)| b.total_cmp(a).then_with(|| a_name.cmp(b_name)));
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    #[rstest]
    #[case(0, 15)]
    #[case(1, 5)]
    #[case(2, -5)]
    #[case(7, 0)]
    fn priority_weights(#[case] priority: i64, #[case] expected: i64) {
        check!(Scorer::default().priority(priority) == expected);
    }

    #[rstest]
    #[case("cylc.sphinx_ext.minicylc", "minicylc", 11)]
    #[case("minicylc", "minicylc", 11)]
    #[case("cylc.sphinx_ext.minicylc", "cylc.sphinx_ext.minicylc", 11)]
    #[case("cylc.sphinx_ext.minicylc", "mini", 6)]
    #[case("cylc.sphinx_ext.minicylc", "sphinx", 0)]
    fn object_name_scores(#[case] fullname: &str, #[case] term: &str, #[case] expected: i64) {
        check!(Scorer::default().object_name(fullname, term) == expected);
    }

    #[test]
    fn suggestions_are_ranked() {
        let suggestions = suggest("configur", ["configur", "config", "colour", "zebra"], 5);
        check!(suggestions.first().map(|(s, _)| *s) == Some("configur"));
        check!(suggestions.iter().all(|(s, _)| *s != "zebra"));
    }
}
