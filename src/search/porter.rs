//! The original Porter stemmer.
//!
//! English sites are indexed with Porter, not Porter2, so queries must be
//! stemmed the same way to hit index keys (`always` is indexed as `alwai`).

/// Stems one lowercased English word.
pub(crate) fn stem(word: &str) -> String {
    let mut w = Word {
        b: word.chars().collect(),
    };
    if w.b.len() < 3 {
        return word.to_string();
    }
    w.step1a();
    w.step1b();
    w.step1c();
    w.step2();
    w.step3();
    w.step4();
    w.step5();
    w.b.into_iter().collect()
}

const STEP2: &[(&str, &str)] = &[
    ("ational", "ate"),
    ("tional", "tion"),
    ("enci", "ence"),
    ("anci", "ance"),
    ("izer", "ize"),
    ("abli", "able"),
    ("alli", "al"),
    ("entli", "ent"),
    ("eli", "e"),
    ("ousli", "ous"),
    ("ization", "ize"),
    ("ation", "ate"),
    ("ator", "ate"),
    ("alism", "al"),
    ("iveness", "ive"),
    ("fulness", "ful"),
    ("ousness", "ous"),
    ("aliti", "al"),
    ("iviti", "ive"),
    ("biliti", "ble"),
];

const STEP3: &[(&str, &str)] = &[
    ("icate", "ic"),
    ("ative", ""),
    ("alize", "al"),
    ("iciti", "ic"),
    ("ical", "ic"),
    ("ful", ""),
    ("ness", ""),
];

const STEP4: &[&str] = &[
    "al", "ance", "ence", "er", "ic", "able", "ible", "ant", "ement", "ment", "ent", "ion", "ou",
    "ism", "ate", "iti", "ous", "ive", "ize",
];

struct Word {
    b: Vec<char>,
}

impl Word {
    fn is_consonant(&self, i: usize) -> bool {
        match self.b[i] {
            'a' | 'e' | 'i' | 'o' | 'u' => false,
            'y' => i == 0 || !self.is_consonant(i - 1),
            _ => true,
        }
    }

    /// Number of vowel-consonant sequences in the first `len` characters.
    fn measure(&self, len: usize) -> usize {
        let mut i = 0;
        while i < len && self.is_consonant(i) {
            i += 1;
        }
        let mut m = 0;
        loop {
            while i < len && !self.is_consonant(i) {
                i += 1;
            }
            if i >= len {
                return m;
            }
            while i < len && self.is_consonant(i) {
                i += 1;
            }
            m += 1;
        }
    }

    fn has_vowel(&self, len: usize) -> bool {
        (0..len).any(|i| !self.is_consonant(i))
    }

    fn double_consonant(&self, len: usize) -> bool {
        len >= 2 && self.b[len - 1] == self.b[len - 2] && self.is_consonant(len - 1)
    }

    /// Consonant-vowel-consonant ending, the last consonant not `w`, `x` or `y`.
    fn cvc(&self, len: usize) -> bool {
        len >= 3
            && self.is_consonant(len - 3)
            && !self.is_consonant(len - 2)
            && self.is_consonant(len - 1)
            && !matches!(self.b[len - 1], 'w' | 'x' | 'y')
    }

    /// Stem length when the word ends with `suffix`.
    fn ends(&self, suffix: &str) -> Option<usize> {
        let n = suffix.chars().count();
        (self.b.len() >= n && self.b[self.b.len() - n..].iter().copied().eq(suffix.chars()))
            .then(|| self.b.len() - n)
    }

    fn set_to(&mut self, stem: usize, replacement: &str) {
        self.b.truncate(stem);
        self.b.extend(replacement.chars());
    }

    /// Longest suffix of `candidates` the word ends with, and its stem length.
    fn longest<'a>(&self, candidates: impl Iterator<Item = &'a str>) -> Option<(&'a str, usize)> {
        candidates
            .filter_map(|s| self.ends(s).map(|stem| (s, stem)))
            .min_by_key(|(_, stem)| *stem)
    }

    fn step1a(&mut self) {
        if let Some(stem) = self.ends("sses") {
            self.set_to(stem, "ss");
        } else if let Some(stem) = self.ends("ies") {
            self.set_to(stem, "i");
        } else if self.ends("ss").is_none()
            && let Some(stem) = self.ends("s")
        {
            self.set_to(stem, "");
        }
    }

    fn step1b(&mut self) {
        if let Some(stem) = self.ends("eed") {
            if self.measure(stem) > 0 {
                self.set_to(stem, "ee");
            }
            return;
        }
        let Some(stem) = self
            .ends("ed")
            .or_else(|| self.ends("ing"))
            .filter(|stem| self.has_vowel(*stem))
        else {
            return;
        };
        self.set_to(stem, "");

        let len = self.b.len();
        if self.ends("at").is_some() || self.ends("bl").is_some() || self.ends("iz").is_some() {
            self.b.push('e');
        } else if self.double_consonant(len) && !matches!(self.b[len - 1], 'l' | 's' | 'z') {
            self.b.pop();
        } else if self.measure(len) == 1 && self.cvc(len) {
            self.b.push('e');
        }
    }

    fn step1c(&mut self) {
        if let Some(stem) = self.ends("y")
            && self.has_vowel(stem)
        {
            self.set_to(stem, "i");
        }
    }

    fn replace_longest(&mut self, rules: &[(&str, &str)], min_measure: usize) {
        if let Some((suffix, stem)) = self.longest(rules.iter().map(|(s, _)| *s))
            && self.measure(stem) >= min_measure
            && let Some((_, replacement)) = rules.iter().find(|(s, _)| *s == suffix)
        {
            self.set_to(stem, replacement);
        }
    }

    fn step2(&mut self) {
        self.replace_longest(STEP2, 1);
    }

    fn step3(&mut self) {
        self.replace_longest(STEP3, 1);
    }

    fn step4(&mut self) {
        let Some((suffix, stem)) = self.longest(STEP4.iter().copied()) else {
            return;
        };
        if self.measure(stem) <= 1 {
            return;
        }
        if suffix == "ion" && !(stem > 0 && matches!(self.b[stem - 1], 's' | 't')) {
            return;
        }
        self.set_to(stem, "");
    }

    fn step5(&mut self) {
        if let Some(stem) = self.ends("e") {
            let m = self.measure(stem);
            if m > 1 || (m == 1 && !self.cvc(stem)) {
                self.set_to(stem, "");
            }
        }
        let len = self.b.len();
        if self.b.last() == Some(&'l') && self.double_consonant(len) && self.measure(len) > 1 {
            self.b.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    #[rstest]
    #[case("caresses", "caress")]
    #[case("ponies", "poni")]
    #[case("cats", "cat")]
    #[case("agreed", "agre")]
    #[case("plastered", "plaster")]
    #[case("motoring", "motor")]
    #[case("hopping", "hop")]
    #[case("filing", "file")]
    #[case("happy", "happi")]
    #[case("always", "alwai")]
    #[case("relational", "relat")]
    #[case("generalization", "gener")]
    #[case("triplicate", "triplic")]
    #[case("electrical", "electr")]
    #[case("adjustment", "adjust")]
    #[case("adoption", "adopt")]
    #[case("controlling", "control")]
    #[case("configuration", "configur")]
    #[case("tables", "tabl")]
    #[case("slides", "slide")]
    fn porter_vocabulary(#[case] word: &str, #[case] expected: &str) {
        check!(stem(word) == expected);
    }

    #[test]
    fn short_words_unchanged() {
        check!(stem("is") == "is");
        check!(stem("as") == "as");
    }
}
