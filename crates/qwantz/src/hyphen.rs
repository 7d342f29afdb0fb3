//! Hyphenation disambiguation.
//!
//! A row ending in `-` either continues a broken word or really contains a
//! hyphenated compound. A curated word set from past strips answers first;
//! a general English word list is the fallback.

use std::io;
use std::path::Path;

use ecow::{EcoString, eco_format};
use rustc_hash::FxHashSet;

use crate::diag::Sink;

/// Cast names the general dictionary does not know.
const EXTRA_WORDS: &[&str] =
    &["utahraptor", "utahraptor's", "dromiceiomimus", "dromiceiomimus's"];

/// The word sets consulted when resolving a row-break hyphen.
#[derive(Debug, Clone)]
pub struct Dictionaries {
    qwantz: FxHashSet<EcoString>,
    english: FxHashSet<EcoString>,
}

impl Dictionaries {
    /// Load both word lists, one word per line.
    pub fn load(qwantz: &Path, english: &Path) -> io::Result<Self> {
        let mut english = read_word_set(english)?;
        english.extend(EXTRA_WORDS.iter().map(|w| EcoString::from(*w)));
        Ok(Self { qwantz: read_word_set(qwantz)?, english })
    }

    /// Build dictionaries from in-memory word lists.
    pub fn from_words(qwantz: &[&str], english: &[&str]) -> Self {
        Self {
            qwantz: qwantz.iter().map(|w| w.to_lowercase().into()).collect(),
            english: english
                .iter()
                .copied()
                .chain(EXTRA_WORDS.iter().copied())
                .map(|w| w.to_lowercase().into())
                .collect(),
        }
    }

    /// Decide whether a row-break hyphen is written out.
    ///
    /// `part1` and `part2` are the hyphen-split pieces of the words on
    /// either side of the break. Returns `true` to keep the hyphen.
    pub fn disambiguate(&self, part1: &[&str], part2: &[&str], sink: &mut Sink) -> bool {
        let (Some(&last), Some(&first)) = (part1.last(), part2.first()) else {
            return true;
        };
        if last.chars().next_back().is_some_and(|c| c.is_lowercase())
            && first.chars().next().is_some_and(|c| c.is_uppercase())
        {
            return true;
        }
        if first.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            return true;
        }

        let last = last.to_lowercase();
        let first = first.to_lowercase();
        let joined: EcoString = eco_format!("{last}{first}");
        let pair: EcoString = eco_format!("{last}-{first}");
        let phrase: EcoString = {
            let mut all: Vec<&str> = part1.to_vec();
            all.extend(part2);
            all.join("-").to_lowercase().into()
        };

        let keep = self.qwantz.contains(&pair) || self.qwantz.contains(&phrase);
        let drop = self.qwantz.contains(&joined);
        match (keep, drop) {
            (true, true) => {
                // A known joined word always wins over a known compound.
                crate::warn!(sink, "ambiguous hyphen ({last}/{first}); both forms known");
                false
            }
            (true, false) => true,
            (false, true) => false,
            (false, false) => {
                let no_hyphen = self.english.contains(&joined);
                let separate = self.english.contains(last.as_str())
                    && self.english.contains(first.as_str());
                if no_hyphen == separate {
                    crate::warn!(
                        sink,
                        "ambiguous hyphen ({last}/{first}); {} in dict",
                        if no_hyphen { "both" } else { "none" },
                    );
                }
                !no_hyphen && separate
            }
        }
    }
}

fn read_word_set(path: &Path) -> io::Result<FxHashSet<EcoString>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text.lines().map(|line| line.trim_end().to_lowercase().into()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dicts() -> Dictionaries {
        Dictionaries::from_words(
            &["dinosaur", "merry-go-round"],
            &["every", "body", "everybody", "great"],
        )
    }

    #[test]
    fn test_known_joined_word_drops_hyphen() {
        let mut sink = Sink::new();
        assert!(!dicts().disambiguate(&["dino"], &["saur"], &mut sink));
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn test_known_compound_keeps_hyphen() {
        let mut sink = Sink::new();
        assert!(dicts().disambiguate(&["merry", "go"], &["round"], &mut sink));
    }

    #[test]
    fn test_both_forms_warn_and_join() {
        let dicts = Dictionaries::from_words(&["dinosaur", "dino-saur"], &[]);
        let mut sink = Sink::new();
        assert!(!dicts.disambiguate(&["dino"], &["saur"], &mut sink));
        assert_eq!(sink.diagnostics().len(), 1);
    }

    #[test]
    fn test_case_break_keeps_hyphen() {
        let mut sink = Sink::new();
        assert!(dicts().disambiguate(&["jet"], &["Set"], &mut sink));
        assert!(dicts().disambiguate(&["top"], &["40"], &mut sink));
    }

    #[test]
    fn test_english_fallback() {
        let mut sink = Sink::new();
        // "every" + "body" joins into a known word: ambiguous, both known.
        assert!(!dicts().disambiguate(&["every"], &["body"], &mut sink));
        assert_eq!(sink.diagnostics().len(), 1);
        // Both pieces known, the join unknown: keep the hyphen.
        assert!(dicts().disambiguate(&["great"], &["great"], &mut sink));
    }

    #[test]
    fn test_idempotent() {
        let dicts = dicts();
        let mut sink = Sink::new();
        let a = dicts.disambiguate(&["dino"], &["saur"], &mut sink);
        let b = dicts.disambiguate(&["dino"], &["saur"], &mut sink);
        assert_eq!(a, b);
    }
}
