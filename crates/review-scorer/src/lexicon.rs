//! The closed adjective vocabulary that reviews are scored against.
//!
//! Three adjectives per score level, shared by the food and service axes.
//! Which axis an adjective describes is decided by the extractor from the
//! clause it appears in, never by the word itself.

use std::collections::HashMap;

use crate::model::Score;

const VOCABULARY: [(u8, [&str; 3]); 5] = [
    (1, ["awful", "horrible", "disgusting"]),
    (2, ["bad", "unpleasant", "offensive"]),
    (3, ["average", "uninspiring", "forgettable"]),
    (4, ["good", "enjoyable", "satisfying"]),
    (5, ["awesome", "incredible", "amazing"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexiconEntry {
    pub adjective: &'static str,
    pub score: Score,
}

#[derive(Debug, Clone)]
pub struct Lexicon {
    by_word: HashMap<&'static str, Score>,
    entries: Vec<LexiconEntry>,
}

impl Lexicon {
    pub fn standard() -> Self {
        let mut by_word = HashMap::new();
        let mut entries = Vec::new();
        for (level, words) in VOCABULARY {
            // VOCABULARY levels are all within 1..=5
            let Ok(score) = Score::new(level) else {
                continue;
            };
            for adjective in words {
                by_word.insert(adjective, score);
                entries.push(LexiconEntry { adjective, score });
            }
        }
        Self { by_word, entries }
    }

    /// Score for a single lower-case word, if it belongs to the vocabulary.
    pub fn score_of(&self, word: &str) -> Option<Score> {
        self.by_word.get(word).copied()
    }

    /// The adjectives that carry `score`, in vocabulary order.
    pub fn adjectives_for(&self, score: Score) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|e| e.score == score)
            .map(|e| e.adjective)
            .collect()
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::standard()
    }
}
