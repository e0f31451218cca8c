//! Keyword extraction of `(food, service)` score pairs from review text.
//!
//! The text is split into clauses on punctuation and contrastive connectives,
//! and each clause is segmented at the anchor words "food" and "service".
//! An adjective scores the axis of the nearest preceding anchor in its clause;
//! adjectives ahead of a clause's first anchor belong to that anchor. Clauses
//! without an anchor contribute nothing, and only lexicon words are recognized.

use regex::Regex;

use crate::error::{AppError, SignalFault};
use crate::lexicon::Lexicon;
use crate::model::{Axis, Review, Score, ScorePair};

const FOOD_ANCHOR: &str = "food";
const SERVICE_ANCHOR: &str = "service";
const EXCERPT_CHARS: usize = 60;

pub struct ReviewExtractor {
    lexicon: Lexicon,
    clause_re: Regex,
    word_re: Regex,
}

impl ReviewExtractor {
    pub fn new(lexicon: Lexicon) -> Self {
        let clause_re = Regex::new(r"(?i)[.!?;,]|\b(?:but|while|whereas|although|though)\b")
            .expect("valid regex");
        let word_re = Regex::new(r"[a-z]+").expect("valid regex");
        Self {
            lexicon,
            clause_re,
            word_re,
        }
    }

    pub fn extract(&self, review: &Review) -> Result<ScorePair, AppError> {
        let mut signals = Signals::default();

        for clause in self.clause_re.split(&review.text) {
            let lowered = clause.to_lowercase();
            let mut anchor: Option<Axis> = None;
            let mut leading: Vec<Score> = Vec::new();
            for word in self.word_re.find_iter(&lowered).map(|m| m.as_str()) {
                if let Some(axis) = anchor_of(word) {
                    if anchor.is_none() {
                        signals.axis_mut(axis).append(&mut leading);
                    }
                    anchor = Some(axis);
                } else if let Some(score) = self.lexicon.score_of(word) {
                    match anchor {
                        Some(axis) => signals.axis_mut(axis).push(score),
                        None => leading.push(score),
                    }
                }
            }
        }

        let food_score = single_signal(&signals.food, Axis::Food, review)?;
        let service_score = single_signal(&signals.service, Axis::Service, review)?;
        Ok(ScorePair::new(food_score, service_score))
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Extract every review, stopping at the first malformed one.
    pub fn extract_all(&self, reviews: &[&Review]) -> Result<Vec<ScorePair>, AppError> {
        reviews.iter().map(|r| self.extract(r)).collect()
    }
}

impl Default for ReviewExtractor {
    fn default() -> Self {
        Self::new(Lexicon::standard())
    }
}

#[derive(Default)]
struct Signals {
    food: Vec<Score>,
    service: Vec<Score>,
}

impl Signals {
    fn axis_mut(&mut self, axis: Axis) -> &mut Vec<Score> {
        match axis {
            Axis::Food => &mut self.food,
            Axis::Service => &mut self.service,
        }
    }
}

fn anchor_of(word: &str) -> Option<Axis> {
    match word {
        FOOD_ANCHOR => Some(Axis::Food),
        SERVICE_ANCHOR => Some(Axis::Service),
        _ => None,
    }
}

fn single_signal(found: &[Score], axis: Axis, review: &Review) -> Result<Score, AppError> {
    match found {
        [score] => Ok(*score),
        [] => Err(malformed(review, axis, SignalFault::Missing)),
        _ => Err(malformed(review, axis, SignalFault::Ambiguous)),
    }
}

fn malformed(review: &Review, axis: Axis, reason: SignalFault) -> AppError {
    let excerpt = if review.text.chars().count() > EXCERPT_CHARS {
        format!("{}...", review.text.chars().take(EXCERPT_CHARS).collect::<String>())
    } else {
        review.text.clone()
    };
    AppError::MalformedReview {
        restaurant: review.restaurant_name.clone(),
        excerpt,
        axis,
        reason,
    }
}
