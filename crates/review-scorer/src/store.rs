//! In-memory review corpus.
//!
//! Corpus format is one review per line: `<restaurant name>. <review text>.`
//! The name ends at the first `.` on the line. Blank lines are skipped.
//! The store is built once at startup and is read-only afterwards.

use std::collections::HashMap;
use std::path::Path;

use crate::error::AppError;
use crate::model::{RestaurantSummary, Review};

/// How restaurant names are folded into lookup keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameMatching {
    /// Trimmed and case-folded.
    #[default]
    Exact,
    /// Lower-case ASCII letters and digits only, so "mcdonalds" finds "McDonald's".
    Sanitized,
}

impl NameMatching {
    pub fn key(self, name: &str) -> String {
        match self {
            NameMatching::Exact => name.trim().to_lowercase(),
            NameMatching::Sanitized => name
                .chars()
                .filter(|c| !c.is_whitespace())
                .flat_map(char::to_lowercase)
                .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                .collect(),
        }
    }
}

impl std::str::FromStr for NameMatching {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(NameMatching::Exact),
            "sanitized" => Ok(NameMatching::Sanitized),
            other => Err(AppError::Config(format!(
                "unknown name matching mode '{other}' (expected 'exact' or 'sanitized')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReviewStore {
    reviews: Vec<Review>,
    index: HashMap<String, Vec<usize>>,
    /// Keys in first-seen order, for stable listings.
    order: Vec<String>,
    matching: NameMatching,
}

impl ReviewStore {
    pub fn new(reviews: Vec<Review>, matching: NameMatching) -> Self {
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        let mut order = Vec::new();
        for (i, review) in reviews.iter().enumerate() {
            let key = matching.key(&review.restaurant_name);
            let slots = index.entry(key.clone()).or_default();
            if slots.is_empty() {
                order.push(key);
            }
            slots.push(i);
        }
        Self {
            reviews,
            index,
            order,
            matching,
        }
    }

    pub fn load(path: &Path, matching: NameMatching) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("failed to read {}: {e}", path.display())))?;
        Ok(Self::new(parse_corpus(&content)?, matching))
    }

    /// All reviews for `name` in corpus order.
    pub fn lookup(&self, name: &str) -> Result<Vec<&Review>, AppError> {
        let key = self.matching.key(name);
        let slots = self
            .index
            .get(&key)
            .filter(|_| !key.is_empty())
            .ok_or_else(|| AppError::NotFound(name.trim().to_string()))?;
        Ok(slots.iter().map(|&i| &self.reviews[i]).collect())
    }

    pub fn restaurants(&self) -> Vec<RestaurantSummary> {
        self.order
            .iter()
            .filter_map(|key| {
                let slots = self.index.get(key)?;
                let first = self.reviews.get(*slots.first()?)?;
                Some(RestaurantSummary {
                    name: first.restaurant_name.clone(),
                    review_count: slots.len(),
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }
}

pub fn parse_corpus(content: &str) -> Result<Vec<Review>, AppError> {
    let mut reviews = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line_no = i + 1;
        let line = line.trim_start_matches('\u{feff}').trim();
        if line.is_empty() {
            continue;
        }
        let (name, text) = line.split_once('.').ok_or_else(|| AppError::Parse {
            line: line_no,
            message: "missing '.' after restaurant name".to_string(),
        })?;
        let name = name.trim();
        let text = text.trim();
        if name.is_empty() {
            return Err(AppError::Parse {
                line: line_no,
                message: "empty restaurant name".to_string(),
            });
        }
        if text.is_empty() {
            return Err(AppError::Parse {
                line: line_no,
                message: format!("review for '{name}' has no text"),
            });
        }
        reviews.push(Review {
            restaurant_name: name.to_string(),
            text: text.to_string(),
        });
    }
    Ok(reviews)
}
