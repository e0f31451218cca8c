use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A keyword-derived rating on a 1 to 5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MIN: Score = Score(1);
    pub const MAX: Score = Score(5);

    pub fn new(value: u8) -> Result<Self, AppError> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(AppError::InvalidScore(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Score {
    type Error = AppError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Score::new(value)
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> u8 {
        score.0
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two independently scored review dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Food,
    Service,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Food => f.write_str("food"),
            Axis::Service => f.write_str("service"),
        }
    }
}

/// One line of the review corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Restaurant name as written in the corpus.
    pub restaurant_name: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScorePair {
    pub food_score: Score,
    pub customer_service_score: Score,
}

impl ScorePair {
    pub fn new(food_score: Score, customer_service_score: Score) -> Self {
        Self {
            food_score,
            customer_service_score,
        }
    }

    /// Build a pair from raw integers, rejecting values outside 1..=5.
    #[cfg(test)]
    pub fn from_raw(food: u8, service: u8) -> Result<Self, AppError> {
        Ok(Self::new(Score::new(food)?, Score::new(service)?))
    }
}

/// Outcome of one successful pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QueryResult {
    pub restaurant_name: String,
    /// Overall quality in `[0, 10]`.
    pub overall_score: f64,
    pub review_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RestaurantSummary {
    pub name: String,
    pub review_count: usize,
}
