use review_common::error::CommonError;

use crate::model::Axis;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("no reviews found for restaurant: {0}")]
    NotFound(String),

    #[error("malformed review for {restaurant}: {reason} {axis} adjective in \"{excerpt}\"")]
    MalformedReview {
        restaurant: String,
        /// Leading slice of the review text, enough to locate it in the corpus.
        excerpt: String,
        axis: Axis,
        reason: SignalFault,
    },

    #[error("cannot aggregate an empty set of scores")]
    EmptyInput,

    #[error("score out of range 1..=5: {0}")]
    InvalidScore(u8),

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Common(#[from] CommonError),
}

/// Why an axis could not be scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalFault {
    Missing,
    Ambiguous,
}

impl std::fmt::Display for SignalFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalFault::Missing => f.write_str("missing"),
            SignalFault::Ambiguous => f.write_str("more than one"),
        }
    }
}
