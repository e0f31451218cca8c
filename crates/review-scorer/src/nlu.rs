//! Language-facing collaborators of the scoring pipeline.
//!
//! The pipeline only sees two one-method traits: turning a free-text question into
//! a restaurant name, and turning a `QueryResult` into an answer sentence. The
//! chat-model backed implementations live here next to deterministic ones.

use std::sync::Arc;

use async_trait::async_trait;
use review_common::openai::OpenAiClient;

use crate::error::AppError;
use crate::model::QueryResult;

const INTERPRET_PROMPT: &str = "\
You extract restaurant names from questions about restaurant reviews. \
Reply with the name of the single restaurant the question asks about, exactly as written \
in the question, and nothing else: no quotes, no punctuation, no explanation.";

const PRESENT_PROMPT: &str = "\
You report restaurant ratings. You receive a restaurant name, its overall score out of 10 \
and the number of reviews it was computed from. Answer in one sentence that states the \
overall score with exactly three decimal places. Never mention any number that is not in \
the input and do not add analysis.";

#[async_trait]
pub trait QueryInterpreter: Send + Sync {
    /// Best-effort restaurant name for `query`. May be noisy or misspelled.
    async fn interpret(&self, query: &str) -> Result<String, AppError>;
}

#[async_trait]
pub trait ScorePresenter: Send + Sync {
    async fn present(&self, result: &QueryResult) -> Result<String, AppError>;
}

/// Treats the query itself as the restaurant name.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralInterpreter;

#[async_trait]
impl QueryInterpreter for LiteralInterpreter {
    async fn interpret(&self, query: &str) -> Result<String, AppError> {
        Ok(query.to_string())
    }
}

pub struct LlmInterpreter {
    client: Arc<OpenAiClient>,
    model: String,
}

impl LlmInterpreter {
    pub fn new(client: Arc<OpenAiClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl QueryInterpreter for LlmInterpreter {
    async fn interpret(&self, query: &str) -> Result<String, AppError> {
        let reply = self
            .client
            .complete(&self.model, INTERPRET_PROMPT, query)
            .await?;
        Ok(clean_model_name(&reply))
    }
}

/// Strip the wrapping a chat model tends to add around a bare name.
fn clean_model_name(reply: &str) -> String {
    let first_line = reply.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let mut name = first_line.trim();
    loop {
        let next = name
            .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*'))
            .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?'))
            .trim();
        if next == name {
            return name.to_string();
        }
        name = next;
    }
}

/// Fixed sentence, no model involved.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainPresenter;

#[async_trait]
impl ScorePresenter for PlainPresenter {
    async fn present(&self, result: &QueryResult) -> Result<String, AppError> {
        Ok(plain_sentence(result))
    }
}

pub fn plain_sentence(result: &QueryResult) -> String {
    let noun = if result.review_count == 1 { "review" } else { "reviews" };
    format!(
        "The overall score for {} is {:.3} out of 10, based on {} {noun}.",
        result.restaurant_name, result.overall_score, result.review_count
    )
}

pub struct LlmPresenter {
    client: Arc<OpenAiClient>,
    model: String,
}

impl LlmPresenter {
    pub fn new(client: Arc<OpenAiClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl ScorePresenter for LlmPresenter {
    async fn present(&self, result: &QueryResult) -> Result<String, AppError> {
        let input = format!(
            "restaurant: {}\noverall_score: {:.3}\nreview_count: {}",
            result.restaurant_name, result.overall_score, result.review_count
        );
        let reply = self.client.complete(&self.model, PRESENT_PROMPT, &input).await?;
        Ok(reply)
    }
}
