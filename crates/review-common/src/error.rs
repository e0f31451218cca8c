use crate::openai::OpenAiClientError;

/// Error types shared across the review tooling crates.
///
/// These errors represent failures in infrastructure components (the chat model host)
/// rather than in review scoring itself. Application crates wrap `CommonError` via `#[from]`.
#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("llm error: {0}")]
    Llm(#[from] OpenAiClientError),

    #[error("llm returned an empty completion")]
    EmptyCompletion,
}
