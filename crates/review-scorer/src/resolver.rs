use std::sync::Arc;

use tracing::debug;

use crate::error::AppError;
use crate::nlu::QueryInterpreter;

/// Turns a free-text question into a restaurant name for the review store.
///
/// The interpreter does the language work. The resolver only guarantees that a
/// usable, non-blank name comes out, and passes it on without correcting it:
/// exact matching is the store's job.
#[derive(Clone)]
pub struct QueryResolver {
    interpreter: Arc<dyn QueryInterpreter>,
}

impl QueryResolver {
    pub fn new(interpreter: Arc<dyn QueryInterpreter>) -> Self {
        Self { interpreter }
    }

    pub async fn resolve(&self, query: &str) -> Result<String, AppError> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidQuery("query must not be empty".to_string()));
        }
        let name = self.interpreter.interpret(query).await?;
        if name.trim().is_empty() {
            return Err(AppError::InvalidQuery(format!(
                "no restaurant name found in query: {query}"
            )));
        }
        debug!(query, resolved = %name, "query resolved");
        Ok(name)
    }
}
