use std::path::PathBuf;

use crate::aggregate::ScoringPolicy;
use crate::error::AppError;
use crate::store::NameMatching;

/// Where restaurant names come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NluMode {
    /// Ask the chat model to pull the name out of the question.
    Llm,
    /// The question is the name.
    Literal,
}

/// How results are phrased for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenterMode {
    Plain,
    Llm,
}

/// Application configuration loaded explicitly from environment variables.
///
/// The chat model host is configured separately through
/// `review_common::openai::OpenAiClientConfig::from_env`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Review corpus, one `<name>. <review>` record per line.
    pub reviews_path: PathBuf,
    pub name_matching: NameMatching,
    pub scoring_policy: ScoringPolicy,
    pub nlu_mode: NluMode,
    pub presenter_mode: PresenterMode,
    /// Chat model used for interpretation and presentation.
    pub nlu_model: String,
}

impl Config {
    /// Optional:
    /// - `REVIEWS_PATH` (default: "restaurant-data.txt")
    /// - `REVIEW_NAME_MATCHING`: "exact" (default) or "sanitized"
    /// - `REVIEW_SCORING_POLICY`: "mean-product" (default) or "geometric-mean"
    /// - `NLU_MODE`: "llm" (default) or "literal"
    /// - `PRESENTER_MODE`: "plain" (default) or "llm"
    /// - `NLU_MODEL` (default: "gpt-4o-mini")
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let reviews_path = PathBuf::from(
            var("REVIEWS_PATH").unwrap_or_else(|| "restaurant-data.txt".to_string()),
        );
        if !reviews_path.exists() {
            return Err(AppError::Config(format!(
                "review corpus not found: {} (set REVIEWS_PATH)",
                reviews_path.display()
            )));
        }

        let name_matching = match var("REVIEW_NAME_MATCHING") {
            Some(v) => v.parse()?,
            None => NameMatching::default(),
        };

        let scoring_policy = match var("REVIEW_SCORING_POLICY") {
            Some(v) => v.parse()?,
            None => ScoringPolicy::default(),
        };

        let nlu_mode = match var("NLU_MODE").as_deref().map(str::trim) {
            None | Some("llm") => NluMode::Llm,
            Some("literal") => NluMode::Literal,
            Some(other) => {
                return Err(AppError::Config(format!(
                    "unknown NLU_MODE '{other}' (expected 'llm' or 'literal')"
                )))
            }
        };

        let presenter_mode = match var("PRESENTER_MODE").as_deref().map(str::trim) {
            None | Some("plain") => PresenterMode::Plain,
            Some("llm") => PresenterMode::Llm,
            Some(other) => {
                return Err(AppError::Config(format!(
                    "unknown PRESENTER_MODE '{other}' (expected 'plain' or 'llm')"
                )))
            }
        };

        let nlu_model = var("NLU_MODEL")
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "gpt-4o-mini".to_string());

        Ok(Self {
            reviews_path,
            name_matching,
            scoring_policy,
            nlu_mode,
            presenter_mode,
            nlu_model,
        })
    }

    /// Whether any component needs the chat model host.
    pub fn needs_llm(&self) -> bool {
        self.nlu_mode == NluMode::Llm || self.presenter_mode == PresenterMode::Llm
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn corpus_path() -> String {
        // any existing file will do
        env!("CARGO_MANIFEST_DIR").to_string() + "/Cargo.toml"
    }

    fn load(pairs: &[(&str, &str)]) -> Result<Config, AppError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let path = corpus_path();
        let config = load(&[("REVIEWS_PATH", path.as_str())]).unwrap();
        assert_eq!(config.name_matching, NameMatching::Exact);
        assert_eq!(config.scoring_policy, ScoringPolicy::MeanProduct);
        assert_eq!(config.nlu_mode, NluMode::Llm);
        assert_eq!(config.presenter_mode, PresenterMode::Plain);
        assert_eq!(config.nlu_model, "gpt-4o-mini");
        assert!(config.needs_llm());
    }

    #[test]
    fn overrides() {
        let path = corpus_path();
        let config = load(&[
            ("REVIEWS_PATH", path.as_str()),
            ("REVIEW_NAME_MATCHING", "sanitized"),
            ("REVIEW_SCORING_POLICY", "geometric-mean"),
            ("NLU_MODE", "literal"),
            ("NLU_MODEL", "local-llama"),
        ])
        .unwrap();
        assert_eq!(config.name_matching, NameMatching::Sanitized);
        assert_eq!(config.scoring_policy, ScoringPolicy::GeometricMean);
        assert_eq!(config.nlu_mode, NluMode::Literal);
        assert_eq!(config.nlu_model, "local-llama");
        assert!(!config.needs_llm());
    }

    #[test]
    fn rejects_missing_corpus_and_bad_modes() {
        assert!(matches!(
            load(&[("REVIEWS_PATH", "/definitely/not/here.txt")]),
            Err(AppError::Config(_))
        ));
        let path = corpus_path();
        assert!(matches!(
            load(&[("REVIEWS_PATH", path.as_str()), ("NLU_MODE", "telepathy")]),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            load(&[("REVIEWS_PATH", path.as_str()), ("REVIEW_SCORING_POLICY", "median")]),
            Err(AppError::Config(_))
        ));
    }
}
