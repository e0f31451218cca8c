use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::AppError;
use crate::lexicon::Lexicon;
use crate::model::{QueryResult, RestaurantSummary, Score};
use crate::nlu::ScorePresenter;
use crate::pipeline::{Pipeline, PipelineRun, PipelineStage};

#[derive(Clone)]
pub struct ReviewScorerServer {
    pipeline: Pipeline,
    presenter: Arc<dyn ScorePresenter>,
    tool_router: ToolRouter<ReviewScorerServer>,
}

impl ReviewScorerServer {
    pub fn new(pipeline: Pipeline, presenter: Arc<dyn ScorePresenter>) -> Self {
        Self {
            pipeline,
            presenter,
            tool_router: Self::tool_router(),
        }
    }

    async fn answer(&self, result: QueryResult) -> Result<Json<RatingResponse>, String> {
        let answer = self
            .presenter
            .present(&result)
            .await
            .map_err(|e| format!("presentation failed: {e}"))?;
        Ok(Json(RatingResponse { result, answer }))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct RateRestaurantParams {
    /// Free-text question naming a restaurant, e.g. "How good is Subway?".
    query: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct RestaurantNameParams {
    /// Restaurant name as it appears in the review corpus (case-insensitive).
    restaurant_name: String,
}

#[derive(Debug, Serialize, JsonSchema)]
struct RatingResponse {
    result: QueryResult,
    answer: String,
}

#[derive(Debug, Serialize, JsonSchema)]
struct ReviewEntry {
    text: String,
    food_score: Option<u8>,
    customer_service_score: Option<u8>,
    /// Set when no clean keyword signal could be extracted.
    error: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
struct ReviewListResponse {
    restaurant_name: String,
    reviews: Vec<ReviewEntry>,
}

#[derive(Debug, Serialize, JsonSchema)]
struct RestaurantListResponse {
    restaurants: Vec<RestaurantSummary>,
    review_count: usize,
}

#[tool_router]
impl ReviewScorerServer {
    #[tool(description = "Answer a free-text question about a restaurant with its overall review score (0-10), computed from keyword-scored food and customer service ratings.")]
    async fn rate_restaurant(
        &self,
        Parameters(params): Parameters<RateRestaurantParams>,
    ) -> Result<Json<RatingResponse>, String> {
        info!(query = %params.query, "rate_restaurant tool invoked");
        let PipelineRun {
            stage,
            failed_at,
            result,
        } = self.pipeline.run_traced(&params.query).await;
        debug!(stage = %stage, "rate_restaurant pipeline finished");
        let result = result.map_err(|e| stage_error(failed_at, &e))?;
        self.answer(result).await
    }

    #[tool(description = "Compute the overall review score (0-10) for a restaurant by exact name.")]
    async fn score_restaurant(
        &self,
        Parameters(params): Parameters<RestaurantNameParams>,
    ) -> Result<Json<RatingResponse>, String> {
        let name = params.restaurant_name.trim().to_string();
        if name.is_empty() {
            return Err("restaurant_name must not be empty".to_string());
        }
        let PipelineRun {
            failed_at, result, ..
        } = self.pipeline.score_traced(&name);
        let result = result.map_err(|e| stage_error(failed_at, &e))?;
        self.answer(result).await
    }

    #[tool(description = "List a restaurant's reviews with the food and customer service scores extracted from each.")]
    async fn get_reviews(
        &self,
        Parameters(params): Parameters<RestaurantNameParams>,
    ) -> Result<Json<ReviewListResponse>, String> {
        let name = params.restaurant_name.trim().to_string();
        if name.is_empty() {
            return Err("restaurant_name must not be empty".to_string());
        }
        let reviews = self
            .pipeline
            .store()
            .lookup(&name)
            .map_err(|e| e.to_string())?;

        let restaurant_name = reviews
            .first()
            .map(|r| r.restaurant_name.clone())
            .unwrap_or(name);
        let extractor = self.pipeline.extractor();
        let entries = reviews
            .into_iter()
            .map(|review| match extractor.extract(review) {
                Ok(pair) => ReviewEntry {
                    text: review.text.clone(),
                    food_score: Some(pair.food_score.get()),
                    customer_service_score: Some(pair.customer_service_score.get()),
                    error: None,
                },
                Err(e) => ReviewEntry {
                    text: review.text.clone(),
                    food_score: None,
                    customer_service_score: None,
                    error: Some(e.to_string()),
                },
            })
            .collect();

        Ok(Json(ReviewListResponse {
            restaurant_name,
            reviews: entries,
        }))
    }

    #[tool(description = "List every restaurant in the review corpus with its review count.")]
    async fn list_restaurants(&self) -> Result<Json<RestaurantListResponse>, String> {
        let store = self.pipeline.store();
        Ok(Json(RestaurantListResponse {
            restaurants: store.restaurants(),
            review_count: store.len(),
        }))
    }
}

#[tool_handler]
impl ServerHandler for ReviewScorerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "review-scorer".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "Restaurant review scoring MCP server. Each review is scored 1-5 for food and \
                 customer service from a fixed adjective vocabulary ({}), and all reviews for a \
                 restaurant are combined into one 0-10 score ({} policy). Use rate_restaurant \
                 for natural language questions, score_restaurant when the name is known, \
                 get_reviews to inspect per-review scores and list_restaurants to browse.",
                vocabulary(self.pipeline.extractor().lexicon()),
                self.pipeline.policy().name()
            )),
        }
    }
}

fn stage_error(failed_at: Option<PipelineStage>, error: &AppError) -> String {
    match failed_at {
        Some(stage) => format!("{stage} failed: {error}"),
        None => error.to_string(),
    }
}

fn vocabulary(lexicon: &Lexicon) -> String {
    (Score::MIN.get()..=Score::MAX.get())
        .filter_map(|v| Score::new(v).ok())
        .map(|score| format!("{score}: {}", lexicon.adjectives_for(score).join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ScoringPolicy;
    use crate::extract::ReviewExtractor;
    use crate::nlu::{LiteralInterpreter, PlainPresenter};
    use crate::resolver::QueryResolver;
    use crate::store::{parse_corpus, NameMatching, ReviewStore};

    fn server() -> ReviewScorerServer {
        let corpus = "\
Subway. The food was good, but the customer service was amazing.
Subway. The food had forgettable bread. The customer service was unpleasant.
Noodle Hut. The noodles were hot. The room was loud.
";
        let store = ReviewStore::new(parse_corpus(corpus).unwrap(), NameMatching::Exact);
        let pipeline = Pipeline::new(
            QueryResolver::new(Arc::new(LiteralInterpreter)),
            Arc::new(store),
            Arc::new(ReviewExtractor::default()),
            ScoringPolicy::MeanProduct,
        );
        ReviewScorerServer::new(pipeline, Arc::new(PlainPresenter))
    }

    #[test]
    fn tools_publish_output_schemas() {
        let tools = ReviewScorerServer::tool_router().list_all();
        for name in [
            "rate_restaurant",
            "score_restaurant",
            "get_reviews",
            "list_restaurants",
        ] {
            let tool = tools
                .iter()
                .find(|t| t.name == name)
                .unwrap_or_else(|| panic!("missing tool: {name}"));
            assert!(
                tool.output_schema.is_some(),
                "tool {name} should publish output_schema"
            );
        }
    }

    #[tokio::test]
    async fn rate_restaurant_returns_score_and_answer() {
        let server = server();
        let Json(response) = server
            .rate_restaurant(Parameters(RateRestaurantParams {
                query: "subway".to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(response.result.restaurant_name, "Subway");
        assert_eq!(response.result.review_count, 2);
        // food (4 + 3) / 2, service (5 + 2) / 2
        assert!((response.result.overall_score - 4.9).abs() < 1e-9);
        assert!(response.answer.contains("4.900"));
    }

    #[tokio::test]
    async fn errors_surface_as_tool_errors() {
        let server = server();
        let Err(err) = server
            .score_restaurant(Parameters(RestaurantNameParams {
                restaurant_name: "Nowhere".to_string(),
            }))
            .await
        else {
            panic!("Nowhere should not score");
        };
        assert!(err.starts_with("fetching failed"), "{err}");
        assert!(err.contains("no reviews found"), "{err}");

        let Err(err) = server
            .score_restaurant(Parameters(RestaurantNameParams {
                restaurant_name: "Noodle Hut".to_string(),
            }))
            .await
        else {
            panic!("Noodle Hut should not score");
        };
        assert!(err.starts_with("extracting failed"), "{err}");
        assert!(err.contains("malformed review"), "{err}");
    }

    #[tokio::test]
    async fn get_reviews_reports_per_review_scores() {
        let server = server();
        let Json(response) = server
            .get_reviews(Parameters(RestaurantNameParams {
                restaurant_name: "noodle hut".to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(response.restaurant_name, "Noodle Hut");
        assert_eq!(response.reviews.len(), 1);
        assert!(response.reviews[0].food_score.is_none());
        assert!(response.reviews[0].error.is_some());

        let Json(response) = server
            .get_reviews(Parameters(RestaurantNameParams {
                restaurant_name: "Subway".to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(response.reviews[1].food_score, Some(3));
        assert_eq!(response.reviews[1].customer_service_score, Some(2));
    }

    #[tokio::test]
    async fn rating_response_serializes_result_and_answer() {
        let Json(response) = server()
            .score_restaurant(Parameters(RestaurantNameParams {
                restaurant_name: "Subway".to_string(),
            }))
            .await
            .unwrap();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["result"]["restaurant_name"], "Subway");
        assert_eq!(value["result"]["review_count"], 2);
        assert!(value["answer"].as_str().unwrap().contains("Subway"));
    }

    #[test]
    fn vocabulary_lists_every_level() {
        let text = vocabulary(&Lexicon::standard());
        assert!(text.starts_with("1: awful, horrible, disgusting; 2: bad"));
        assert!(text.ends_with("5: awesome, incredible, amazing"));
    }

    #[tokio::test]
    async fn list_restaurants_counts_reviews() {
        let Json(response) = server().list_restaurants().await.unwrap();
        assert_eq!(response.review_count, 3);
        assert_eq!(response.restaurants.len(), 2);
        assert_eq!(response.restaurants[0].name, "Subway");
        assert_eq!(response.restaurants[0].review_count, 2);
    }
}
