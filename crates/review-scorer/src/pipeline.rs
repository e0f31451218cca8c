//! Query orchestration: resolve the restaurant, fetch its reviews, extract score
//! pairs, aggregate them.
//!
//! Stages run strictly in order with no retries. The first failing stage ends
//! the run in `Failed` and its error is returned as-is; partial results are dropped.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::ScoringPolicy;
use crate::error::AppError;
use crate::extract::ReviewExtractor;
use crate::model::QueryResult;
use crate::resolver::QueryResolver;
use crate::store::ReviewStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Resolving,
    Fetching,
    Extracting,
    Aggregating,
    Done,
    Failed,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PipelineStage::Resolving => "resolving",
            PipelineStage::Fetching => "fetching",
            PipelineStage::Extracting => "extracting",
            PipelineStage::Aggregating => "aggregating",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug)]
pub struct PipelineRun {
    /// `Done` or `Failed`.
    pub stage: PipelineStage,
    pub failed_at: Option<PipelineStage>,
    pub result: Result<QueryResult, AppError>,
}

struct StageTracker {
    current: PipelineStage,
}

impl StageTracker {
    fn start(stage: PipelineStage) -> Self {
        debug!(stage = ?stage, "pipeline started");
        Self { current: stage }
    }

    fn enter(&mut self, next: PipelineStage) {
        if self.current == next {
            return;
        }
        debug!(from = ?self.current, to = ?next, "pipeline transition");
        self.current = next;
    }

    fn finish(self, result: Result<QueryResult, AppError>) -> PipelineRun {
        match result {
            Ok(result) => {
                info!(
                    restaurant = %result.restaurant_name,
                    overall_score = result.overall_score,
                    review_count = result.review_count,
                    "pipeline done"
                );
                PipelineRun {
                    stage: PipelineStage::Done,
                    failed_at: None,
                    result: Ok(result),
                }
            }
            Err(e) => {
                warn!(stage = ?self.current, error = %e, "pipeline failed");
                PipelineRun {
                    stage: PipelineStage::Failed,
                    failed_at: Some(self.current),
                    result: Err(e),
                }
            }
        }
    }
}

#[derive(Clone)]
pub struct Pipeline {
    resolver: QueryResolver,
    store: Arc<ReviewStore>,
    extractor: Arc<ReviewExtractor>,
    policy: ScoringPolicy,
}

impl Pipeline {
    pub fn new(
        resolver: QueryResolver,
        store: Arc<ReviewStore>,
        extractor: Arc<ReviewExtractor>,
        policy: ScoringPolicy,
    ) -> Self {
        Self {
            resolver,
            store,
            extractor,
            policy,
        }
    }

    pub async fn run(&self, query: &str) -> Result<QueryResult, AppError> {
        self.run_traced(query).await.result
    }

    pub async fn run_traced(&self, query: &str) -> PipelineRun {
        let mut tracker = StageTracker::start(PipelineStage::Resolving);
        let result = match self.resolver.resolve(query).await {
            Ok(name) => self.score_stages(&mut tracker, &name),
            Err(e) => Err(e),
        };
        tracker.finish(result)
    }

    /// Score a restaurant whose name is already known, skipping resolution.
    pub fn score_restaurant(&self, name: &str) -> Result<QueryResult, AppError> {
        self.score_traced(name).result
    }

    pub fn score_traced(&self, name: &str) -> PipelineRun {
        let mut tracker = StageTracker::start(PipelineStage::Fetching);
        let result = self.score_stages(&mut tracker, name);
        tracker.finish(result)
    }

    fn score_stages(
        &self,
        tracker: &mut StageTracker,
        name: &str,
    ) -> Result<QueryResult, AppError> {
        tracker.enter(PipelineStage::Fetching);
        let reviews = self.store.lookup(name)?;

        tracker.enter(PipelineStage::Extracting);
        let pairs = self.extractor.extract_all(&reviews)?;

        tracker.enter(PipelineStage::Aggregating);
        let overall_score = self.policy.aggregate(&pairs)?;

        let restaurant_name = reviews
            .first()
            .map(|r| r.restaurant_name.clone())
            .unwrap_or_else(|| name.trim().to_string());
        Ok(QueryResult {
            restaurant_name,
            overall_score,
            review_count: pairs.len(),
        })
    }

    pub fn store(&self) -> &ReviewStore {
        &self.store
    }

    pub fn extractor(&self) -> &ReviewExtractor {
        &self.extractor
    }

    pub fn policy(&self) -> ScoringPolicy {
        self.policy
    }
}
