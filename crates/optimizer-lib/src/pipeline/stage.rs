//! Stage identities and per-run bookkeeping

use crate::error::PipelineResult;
use crate::observability::{PipelineMetrics, StructuredLogger};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Ingest,
    ExtractFeatures,
    AnalyzePatterns,
    AssessRisk,
    GenerateRecommendations,
    PredictPerformance,
    Validate,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Ingest,
        Stage::ExtractFeatures,
        Stage::AnalyzePatterns,
        Stage::AssessRisk,
        Stage::GenerateRecommendations,
        Stage::PredictPerformance,
        Stage::Validate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Ingest => "ingest",
            Stage::ExtractFeatures => "extract_features",
            Stage::AnalyzePatterns => "analyze_patterns",
            Stage::AssessRisk => "assess_risk",
            Stage::GenerateRecommendations => "generate_recommendations",
            Stage::PredictPerformance => "predict_performance",
            Stage::Validate => "validate",
        }
    }

    /// Whether a failure in this stage halts the run
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Stage::AssessRisk | Stage::PredictPerformance)
    }

    pub fn failure_message(&self) -> &'static str {
        match self {
            Stage::Ingest => "Data ingestion failed",
            Stage::ExtractFeatures => "Feature extraction failed",
            Stage::AnalyzePatterns => "Pattern analysis failed",
            Stage::AssessRisk => "Risk assessment failed",
            Stage::GenerateRecommendations => "Recommendation generation failed",
            Stage::PredictPerformance => "Performance prediction failed",
            Stage::Validate => "Validation failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bookkeeping record for one executed stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: Stage,
    pub success: bool,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub duration_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Closed set of outcomes for a stage
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Completed(T),
    /// Disabled by configuration
    Skipped,
    Failed { reason: String },
}

impl<T> StageOutcome<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            StageOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }
}

/// Compact payload recorded in a stage's result
pub trait StagePayload {
    fn payload(&self) -> serde_json::Value;
}

/// State owned by a single run: the append-only stage log plus telemetry
pub struct RunContext {
    pub as_of: DateTime<Utc>,
    started: Instant,
    stage_results: Vec<StageResult>,
    metrics: PipelineMetrics,
    logger: StructuredLogger,
}

impl RunContext {
    pub fn new(as_of: DateTime<Utc>, metrics: PipelineMetrics, logger: StructuredLogger) -> Self {
        Self {
            as_of,
            started: Instant::now(),
            stage_results: Vec::new(),
            metrics,
            logger,
        }
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Record a finished stage and turn its result into an outcome
    pub fn finish<T: StagePayload>(
        &mut self,
        stage: Stage,
        started: Instant,
        result: PipelineResult<T>,
    ) -> StageOutcome<T> {
        let duration_secs = started.elapsed().as_secs_f64();
        self.metrics.observe_stage(stage.as_str(), duration_secs);

        match result {
            Ok(value) => {
                self.logger.log_stage_completed(stage.as_str(), duration_secs);
                self.stage_results.push(StageResult {
                    stage,
                    success: true,
                    payload: value.payload(),
                    timestamp: Utc::now(),
                    duration_secs,
                    error: None,
                });
                StageOutcome::Completed(value)
            }
            Err(e) => {
                let reason = e.to_string();
                self.metrics.inc_stage_failure(stage.as_str());
                self.logger
                    .log_stage_failed(stage.as_str(), stage.is_fatal(), &reason);
                self.stage_results.push(StageResult {
                    stage,
                    success: false,
                    payload: serde_json::Value::Null,
                    timestamp: Utc::now(),
                    duration_secs,
                    error: Some(reason.clone()),
                });
                StageOutcome::Failed { reason }
            }
        }
    }

    pub fn stage_results(&self) -> &[StageResult] {
        &self.stage_results
    }

    pub fn into_stage_results(self) -> Vec<StageResult> {
        self.stage_results
    }
}
