//! Optimization pipeline orchestration
//!
//! A run moves strictly forward through seven stages:
//! `ingest → extract_features → analyze_patterns → [assess_risk] →
//! generate_recommendations → [predict_performance] → validate`.
//!
//! Bracketed stages can be disabled and their failure only degrades the run.
//! Any other stage failing ends the run with an error report that still
//! carries every stage result recorded so far.

mod sanitize;
mod scheduler;
mod stage;
mod summary;
mod validator;


pub use sanitize::Sanitize;
pub use scheduler::{PipelineScheduler, SchedulerStats, DEFAULT_RUN_INTERVAL};
pub use stage::{RunContext, Stage, StageOutcome, StagePayload, StageResult};
pub use summary::{
    DataProcessingStats, ExecutionSummary, RecommendationStats, RunSummary, StagePerformance,
};
pub use validator::{Rejection, ValidationOutcome, ValidationSummary, Validator, DEFAULT_MIN_SAVINGS};

use crate::analysis::{PatternAnalyzer, VolatilityAnomalyDetector};
use crate::error::{PipelineError, PipelineResult};
use crate::features::{FeatureExtractor, DEFAULT_ANALYSIS_WINDOW_DAYS, MIN_DATA_POINTS};
use crate::models::{
    CostAnomaly, CostRecord, FeatureVector, InefficiencyKind, PerformancePrediction,
    Recommendation, Resource, ResourceAnalysis, RiskAssessment, RiskLevel,
};
use crate::observability::{PipelineMetrics, StructuredLogger};
use crate::performance::PerformancePredictor;
use crate::recommend::{HeuristicConfig, RecommendationEngine, ResourceContext};
use crate::risk::{ActionDescriptor, ActionKind, RiskScorer};
use crate::source::{DataSource, DateRange, Inventory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Days of cost history considered
    pub analysis_window_days: u32,
    /// Minimum cost records before a resource is analysed
    pub min_data_points: usize,
    /// Recommendations below this confidence are rejected
    pub confidence_threshold: f64,
    pub max_recommendations_per_resource: usize,
    pub enable_anomaly_detection: bool,
    pub enable_risk_assessment: bool,
    pub enable_performance_prediction: bool,
    /// Recommendations saving less than this per month are rejected
    pub min_savings: f64,
    pub heuristics: HeuristicConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            analysis_window_days: DEFAULT_ANALYSIS_WINDOW_DAYS,
            min_data_points: MIN_DATA_POINTS,
            confidence_threshold: 0.6,
            max_recommendations_per_resource: 3,
            enable_anomaly_detection: true,
            enable_risk_assessment: true,
            enable_performance_prediction: true,
            min_savings: DEFAULT_MIN_SAVINGS,
            heuristics: HeuristicConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        if self.analysis_window_days == 0 {
            return Err(PipelineError::InvalidConfig(
                "analysis_window_days must be at least 1".to_string(),
            ));
        }
        if self.min_data_points == 0 {
            return Err(PipelineError::InvalidConfig(
                "min_data_points must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(PipelineError::InvalidConfig(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if !self.min_savings.is_finite() || self.min_savings < 0.0 {
            return Err(PipelineError::InvalidConfig(
                "min_savings must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }
}

/// Risk of acting on one detected inefficiency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingRisk {
    pub resource_id: String,
    pub inefficiency: InefficiencyKind,
    pub assessment: RiskAssessment,
}

impl Sanitize for FindingRisk {
    fn sanitize(&mut self) {
        self.assessment.sanitize();
    }
}

impl Sanitize for StageResult {
    fn sanitize(&mut self) {
        self.duration_secs.sanitize();
        self.payload.sanitize();
    }
}

/// Output of the ingest stage
#[derive(Debug, Clone)]
pub struct Ingested {
    pub inventory: Inventory,
    pub dropped_records: usize,
}

impl StagePayload for Ingested {
    fn payload(&self) -> serde_json::Value {
        serde_json::json!({
            "resources": self.inventory.resources.len(),
            "cost_records": self.inventory.cost_records.len(),
            "dropped_records": self.dropped_records,
        })
    }
}

/// Output of the feature extraction stage
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    pub features: BTreeMap<String, FeatureVector>,
    pub skipped: Vec<String>,
}

impl StagePayload for FeatureSet {
    fn payload(&self) -> serde_json::Value {
        serde_json::json!({
            "extracted": self.features.len(),
            "skipped": self.skipped.len(),
        })
    }
}

/// Output of the pattern analysis stage
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    pub analyses: BTreeMap<String, ResourceAnalysis>,
    pub anomalies: Vec<CostAnomaly>,
}

impl PatternSet {
    pub fn inefficiency_count(&self) -> usize {
        self.analyses.values().map(|a| a.inefficiencies.len()).sum()
    }
}

impl StagePayload for PatternSet {
    fn payload(&self) -> serde_json::Value {
        serde_json::json!({
            "analyzed": self.analyses.len(),
            "inefficiencies": self.inefficiency_count(),
            "anomalies": self.anomalies.len(),
        })
    }
}

impl StagePayload for Vec<FindingRisk> {
    fn payload(&self) -> serde_json::Value {
        let count = |level: RiskLevel| {
            self.iter()
                .filter(|r| r.assessment.risk_level == level)
                .count()
        };
        serde_json::json!({
            "assessed": self.len(),
            "high_risk": count(RiskLevel::High),
            "critical_risk": count(RiskLevel::Critical),
        })
    }
}

impl StagePayload for Vec<Recommendation> {
    fn payload(&self) -> serde_json::Value {
        let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
        for rec in self {
            *by_type.entry(rec.kind().as_str()).or_insert(0) += 1;
        }
        serde_json::json!({
            "generated": self.len(),
            "by_type": by_type,
            "total_potential_savings": self.iter().map(|r| r.potential_savings).sum::<f64>(),
        })
    }
}

impl StagePayload for Vec<PerformancePrediction> {
    fn payload(&self) -> serde_json::Value {
        serde_json::json!({
            "predicted": self.len(),
            "degradations": self.iter().filter(|p| p.predicted_performance_impact < 0.0).count(),
        })
    }
}

impl StagePayload for ValidationOutcome {
    fn payload(&self) -> serde_json::Value {
        serde_json::json!({
            "validated": self.summary.validated,
            "invalid": self.summary.invalid,
            "pass_rate": self.summary.pass_rate,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Error => "error",
        }
    }
}

/// Everything a run hands back to its caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub recommendations: Vec<Recommendation>,
    pub rejected: Vec<Rejection>,
    pub anomalies: Vec<CostAnomaly>,
    pub finding_risks: Vec<FindingRisk>,
    /// Optional stages that failed without halting the run
    pub degraded_stages: Vec<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
    pub stage_results: Vec<StageResult>,
    pub total_duration_secs: f64,
    pub started_at: DateTime<Utc>,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    pub fn total_savings(&self) -> f64 {
        self.recommendations.iter().map(|r| r.potential_savings).sum()
    }
}

impl Sanitize for PipelineReport {
    fn sanitize(&mut self) {
        self.recommendations.sanitize();
        self.anomalies.sanitize();
        self.finding_risks.sanitize();
        self.summary.sanitize();
        self.stage_results.sanitize();
        self.total_duration_secs.sanitize();
    }
}

/// The optimization pipeline
pub struct Pipeline {
    config: PipelineConfig,
    source: Arc<dyn DataSource>,
    extractor: FeatureExtractor,
    analyzer: PatternAnalyzer,
    anomaly_detector: VolatilityAnomalyDetector,
    risk_scorer: RiskScorer,
    engine: RecommendationEngine,
    predictor: PerformancePredictor,
    validator: Validator,
    metrics: PipelineMetrics,
    logger: StructuredLogger,
    #[cfg(test)]
    failing_stages: std::collections::HashSet<Stage>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    /// Make `stage` fail on every run
    #[cfg(test)]
    pub(crate) fn fail_stage(mut self, stage: Stage) -> Self {
        self.failing_stages.insert(stage);
        self
    }

    #[cfg(test)]
    fn forced_failure(&self, stage: Stage) -> PipelineResult<()> {
        if self.failing_stages.contains(&stage) {
            return Err(PipelineError::StageFailed {
                stage: stage.to_string(),
                reason: "forced failure".to_string(),
            });
        }
        Ok(())
    }

    #[cfg(not(test))]
    fn forced_failure(&self, _stage: Stage) -> PipelineResult<()> {
        Ok(())
    }

    /// Run over all resources, or only `resource_ids` when given
    pub async fn run(&self, resource_ids: Option<&BTreeSet<String>>) -> PipelineReport {
        self.run_at(resource_ids, Utc::now()).await
    }

    /// Run as of a fixed instant, which anchors the analysis window
    pub async fn run_at(
        &self,
        resource_ids: Option<&BTreeSet<String>>,
        now: DateTime<Utc>,
    ) -> PipelineReport {
        let mut ctx = RunContext::new(now, self.metrics.clone(), self.logger.clone());
        info!(
            resources = resource_ids.map(|ids| ids.len()),
            window_days = self.config.analysis_window_days,
            "Starting optimization run"
        );

        let started = Instant::now();
        let result = self.ingest(resource_ids, now).await;
        let ingested = match ctx.finish(Stage::Ingest, started, result) {
            StageOutcome::Completed(v) => v,
            _ => return self.abort(ctx, Stage::Ingest),
        };
        let inventory = &ingested.inventory;

        let started = Instant::now();
        let result = self.extract_features(inventory, now);
        let features = match ctx.finish(Stage::ExtractFeatures, started, result) {
            StageOutcome::Completed(v) => v,
            _ => return self.abort(ctx, Stage::ExtractFeatures),
        };

        let started = Instant::now();
        let result = self.analyze_patterns(&features);
        let patterns = match ctx.finish(Stage::AnalyzePatterns, started, result) {
            StageOutcome::Completed(v) => v,
            _ => return self.abort(ctx, Stage::AnalyzePatterns),
        };

        let mut degraded_stages = Vec::new();

        let finding_risks = if self.config.enable_risk_assessment {
            let started = Instant::now();
            let result = self.assess_risk(inventory, &patterns, now);
            ctx.finish(Stage::AssessRisk, started, result)
        } else {
            StageOutcome::Skipped
        };
        let finding_risks = match finding_risks {
            StageOutcome::Completed(v) => v,
            StageOutcome::Skipped => Vec::new(),
            StageOutcome::Failed { reason } => {
                warn!(error = %reason, "Risk assessment failed, continuing without risk data");
                degraded_stages.push(Stage::AssessRisk);
                Vec::new()
            }
        };

        let started = Instant::now();
        let result = self.generate_recommendations(inventory, &features, &patterns, now);
        let mut recommendations = match ctx.finish(Stage::GenerateRecommendations, started, result)
        {
            StageOutcome::Completed(v) => v,
            _ => return self.abort(ctx, Stage::GenerateRecommendations),
        };
        let generated = recommendations.len();

        let predictions = if self.config.enable_performance_prediction {
            let started = Instant::now();
            let result = self.predict_performance(inventory, &features, &recommendations, now);
            ctx.finish(Stage::PredictPerformance, started, result)
        } else {
            StageOutcome::Skipped
        };
        match predictions {
            StageOutcome::Completed(predictions) => {
                for (rec, prediction) in recommendations.iter_mut().zip(predictions) {
                    rec.performance = Some(prediction);
                }
            }
            StageOutcome::Skipped => {}
            StageOutcome::Failed { reason } => {
                warn!(error = %reason, "Performance prediction failed, continuing without predictions");
                degraded_stages.push(Stage::PredictPerformance);
            }
        }

        let started = Instant::now();
        let result = Ok(self.validator.validate(recommendations));
        let validation = match ctx.finish(Stage::Validate, started, result) {
            StageOutcome::Completed(v) => v,
            _ => return self.abort(ctx, Stage::Validate),
        };

        let (analyzed, skipped) = (features.features.len(), features.skipped.len());
        let data_processing = DataProcessingStats {
            resources: inventory.resources.len(),
            cost_records: inventory.cost_records.len(),
            dropped_records: ingested.dropped_records,
            resources_analyzed: analyzed,
            resources_skipped: skipped,
            inefficiencies: patterns.inefficiency_count(),
            anomalies: patterns.anomalies.len(),
        };
        let rec_stats = RecommendationStats::from_validated(
            generated,
            &validation.summary,
            &validation.recommendations,
        );

        let total_duration_secs = ctx.elapsed_secs();
        let stage_results = ctx.into_stage_results();
        let summary = RunSummary::build(&stage_results, data_processing, rec_stats);

        let mut report = PipelineReport {
            status: RunStatus::Success,
            message: None,
            error: None,
            recommendations: validation.recommendations,
            rejected: validation.rejected,
            anomalies: patterns.anomalies,
            finding_risks,
            degraded_stages,
            summary: Some(summary),
            stage_results,
            total_duration_secs,
            started_at: now,
        };
        report.sanitize();

        let total_savings = report.total_savings();
        self.metrics.inc_run(RunStatus::Success.as_str());
        self.metrics.set_resources(analyzed, skipped);
        self.metrics
            .set_recommendations(generated, report.recommendations.len(), total_savings);
        self.logger.log_run_finished(
            RunStatus::Success.as_str(),
            report.recommendations.len(),
            total_savings,
            report.total_duration_secs,
        );
        report
    }

    /// Build the error report for a fatal stage failure
    fn abort(&self, ctx: RunContext, stage: Stage) -> PipelineReport {
        let error = ctx
            .stage_results()
            .last()
            .and_then(|r| r.error.clone());
        let total_duration_secs = ctx.elapsed_secs();
        let started_at = ctx.as_of;

        let mut report = PipelineReport {
            status: RunStatus::Error,
            message: Some(stage.failure_message().to_string()),
            error,
            recommendations: Vec::new(),
            rejected: Vec::new(),
            anomalies: Vec::new(),
            finding_risks: Vec::new(),
            degraded_stages: Vec::new(),
            summary: None,
            stage_results: ctx.into_stage_results(),
            total_duration_secs,
            started_at,
        };
        report.sanitize();

        self.metrics.inc_run(RunStatus::Error.as_str());
        self.logger.log_run_finished(
            RunStatus::Error.as_str(),
            0,
            0.0,
            report.total_duration_secs,
        );
        report
    }

    pub(crate) async fn ingest(
        &self,
        resource_ids: Option<&BTreeSet<String>>,
        now: DateTime<Utc>,
    ) -> PipelineResult<Ingested> {
        let range = DateRange::ending(now.date_naive(), self.config.analysis_window_days);
        let mut inventory = self.source.fetch(resource_ids, range).await?;

        if let Some(ids) = resource_ids {
            for id in ids {
                if !inventory.resources.iter().any(|r| &r.id == id) {
                    warn!(resource_id = %id, "Requested resource not found in inventory");
                }
            }
        }

        let before = inventory.cost_records.len();
        inventory.cost_records.retain(|record| {
            let valid = is_valid_record(record);
            if !valid {
                warn!(
                    resource_id = %record.resource_id,
                    date = %record.date,
                    cost = record.cost,
                    "Dropping invalid cost record"
                );
            }
            valid
        });
        let dropped_records = before - inventory.cost_records.len();

        Ok(Ingested {
            inventory,
            dropped_records,
        })
    }

    pub(crate) fn extract_features(
        &self,
        inventory: &Inventory,
        now: DateTime<Utc>,
    ) -> PipelineResult<FeatureSet> {
        let mut by_resource: HashMap<&str, Vec<CostRecord>> = HashMap::new();
        for record in &inventory.cost_records {
            by_resource
                .entry(record.resource_id.as_str())
                .or_default()
                .push(record.clone());
        }

        let mut set = FeatureSet::default();
        for resource in &inventory.resources {
            if set.features.contains_key(&resource.id) || set.skipped.contains(&resource.id) {
                return Err(PipelineError::DuplicateResource(resource.id.clone()));
            }

            let records = by_resource
                .get(resource.id.as_str())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            match self.extractor.extract(resource, records, now) {
                Some(features) => {
                    set.features.insert(resource.id.clone(), features);
                }
                None => {
                    self.logger.log_resource_skipped(
                        &resource.id,
                        records.len(),
                        self.config.min_data_points,
                    );
                    set.skipped.push(resource.id.clone());
                }
            }
        }
        Ok(set)
    }

    pub(crate) fn analyze_patterns(&self, features: &FeatureSet) -> PipelineResult<PatternSet> {
        let analyses: BTreeMap<String, ResourceAnalysis> = features
            .features
            .iter()
            .map(|(id, f)| (id.clone(), self.analyzer.analyze(f)))
            .collect();

        let anomalies = if self.config.enable_anomaly_detection {
            let vectors: Vec<FeatureVector> = features.features.values().cloned().collect();
            self.anomaly_detector.detect(&vectors)
        } else {
            Vec::new()
        };
        for anomaly in &anomalies {
            debug!(
                resource_id = %anomaly.resource_id,
                z_score = anomaly.z_score,
                "Cost volatility anomaly"
            );
        }

        Ok(PatternSet {
            analyses,
            anomalies,
        })
    }

    pub(crate) fn assess_risk(
        &self,
        inventory: &Inventory,
        patterns: &PatternSet,
        now: DateTime<Utc>,
    ) -> PipelineResult<Vec<FindingRisk>> {
        self.forced_failure(Stage::AssessRisk)?;
        let resources = index_resources(inventory);
        let mut risks = Vec::new();

        for (resource_id, analysis) in &patterns.analyses {
            let resource = lookup(&resources, resource_id)?;
            for inefficiency in &analysis.inefficiencies {
                let action = ActionDescriptor {
                    requires_downtime: matches!(
                        inefficiency.kind,
                        InefficiencyKind::OverProvisioning | InefficiencyKind::UnderUtilization
                    ),
                    ..ActionDescriptor::new(ActionKind::Other)
                };
                risks.push(FindingRisk {
                    resource_id: resource_id.clone(),
                    inefficiency: inefficiency.kind,
                    assessment: self.risk_scorer.assess_at(resource, &action, now),
                });
            }
        }
        Ok(risks)
    }

    pub(crate) fn generate_recommendations(
        &self,
        inventory: &Inventory,
        features: &FeatureSet,
        patterns: &PatternSet,
        now: DateTime<Utc>,
    ) -> PipelineResult<Vec<Recommendation>> {
        let resources = index_resources(inventory);

        let contexts = patterns
            .analyses
            .iter()
            .map(|(resource_id, analysis)| {
                Ok(ResourceContext {
                    resource: lookup(&resources, resource_id)?,
                    features: features
                        .features
                        .get(resource_id)
                        .ok_or_else(|| PipelineError::MissingFeatures(resource_id.clone()))?,
                    analysis,
                })
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        let mut recs = self.engine.generate(&contexts, now);

        if self.config.enable_risk_assessment {
            for rec in &mut recs {
                let resource = lookup(&resources, &rec.resource_id)?;
                rec.risk = Some(self.risk_scorer.assess_at(
                    resource,
                    &ActionDescriptor::from(&*rec),
                    now,
                ));
            }
        }
        Ok(recs)
    }

    pub(crate) fn predict_performance(
        &self,
        inventory: &Inventory,
        features: &FeatureSet,
        recs: &[Recommendation],
        now: DateTime<Utc>,
    ) -> PipelineResult<Vec<PerformancePrediction>> {
        self.forced_failure(Stage::PredictPerformance)?;
        let resources = index_resources(inventory);
        recs.iter()
            .map(|rec| {
                let resource = lookup(&resources, &rec.resource_id)?;
                Ok(self.predictor.predict(
                    resource,
                    features.features.get(&rec.resource_id),
                    rec,
                    now,
                ))
            })
            .collect()
    }
}

fn is_valid_record(record: &CostRecord) -> bool {
    record.cost.is_finite() && record.cost >= 0.0
}

fn index_resources(inventory: &Inventory) -> HashMap<&str, &Resource> {
    inventory
        .resources
        .iter()
        .map(|r| (r.id.as_str(), r))
        .collect()
}

fn lookup<'a>(
    resources: &HashMap<&str, &'a Resource>,
    resource_id: &str,
) -> PipelineResult<&'a Resource> {
    resources
        .get(resource_id)
        .copied()
        .ok_or_else(|| PipelineError::MissingResource(resource_id.to_string()))
}

/// Builder for [`Pipeline`]
pub struct PipelineBuilder {
    source: Option<Arc<dyn DataSource>>,
    config: PipelineConfig,
    service_name: String,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            config: PipelineConfig::default(),
            service_name: "cost-optimizer".to_string(),
        }
    }

    pub fn source(mut self, source: Arc<dyn DataSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Name attached to structured log events
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn build(self) -> PipelineResult<Pipeline> {
        let source = self
            .source
            .ok_or_else(|| PipelineError::InvalidConfig("a data source is required".to_string()))?;
        self.config.validate()?;

        let config = self.config;
        Ok(Pipeline {
            extractor: FeatureExtractor::new(config.min_data_points, config.analysis_window_days),
            analyzer: PatternAnalyzer::new(),
            anomaly_detector: VolatilityAnomalyDetector::default(),
            risk_scorer: RiskScorer::new(),
            engine: RecommendationEngine::new(
                config.heuristics.clone(),
                config.max_recommendations_per_resource,
            ),
            predictor: PerformancePredictor::new(),
            validator: Validator::new(config.min_savings, config.confidence_threshold),
            metrics: PipelineMetrics::new(),
            logger: StructuredLogger::new(self.service_name),
            #[cfg(test)]
            failing_stages: Default::default(),
            source,
            config,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
