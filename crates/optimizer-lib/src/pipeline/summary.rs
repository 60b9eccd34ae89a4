//! Run summary assembled from stage bookkeeping and final output

use super::sanitize::Sanitize;
use super::stage::{Stage, StageResult};
use super::validator::ValidationSummary;
use crate::models::Recommendation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub total_stages: usize,
    pub successful_stages: usize,
    pub failed_stages: usize,
    pub success_rate: f64,
    pub total_duration_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagePerformance {
    pub stage: Stage,
    pub success: bool,
    pub duration_secs: f64,
    pub duration_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataProcessingStats {
    pub resources: usize,
    pub cost_records: usize,
    pub dropped_records: usize,
    pub resources_analyzed: usize,
    pub resources_skipped: usize,
    pub inefficiencies: usize,
    pub anomalies: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationStats {
    pub generated: usize,
    pub validated: usize,
    pub rejected: usize,
    pub pass_rate: f64,
    pub by_type: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub total_potential_savings: f64,
}

impl RecommendationStats {
    pub fn from_validated(
        generated: usize,
        validation: &ValidationSummary,
        recs: &[Recommendation],
    ) -> Self {
        let mut by_type = BTreeMap::new();
        let mut by_priority = BTreeMap::new();
        for rec in recs {
            *by_type.entry(rec.kind().as_str().to_string()).or_insert(0) += 1;
            *by_priority
                .entry(rec.priority_level.as_str().to_string())
                .or_insert(0) += 1;
        }

        Self {
            generated,
            validated: validation.validated,
            rejected: validation.invalid,
            pass_rate: validation.pass_rate,
            by_type,
            by_priority,
            total_potential_savings: recs.iter().map(|r| r.potential_savings).sum(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub execution: ExecutionSummary,
    pub stage_performance: Vec<StagePerformance>,
    pub data_processing: DataProcessingStats,
    pub recommendations: RecommendationStats,
}

impl RunSummary {
    pub fn build(
        stage_results: &[StageResult],
        data_processing: DataProcessingStats,
        recommendations: RecommendationStats,
    ) -> Self {
        let total_duration: f64 = stage_results.iter().map(|r| r.duration_secs).sum();
        let successful = stage_results.iter().filter(|r| r.success).count();
        let total_stages = Stage::ALL.len();

        let stage_performance = stage_results
            .iter()
            .map(|r| StagePerformance {
                stage: r.stage,
                success: r.success,
                duration_secs: r.duration_secs,
                duration_percentage: if total_duration > 0.0 {
                    r.duration_secs / total_duration * 100.0
                } else {
                    0.0
                },
            })
            .collect();

        Self {
            execution: ExecutionSummary {
                total_stages,
                successful_stages: successful,
                failed_stages: stage_results.len() - successful,
                success_rate: successful as f64 / total_stages as f64,
                total_duration_secs: total_duration,
            },
            stage_performance,
            data_processing,
            recommendations,
        }
    }
}

impl Sanitize for RunSummary {
    fn sanitize(&mut self) {
        self.execution.success_rate.sanitize();
        self.execution.total_duration_secs.sanitize();
        for stage in &mut self.stage_performance {
            stage.duration_secs.sanitize();
            stage.duration_percentage.sanitize();
        }
        self.recommendations.pass_rate.sanitize();
        self.recommendations.total_potential_savings.sanitize();
    }
}
