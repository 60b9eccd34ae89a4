//! Performance impact estimation for recommendations
//!
//! Impact is a signed fraction where negative values mean degradation. It
//! starts from a per-action base, is scaled by workload sensitivity, and comes
//! with monitoring advice sized to its magnitude.

use crate::features::finite;
use crate::models::{
    Complexity, ConfidenceLevel, FeatureVector, ImpactBreakdown, ImpactDirection,
    PerformancePrediction, ProposedAction, Recommendation, RecommendationKind, Resource,
    SizeDirection, UsageSignals, WorkloadType,
};
use chrono::{DateTime, Utc};

const WORKLOAD_TAG_KEYS: &[&str] = &["workload", "workload-type", "environment"];
const CRITICALITY_TAG_KEYS: &[&str] = &["criticality", "importance"];
const KNOWN_RESOURCE_TYPES: &[&str] = &["ec2", "rds", "lambda", "s3", "elb"];
const USER_FACING_NAMES: &[&str] = &["web", "api", "app"];
const BATCH_NAMES: &[&str] = &["batch", "job", "worker"];

const SIGNIFICANT_IMPACT: f64 = 0.2;
const ALERTING_IMPACT: f64 = 0.15;

impl WorkloadType {
    /// Sensitivity of the workload to performance changes
    pub fn multiplier(&self) -> f64 {
        match self {
            WorkloadType::Production => 1.5,
            WorkloadType::Development => 0.7,
            WorkloadType::Testing => 0.5,
            WorkloadType::BatchProcessing => 0.8,
            WorkloadType::RealTime => 2.0,
            WorkloadType::UserFacing => 1.8,
            WorkloadType::ComputeIntensive | WorkloadType::General => 1.0,
        }
    }

    fn from_tag_value(value: &str) -> Option<Self> {
        match value {
            "production" => Some(WorkloadType::Production),
            "development" => Some(WorkloadType::Development),
            "testing" => Some(WorkloadType::Testing),
            "batch_processing" => Some(WorkloadType::BatchProcessing),
            "real_time" => Some(WorkloadType::RealTime),
            "user_facing" => Some(WorkloadType::UserFacing),
            _ => None,
        }
    }

    fn is_latency_sensitive(&self) -> bool {
        matches!(self, WorkloadType::UserFacing | WorkloadType::RealTime)
    }
}

/// Tags win, then usage signals, then naming; otherwise general
pub fn classify_workload(resource: &Resource, signals: &UsageSignals) -> WorkloadType {
    if let Some(workload) = resource.tags_lower().find_map(|(k, v)| {
        if WORKLOAD_TAG_KEYS.contains(&k.as_str()) {
            WorkloadType::from_tag_value(&v)
        } else {
            None
        }
    }) {
        return workload;
    }

    if signals.cpu_variance.is_some_and(|v| v > 0.5) {
        return WorkloadType::BatchProcessing;
    }
    if signals.avg_cpu_utilization.is_some_and(|v| v > 70.0) {
        return WorkloadType::ComputeIntensive;
    }

    let name = resource.name_lower();
    if USER_FACING_NAMES.iter().any(|k| name.contains(k)) {
        WorkloadType::UserFacing
    } else if BATCH_NAMES.iter().any(|k| name.contains(k)) {
        WorkloadType::BatchProcessing
    } else if name.contains("prod") {
        WorkloadType::Production
    } else {
        WorkloadType::General
    }
}

/// Estimates how a recommendation changes resource performance
#[derive(Debug, Clone, Default)]
pub struct PerformancePredictor;

impl PerformancePredictor {
    pub fn new() -> Self {
        Self
    }

    pub fn predict(
        &self,
        resource: &Resource,
        features: Option<&FeatureVector>,
        rec: &Recommendation,
        now: DateTime<Utc>,
    ) -> PerformancePrediction {
        let signals = UsageSignals::from_resource(resource);
        let workload = classify_workload(resource, &signals);

        let base = base_impact(&rec.action, workload);
        let adjusted = finite(adjust(base, workload, resource, rec.implementation_complexity));

        let confidence_level = confidence(
            resource,
            features.map(|f| f.data_points).unwrap_or(0),
            rec.implementation_complexity,
        );

        PerformancePrediction {
            recommendation_id: rec.id.clone(),
            predicted_performance_impact: adjusted,
            confidence_level,
            confidence_score: confidence_level.score(),
            workload_type: workload,
            impact_breakdown: breakdown(base, adjusted),
            recommendations: advice(adjusted, confidence_level, workload),
            monitoring_suggestions: monitoring_suggestions(rec.kind(), adjusted),
            rollback_triggers: rollback_triggers(adjusted),
            predicted_at: now,
        }
    }
}

fn base_impact(action: &ProposedAction, workload: WorkloadType) -> f64 {
    match action {
        ProposedAction::Rightsizing {
            direction: SizeDirection::Down,
            ..
        } => {
            if workload.is_latency_sensitive() {
                -0.25
            } else {
                -0.15
            }
        }
        ProposedAction::Rightsizing {
            direction: SizeDirection::Up,
            ..
        } => 0.10,
        ProposedAction::ReservedCapacity { .. } => 0.0,
        ProposedAction::SpotInstance { .. } => -0.05,
        ProposedAction::StorageOptimization { .. } => -0.02,
        ProposedAction::UnusedResource { .. } => 0.0,
    }
}

fn adjust(base: f64, workload: WorkloadType, resource: &Resource, complexity: Complexity) -> f64 {
    let mut impact = base * workload.multiplier();

    let critical = resource.tags_lower().any(|(k, v)| {
        CRITICALITY_TAG_KEYS.contains(&k.as_str()) && (v == "high" || v == "critical")
    });
    if critical {
        impact *= 1.3;
    }

    match complexity {
        Complexity::High => impact * 1.2,
        Complexity::Low => impact * 0.9,
        Complexity::Medium => impact,
    }
}

fn confidence(resource: &Resource, data_points: usize, complexity: Complexity) -> ConfidenceLevel {
    let mut score = 0.5;
    if data_points > 100 {
        score += 0.2;
    }
    match complexity {
        Complexity::Low => score += 0.15,
        Complexity::High => score -= 0.1,
        Complexity::Medium => {}
    }
    let resource_type = resource.type_lower();
    if KNOWN_RESOURCE_TYPES.iter().any(|t| resource_type.contains(t)) {
        score += 0.1;
    }

    if score >= 0.8 {
        ConfidenceLevel::High
    } else if score >= 0.6 {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

fn breakdown(base: f64, adjusted: f64) -> ImpactBreakdown {
    ImpactBreakdown {
        base_impact: base,
        risk_adjustments: finite(adjusted - base),
        final_impact: adjusted,
        impact_percentage: finite(adjusted * 100.0),
        impact_direction: if adjusted > 0.0 {
            ImpactDirection::Positive
        } else if adjusted < 0.0 {
            ImpactDirection::Negative
        } else {
            ImpactDirection::Neutral
        },
    }
}

fn advice(impact: f64, confidence: ConfidenceLevel, workload: WorkloadType) -> Vec<String> {
    let mut out = Vec::new();
    if confidence == ConfidenceLevel::Low {
        out.push("Monitor performance closely after implementation");
        out.push("Have rollback plan ready");
    }
    if impact.abs() > SIGNIFICANT_IMPACT {
        out.push("Consider gradual rollout or canary deployment");
        out.push("Set up detailed performance monitoring");
    }
    if impact < -0.1 {
        out.push("Test thoroughly in staging environment first");
        out.push("Prepare performance baseline measurements");
    }
    if workload.is_latency_sensitive() {
        out.push("Schedule during low-traffic periods");
        out.push("Have additional capacity ready for rollback");
    }
    out.into_iter().map(String::from).collect()
}

fn monitoring_suggestions(kind: RecommendationKind, impact: f64) -> Vec<String> {
    let mut out = vec![
        "Monitor CPU utilization trends",
        "Track response times and latency",
        "Monitor error rates and failed requests",
    ];
    match kind {
        RecommendationKind::Rightsizing => out.extend([
            "Monitor memory pressure",
            "Track I/O wait times",
            "Monitor application performance metrics",
        ]),
        RecommendationKind::StorageOptimization => out.extend([
            "Monitor disk I/O operations",
            "Track storage latency",
            "Monitor cache hit rates",
        ]),
        RecommendationKind::SpotInstance => out.extend([
            "Monitor instance interruptions",
            "Track spot instance pricing",
            "Monitor failover events",
        ]),
        RecommendationKind::ReservedCapacity | RecommendationKind::UnusedResource => {}
    }
    if impact.abs() > ALERTING_IMPACT {
        out.push("Set up alerts for performance degradation");
        out.push("Monitor business KPIs closely");
    }
    out.into_iter().map(String::from).collect()
}

fn rollback_triggers(impact: f64) -> Vec<String> {
    let mut out = vec![
        "Error rate increases by >25%",
        "Response time increases by >50%",
        "CPU utilization consistently >90%",
    ];
    if impact.abs() > SIGNIFICANT_IMPACT {
        out.extend([
            "Performance degradation detected",
            "Business metric impact observed",
            "User complaints reported",
        ]);
    }
    out.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriorityLevel;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()
    }

    fn resource(name: &str, tags: &[(&str, &str)], specs: serde_json::Value) -> Resource {
        Resource {
            id: "res-1".to_string(),
            provider: "aws".to_string(),
            resource_type: "ec2".to_string(),
            name: name.to_string(),
            region: "us-east-1".to_string(),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            specifications: serde_json::from_value(specs).unwrap(),
            created_at: None,
        }
    }

    fn rec(action: ProposedAction, complexity: Complexity) -> Recommendation {
        Recommendation {
            id: "rec-1".to_string(),
            resource_id: "res-1".to_string(),
            resource_name: "node".to_string(),
            resource_type: "ec2".to_string(),
            provider: "aws".to_string(),
            action,
            title: String::new(),
            description: String::new(),
            potential_savings: 30.0,
            confidence_score: 0.8,
            implementation_complexity: complexity,
            requires_downtime: true,
            requires_data_migration: false,
            rollback_complexity: Complexity::Low,
            risk_factors: Vec::new(),
            detected_inefficiencies: Vec::new(),
            priority_rank: 1,
            priority_level: PriorityLevel::Low,
            final_rank: None,
            risk: None,
            performance: None,
            created_at: now(),
        }
    }

    fn downsize() -> ProposedAction {
        ProposedAction::Rightsizing {
            direction: SizeDirection::Down,
            current_instance: "m5.large".to_string(),
            recommended_instance: "m5.medium".to_string(),
        }
    }

    #[test]
    fn test_workload_classification_precedence() {
        let signals = |specs: serde_json::Value| {
            UsageSignals::from_resource(&resource("x", &[], specs))
        };

        let tagged = resource("web-api", &[("environment", "testing")], json!({}));
        assert_eq!(
            classify_workload(&tagged, &UsageSignals::default()),
            WorkloadType::Testing
        );

        let bursty = resource("web-api", &[], json!({}));
        assert_eq!(
            classify_workload(&bursty, &signals(json!({ "cpu_variance": 0.8 }))),
            WorkloadType::BatchProcessing
        );
        assert_eq!(
            classify_workload(&bursty, &signals(json!({ "avg_cpu_utilization": 85 }))),
            WorkloadType::ComputeIntensive
        );
        assert_eq!(
            classify_workload(&bursty, &UsageSignals::default()),
            WorkloadType::UserFacing
        );
        assert_eq!(
            classify_workload(&resource("nightly-job", &[], json!({})), &UsageSignals::default()),
            WorkloadType::BatchProcessing
        );
        assert_eq!(
            classify_workload(&resource("prod-db", &[], json!({})), &UsageSignals::default()),
            WorkloadType::Production
        );
        assert_eq!(
            classify_workload(&resource("misc", &[], json!({})), &UsageSignals::default()),
            WorkloadType::General
        );
    }

    #[test]
    fn test_user_facing_downsize_is_amplified() {
        let r = resource("web-frontend", &[], json!({}));
        let p = PerformancePredictor::new().predict(
            &r,
            None,
            &rec(downsize(), Complexity::Medium),
            now(),
        );

        assert_eq!(p.workload_type, WorkloadType::UserFacing);
        assert!((p.impact_breakdown.base_impact + 0.25).abs() < 1e-9);
        assert!((p.predicted_performance_impact + 0.45).abs() < 1e-9);
        assert_eq!(p.impact_breakdown.impact_direction, ImpactDirection::Negative);
        assert_eq!(p.rollback_triggers.len(), 6);
        assert!(p
            .recommendations
            .contains(&"Schedule during low-traffic periods".to_string()));
        assert!(p
            .monitoring_suggestions
            .contains(&"Monitor memory pressure".to_string()));
    }

    #[test]
    fn test_critical_tag_and_complexity_adjustments() {
        let r = resource("misc", &[("criticality", "High")], json!({}));
        let p =
            PerformancePredictor::new().predict(&r, None, &rec(downsize(), Complexity::High), now());
        // -0.15 * 1.0 * 1.3 * 1.2
        assert!((p.predicted_performance_impact + 0.234).abs() < 1e-9);
    }

    #[test]
    fn test_reserved_capacity_is_neutral() {
        let r = resource("misc", &[], json!({}));
        let action = ProposedAction::ReservedCapacity {
            current_monthly_cost: 100.0,
            reserved_monthly_cost: 60.0,
        };
        let p = PerformancePredictor::new().predict(&r, None, &rec(action, Complexity::Low), now());
        assert_eq!(p.predicted_performance_impact, 0.0);
        assert_eq!(p.impact_breakdown.impact_direction, ImpactDirection::Neutral);
        assert_eq!(p.rollback_triggers.len(), 3);
        assert_eq!(p.monitoring_suggestions.len(), 3);
        // 0.5 + 0.15 low complexity + 0.1 known type
        assert_eq!(p.confidence_level, ConfidenceLevel::Medium);
        assert_eq!(p.confidence_score, 0.7);
    }

    #[test]
    fn test_confidence_levels() {
        let known = resource("misc", &[], json!({}));
        assert_eq!(confidence(&known, 150, Complexity::Low), ConfidenceLevel::High);
        assert_eq!(confidence(&known, 10, Complexity::High), ConfidenceLevel::Low);
    }
}
