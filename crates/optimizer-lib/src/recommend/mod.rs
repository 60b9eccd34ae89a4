//! Recommendation generation
//!
//! Heuristics run independently per resource. The engine keeps the best
//! candidates per resource, then ranks everything globally by savings.

mod heuristics;
mod sizing;

pub use heuristics::{
    evaluate, profile, Candidate, HeuristicConfig, HeuristicInput, RuleProfile, RULE_PROFILES,
};
pub use sizing::{SizeCatalog, DEFAULT_INSTANCE_COST};

use crate::features::finite;
use crate::models::{
    Complexity, FeatureVector, PriorityLevel, Recommendation, RecommendationKind, Resource,
    ResourceAnalysis, UsageSignals,
};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use tracing::debug;

/// Inputs for generating recommendations for one resource
#[derive(Debug, Clone, Copy)]
pub struct ResourceContext<'a> {
    pub resource: &'a Resource,
    pub features: &'a FeatureVector,
    pub analysis: &'a ResourceAnalysis,
}

/// Applies heuristics across resources and ranks the output
#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    config: HeuristicConfig,
    max_per_resource: usize,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new(HeuristicConfig::default(), 3)
    }
}

impl RecommendationEngine {
    pub fn new(config: HeuristicConfig, max_per_resource: usize) -> Self {
        Self {
            config,
            max_per_resource,
        }
    }

    pub fn config(&self) -> &HeuristicConfig {
        &self.config
    }

    /// Generate, cap and rank recommendations for every resource
    pub fn generate(
        &self,
        contexts: &[ResourceContext<'_>],
        now: DateTime<Utc>,
    ) -> Vec<Recommendation> {
        let mut all: Vec<Recommendation> = contexts
            .iter()
            .flat_map(|ctx| self.for_resource(ctx, now))
            .collect();
        rank(&mut all);
        all
    }

    /// Unranked recommendations for one resource, at most `max_per_resource`
    pub fn for_resource(
        &self,
        ctx: &ResourceContext<'_>,
        now: DateTime<Utc>,
    ) -> Vec<Recommendation> {
        let signals = UsageSignals::from_resource(ctx.resource);
        let input = HeuristicInput {
            resource: ctx.resource,
            signals: &signals,
            features: ctx.features,
        };

        let mut recs: Vec<Recommendation> = RecommendationKind::ALL
            .iter()
            .filter_map(|kind| evaluate(*kind, &input, &self.config))
            .map(|candidate| self.build(ctx, candidate, now))
            .collect();

        recs.sort_by(by_savings_desc);
        recs.truncate(self.max_per_resource);

        for rec in &recs {
            debug!(
                resource_id = %rec.resource_id,
                kind = rec.kind().as_str(),
                savings = rec.potential_savings,
                "Recommendation generated"
            );
        }
        recs
    }

    fn build(
        &self,
        ctx: &ResourceContext<'_>,
        candidate: Candidate,
        now: DateTime<Utc>,
    ) -> Recommendation {
        let kind = candidate.action.kind();
        let profile = profile(kind);
        let potential_savings = finite(candidate.potential_savings).max(0.0);
        let confidence_score = profile.confidence.clamp(0.0, 1.0);

        Recommendation {
            id: recommendation_id(&ctx.resource.id, kind),
            resource_id: ctx.resource.id.clone(),
            resource_name: ctx.resource.name.clone(),
            resource_type: ctx.resource.resource_type.clone(),
            provider: ctx.resource.provider.clone(),
            action: candidate.action,
            title: profile.title.to_string(),
            description: candidate.description,
            potential_savings,
            confidence_score,
            implementation_complexity: profile.complexity,
            requires_downtime: profile.requires_downtime,
            requires_data_migration: profile.requires_data_migration,
            rollback_complexity: profile.rollback,
            risk_factors: profile.risk_factors.iter().map(|s| s.to_string()).collect(),
            detected_inefficiencies: ctx.analysis.inefficiencies.iter().map(|i| i.kind).collect(),
            priority_rank: 0,
            priority_level: candidate.priority_override.unwrap_or_else(|| {
                priority_level(potential_savings, confidence_score, profile.complexity)
            }),
            final_rank: None,
            risk: None,
            performance: None,
            created_at: now,
        }
    }
}

/// Sort by savings descending and assign 1-based priority ranks
pub fn rank(recs: &mut [Recommendation]) {
    recs.sort_by(by_savings_desc);
    for (idx, rec) in recs.iter_mut().enumerate() {
        rec.priority_rank = idx + 1;
    }
}

/// Savings descending; ties broken by resource then kind for stable output
fn by_savings_desc(a: &Recommendation, b: &Recommendation) -> Ordering {
    b.potential_savings
        .total_cmp(&a.potential_savings)
        .then_with(|| a.resource_id.cmp(&b.resource_id))
        .then_with(|| a.kind().cmp(&b.kind()))
}

/// Priority from savings weighted by confidence and ease of implementation
pub fn priority_level(savings: f64, confidence: f64, complexity: Complexity) -> PriorityLevel {
    let mut score = savings * confidence;
    match complexity {
        Complexity::Low => score *= 1.2,
        Complexity::High => score *= 0.8,
        Complexity::Medium => {}
    }

    if score > 500.0 {
        PriorityLevel::Critical
    } else if score > 200.0 {
        PriorityLevel::High
    } else if score > 50.0 {
        PriorityLevel::Medium
    } else {
        PriorityLevel::Low
    }
}

/// Deterministic id so reruns over the same inventory produce the same ids
pub fn recommendation_id(resource_id: &str, kind: RecommendationKind) -> String {
    let mut hasher = Sha256::new();
    hasher.update(resource_id.as_bytes());
    hasher.update(b":");
    hasher.update(kind.as_str().as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{}-{}", kind.as_str(), &digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Inefficiency, InefficiencyKind, ProposedAction, Severity};
    use crate::models::{TrendDirection, UsagePattern, VolatilityClass};
    use chrono::TimeZone;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()
    }

    fn resource(id: &str, specs: serde_json::Value) -> Resource {
        let specifications: BTreeMap<String, serde_json::Value> =
            serde_json::from_value(specs).unwrap();
        Resource {
            id: id.to_string(),
            provider: "aws".to_string(),
            resource_type: "ec2".to_string(),
            name: id.to_string(),
            region: "us-east-1".to_string(),
            tags: BTreeMap::new(),
            specifications,
            created_at: None,
        }
    }

    fn features(id: &str, avg: f64, data_points: usize) -> FeatureVector {
        FeatureVector {
            resource_id: id.to_string(),
            avg_daily_cost: avg,
            total_cost: avg * data_points as f64,
            cost_std: 0.0,
            cost_min: avg,
            cost_max: avg,
            cost_trend: 0.0,
            cost_volatility: 0.0,
            data_points,
            usage_consistency: 1.0,
            peak_cost_ratio: 1.0,
            cost_range_ratio: 0.0,
            has_tags: false,
            tag_count: 0,
            is_production: false,
            resource_type_encoded: 0,
            provider_encoded: 0,
            age_days: 0,
            analysis_window_days: 30,
        }
    }

    fn analysis(id: &str) -> ResourceAnalysis {
        ResourceAnalysis {
            resource_id: id.to_string(),
            pattern: UsagePattern {
                cost_stability: 1.0,
                usage_consistency: 1.0,
                peak_usage_ratio: 1.0,
                trend_direction: TrendDirection::Flat,
                trend_magnitude: 0.0,
                is_over_provisioned: false,
                is_under_utilized: false,
                volatility_class: VolatilityClass::Low,
            },
            inefficiencies: vec![Inefficiency {
                kind: InefficiencyKind::OverProvisioning,
                severity: Severity::Medium,
                description: String::new(),
                potential_savings_pct: 30.0,
                confidence: 0.8,
            }],
            analysis_confidence: 0.5,
        }
    }

    #[test]
    fn test_priority_level_thresholds() {
        assert_eq!(
            priority_level(1200.0, 0.9, Complexity::Low),
            PriorityLevel::Critical
        );
        assert_eq!(
            priority_level(300.0, 0.8, Complexity::Medium),
            PriorityLevel::High
        );
        assert_eq!(
            priority_level(30.0, 0.8, Complexity::Medium),
            PriorityLevel::Low
        );
        // 70 * 0.9 * 0.8 = 50.4
        assert_eq!(
            priority_level(70.0, 0.9, Complexity::High),
            PriorityLevel::Medium
        );
    }

    #[test]
    fn test_ids_are_deterministic() {
        let a = recommendation_id("res-1", RecommendationKind::SpotInstance);
        let b = recommendation_id("res-1", RecommendationKind::SpotInstance);
        let c = recommendation_id("res-1", RecommendationKind::Rightsizing);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("spot_instance-"));
    }

    #[test]
    fn test_per_resource_cap_keeps_highest_savings() {
        let r = resource(
            "idle",
            json!({
                "instance_type": "m5.large",
                "avg_cpu_utilization": 3,
                "peak_cpu_utilization": 10,
                "avg_network_utilization": 1,
                "last_activity_days": 20,
            }),
        );
        let f = features("idle", 10.0, 35);
        let a = analysis("idle");
        let ctx = ResourceContext {
            resource: &r,
            features: &f,
            analysis: &a,
        };

        let engine = RecommendationEngine::new(HeuristicConfig::default(), 2);
        let recs = engine.for_resource(&ctx, now());
        let kinds: Vec<_> = recs.iter().map(|r| r.kind()).collect();
        // unused 300, spot 210, reserved 120, rightsizing 30
        assert_eq!(
            kinds,
            vec![
                RecommendationKind::UnusedResource,
                RecommendationKind::SpotInstance
            ]
        );
        assert_eq!(
            recs[0].detected_inefficiencies,
            vec![InefficiencyKind::OverProvisioning]
        );
    }

    #[test]
    fn test_global_ranking_across_resources() {
        let small = resource("small", json!({ "avg_cpu_utilization": 30 }));
        let large = resource("large", json!({ "avg_cpu_utilization": 30 }));
        let (fs, fl) = (features("small", 2.0, 10), features("large", 20.0, 10));
        let (a_s, a_l) = (analysis("small"), analysis("large"));
        let contexts = vec![
            ResourceContext {
                resource: &small,
                features: &fs,
                analysis: &a_s,
            },
            ResourceContext {
                resource: &large,
                features: &fl,
                analysis: &a_l,
            },
        ];

        let recs = RecommendationEngine::default().generate(&contexts, now());
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].resource_id, "large");
        assert_eq!(recs[0].priority_rank, 1);
        assert_eq!(recs[1].priority_rank, 2);
        assert!(recs
            .iter()
            .all(|r| r.potential_savings >= 0.0 && (0.0..=1.0).contains(&r.confidence_score)));
    }

    #[test]
    fn test_upsizing_is_forced_to_medium_priority() {
        let r = resource(
            "hot",
            json!({
                "instance_type": "m5.large",
                "avg_cpu_utilization": 90,
                "peak_cpu_utilization": 99,
            }),
        );
        let f = features("hot", 1.0, 10);
        let a = analysis("hot");
        let recs = RecommendationEngine::default().for_resource(
            &ResourceContext {
                resource: &r,
                features: &f,
                analysis: &a,
            },
            now(),
        );
        assert_eq!(recs.len(), 1);
        assert!(matches!(recs[0].action, ProposedAction::Rightsizing { .. }));
        assert_eq!(recs[0].priority_level, PriorityLevel::Medium);
        assert_eq!(recs[0].potential_savings, 0.0);
    }
}
