//! Usage patterns and inefficiency rules
//!
//! The pattern analyzer is a pure function of a feature vector. Inefficiencies
//! are detected by evaluating a fixed rule table; each rule is independent and
//! a resource may match several.

use crate::features::consistency;
use crate::models::{
    FeatureVector, Inefficiency, InefficiencyKind, ResourceAnalysis, Severity, TrendDirection,
    UsagePattern, VolatilityClass,
};

/// Average cost above this multiple of the minimum marks over-provisioning
const OVER_PROVISIONING_RATIO: f64 = 1.5;

const UNDER_UTILIZED_CONSISTENCY: f64 = 0.3;

const HIGH_VOLATILITY: f64 = 0.5;

const PRODUCTION_CONSISTENCY: f64 = 0.4;

/// A declarative inefficiency detection rule
pub struct InefficiencyRule {
    pub kind: InefficiencyKind,
    pub severity: Severity,
    pub potential_savings_pct: f64,
    pub confidence: f64,
    pub description: &'static str,
    pub matches: fn(&FeatureVector, &UsagePattern) -> bool,
}

pub const INEFFICIENCY_RULES: &[InefficiencyRule] = &[
    InefficiencyRule {
        kind: InefficiencyKind::OverProvisioning,
        severity: Severity::Medium,
        potential_savings_pct: 30.0,
        confidence: 0.8,
        description: "Average spend sits well above the observed minimum, suggesting unused headroom",
        matches: |_, p| p.is_over_provisioned,
    },
    InefficiencyRule {
        kind: InefficiencyKind::UnderUtilization,
        severity: Severity::High,
        potential_savings_pct: 60.0,
        confidence: 0.9,
        description: "Resource shows very low and inconsistent usage patterns",
        matches: |_, p| p.is_under_utilized,
    },
    InefficiencyRule {
        kind: InefficiencyKind::UsageVolatility,
        severity: Severity::Medium,
        potential_savings_pct: 20.0,
        confidence: 0.7,
        description: "Highly variable usage patterns suggest potential for optimization",
        matches: |_, p| p.volatility_class == VolatilityClass::High,
    },
    InefficiencyRule {
        kind: InefficiencyKind::ProductionInefficiency,
        severity: Severity::High,
        potential_savings_pct: 40.0,
        confidence: 0.85,
        description: "Production resource with inefficient usage patterns",
        matches: |f, p| f.is_production && p.usage_consistency < PRODUCTION_CONSISTENCY,
    },
];

/// Derives usage patterns and inefficiencies from feature vectors
#[derive(Debug, Clone, Default)]
pub struct PatternAnalyzer;

impl PatternAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Full analysis of one resource
    pub fn analyze(&self, features: &FeatureVector) -> ResourceAnalysis {
        let pattern = self.usage_pattern(features);
        let inefficiencies = self.detect_inefficiencies(features, &pattern);
        ResourceAnalysis {
            resource_id: features.resource_id.clone(),
            pattern,
            inefficiencies,
            analysis_confidence: self.analysis_confidence(features),
        }
    }

    pub fn usage_pattern(&self, f: &FeatureVector) -> UsagePattern {
        let stability = consistency(f.cost_volatility);
        let trend_direction = if f.cost_trend > 0.0 {
            TrendDirection::Increasing
        } else if f.cost_trend < 0.0 {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Flat
        };

        UsagePattern {
            cost_stability: stability,
            usage_consistency: stability,
            peak_usage_ratio: f.peak_cost_ratio,
            trend_direction,
            trend_magnitude: f.cost_trend.abs(),
            is_over_provisioned: f.avg_daily_cost > f.cost_min * OVER_PROVISIONING_RATIO,
            is_under_utilized: stability < UNDER_UTILIZED_CONSISTENCY,
            volatility_class: if f.cost_volatility > HIGH_VOLATILITY {
                VolatilityClass::High
            } else {
                VolatilityClass::Low
            },
        }
    }

    pub fn detect_inefficiencies(
        &self,
        features: &FeatureVector,
        pattern: &UsagePattern,
    ) -> Vec<Inefficiency> {
        INEFFICIENCY_RULES
            .iter()
            .filter(|rule| (rule.matches)(features, pattern))
            .map(|rule| Inefficiency {
                kind: rule.kind,
                severity: rule.severity,
                description: rule.description.to_string(),
                potential_savings_pct: rule.potential_savings_pct,
                confidence: rule.confidence,
            })
            .collect()
    }

    /// Confidence in the analysis itself, clamped to [0.1, 0.95]
    pub fn analysis_confidence(&self, f: &FeatureVector) -> f64 {
        let mut confidence: f64 = 0.5;
        if f.data_points > 30 {
            confidence += 0.2;
        } else if f.data_points > 14 {
            confidence += 0.1;
        }
        if f.is_production {
            confidence += 0.1;
        }
        if f.cost_volatility > 0.7 {
            confidence -= 0.1;
        }
        confidence.clamp(0.1, 0.95)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(avg: f64, min: f64, volatility: f64, data_points: usize) -> FeatureVector {
        FeatureVector {
            resource_id: "res-1".to_string(),
            avg_daily_cost: avg,
            total_cost: avg * data_points as f64,
            cost_std: avg * volatility,
            cost_min: min,
            cost_max: avg * 2.0,
            cost_trend: 0.0,
            cost_volatility: volatility,
            data_points,
            usage_consistency: consistency(volatility),
            peak_cost_ratio: 2.0,
            cost_range_ratio: 1.0,
            has_tags: false,
            tag_count: 0,
            is_production: false,
            resource_type_encoded: 0,
            provider_encoded: 0,
            age_days: 0,
            analysis_window_days: 30,
        }
    }

    fn kinds(analysis: &ResourceAnalysis) -> Vec<InefficiencyKind> {
        analysis.inefficiencies.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn test_stable_resource_has_no_inefficiencies() {
        let analysis = PatternAnalyzer::new().analyze(&features(100.0, 95.0, 0.05, 35));
        assert!(analysis.inefficiencies.is_empty());
        assert_eq!(analysis.pattern.volatility_class, VolatilityClass::Low);
        assert!((analysis.pattern.cost_stability - 0.95).abs() < 1e-9);
        assert_eq!(analysis.pattern.trend_direction, TrendDirection::Flat);
    }

    #[test]
    fn test_over_provisioning_rule() {
        let analysis = PatternAnalyzer::new().analyze(&features(100.0, 50.0, 0.1, 10));
        assert_eq!(kinds(&analysis), vec![InefficiencyKind::OverProvisioning]);
        let rule = &analysis.inefficiencies[0];
        assert_eq!(rule.severity, Severity::Medium);
        assert_eq!(rule.potential_savings_pct, 30.0);
        assert_eq!(rule.confidence, 0.8);
    }

    #[test]
    fn test_resource_can_match_multiple_rules() {
        let mut f = features(100.0, 10.0, 0.8, 10);
        f.is_production = true;
        let analysis = PatternAnalyzer::new().analyze(&f);
        assert_eq!(
            kinds(&analysis),
            vec![
                InefficiencyKind::OverProvisioning,
                InefficiencyKind::UnderUtilization,
                InefficiencyKind::UsageVolatility,
                InefficiencyKind::ProductionInefficiency,
            ]
        );
    }

    #[test]
    fn test_volatility_at_or_above_one_has_zero_stability() {
        let pattern = PatternAnalyzer::new().usage_pattern(&features(10.0, 10.0, 1.4, 10));
        assert_eq!(pattern.cost_stability, 0.0);
        assert!(pattern.is_under_utilized);
    }

    #[test]
    fn test_trend_direction() {
        let analyzer = PatternAnalyzer::new();
        let mut f = features(10.0, 10.0, 0.1, 10);
        f.cost_trend = -0.5;
        let pattern = analyzer.usage_pattern(&f);
        assert_eq!(pattern.trend_direction, TrendDirection::Decreasing);
        assert_eq!(pattern.trend_magnitude, 0.5);
    }

    #[test]
    fn test_analysis_confidence_adjustments() {
        let analyzer = PatternAnalyzer::new();
        assert!((analyzer.analysis_confidence(&features(1.0, 1.0, 0.1, 10)) - 0.5).abs() < 1e-9);
        assert!((analyzer.analysis_confidence(&features(1.0, 1.0, 0.1, 20)) - 0.6).abs() < 1e-9);

        let mut f = features(1.0, 1.0, 0.1, 31);
        f.is_production = true;
        assert!((analyzer.analysis_confidence(&f) - 0.8).abs() < 1e-9);

        assert!((analyzer.analysis_confidence(&features(1.0, 1.0, 0.9, 5)) - 0.4).abs() < 1e-9);
    }
}
