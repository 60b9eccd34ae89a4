//! Final filtering and ranking of generated recommendations

use crate::models::Recommendation;
use serde::{Deserialize, Serialize};

/// Minimum monthly savings a recommendation must offer
pub const DEFAULT_MIN_SAVINGS: f64 = 10.0;

/// A recommendation dropped by validation, with every failed check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub recommendation_id: String,
    pub resource_id: String,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub validated: usize,
    pub invalid: usize,
    /// Share of input that passed, 0 when there was no input
    pub pass_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub recommendations: Vec<Recommendation>,
    pub rejected: Vec<Rejection>,
    pub summary: ValidationSummary,
}

/// Strict filter over generated recommendations
#[derive(Debug, Clone)]
pub struct Validator {
    pub min_savings: f64,
    pub confidence_threshold: f64,
}

impl Validator {
    pub fn new(min_savings: f64, confidence_threshold: f64) -> Self {
        Self {
            min_savings,
            confidence_threshold,
        }
    }

    /// Reasons `rec` fails validation; empty when it passes
    pub fn check(&self, rec: &Recommendation) -> Vec<String> {
        let mut reasons = Vec::new();
        if rec.id.is_empty() || rec.resource_id.is_empty() {
            reasons.push("Missing recommendation or resource id".to_string());
        }
        if !rec.potential_savings.is_finite() || rec.potential_savings < self.min_savings {
            reasons.push("Savings below minimum threshold".to_string());
        }
        if !rec.confidence_score.is_finite() || rec.confidence_score < self.confidence_threshold {
            reasons.push("Confidence below threshold".to_string());
        }
        reasons
    }

    /// Filter, then order by (priority rank, savings desc) and assign final ranks
    pub fn validate(&self, recs: Vec<Recommendation>) -> ValidationOutcome {
        let total = recs.len();
        let mut valid = Vec::with_capacity(total);
        let mut rejected = Vec::new();

        for rec in recs {
            let reasons = self.check(&rec);
            if reasons.is_empty() {
                valid.push(rec);
            } else {
                rejected.push(Rejection {
                    recommendation_id: rec.id,
                    resource_id: rec.resource_id,
                    reasons,
                });
            }
        }

        valid.sort_by(|a, b| {
            a.priority_rank
                .cmp(&b.priority_rank)
                .then_with(|| b.potential_savings.total_cmp(&a.potential_savings))
        });
        for (idx, rec) in valid.iter_mut().enumerate() {
            rec.final_rank = Some(idx + 1);
        }

        let summary = ValidationSummary {
            validated: valid.len(),
            invalid: rejected.len(),
            pass_rate: if total == 0 {
                0.0
            } else {
                valid.len() as f64 / total as f64
            },
        };

        ValidationOutcome {
            recommendations: valid,
            rejected,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Complexity, PriorityLevel, ProposedAction};
    use chrono::Utc;
    use proptest::prelude::*;

    fn rec(id: &str, savings: f64, confidence: f64, rank: usize) -> Recommendation {
        Recommendation {
            id: id.to_string(),
            resource_id: format!("res-{}", id),
            resource_name: String::new(),
            resource_type: "ec2".to_string(),
            provider: "aws".to_string(),
            action: ProposedAction::UnusedResource { idle_days: 9.0 },
            title: String::new(),
            description: String::new(),
            potential_savings: savings,
            confidence_score: confidence,
            implementation_complexity: Complexity::Low,
            requires_downtime: true,
            requires_data_migration: false,
            rollback_complexity: Complexity::Medium,
            risk_factors: Vec::new(),
            detected_inefficiencies: Vec::new(),
            priority_rank: rank,
            priority_level: PriorityLevel::Low,
            final_rank: None,
            risk: None,
            performance: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_rejections_carry_reasons() {
        let validator = Validator::new(DEFAULT_MIN_SAVINGS, 0.6);
        let outcome = validator.validate(vec![
            rec("ok", 50.0, 0.8, 1),
            rec("cheap", 5.0, 0.8, 2),
            rec("both", 0.0, 0.5, 3),
        ]);

        assert_eq!(outcome.recommendations.len(), 1);
        assert_eq!(outcome.rejected.len(), 2);
        assert_eq!(
            outcome.rejected[0].reasons,
            vec!["Savings below minimum threshold"]
        );
        assert_eq!(outcome.rejected[1].reasons.len(), 2);
        assert!((outcome.summary.pass_rate - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let validator = Validator::new(10.0, 0.6);
        assert!(validator.check(&rec("edge", 10.0, 0.6, 1)).is_empty());
    }

    #[test]
    fn test_final_rank_follows_priority_rank() {
        let validator = Validator::new(10.0, 0.6);
        let outcome = validator.validate(vec![
            rec("second", 40.0, 0.9, 2),
            rec("first", 90.0, 0.9, 1),
        ]);
        let order: Vec<_> = outcome
            .recommendations
            .iter()
            .map(|r| (r.id.as_str(), r.final_rank))
            .collect();
        assert_eq!(order, vec![("first", Some(1)), ("second", Some(2))]);
    }

    #[test]
    fn test_empty_input_has_zero_pass_rate() {
        let outcome = Validator::new(10.0, 0.6).validate(Vec::new());
        assert_eq!(outcome.summary, ValidationSummary::default());
    }

    proptest! {
        #[test]
        fn prop_validator_is_a_strict_filter(
            items in proptest::collection::vec((0.0f64..100.0, 0.0f64..=1.0), 0..30),
            threshold in 0.0f64..=1.0,
        ) {
            let input: Vec<_> = items
                .iter()
                .enumerate()
                .map(|(i, (s, c))| rec(&i.to_string(), *s, *c, i + 1))
                .collect();
            let ids: Vec<String> = input.iter().map(|r| r.id.clone()).collect();

            let outcome = Validator::new(10.0, threshold).validate(input);
            prop_assert_eq!(outcome.recommendations.len() + outcome.rejected.len(), ids.len());
            for r in &outcome.recommendations {
                prop_assert!(ids.contains(&r.id));
                prop_assert!(r.potential_savings >= 10.0);
                prop_assert!(r.confidence_score >= threshold);
            }
        }
    }
}
