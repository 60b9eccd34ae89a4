//! Normalizes non-finite numbers before output leaves the pipeline

use crate::features::finite;
use crate::models::{
    CostAnomaly, ImpactBreakdown, PerformancePrediction, ProposedAction, Recommendation,
    RiskAssessment,
};

/// Replace every NaN or infinite float reachable from `self` with 0.0
pub trait Sanitize {
    fn sanitize(&mut self);
}

impl Sanitize for f64 {
    fn sanitize(&mut self) {
        *self = finite(*self);
    }
}

impl<T: Sanitize> Sanitize for Vec<T> {
    fn sanitize(&mut self) {
        self.iter_mut().for_each(Sanitize::sanitize);
    }
}

impl<T: Sanitize> Sanitize for Option<T> {
    fn sanitize(&mut self) {
        if let Some(inner) = self {
            inner.sanitize();
        }
    }
}

impl Sanitize for serde_json::Value {
    fn sanitize(&mut self) {
        match self {
            serde_json::Value::Number(n) => {
                if n.as_f64().is_some_and(|v| !v.is_finite()) {
                    *self = serde_json::Value::from(0.0);
                }
            }
            serde_json::Value::Array(items) => items.iter_mut().for_each(Sanitize::sanitize),
            serde_json::Value::Object(map) => map.values_mut().for_each(Sanitize::sanitize),
            _ => {}
        }
    }
}

impl Sanitize for RiskAssessment {
    fn sanitize(&mut self) {
        self.overall_risk_score.sanitize();
        for component in &mut self.components {
            component.score.sanitize();
            component.weight.sanitize();
        }
    }
}

impl Sanitize for ImpactBreakdown {
    fn sanitize(&mut self) {
        self.base_impact.sanitize();
        self.risk_adjustments.sanitize();
        self.final_impact.sanitize();
        self.impact_percentage.sanitize();
    }
}

impl Sanitize for PerformancePrediction {
    fn sanitize(&mut self) {
        self.predicted_performance_impact.sanitize();
        self.confidence_score.sanitize();
        self.impact_breakdown.sanitize();
    }
}

impl Sanitize for Recommendation {
    fn sanitize(&mut self) {
        self.potential_savings.sanitize();
        self.confidence_score.sanitize();
        self.risk.sanitize();
        self.performance.sanitize();
        match &mut self.action {
            ProposedAction::ReservedCapacity {
                current_monthly_cost,
                reserved_monthly_cost,
            } => {
                current_monthly_cost.sanitize();
                reserved_monthly_cost.sanitize();
            }
            ProposedAction::SpotInstance {
                current_monthly_cost,
                spot_monthly_cost,
            } => {
                current_monthly_cost.sanitize();
                spot_monthly_cost.sanitize();
            }
            ProposedAction::StorageOptimization {
                allocated_gb,
                used_gb,
                recommended_gb,
            } => {
                allocated_gb.sanitize();
                used_gb.sanitize();
                recommended_gb.sanitize();
            }
            ProposedAction::UnusedResource { idle_days } => idle_days.sanitize(),
            ProposedAction::Rightsizing { .. } => {}
        }
    }
}

impl Sanitize for CostAnomaly {
    fn sanitize(&mut self) {
        self.z_score.sanitize();
    }
}
