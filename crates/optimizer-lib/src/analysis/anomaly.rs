//! Cost volatility anomaly detection
//!
//! Flags resources whose cost volatility is far from the rest of the run,
//! measured as a z-score against the population of analysed resources.

use crate::models::{CostAnomaly, FeatureVector, Severity};

/// Minimum resources in a run before z-scores are meaningful
pub const MIN_RESOURCES_FOR_DETECTION: usize = 3;

/// Detects cost volatility outliers across a run
#[derive(Debug, Clone)]
pub struct VolatilityAnomalyDetector {
    /// Number of standard deviations to consider an anomaly
    pub std_dev_threshold: f64,
    /// Z-score at which an anomaly becomes high severity
    pub high_severity_threshold: f64,
}

impl Default for VolatilityAnomalyDetector {
    fn default() -> Self {
        Self {
            std_dev_threshold: 2.0,
            high_severity_threshold: 3.0,
        }
    }
}

impl VolatilityAnomalyDetector {
    pub fn new(std_dev_threshold: f64) -> Self {
        Self {
            std_dev_threshold,
            ..Default::default()
        }
    }

    pub fn detect(&self, features: &[FeatureVector]) -> Vec<CostAnomaly> {
        if features.len() < MIN_RESOURCES_FOR_DETECTION {
            return Vec::new();
        }

        let n = features.len() as f64;
        let mean = features.iter().map(|f| f.cost_volatility).sum::<f64>() / n;
        let variance = features
            .iter()
            .map(|f| (f.cost_volatility - mean).powi(2))
            .sum::<f64>()
            / n;
        let std_dev = variance.sqrt();

        // Avoid division by zero
        if !std_dev.is_finite() || std_dev < f64::EPSILON {
            return Vec::new();
        }

        features
            .iter()
            .filter_map(|f| {
                let z_score = (f.cost_volatility - mean) / std_dev;
                if z_score.abs() <= self.std_dev_threshold {
                    return None;
                }
                Some(CostAnomaly {
                    resource_id: f.resource_id.clone(),
                    anomaly_type: "cost_volatility".to_string(),
                    severity: if z_score.abs() > self.high_severity_threshold {
                        Severity::High
                    } else {
                        Severity::Medium
                    },
                    z_score,
                    description: format!(
                        "Unusual cost volatility detected (z-score: {:.2})",
                        z_score
                    ),
                })
            })
            .collect()
    }
}
