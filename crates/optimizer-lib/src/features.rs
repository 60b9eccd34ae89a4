//! Feature extraction from daily cost series
//!
//! Turns a resource's cost records into a fixed set of numeric features:
//! summary statistics, linear trend, volatility and metadata-derived values.
//! Every value is finite; degenerate series yield zeros instead of errors.

use crate::models::{CostRecord, FeatureVector, Resource};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Minimum number of daily cost records required for feature extraction
pub const MIN_DATA_POINTS: usize = 7;

/// Default analysis window in days
pub const DEFAULT_ANALYSIS_WINDOW_DAYS: u32 = 30;

const PRODUCTION_TAG_VALUES: &[&str] = &["prod", "production"];

/// Extracts feature vectors from cost records
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    min_data_points: usize,
    analysis_window_days: u32,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(MIN_DATA_POINTS, DEFAULT_ANALYSIS_WINDOW_DAYS)
    }
}

impl FeatureExtractor {
    pub fn new(min_data_points: usize, analysis_window_days: u32) -> Self {
        Self {
            min_data_points,
            analysis_window_days,
        }
    }

    pub fn has_sufficient_data(&self, records: &[CostRecord]) -> bool {
        records.len() >= self.min_data_points
    }

    /// Extract features for a resource, or `None` when it has too few records.
    ///
    /// `as_of` anchors the resource age so repeated runs over the same data
    /// produce identical vectors.
    pub fn extract(
        &self,
        resource: &Resource,
        records: &[CostRecord],
        as_of: DateTime<Utc>,
    ) -> Option<FeatureVector> {
        if !self.has_sufficient_data(records) {
            return None;
        }

        let mut ordered: Vec<&CostRecord> = records.iter().collect();
        ordered.sort_by_key(|r| r.date);
        let costs: Vec<f64> = ordered.iter().map(|r| finite(r.cost)).collect();

        let avg = finite(mean(&costs));
        let total = finite(costs.iter().sum());
        let std = finite(std_dev(&costs));
        let min = finite(costs.iter().copied().fold(f64::INFINITY, f64::min));
        let max = finite(costs.iter().copied().fold(f64::NEG_INFINITY, f64::max));
        let trend = finite(linear_regression_slope(&costs));
        let volatility = if avg > 0.0 { finite(std / avg) } else { 0.0 };

        let tag_count = resource.tags.len();
        let is_production = resource
            .tags
            .values()
            .any(|v| PRODUCTION_TAG_VALUES.contains(&v.to_lowercase().as_str()));

        Some(FeatureVector {
            resource_id: resource.id.clone(),
            avg_daily_cost: avg,
            total_cost: total,
            cost_std: std,
            cost_min: min,
            cost_max: max,
            cost_trend: trend,
            cost_volatility: volatility,
            data_points: costs.len(),
            usage_consistency: consistency(volatility),
            peak_cost_ratio: if avg > 0.0 { finite(max / avg) } else { 1.0 },
            cost_range_ratio: if avg > 0.0 {
                finite((max - min) / avg)
            } else {
                0.0
            },
            has_tags: tag_count > 0,
            tag_count,
            is_production,
            resource_type_encoded: stable_bucket(&resource.resource_type, 1000),
            provider_encoded: stable_bucket(&resource.provider, 100),
            age_days: resource
                .created_at
                .map(|created| (as_of - created).num_days().max(0))
                .unwrap_or(0),
            analysis_window_days: self.analysis_window_days,
        })
    }
}

/// Coerce NaN and infinities to zero
pub fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Complement of volatility, zero once volatility reaches 1
pub fn consistency(volatility: f64) -> f64 {
    if volatility < 1.0 {
        1.0 - volatility
    } else {
        0.0
    }
}

/// Deterministic bucket for a categorical value
pub fn stable_bucket(value: &str, buckets: u64) -> u32 {
    let digest = Sha256::digest(value.to_lowercase().as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) % buckets.max(1)) as u32
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / values.len() as f64).sqrt()
}

/// Least-squares slope over the index of each value
pub fn linear_regression_slope(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let sum_x: f64 = (0..values.len()).map(|i| i as f64).sum();
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values.iter().enumerate().map(|(i, y)| i as f64 * y).sum();
    let sum_x2: f64 = (0..values.len()).map(|i| (i as f64).powi(2)).sum();
    let denom = n * sum_x2 - sum_x.powi(2);
    if denom.abs() < f64::EPSILON {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denom
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap()
    }

    fn resource() -> Resource {
        Resource {
            id: "res-1".to_string(),
            provider: "aws".to_string(),
            resource_type: "ec2".to_string(),
            name: "web-server".to_string(),
            region: "us-east-1".to_string(),
            tags: BTreeMap::from([("environment".to_string(), "Production".to_string())]),
            specifications: BTreeMap::new(),
            created_at: Some(as_of() - Duration::days(90)),
        }
    }

    fn records(costs: &[f64]) -> Vec<CostRecord> {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        costs
            .iter()
            .enumerate()
            .map(|(i, c)| CostRecord {
                resource_id: "res-1".to_string(),
                date: start + Duration::days(i as i64),
                cost: *c,
                currency: "USD".to_string(),
                usage_quantity: None,
                usage_unit: None,
                service_name: "compute".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_insufficient_data_points() {
        let extractor = FeatureExtractor::default();
        let recs = records(&[1.0, 2.0, 3.0]);
        assert!(!extractor.has_sufficient_data(&recs));
        assert!(extractor.extract(&resource(), &recs, as_of()).is_none());
    }

    #[test]
    fn test_summary_statistics() {
        let extractor = FeatureExtractor::default();
        let recs = records(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let f = extractor.extract(&resource(), &recs, as_of()).unwrap();

        assert!((f.avg_daily_cost - 5.0).abs() < 1e-9);
        assert!((f.total_cost - 40.0).abs() < 1e-9);
        // Population std-dev of this series is exactly 2
        assert!((f.cost_std - 2.0).abs() < 1e-9);
        assert_eq!(f.cost_min, 2.0);
        assert_eq!(f.cost_max, 9.0);
        assert!((f.cost_volatility - 0.4).abs() < 1e-9);
        assert!((f.usage_consistency - 0.6).abs() < 1e-9);
        assert_eq!(f.data_points, 8);
        assert!(f.is_production);
        assert_eq!(f.tag_count, 1);
        assert_eq!(f.age_days, 90);
    }

    #[test]
    fn test_records_are_ordered_by_date() {
        let extractor = FeatureExtractor::default();
        let mut recs = records(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        recs.reverse();
        let f = extractor.extract(&resource(), &recs, as_of()).unwrap();
        assert!((f.cost_trend - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_cost_series_is_degenerate_not_error() {
        let extractor = FeatureExtractor::default();
        let f = extractor
            .extract(&resource(), &records(&[0.0; 10]), as_of())
            .unwrap();
        assert_eq!(f.cost_volatility, 0.0);
        assert_eq!(f.cost_trend, 0.0);
        assert_eq!(f.peak_cost_ratio, 1.0);
        assert_eq!(f.cost_range_ratio, 0.0);
    }

    #[test]
    fn test_non_finite_costs_are_sanitized() {
        let extractor = FeatureExtractor::default();
        let recs = records(&[1.0, f64::NAN, f64::INFINITY, 3.0, 4.0, 5.0, 6.0]);
        let f = extractor.extract(&resource(), &recs, as_of()).unwrap();
        assert!(f.to_map().values().all(|v| v.is_finite()));
    }

    #[test]
    fn test_stable_bucket_is_deterministic() {
        assert_eq!(stable_bucket("ec2", 1000), stable_bucket("EC2", 1000));
        assert!(stable_bucket("ec2", 1000) < 1000);
        assert!(stable_bucket("aws", 100) < 100);
    }

    #[test]
    fn test_linear_regression_slope() {
        assert!((linear_regression_slope(&[1.0, 2.0, 3.0, 4.0, 5.0]) - 1.0).abs() < 0.01);
        assert_eq!(linear_regression_slope(&[]), 0.0);
        assert_eq!(linear_regression_slope(&[4.0]), 0.0);
    }

    proptest! {
        #[test]
        fn prop_features_are_always_finite(
            costs in proptest::collection::vec(prop_oneof![
                0.0f64..1e12,
                Just(f64::NAN),
                Just(f64::INFINITY),
                Just(f64::MAX),
            ], 2..60)
        ) {
            let extractor = FeatureExtractor::new(2, 30);
            let f = extractor.extract(&resource(), &records(&costs), as_of()).unwrap();
            prop_assert!(f.to_map().values().all(|v| v.is_finite()));
        }

        #[test]
        fn prop_extraction_is_idempotent(costs in proptest::collection::vec(0.0f64..1e4, 7..40)) {
            let extractor = FeatureExtractor::default();
            let recs = records(&costs);
            let first = extractor.extract(&resource(), &recs, as_of());
            let second = extractor.extract(&resource(), &recs, as_of());
            prop_assert_eq!(first, second);
        }
    }
}
