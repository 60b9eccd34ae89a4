//! Usage pattern analysis
//!
//! This module provides:
//! - Qualitative usage patterns derived from feature vectors
//! - Rule-table driven inefficiency detection
//! - Cross-resource cost volatility anomaly detection

mod anomaly;
mod patterns;

pub use anomaly::{VolatilityAnomalyDetector, MIN_RESOURCES_FOR_DETECTION};
pub use patterns::{InefficiencyRule, PatternAnalyzer, INEFFICIENCY_RULES};
