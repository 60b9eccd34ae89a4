//! Observability infrastructure for the optimizer
//!
//! Provides:
//! - Prometheus metrics (stage latency, run outcomes, last-run gauges)
//! - Structured logging of pipeline events with tracing

use prometheus::{
    register_gauge, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge_vec, Gauge, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Stage latency buckets in seconds
const STAGE_LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Registered once per process; `None` if registration failed
static GLOBAL_METRICS: OnceLock<Option<MetricsInner>> = OnceLock::new();

struct MetricsInner {
    stage_duration_seconds: HistogramVec,
    stage_failures: IntCounterVec,
    runs: IntCounterVec,
    resources: IntGaugeVec,
    recommendations: IntGaugeVec,
    potential_savings: Gauge,
    persist_failures: IntCounter,
}

impl MetricsInner {
    fn register() -> prometheus::Result<Self> {
        Ok(Self {
            stage_duration_seconds: register_histogram_vec!(
                "cost_optimizer_stage_duration_seconds",
                "Time spent in each pipeline stage",
                &["stage"],
                STAGE_LATENCY_BUCKETS.to_vec()
            )?,
            stage_failures: register_int_counter_vec!(
                "cost_optimizer_stage_failures_total",
                "Pipeline stage failures, fatal or not",
                &["stage"]
            )?,
            runs: register_int_counter_vec!(
                "cost_optimizer_runs_total",
                "Completed pipeline runs by status",
                &["status"]
            )?,
            resources: register_int_gauge_vec!(
                "cost_optimizer_resources",
                "Resources in the last run by outcome",
                &["outcome"]
            )?,
            recommendations: register_int_gauge_vec!(
                "cost_optimizer_recommendations",
                "Recommendations in the last run by phase",
                &["phase"]
            )?,
            potential_savings: register_gauge!(
                "cost_optimizer_potential_monthly_savings",
                "Total potential monthly savings of the last validated run"
            )?,
            persist_failures: register_int_counter!(
                "cost_optimizer_persist_failures_total",
                "Recommendations rejected by the persistence sink"
            )?,
        })
    }
}

/// Handle to the process-wide pipeline metrics. Clones share the same metrics.
#[derive(Clone)]
pub struct PipelineMetrics {
    _private: (),
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(|| match MetricsInner::register() {
            Ok(inner) => Some(inner),
            Err(e) => {
                warn!(error = %e, "Failed to register pipeline metrics, metrics disabled");
                None
            }
        });
        Self { _private: () }
    }

    fn inner(&self) -> Option<&MetricsInner> {
        GLOBAL_METRICS.get().and_then(Option::as_ref)
    }

    pub fn observe_stage(&self, stage: &str, duration_secs: f64) {
        if let Some(m) = self.inner() {
            m.stage_duration_seconds
                .with_label_values(&[stage])
                .observe(duration_secs);
        }
    }

    pub fn inc_stage_failure(&self, stage: &str) {
        if let Some(m) = self.inner() {
            m.stage_failures.with_label_values(&[stage]).inc();
        }
    }

    pub fn inc_run(&self, status: &str) {
        if let Some(m) = self.inner() {
            m.runs.with_label_values(&[status]).inc();
        }
    }

    pub fn set_resources(&self, analyzed: usize, skipped: usize) {
        if let Some(m) = self.inner() {
            m.resources
                .with_label_values(&["analyzed"])
                .set(analyzed as i64);
            m.resources.with_label_values(&["skipped"]).set(skipped as i64);
        }
    }

    pub fn set_recommendations(&self, generated: usize, validated: usize, savings: f64) {
        if let Some(m) = self.inner() {
            m.recommendations
                .with_label_values(&["generated"])
                .set(generated as i64);
            m.recommendations
                .with_label_values(&["validated"])
                .set(validated as i64);
            m.potential_savings.set(savings);
        }
    }

    pub fn add_persist_failures(&self, count: usize) {
        if let Some(m) = self.inner() {
            m.persist_failures.inc_by(count as u64);
        }
    }
}

/// Canonical structured events for the optimizer
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_stage_completed(&self, stage: &str, duration_secs: f64) {
        info!(
            event = "stage_completed",
            service = %self.service,
            stage = %stage,
            duration_secs = duration_secs,
            "Pipeline stage completed"
        );
    }

    pub fn log_stage_failed(&self, stage: &str, fatal: bool, error: &str) {
        warn!(
            event = "stage_failed",
            service = %self.service,
            stage = %stage,
            fatal = fatal,
            error = %error,
            "Pipeline stage failed"
        );
    }

    pub fn log_resource_skipped(&self, resource_id: &str, data_points: usize, required: usize) {
        warn!(
            event = "resource_skipped",
            service = %self.service,
            resource_id = %resource_id,
            data_points = data_points,
            required = required,
            "Insufficient cost history, resource skipped"
        );
    }

    pub fn log_run_finished(
        &self,
        status: &str,
        recommendations: usize,
        total_savings: f64,
        duration_secs: f64,
    ) {
        info!(
            event = "run_finished",
            service = %self.service,
            status = %status,
            recommendations = recommendations,
            total_savings = total_savings,
            duration_secs = duration_secs,
            "Optimization run finished"
        );
    }

    pub fn log_recommendations_persisted(&self, written: usize, updated: usize, rejected: usize) {
        if rejected == 0 {
            info!(
                event = "recommendations_persisted",
                service = %self.service,
                written = written,
                updated = updated,
                rejected = rejected,
                "Recommendations persisted"
            );
        } else {
            warn!(
                event = "recommendations_persisted",
                service = %self.service,
                written = written,
                updated = updated,
                rejected = rejected,
                "Some recommendations were rejected by the sink"
            );
        }
    }

    pub fn log_startup(&self, version: &str, interval_secs: u64) {
        info!(
            event = "startup",
            service = %self.service,
            version = %version,
            interval_secs = interval_secs,
            "Cost optimizer started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "shutdown",
            service = %self.service,
            reason = %reason,
            "Cost optimizer shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_handles_share_registry() {
        let metrics = PipelineMetrics::new();
        let other = metrics.clone();

        metrics.observe_stage("ingest", 0.01);
        metrics.inc_stage_failure("assess_risk");
        other.inc_run("success");
        other.set_resources(4, 1);
        other.set_recommendations(6, 3, 1250.5);
        other.add_persist_failures(1);

        let families = prometheus::gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "cost_optimizer_runs_total"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("cost-optimizer");
        assert_eq!(logger.service, "cost-optimizer");
        logger.log_stage_completed("ingest", 0.2);
    }
}
