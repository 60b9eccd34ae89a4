//! Periodic pipeline runs
//!
//! Runs the pipeline on a fixed interval, hands each successful run's
//! recommendations to the sink and reflects the outcome in the health registry.

use super::{Pipeline, PipelineReport, Stage};
use crate::health::{components, HealthRegistry};
use crate::source::RecommendationSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::time::interval;
use tracing::{error, info, warn};

/// Default interval between runs
pub const DEFAULT_RUN_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Counters over the scheduler's lifetime
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulerStats {
    pub runs: u64,
    pub failed_runs: u64,
    pub persisted: u64,
    pub persist_failures: u64,
}

pub struct PipelineScheduler {
    pipeline: Arc<Pipeline>,
    sink: Arc<dyn RecommendationSink>,
    health: HealthRegistry,
    run_interval: Duration,
    last_report: RwLock<Option<PipelineReport>>,
    stats: RwLock<SchedulerStats>,
}

impl PipelineScheduler {
    pub fn new(
        pipeline: Arc<Pipeline>,
        sink: Arc<dyn RecommendationSink>,
        health: HealthRegistry,
        run_interval: Duration,
    ) -> Self {
        Self {
            pipeline,
            sink,
            health,
            run_interval,
            last_report: RwLock::new(None),
            stats: RwLock::new(SchedulerStats::default()),
        }
    }

    /// Run until a shutdown signal arrives. The first tick fires immediately.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.run_interval.as_secs(),
            "Starting pipeline scheduler"
        );

        let mut ticker = interval(self.run_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.health.set_ready(true).await;
                    self.run_once().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down pipeline scheduler");
                    break;
                }
            }
        }
    }

    /// One pipeline run followed by persistence and health updates
    pub async fn run_once(&self) -> PipelineReport {
        let report = self.pipeline.run(None).await;
        self.record(&report).await;

        if report.is_success() {
            self.persist(&report).await;
        }

        *self.last_report.write().await = Some(report.clone());
        report
    }

    async fn record(&self, report: &PipelineReport) {
        let ingest_failed = report
            .stage_results
            .iter()
            .any(|r| r.stage == Stage::Ingest && !r.success);
        if ingest_failed {
            let message = report.error.clone().unwrap_or_default();
            self.health
                .set_unhealthy(components::DATA_SOURCE, message)
                .await;
        } else {
            self.health.set_healthy(components::DATA_SOURCE).await;
        }

        if !report.is_success() {
            let message = report.message.clone().unwrap_or_default();
            error!(
                error = report.error.as_deref().unwrap_or(""),
                "{}", message
            );
            self.health
                .set_unhealthy(components::PIPELINE, message)
                .await;
        } else if !report.degraded_stages.is_empty() {
            let stages: Vec<&str> = report.degraded_stages.iter().map(Stage::as_str).collect();
            self.health
                .set_degraded(
                    components::PIPELINE,
                    format!("Optional stages failed: {}", stages.join(", ")),
                )
                .await;
        } else {
            self.health.set_healthy(components::PIPELINE).await;
        }

        let mut stats = self.stats.write().await;
        stats.runs += 1;
        if !report.is_success() {
            stats.failed_runs += 1;
        }
    }

    async fn persist(&self, report: &PipelineReport) {
        let outcome = self.sink.persist(&report.recommendations).await;
        let (written, updated, failed) = match outcome {
            Ok(outcome) => {
                for failure in &outcome.failures {
                    warn!(
                        recommendation_id = %failure.recommendation_id,
                        reason = %failure.reason,
                        "Recommendation rejected by sink"
                    );
                }
                if outcome.is_clean() {
                    self.health.set_healthy(components::PERSISTENCE).await;
                } else {
                    self.health
                        .set_degraded(
                            components::PERSISTENCE,
                            format!("{} recommendations rejected", outcome.failures.len()),
                        )
                        .await;
                }
                (outcome.written, outcome.updated, outcome.failures.len())
            }
            Err(e) => {
                warn!(error = %e, "Failed to persist recommendations");
                self.health
                    .set_degraded(components::PERSISTENCE, e.to_string())
                    .await;
                (0, 0, report.recommendations.len())
            }
        };

        self.pipeline
            .logger()
            .log_recommendations_persisted(written, updated, failed);
        self.pipeline.metrics().add_persist_failures(failed);

        let mut stats = self.stats.write().await;
        stats.persisted += (written + updated) as u64;
        stats.persist_failures += failed as u64;
    }

    pub async fn last_report(&self) -> Option<PipelineReport> {
        self.last_report.read().await.clone()
    }

    pub async fn stats(&self) -> SchedulerStats {
        self.stats.read().await.clone()
    }
}
