//! Full pipeline run

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use optimizer_lib::{
    JsonFileSink, JsonFileSource, Pipeline, PipelineConfig, PipelineReport, RecommendationSink,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::Tabled;

use crate::output::{
    color_confidence, color_level, format_currency, print_error, print_info, print_json,
    print_success, print_table, print_warning, truncate_id, OutputFormat,
};

pub struct RunOptions {
    pub resources: Vec<String>,
    pub output: Option<PathBuf>,
    pub window_days: Option<u32>,
    pub min_confidence: Option<f64>,
    pub risk: bool,
    pub performance: bool,
    pub anomalies: bool,
}

impl RunOptions {
    fn pipeline_config(&self) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            analysis_window_days: self.window_days.unwrap_or(defaults.analysis_window_days),
            confidence_threshold: self.min_confidence.unwrap_or(defaults.confidence_threshold),
            enable_risk_assessment: self.risk,
            enable_performance_prediction: self.performance,
            enable_anomaly_detection: self.anomalies,
            ..defaults
        }
    }
}

/// Row for recommendations table
#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Savings/mo")]
    savings: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Risk")]
    risk: String,
    #[tabled(rename = "Perf Impact")]
    impact: String,
}

/// Run the pipeline over the inventory and print the report
pub async fn run_pipeline(
    inventory: &Path,
    options: RunOptions,
    now: DateTime<Utc>,
    format: OutputFormat,
) -> Result<()> {
    let pipeline = Pipeline::builder()
        .source(Arc::new(JsonFileSource::new(inventory)))
        .config(options.pipeline_config())
        .service_name("cco")
        .build()
        .context("Invalid pipeline options")?;

    let filter: BTreeSet<String> = options.resources.iter().cloned().collect();
    let filter = (!filter.is_empty()).then_some(filter);
    let report = pipeline.run_at(filter.as_ref(), now).await;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report),
    }

    if !report.is_success() {
        anyhow::bail!(
            "{}",
            report.message.as_deref().unwrap_or("Optimization run failed")
        );
    }

    if let Some(path) = options.output {
        persist(&path, &report, format).await?;
    }

    Ok(())
}

async fn persist(path: &Path, report: &PipelineReport, format: OutputFormat) -> Result<()> {
    let sink = JsonFileSink::new(path);
    let outcome = sink
        .persist(&report.recommendations)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    if format == OutputFormat::Table {
        print_success(&format!(
            "Wrote {} new and updated {} recommendations in {}",
            outcome.written,
            outcome.updated,
            path.display()
        ));
        for failure in &outcome.failures {
            print_warning(&format!(
                "Rejected {}: {}",
                failure.recommendation_id, failure.reason
            ));
        }
    }
    Ok(())
}

fn print_report(report: &PipelineReport) {
    if !report.is_success() {
        print_error(report.message.as_deref().unwrap_or("Optimization run failed"));
        if let Some(error) = &report.error {
            eprintln!("  {}", error);
        }
        return;
    }

    let rows: Vec<RecommendationRow> = report
        .recommendations
        .iter()
        .map(|r| RecommendationRow {
            rank: r.final_rank.unwrap_or(r.priority_rank),
            resource: truncate_id(&r.resource_id),
            kind: r.kind().as_str().to_string(),
            savings: format_currency(r.potential_savings),
            confidence: color_confidence(r.confidence_score),
            priority: color_level(r.priority_level),
            risk: r
                .risk
                .as_ref()
                .map(|a| color_level(a.risk_level))
                .unwrap_or_else(|| "-".to_string()),
            impact: r
                .performance
                .as_ref()
                .map(|p| format!("{:+.1}%", p.impact_breakdown.impact_percentage))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    print_table(rows, "No recommendations passed validation");

    println!(
        "\nTotal: {} recommendations, {} potential monthly savings",
        report.recommendations.len(),
        format_currency(report.total_savings())
    );

    if let Some(summary) = &report.summary {
        let stats = &summary.data_processing;
        print_info(&format!(
            "Analysed {} of {} resources ({} skipped), {} inefficiencies, {} anomalies",
            stats.resources_analyzed,
            stats.resources,
            stats.resources_skipped,
            stats.inefficiencies,
            stats.anomalies
        ));
    }
    if !report.rejected.is_empty() {
        print_info(&format!(
            "{} recommendations rejected by validation",
            report.rejected.len()
        ));
    }
    for stage in &report.degraded_stages {
        print_warning(&format!("Stage {} failed; results lack its data", stage));
    }
    for anomaly in &report.anomalies {
        print_warning(&format!("{}: {}", anomaly.resource_id, anomaly.description));
    }
}
