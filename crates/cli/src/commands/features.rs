//! Feature and inefficiency inspection

use anyhow::Result;
use chrono::{DateTime, Utc};
use optimizer_lib::{
    analysis::PatternAnalyzer,
    features::{FeatureExtractor, DEFAULT_ANALYSIS_WINDOW_DAYS, MIN_DATA_POINTS},
    CostRecord, FeatureVector, ResourceAnalysis,
};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use super::load_inventory;
use crate::output::{
    format_currency, format_percent, print_json, print_table, print_warning, truncate_id,
    OutputFormat,
};

/// Row for features table
#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Points")]
    data_points: usize,
    #[tabled(rename = "Avg/day")]
    avg_daily: String,
    #[tabled(rename = "Monthly")]
    monthly: String,
    #[tabled(rename = "Volatility")]
    volatility: String,
    #[tabled(rename = "Trend")]
    trend: String,
    #[tabled(rename = "Inefficiencies")]
    inefficiencies: String,
}

#[derive(Serialize)]
struct ResourceFeatures {
    features: FeatureVector,
    analysis: ResourceAnalysis,
}

/// Extract and print features for each resource with enough history
pub async fn show_features(
    inventory: &Path,
    resources: Vec<String>,
    now: DateTime<Utc>,
    format: OutputFormat,
) -> Result<()> {
    let inventory =
        load_inventory(inventory, &resources, now, DEFAULT_ANALYSIS_WINDOW_DAYS).await?;
    let extractor = FeatureExtractor::default();
    let analyzer = PatternAnalyzer::new();

    let mut analysed = Vec::new();
    let mut skipped = Vec::new();
    for resource in &inventory.resources {
        let records: Vec<CostRecord> = inventory.records_for(&resource.id).cloned().collect();
        match extractor.extract(resource, &records, now) {
            Some(features) => {
                let analysis = analyzer.analyze(&features);
                analysed.push(ResourceFeatures { features, analysis });
            }
            None => skipped.push((resource.id.clone(), records.len())),
        }
    }

    match format {
        OutputFormat::Json => print_json(&analysed)?,
        OutputFormat::Table => {
            let rows: Vec<FeatureRow> = analysed
                .iter()
                .map(|r| FeatureRow {
                    resource: truncate_id(&r.features.resource_id),
                    data_points: r.features.data_points,
                    avg_daily: format_currency(r.features.avg_daily_cost),
                    monthly: format_currency(r.features.monthly_cost()),
                    volatility: format_percent(r.features.cost_volatility),
                    trend: format!("{:+.2}", r.features.cost_trend),
                    inefficiencies: r
                        .analysis
                        .inefficiencies
                        .iter()
                        .map(|i| i.kind.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                })
                .collect();
            print_table(rows, "No resources with enough cost history");

            for (id, points) in &skipped {
                print_warning(&format!(
                    "{} skipped: {} cost records, need {}",
                    id, points, MIN_DATA_POINTS
                ));
            }
        }
    }

    Ok(())
}
