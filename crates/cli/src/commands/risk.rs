//! Risk assessment for a single resource

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use optimizer_lib::{
    features::DEFAULT_ANALYSIS_WINDOW_DAYS,
    risk::{ActionDescriptor, ActionKind, RiskScorer},
};
use std::path::Path;
use tabled::Tabled;

use super::load_inventory;
use crate::output::{color_level, print_json, print_table, OutputFormat};

/// Row for risk components table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Factor")]
    factor: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Weight")]
    weight: String,
    #[tabled(rename = "Reasons")]
    reasons: String,
}

/// Score the risk of applying `action` to one resource
pub async fn assess_resource(
    inventory: &Path,
    resource_id: &str,
    action: ActionKind,
    downtime: bool,
    data_migration: bool,
    now: DateTime<Utc>,
    format: OutputFormat,
) -> Result<()> {
    let inventory = load_inventory(
        inventory,
        &[resource_id.to_string()],
        now,
        DEFAULT_ANALYSIS_WINDOW_DAYS,
    )
    .await?;
    let resource = inventory
        .resources
        .iter()
        .find(|r| r.id == resource_id)
        .with_context(|| format!("Resource {} not found in inventory", resource_id))?;

    let descriptor = ActionDescriptor {
        requires_downtime: downtime,
        requires_data_migration: data_migration,
        ..ActionDescriptor::new(action)
    };
    let assessment = RiskScorer::new().assess_at(resource, &descriptor, now);

    match format {
        OutputFormat::Json => print_json(&assessment)?,
        OutputFormat::Table => {
            let rows: Vec<ComponentRow> = assessment
                .components
                .iter()
                .map(|c| ComponentRow {
                    factor: c.factor.as_str().to_string(),
                    score: format!("{:.2}", c.score),
                    weight: format!("{:.2}", c.weight),
                    reasons: c.factors.join("; "),
                })
                .collect();
            print_table(rows, "No risk components");

            println!(
                "\nOverall: {:.2} ({})",
                assessment.overall_risk_score,
                color_level(assessment.risk_level)
            );
            if assessment.requires_approval {
                println!("Requires approval");
            } else if assessment.auto_approval_eligible {
                println!("Eligible for auto-approval");
            }
            println!("\nMitigations:");
            for mitigation in &assessment.mitigations {
                println!("  - {}", mitigation);
            }
        }
    }

    Ok(())
}
