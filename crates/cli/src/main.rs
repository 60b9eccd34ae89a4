//! Cloud Cost Optimizer CLI
//!
//! A command-line tool for running the optimization pipeline over a local
//! inventory file and inspecting features and risk for individual resources.

mod commands;
mod config;
mod output;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use commands::{features, risk, run};
use optimizer_lib::risk::ActionKind;
use std::path::PathBuf;

/// Cloud Cost Optimizer CLI
#[derive(Parser)]
#[command(name = "cco")]
#[command(author, version, about = "CLI for the Cloud Cost Optimizer", long_about = None)]
pub struct Cli {
    /// Inventory JSON file (can also be set via CCO_INVENTORY env var)
    #[arg(long, short, env = "CCO_INVENTORY", global = true)]
    pub inventory: Option<PathBuf>,

    /// Output format
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    /// Analyse as of this date (YYYY-MM-DD) instead of today
    #[arg(long, global = true)]
    pub as_of: Option<NaiveDate>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full optimization pipeline
    Run {
        /// Only analyse these resources (repeatable)
        #[arg(long = "resource", short)]
        resources: Vec<String>,

        /// Append validated recommendations to this JSON file
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Days of cost history to analyse
        #[arg(long)]
        window_days: Option<u32>,

        /// Minimum confidence for a recommendation to pass validation
        #[arg(long)]
        min_confidence: Option<f64>,

        /// Skip risk assessment
        #[arg(long)]
        no_risk: bool,

        /// Skip performance prediction
        #[arg(long)]
        no_performance: bool,

        /// Skip cost anomaly detection
        #[arg(long)]
        no_anomalies: bool,
    },

    /// Show extracted features and detected inefficiencies
    Features {
        /// Only show these resources (repeatable)
        #[arg(long = "resource", short)]
        resources: Vec<String>,
    },

    /// Assess the risk of acting on a resource
    Risk {
        /// Resource ID
        resource: String,

        /// Kind of change being considered
        #[arg(long, value_enum, default_value = "other")]
        action: ActionArg,

        /// The change requires downtime
        #[arg(long)]
        downtime: bool,

        /// The change requires data migration
        #[arg(long)]
        data_migration: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ActionArg {
    Rightsizing,
    InstanceTypeChange,
    ReservedCapacity,
    SpotConversion,
    StorageChange,
    Other,
}

impl From<ActionArg> for ActionKind {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Rightsizing => ActionKind::Rightsizing,
            ActionArg::InstanceTypeChange => ActionKind::InstanceTypeChange,
            ActionArg::ReservedCapacity => ActionKind::ReservedCapacity,
            ActionArg::SpotConversion => ActionKind::SpotConversion,
            ActionArg::StorageChange => ActionKind::StorageChange,
            ActionArg::Other => ActionKind::Other,
        }
    }
}

/// Midday UTC of the given date, or now
fn as_of(date: Option<NaiveDate>) -> DateTime<Utc> {
    date.and_then(|d| d.and_hms_opt(12, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or_else(Utc::now)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::Config::load()?;
    let inventory = config.inventory(cli.inventory);
    let format = config.format(cli.format);
    let now = as_of(cli.as_of);

    match cli.command {
        Commands::Run {
            resources,
            output,
            window_days,
            min_confidence,
            no_risk,
            no_performance,
            no_anomalies,
        } => {
            let options = run::RunOptions {
                resources,
                output,
                window_days,
                min_confidence,
                risk: !no_risk,
                performance: !no_performance,
                anomalies: !no_anomalies,
            };
            run::run_pipeline(&inventory, options, now, format).await?;
        }
        Commands::Features { resources } => {
            features::show_features(&inventory, resources, now, format).await?;
        }
        Commands::Risk {
            resource,
            action,
            downtime,
            data_migration,
        } => {
            risk::assess_resource(
                &inventory,
                &resource,
                action.into(),
                downtime,
                data_migration,
                now,
                format,
            )
            .await?;
        }
    }

    Ok(())
}
