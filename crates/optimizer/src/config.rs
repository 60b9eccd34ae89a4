//! Service configuration

use anyhow::{Context, Result};
use optimizer_lib::PipelineConfig;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming an optional configuration file
pub const CONFIG_PATH_ENV: &str = "OPTIMIZER_CONFIG";

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OptimizerConfig {
    /// Name attached to structured log events
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// JSON inventory of resources and cost records
    #[serde(default = "default_inventory_path")]
    pub inventory_path: PathBuf,

    /// JSON file receiving validated recommendations
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Interval between pipeline runs in seconds
    #[serde(default = "default_run_interval")]
    pub run_interval_secs: u64,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

fn default_service_name() -> String {
    "cost-optimizer".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_inventory_path() -> PathBuf {
    PathBuf::from("inventory.json")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("recommendations.json")
}

fn default_run_interval() -> u64 {
    3600
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            api_port: default_api_port(),
            inventory_path: default_inventory_path(),
            output_path: default_output_path(),
            run_interval_secs: default_run_interval(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl OptimizerConfig {
    /// Load from the optional file named by `OPTIMIZER_CONFIG`, then the environment.
    ///
    /// Nested keys use a double underscore, e.g. `OPTIMIZER_PIPELINE__MIN_DATA_POINTS=10`.
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            builder = builder.add_source(config::File::with_name(&path).required(true));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("OPTIMIZER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        Self::from_builder(builder)
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        let config: Self = builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.run_interval_secs == 0 {
            anyhow::bail!("run_interval_secs must be at least 1");
        }
        self.pipeline
            .validate()
            .context("invalid pipeline configuration")?;
        Ok(())
    }

    pub fn run_interval(&self) -> Duration {
        Duration::from_secs(self.run_interval_secs)
    }
}
