//! Configuration management for the CLI

use crate::output::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Inventory used when neither the flag, the environment nor the config names one
pub const DEFAULT_INVENTORY: &str = "inventory.json";

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Default inventory file
    pub default_inventory: Option<PathBuf>,
    /// Default output format
    pub default_format: Option<OutputFormat>,
}

impl Config {
    /// Load configuration from `~/.config/cco/config.json`, if present
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Inventory from the flag, then the config file, then the default
    pub fn inventory(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.default_inventory.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INVENTORY))
    }

    pub fn format(&self, flag: Option<OutputFormat>) -> OutputFormat {
        flag.or(self.default_format).unwrap_or_default()
    }

    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("cco").join("config.json"))
    }
}
