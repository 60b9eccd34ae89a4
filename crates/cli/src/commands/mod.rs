//! CLI subcommands

pub mod features;
pub mod risk;
pub mod run;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use optimizer_lib::{DataSource, DateRange, Inventory, JsonFileSource};
use std::collections::BTreeSet;
use std::path::Path;

/// Load the inventory restricted to `window_days` ending at `now`
async fn load_inventory(
    path: &Path,
    resources: &[String],
    now: DateTime<Utc>,
    window_days: u32,
) -> Result<Inventory> {
    let filter: BTreeSet<String> = resources.iter().cloned().collect();
    let filter = (!filter.is_empty()).then_some(filter);
    JsonFileSource::new(path)
        .fetch(
            filter.as_ref(),
            DateRange::ending(now.date_naive(), window_days),
        )
        .await
        .with_context(|| format!("Failed to load inventory {}", path.display()))
}
