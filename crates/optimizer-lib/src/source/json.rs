//! JSON file collaborators
//!
//! The source reads an inventory document of the form
//! `{"resources": [...], "cost_records": [...]}`. The sink keeps a JSON array
//! of recommendations and rewrites it through a temporary file on each batch.

use super::{upsert, DataSource, DateRange, Inventory, PersistReport, RecommendationSink};
use crate::error::SourceError;
use crate::models::Recommendation;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

fn io_error(path: &Path, source: std::io::Error) -> SourceError {
    SourceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Reads resources and cost records from a JSON inventory file
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DataSource for JsonFileSource {
    async fn fetch(
        &self,
        filter: Option<&BTreeSet<String>>,
        range: DateRange,
    ) -> Result<Inventory, SourceError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| io_error(&self.path, e))?;
        let inventory: Inventory = serde_json::from_slice(&bytes)?;
        debug!(
            path = %self.path.display(),
            resources = inventory.resources.len(),
            cost_records = inventory.cost_records.len(),
            "Loaded inventory"
        );
        Ok(inventory.restrict(filter, range))
    }
}

/// Persists recommendations to a JSON array file keyed by recommendation id
#[derive(Debug)]
pub struct JsonFileSink {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Everything persisted so far
    pub async fn load(&self) -> Result<Vec<Recommendation>, SourceError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(io_error(&self.path, e)),
        }
    }
}

#[async_trait]
impl RecommendationSink for JsonFileSink {
    async fn persist(&self, batch: &[Recommendation]) -> Result<PersistReport, SourceError> {
        let _guard = self.lock.lock().await;

        let mut stored = self.load().await?;
        let report = upsert(&mut stored, batch);
        if report.written + report.updated == 0 {
            return Ok(report);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(&stored)?;
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_error(&self.path, e))?;

        info!(
            path = %self.path.display(),
            written = report.written,
            updated = report.updated,
            rejected = report.failures.len(),
            "Recommendations persisted"
        );
        Ok(report)
    }
}
