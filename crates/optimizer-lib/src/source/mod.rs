//! Data source and persistence collaborators
//!
//! The pipeline reads resources and cost records through [`DataSource`] and
//! hands finalized recommendations to a [`RecommendationSink`]. Both are async
//! because they usually sit in front of a database or a file.

mod json;
mod memory;

pub use json::{JsonFileSink, JsonFileSource};
pub use memory::{InMemorySource, MemorySink};

use crate::error::SourceError;
use crate::models::{CostRecord, Recommendation, Resource};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Window from `days` days before `end` up to `end`, both inclusive.
    ///
    /// Daily billing usually lags a day, so a 30 day window ending today
    /// still holds 30 complete days of records.
    pub fn ending(end: NaiveDate, days: u32) -> Self {
        Self {
            start: end - Duration::days(i64::from(days)),
            end,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Resources and their cost history as returned by a source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub cost_records: Vec<CostRecord>,
}

impl Inventory {
    /// Keep only the requested resources and the records inside `range`
    pub fn restrict(mut self, filter: Option<&BTreeSet<String>>, range: DateRange) -> Self {
        if let Some(ids) = filter {
            self.resources.retain(|r| ids.contains(&r.id));
        }
        let known: HashSet<&str> = self.resources.iter().map(|r| r.id.as_str()).collect();
        self.cost_records
            .retain(|c| known.contains(c.resource_id.as_str()) && range.contains(c.date));
        self
    }

    pub fn records_for<'a>(&'a self, resource_id: &'a str) -> impl Iterator<Item = &'a CostRecord> {
        self.cost_records
            .iter()
            .filter(move |c| c.resource_id == resource_id)
    }
}

/// Read-only provider of resources and cost records
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(
        &self,
        filter: Option<&BTreeSet<String>>,
        range: DateRange,
    ) -> Result<Inventory, SourceError>;
}

/// A recommendation the sink refused to store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistFailure {
    pub recommendation_id: String,
    pub reason: String,
}

/// Outcome of writing one batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistReport {
    /// Newly stored
    pub written: usize,
    /// Already stored and replaced with the latest version
    #[serde(default)]
    pub updated: usize,
    pub failures: Vec<PersistFailure>,
}

impl PersistReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Destination for finalized recommendations. Failures are reported, never retried.
#[async_trait]
pub trait RecommendationSink: Send + Sync {
    async fn persist(&self, batch: &[Recommendation]) -> Result<PersistReport, SourceError>;
}

/// Upsert `batch` into `stored` keyed by id.
///
/// An id already stored for the same resource is replaced in place. An id
/// repeated within the batch, or stored for a different resource, is rejected.
pub(crate) fn upsert(stored: &mut Vec<Recommendation>, batch: &[Recommendation]) -> PersistReport {
    let mut index: HashMap<String, usize> = stored
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id.clone(), i))
        .collect();
    let mut in_batch: HashSet<&str> = HashSet::new();
    let mut report = PersistReport::default();

    for rec in batch {
        if !in_batch.insert(rec.id.as_str()) {
            report.failures.push(PersistFailure {
                recommendation_id: rec.id.clone(),
                reason: "duplicate recommendation id in batch".to_string(),
            });
            continue;
        }
        match index.get(&rec.id) {
            Some(&i) if stored[i].resource_id != rec.resource_id => {
                report.failures.push(PersistFailure {
                    recommendation_id: rec.id.clone(),
                    reason: format!(
                        "recommendation id already stored for resource {}",
                        stored[i].resource_id
                    ),
                });
            }
            Some(&i) => {
                stored[i] = rec.clone();
                report.updated += 1;
            }
            None => {
                index.insert(rec.id.clone(), stored.len());
                stored.push(rec.clone());
                report.written += 1;
            }
        }
    }
    report
}
