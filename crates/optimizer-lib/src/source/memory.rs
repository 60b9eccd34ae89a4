//! In-memory collaborators for tests and embedding

use super::{upsert, DataSource, DateRange, Inventory, PersistReport, RecommendationSink};
use crate::error::SourceError;
use crate::models::Recommendation;
use async_trait::async_trait;
use std::collections::BTreeSet;
use tokio::sync::RwLock;

/// Serves a fixed inventory
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    inventory: Inventory,
    unavailable: Option<String>,
}

impl InMemorySource {
    pub fn new(inventory: Inventory) -> Self {
        Self {
            inventory,
            unavailable: None,
        }
    }

    /// A source whose every fetch fails
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            inventory: Inventory::default(),
            unavailable: Some(reason.into()),
        }
    }
}

#[async_trait]
impl DataSource for InMemorySource {
    async fn fetch(
        &self,
        filter: Option<&BTreeSet<String>>,
        range: DateRange,
    ) -> Result<Inventory, SourceError> {
        if let Some(reason) = &self.unavailable {
            return Err(SourceError::Unavailable(reason.clone()));
        }
        Ok(self.inventory.clone().restrict(filter, range))
    }
}

/// Keeps persisted recommendations in memory with read-your-writes semantics
#[derive(Debug, Default)]
pub struct MemorySink {
    stored: RwLock<Vec<Recommendation>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn recommendations(&self) -> Vec<Recommendation> {
        self.stored.read().await.clone()
    }
}

#[async_trait]
impl RecommendationSink for MemorySink {
    async fn persist(&self, batch: &[Recommendation]) -> Result<PersistReport, SourceError> {
        let mut stored = self.stored.write().await;
        Ok(upsert(&mut stored, batch))
    }
}
