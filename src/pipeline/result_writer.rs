// src/pipeline/result_writer.rs

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::models::PipelineResult;
use crate::stores::EntityStore;

/// Persists a result onto its entity, which also marks the entity complete.
pub struct ResultWriter {
    store: Arc<dyn EntityStore>,
}

impl ResultWriter {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Overwrites summary, tags and timestamp. Returns the UTC timestamp written.
    pub async fn write(&self, entity_id: &str, result: &PipelineResult) -> Result<DateTime<Utc>> {
        let updated_at = Utc::now();
        self.store
            .write_summary(entity_id, result, updated_at)
            .await
            .with_context(|| format!("Failed to write summary for entity {}", entity_id))?;
        Ok(updated_at)
    }
}
