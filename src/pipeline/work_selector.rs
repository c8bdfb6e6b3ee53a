// src/pipeline/work_selector.rs

use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::HashSet;
use std::sync::Arc;

use crate::models::Entity;
use crate::stores::EntityStore;

/// Hands out batches of pending entities until none are left.
///
/// Every request is `limit B` against the pending filter with no offset: entities
/// that complete leave the filter on their own. Entities handed out in this run
/// that are still pending (skipped or failed) are excluded explicitly so the loop
/// cannot select them again.
pub struct WorkSelector {
    store: Arc<dyn EntityStore>,
    batch_size: usize,
    max_batches: Option<usize>,
    unfinished: HashSet<String>,
    batches_served: usize,
}

impl WorkSelector {
    pub fn new(store: Arc<dyn EntityStore>, batch_size: usize, max_batches: Option<usize>) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            max_batches,
            unfinished: HashSet::new(),
            batches_served: 0,
        }
    }

    /// Next batch, or `None` once the pending set is exhausted or the batch cap is hit.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<Entity>>> {
        if let Some(max) = self.max_batches {
            if self.batches_served >= max {
                info!("⏹️  Reached batch limit of {}, stopping", max);
                return Ok(None);
            }
        }

        let mut exclude: Vec<String> = self.unfinished.iter().cloned().collect();
        exclude.sort();
        let batch = self
            .store
            .fetch_pending(self.batch_size, &exclude)
            .await
            .context("Failed to fetch pending entities")?;

        if batch.is_empty() {
            debug!("No pending entities left ({} excluded this run)", exclude.len());
            return Ok(None);
        }
        for entity in &batch {
            self.unfinished.insert(entity.id.clone());
        }
        self.batches_served += 1;
        Ok(Some(batch))
    }

    /// A written entity drops out of the pending filter, so it no longer needs excluding.
    pub fn mark_completed(&mut self, entity_id: &str) {
        self.unfinished.remove(entity_id);
    }

    pub fn batches_served(&self) -> usize {
        self.batches_served
    }
}
