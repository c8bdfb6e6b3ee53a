// src/pipeline/vector_fetcher.rs

use anyhow::{Context, Result};
use log::debug;
use serde_json::Value;
use std::sync::Arc;

use crate::models::{FeedbackRecord, RawFeedbackPoint};
use crate::stores::VectorStore;

/// Loads one entity's feedback and keeps only well-formed records.
pub struct VectorFetcher {
    store: Arc<dyn VectorStore>,
    limit: usize,
}

impl VectorFetcher {
    pub fn new(store: Arc<dyn VectorStore>, limit: usize) -> Self {
        Self { store, limit }
    }

    /// An empty result is valid; only store failures are errors.
    pub async fn fetch(&self, entity_id: &str) -> Result<Vec<FeedbackRecord>> {
        let points = self
            .store
            .fetch_feedback(entity_id, self.limit)
            .await
            .with_context(|| format!("Failed to fetch feedback vectors for entity {}", entity_id))?;
        let total = points.len();
        let records = validate_points(points);
        if records.len() < total {
            debug!(
                "[{}] Dropped {} of {} feedback points as malformed",
                entity_id,
                total - records.len(),
                total
            );
        }
        Ok(records)
    }
}

/// Drops points with no text, or with a vector that is absent, empty, non-numeric,
/// or of a different length than the first valid one.
pub fn validate_points(points: Vec<RawFeedbackPoint>) -> Vec<FeedbackRecord> {
    let mut dimension: Option<usize> = None;
    let mut records = Vec::with_capacity(points.len());

    for point in points {
        let text = match point.text {
            Some(text) if !text.trim().is_empty() => text,
            _ => continue,
        };
        let vector = match point.vector.as_ref().and_then(parse_vector) {
            Some(vector) => vector,
            None => continue,
        };
        match dimension {
            Some(d) if d != vector.len() => continue,
            Some(_) => {}
            None => dimension = Some(vector.len()),
        }
        records.push(FeedbackRecord::new(text, vector));
    }
    records
}

fn parse_vector(value: &Value) -> Option<Vec<f32>> {
    let items = value.as_array()?;
    if items.is_empty() {
        return None;
    }
    items
        .iter()
        .map(|v| v.as_f64().filter(|f| f.is_finite()).map(|f| f as f32))
        .collect()
}
