// src/clustering/mod.rs

pub mod kmeans;

use thiserror::Error;

use crate::models::{FeedbackRecord, Theme};

pub use kmeans::KMeansThemeClusterer;

#[derive(Debug, Error, PartialEq)]
pub enum ClusteringError {
    #[error("insufficient data: {found} valid records, {required} required")]
    InsufficientData { found: usize, required: usize },

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("clustering failed: {0}")]
    Algorithm(String),
}

/// Partitions one entity's feedback into `k` themes.
///
/// Implementations must be deterministic for identical input order and `k`.
pub trait ThemeClusterer: Send + Sync {
    fn cluster(&self, records: &[FeedbackRecord], k: usize) -> Result<Vec<Theme>, ClusteringError>;
}

/// Groups record texts by cluster assignment. Returns exactly `k` themes in index
/// order; themes nobody was assigned to stay empty.
pub fn group_into_themes(records: &[FeedbackRecord], assignments: &[usize], k: usize) -> Vec<Theme> {
    let mut themes: Vec<Theme> = (0..k).map(Theme::new).collect();
    for (record, &cluster) in records.iter().zip(assignments) {
        if let Some(theme) = themes.get_mut(cluster) {
            theme.texts.push(record.text.clone());
        }
    }
    themes
}

/// Drops empty themes; only these are sent for summarization.
pub fn non_empty_themes(themes: Vec<Theme>) -> Vec<Theme> {
    themes.into_iter().filter(|t| !t.is_empty()).collect()
}
