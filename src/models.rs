// src/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name used in prompts when the entity record carries none.
pub const DEFAULT_ENTITY_NAME: &str = "Unknown";
/// Category label used in prompts when the entity record carries none.
pub const DEFAULT_CATEGORY_LABEL: &str = "their department";
/// Summary written when the model produced nothing usable.
pub const FALLBACK_SUMMARY: &str = "AI summary could not be generated at this time.";

/// A subject being summarized, e.g. an instructor.
///
/// The presence of `summary` is the completion marker: an entity is pending
/// while it is `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Entity {
    pub id: String,
    pub name: Option<String>,
    pub category: Option<String>,
    pub summary: Option<String>,
    pub tags: Option<Vec<String>>,
    pub summary_last_updated: Option<DateTime<Utc>>,
}

impl Entity {
    pub fn pending(id: &str, name: &str, category: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            name: Some(name.to_string()),
            category: category.map(|c| c.to_string()),
            ..Default::default()
        }
    }

    pub fn is_pending(&self) -> bool {
        self.summary.is_none()
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(DEFAULT_ENTITY_NAME)
    }

    pub fn category_label(&self) -> &str {
        self.category
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_CATEGORY_LABEL)
    }
}

/// A point as returned by the vector store, before well-formedness checks.
///
/// `vector` is kept loosely typed because stores may hand back a missing slot,
/// an empty list or a value of the wrong type.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeedbackPoint {
    pub text: Option<String>,
    pub vector: Option<serde_json::Value>,
}

/// One validated feedback item: raw text plus its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRecord {
    pub text: String,
    pub vector: Vec<f32>,
}

impl FeedbackRecord {
    pub fn new(text: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            vector,
        }
    }
}

/// In-memory cluster of feedback texts for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    /// Cluster index, 0..k-1.
    pub index: usize,
    pub texts: Vec<String>,
    pub summary: Option<String>,
}

impl Theme {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            texts: Vec::new(),
            summary: None,
        }
    }

    /// Human-readable label handed to the model, 1-based.
    pub fn label(&self) -> String {
        format!("Theme {}", self.index + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

/// Holistic summary and descriptor tags for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub summary: String,
    pub tags: Vec<String>,
}

impl PipelineResult {
    /// Degraded result: free text as the summary, no tags.
    pub fn text_only(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            tags: Vec::new(),
        }
    }

    pub fn fallback() -> Self {
        Self::text_only(FALLBACK_SUMMARY)
    }
}
