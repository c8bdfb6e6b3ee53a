// src/stores/mod.rs
//
// Document-store and vector-store seams. The orchestrator only sees these traits;
// concrete adapters live in the submodules.

pub mod pgvector_store;
pub mod postgres_entities;
pub mod qdrant;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Entity, PipelineResult, RawFeedbackPoint};

pub use pgvector_store::PgVectorStore;
pub use postgres_entities::PostgresEntityStore;
pub use qdrant::QdrantVectorStore;

/// Holds entity records and their summary fields.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn check_connection(&self) -> Result<()>;

    /// Up to `limit` entities with no summary, skipping `exclude_ids`.
    /// Never pages by offset: completed entities drop out of the filter.
    async fn fetch_pending(&self, limit: usize, exclude_ids: &[String]) -> Result<Vec<Entity>>;

    /// Sets summary, tags and timestamp on one entity. Setting the summary marks
    /// the entity complete.
    async fn write_summary(
        &self,
        entity_id: &str,
        result: &PipelineResult,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Holds feedback texts and their embeddings, keyed by entity.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn check_connection(&self) -> Result<()>;

    async fn fetch_feedback(&self, entity_id: &str, limit: usize) -> Result<Vec<RawFeedbackPoint>>;
}
