// src/stores/pgvector_store.rs

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use pgvector::Vector;

use crate::models::RawFeedbackPoint;
use crate::stores::VectorStore;
use crate::utils::db_connect::PgPool;
use crate::utils::pipeline_config::validate_identifier;

/// Feedback rows in a Postgres table with a `vector` column:
/// `entity_id TEXT, review_text TEXT, embedding VECTOR(n)`.
#[derive(Clone)]
pub struct PgVectorStore {
    pool: PgPool,
    table: String,
}

impl PgVectorStore {
    pub fn new(pool: PgPool, table: &str) -> Result<Self> {
        validate_identifier(table).context("Invalid pgvector table name")?;
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn check_connection(&self) -> Result<()> {
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for vector store check")?;
        let query = format!("SELECT COUNT(*) FROM {}", self.table);
        let row = conn
            .query_one(query.as_str(), &[])
            .await
            .with_context(|| format!("Feedback table '{}' is not readable", self.table))?;
        let count: i64 = row.get(0);
        info!("🧮 pgvector store ready: {} feedback rows in {}", count, self.table);
        Ok(())
    }

    async fn fetch_feedback(&self, entity_id: &str, limit: usize) -> Result<Vec<RawFeedbackPoint>> {
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for feedback fetch")?;
        let query = format!(
            "SELECT review_text, embedding FROM {} WHERE entity_id = $1 LIMIT $2",
            self.table
        );
        let limit = limit as i64;
        let rows = conn
            .query(query.as_str(), &[&entity_id, &limit])
            .await
            .with_context(|| format!("Failed to fetch feedback for entity {}", entity_id))?;

        let points: Vec<RawFeedbackPoint> = rows
            .iter()
            .map(|row| {
                let text: Option<String> = row.try_get("review_text").ok().flatten();
                // A NULL or undecodable embedding is left for the fetcher to drop.
                let vector = row
                    .try_get::<_, Option<Vector>>("embedding")
                    .ok()
                    .flatten()
                    .map(|v| serde_json::Value::from(v.to_vec()));
                RawFeedbackPoint { text, vector }
            })
            .collect();
        debug!("pgvector returned {} points for entity {}", points.len(), entity_id);
        Ok(points)
    }
}
