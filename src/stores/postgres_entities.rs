// src/stores/postgres_entities.rs

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::models::{Entity, PipelineResult};
use crate::stores::EntityStore;
use crate::utils::db_connect::PgPool;
use crate::utils::pipeline_config::validate_identifier;

/// Entity records in a Postgres table with columns
/// `id, name, category, ai_summary, ai_summary_tags, summary_last_updated`.
#[derive(Clone)]
pub struct PostgresEntityStore {
    pool: PgPool,
    table: String,
}

impl PostgresEntityStore {
    pub fn new(pool: PgPool, table: &str) -> Result<Self> {
        validate_identifier(table).context("Invalid entity table name")?;
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }
}

#[async_trait]
impl EntityStore for PostgresEntityStore {
    async fn check_connection(&self) -> Result<()> {
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for entity store check")?;
        let query = format!(
            "SELECT COUNT(*) FROM {} WHERE ai_summary IS NULL",
            self.table
        );
        let row = conn
            .query_one(query.as_str(), &[])
            .await
            .with_context(|| format!("Entity table '{}' is not readable", self.table))?;
        let pending: i64 = row.get(0);
        info!("📋 Entity store ready: {} entities pending a summary", pending);
        Ok(())
    }

    async fn fetch_pending(&self, limit: usize, exclude_ids: &[String]) -> Result<Vec<Entity>> {
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for pending entities")?;
        let query = format!(
            "SELECT id, name, category FROM {} \
             WHERE ai_summary IS NULL AND NOT (id = ANY($1)) \
             ORDER BY id LIMIT $2",
            self.table
        );
        let limit = limit as i64;
        let rows = conn
            .query(query.as_str(), &[&exclude_ids, &limit])
            .await
            .context("Failed to query pending entities")?;

        debug!("Fetched {} pending entity rows", rows.len());
        Ok(rows
            .iter()
            .map(|row| Entity {
                id: row.get("id"),
                name: row.get("name"),
                category: row.get("category"),
                ..Default::default()
            })
            .collect())
    }

    async fn write_summary(
        &self,
        entity_id: &str,
        result: &PipelineResult,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for summary write")?;
        let query = format!(
            "UPDATE {} SET ai_summary = $2, ai_summary_tags = $3, summary_last_updated = $4 \
             WHERE id = $1",
            self.table
        );
        let updated = conn
            .execute(
                query.as_str(),
                &[&entity_id, &result.summary, &result.tags, &updated_at],
            )
            .await
            .with_context(|| format!("Failed to update summary for entity {}", entity_id))?;
        if updated == 0 {
            bail!("No entity row with id {} to update", entity_id);
        }
        Ok(())
    }
}
