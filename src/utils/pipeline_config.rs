// src/utils/pipeline_config.rs

use anyhow::{bail, Result};
use log::info;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Knobs the orchestrator reads while running batches.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// k for theme clustering
    pub num_clusters: usize,
    /// Entities requested per work-selector batch
    pub batch_size: usize,
    /// Entities processed in parallel within one batch
    pub max_entity_workers: usize,
    /// Theme summaries requested in parallel within one entity
    pub max_theme_workers: usize,
    /// Upper bound on feedback points fetched per entity
    pub feedback_fetch_limit: usize,
    pub theme_temperature: f32,
    pub synthesis_temperature: f32,
    /// Stop after this many batches; None runs until nothing is pending
    pub max_batches: Option<usize>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            num_clusters: 6,
            batch_size: 10,
            max_entity_workers: 4,
            max_theme_workers: 6,
            feedback_fetch_limit: 500,
            theme_temperature: 0.3,
            synthesis_temperature: 0.65,
            max_batches: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OllamaSettings {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QdrantSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub collection: String,
    pub vector_name: String,
    pub entity_key: String,
    pub text_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VectorBackend {
    Qdrant(QdrantSettings),
    PgVector { table: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
}

/// Full run-time configuration, read once in `main`.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub pipeline: PipelineSettings,
    pub cluster_seed: u64,
    pub ollama: OllamaSettings,
    pub vector_backend: VectorBackend,
    pub postgres: PostgresSettings,
    pub entity_table: String,
}

impl PipelineConfig {
    /// Create pipeline configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Missing or unparseable
    /// values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = PipelineSettings::default();
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let max_entity_workers = parse_or(&lookup, "MAX_ENTITY_WORKERS", defaults.max_entity_workers).max(1);

        let pipeline = PipelineSettings {
            num_clusters: parse_or(&lookup, "NUM_CLUSTERS", defaults.num_clusters).max(1),
            batch_size: parse_or(&lookup, "ENTITY_BATCH_SIZE", defaults.batch_size).max(1),
            max_entity_workers,
            max_theme_workers: parse_or(&lookup, "MAX_THEME_WORKERS", defaults.max_theme_workers).max(1),
            feedback_fetch_limit: parse_or(&lookup, "FEEDBACK_FETCH_LIMIT", defaults.feedback_fetch_limit).max(1),
            theme_temperature: parse_or(&lookup, "THEME_TEMPERATURE", defaults.theme_temperature),
            synthesis_temperature: parse_or(&lookup, "SYNTHESIS_TEMPERATURE", defaults.synthesis_temperature),
            max_batches: lookup("MAX_BATCHES")
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|v| *v > 0),
        };

        let ollama = OllamaSettings {
            base_url: text("OLLAMA_URL", "http://localhost:11434"),
            model: text("OLLAMA_MODEL", "deepseek-r1:14b"),
            timeout: Duration::from_secs(parse_or(&lookup, "LLM_TIMEOUT_SECONDS", 300u64).max(1)),
        };

        let vector_backend = match text("VECTOR_BACKEND", "qdrant").trim().to_ascii_lowercase().as_str() {
            "pgvector" => VectorBackend::PgVector {
                table: text("PGVECTOR_TABLE", "feedback"),
            },
            _ => VectorBackend::Qdrant(QdrantSettings {
                base_url: text("QDRANT_URL", "http://localhost:6333"),
                api_key: lookup("QDRANT_API_KEY").filter(|k| !k.trim().is_empty()),
                collection: text("QDRANT_COLLECTION", "feedback"),
                vector_name: text("QDRANT_VECTOR_NAME", "review"),
                entity_key: text("QDRANT_ENTITY_KEY", "entity_id"),
                text_key: text("QDRANT_TEXT_KEY", "review_text"),
            }),
        };

        // One connection per entity worker plus headroom for the work selector.
        let postgres = PostgresSettings {
            host: text("POSTGRES_HOST", "127.0.0.1"),
            port: parse_or(&lookup, "POSTGRES_PORT", 5432u16),
            dbname: text("POSTGRES_DB", "feedback"),
            user: text("POSTGRES_USER", "postgres"),
            password: lookup("POSTGRES_PASSWORD").unwrap_or_default(),
            max_connections: (max_entity_workers as u32).saturating_add(2),
        };

        Self {
            pipeline,
            cluster_seed: parse_or(&lookup, "CLUSTER_SEED", 42u64),
            ollama,
            vector_backend,
            postgres,
            entity_table: text("ENTITY_TABLE", "entities"),
        }
    }

    /// Log the effective configuration with secrets hidden
    pub fn log_config(&self) {
        let p = &self.pipeline;
        info!("⚙️  Pipeline configuration:");
        info!(
            "   Clustering: k={}, seed={} | Batches: size={}, max={}",
            p.num_clusters,
            self.cluster_seed,
            p.batch_size,
            p.max_batches
                .map(|m| m.to_string())
                .unwrap_or_else(|| "unlimited".to_string())
        );
        info!(
            "   Workers: entities={}, themes per entity={} | Feedback fetch limit: {}",
            p.max_entity_workers, p.max_theme_workers, p.feedback_fetch_limit
        );
        info!(
            "   Model: {} at {} (theme temp {:.2}, synthesis temp {:.2}, timeout {}s)",
            self.ollama.model,
            self.ollama.base_url,
            p.theme_temperature,
            p.synthesis_temperature,
            self.ollama.timeout.as_secs()
        );
        match &self.vector_backend {
            VectorBackend::Qdrant(q) => info!(
                "   Vector store: Qdrant at {} (collection={}, vector={}, api key {})",
                q.base_url,
                q.collection,
                q.vector_name,
                if q.api_key.is_some() { "[hidden]" } else { "not set" }
            ),
            VectorBackend::PgVector { table } => info!("   Vector store: pgvector table {}", table),
        }
        info!(
            "   Document store: {}@{}:{}/{} table {}",
            self.postgres.user, self.postgres.host, self.postgres.port, self.postgres.dbname, self.entity_table
        );
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Rejects table and collection names that are unsafe to interpolate into SQL or URLs.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("Identifier must not be empty");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        bail!(
            "Identifier '{}' may only contain ASCII letters, digits, '_' and '.'",
            name
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = PipelineConfig::from_lookup(|_| None);
        assert_eq!(config.pipeline, PipelineSettings::default());
        assert_eq!(config.cluster_seed, 42);
        assert_eq!(config.ollama.model, "deepseek-r1:14b");
        assert_eq!(config.ollama.timeout, Duration::from_secs(300));
        assert_eq!(config.entity_table, "entities");
        match config.vector_backend {
            VectorBackend::Qdrant(q) => {
                assert_eq!(q.collection, "feedback");
                assert_eq!(q.vector_name, "review");
                assert_eq!(q.entity_key, "entity_id");
                assert_eq!(q.text_key, "review_text");
                assert!(q.api_key.is_none());
            }
            other => panic!("unexpected backend {:?}", other),
        }
    }

    #[test]
    fn test_invalid_and_zero_values() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("NUM_CLUSTERS", "zero"),
            ("ENTITY_BATCH_SIZE", "0"),
            ("MAX_THEME_WORKERS", "0"),
            ("MAX_BATCHES", "0"),
            ("THEME_TEMPERATURE", "0.1"),
            ("QDRANT_API_KEY", "  "),
        ]));
        assert_eq!(config.pipeline.num_clusters, 6);
        assert_eq!(config.pipeline.batch_size, 1);
        assert_eq!(config.pipeline.max_theme_workers, 1);
        assert_eq!(config.pipeline.max_batches, None);
        assert!((config.pipeline.theme_temperature - 0.1).abs() < f32::EPSILON);
        match config.vector_backend {
            VectorBackend::Qdrant(q) => assert!(q.api_key.is_none()),
            other => panic!("unexpected backend {:?}", other),
        }
    }

    #[test]
    fn test_pgvector_backend_selection() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("VECTOR_BACKEND", "PgVector"),
            ("PGVECTOR_TABLE", "course_feedback"),
            ("MAX_ENTITY_WORKERS", "8"),
        ]));
        assert_eq!(
            config.vector_backend,
            VectorBackend::PgVector {
                table: "course_feedback".to_string()
            }
        );
        assert_eq!(config.postgres.max_connections, 10);
    }

    #[test]
    fn test_env_config() {
        env::set_var("NUM_CLUSTERS", "3");
        env::set_var("MAX_BATCHES", "2");
        env::set_var("OLLAMA_MODEL", "llama3:8b");

        let config = PipelineConfig::from_env();
        assert_eq!(config.pipeline.num_clusters, 3);
        assert_eq!(config.pipeline.max_batches, Some(2));
        assert_eq!(config.ollama.model, "llama3:8b");

        env::remove_var("NUM_CLUSTERS");
        env::remove_var("MAX_BATCHES");
        env::remove_var("OLLAMA_MODEL");
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("entities").is_ok());
        assert!(validate_identifier("public.entities_v2").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("entities; DROP TABLE x").is_err());
        assert!(validate_identifier("feed-back").is_err());
    }
}
