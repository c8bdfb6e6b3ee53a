use anyhow::{Context, Result};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use summarizer_lib::clustering::KMeansThemeClusterer;
use summarizer_lib::llm::{LanguageModel, OllamaClient};
use summarizer_lib::pipeline::{run_summary_pipeline, PipelineContext};
use summarizer_lib::stores::{PgVectorStore, PostgresEntityStore, QdrantVectorStore, VectorStore};
use summarizer_lib::utils::db_connect::{connect, get_pool_status};
use summarizer_lib::utils::env::load_env;
use summarizer_lib::utils::get_memory_usage;
use summarizer_lib::utils::pipeline_config::{PipelineConfig, VectorBackend};
use summarizer_lib::utils::progress_config::ProgressConfig;

const VECTOR_STORE_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env first so RUST_LOG from the file applies
    let env_file = load_env();
    env_logger::init();
    info!("Starting feedback theme summarization pipeline");
    match env_file {
        Ok(Some(path)) => info!("Loaded environment from {}", path.display()),
        Ok(None) => info!("No .env file found, using process environment"),
        Err(e) => warn!("Could not parse .env file: {}. Using process environment.", e),
    }

    let config = PipelineConfig::from_env();
    config.log_config();
    let progress_config = ProgressConfig::from_env();
    let multi_progress = progress_config.create_multi_progress();

    let pool = connect(&config.postgres)
        .await
        .context("Failed to connect to database")?;
    info!("Successfully connected to the database");

    let entity_store = Arc::new(PostgresEntityStore::new(pool.clone(), &config.entity_table)?);
    let vector_store: Arc<dyn VectorStore> = match &config.vector_backend {
        VectorBackend::Qdrant(settings) => {
            Arc::new(QdrantVectorStore::new(settings, VECTOR_STORE_TIMEOUT)?)
        }
        VectorBackend::PgVector { table } => Arc::new(PgVectorStore::new(pool.clone(), table)?),
    };
    let model: Arc<dyn LanguageModel> = Arc::new(OllamaClient::new(&config.ollama)?);
    let clusterer = Arc::new(KMeansThemeClusterer::new(config.cluster_seed));

    let ctx = PipelineContext::new(
        entity_store,
        vector_store,
        model,
        clusterer,
        config.pipeline.clone(),
    );

    let stats = match run_summary_pipeline(&ctx, multi_progress.as_ref()).await {
        Ok(stats) => stats,
        Err(e) => {
            error!("Summary pipeline aborted: {:#}", e);
            return Err(e);
        }
    };
    stats.log_summary();

    if progress_config.should_show_memory() {
        let final_memory_mb = get_memory_usage().await;
        info!("Final memory usage: {} MB", final_memory_mb);
    }
    if progress_config.should_show_db_connection_stats() {
        let (pool_size, idle_connections, in_use_connections) = get_pool_status(&pool);
        info!(
            "Final DB Connection Pool Status: Total: {}, Idle: {}, In Use: {}",
            pool_size, idle_connections, in_use_connections
        );
    }

    info!("Pipeline completed successfully!");
    Ok(())
}
