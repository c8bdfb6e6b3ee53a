// src/pipeline/orchestrator.rs

use anyhow::{Context, Result};
use futures::future::join_all;
use indicatif::MultiProgress;
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::clustering::{non_empty_themes, ClusteringError, ThemeClusterer};
use crate::llm::LanguageModel;
use crate::models::Entity;
use crate::pipeline::progress::BatchProgress;
use crate::pipeline::result_writer::ResultWriter;
use crate::pipeline::stats::{EntityOutcome, RunStats, SkipReason};
use crate::pipeline::vector_fetcher::VectorFetcher;
use crate::pipeline::work_selector::WorkSelector;
use crate::stores::{EntityStore, VectorStore};
use crate::summarization::{HolisticSynthesizer, ThemeSummarizer};
use crate::utils::pipeline_config::PipelineSettings;

/// Everything a worker task needs, built once and cloned into each task.
/// The collaborators are thread-safe and shared through `Arc`.
#[derive(Clone)]
pub struct PipelineContext {
    pub entity_store: Arc<dyn EntityStore>,
    pub vector_store: Arc<dyn VectorStore>,
    pub model: Arc<dyn LanguageModel>,
    pub clusterer: Arc<dyn ThemeClusterer>,
    pub settings: Arc<PipelineSettings>,
}

impl PipelineContext {
    pub fn new(
        entity_store: Arc<dyn EntityStore>,
        vector_store: Arc<dyn VectorStore>,
        model: Arc<dyn LanguageModel>,
        clusterer: Arc<dyn ThemeClusterer>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            entity_store,
            vector_store,
            model,
            clusterer,
            settings: Arc::new(settings),
        }
    }
}

/// Startup checks. Any failure here aborts the run before work is selected.
pub async fn verify_collaborators(ctx: &PipelineContext) -> Result<()> {
    ctx.model
        .ensure_available()
        .await
        .with_context(|| format!("Language model '{}' is not available", ctx.model.model_name()))?;
    ctx.entity_store
        .check_connection()
        .await
        .context("Document store check failed")?;
    ctx.vector_store
        .check_connection()
        .await
        .context("Vector store check failed")?;
    Ok(())
}

/// Runs batches until no pending entity is left. Per-entity failures are counted,
/// never returned; an `Err` means the run itself could not proceed.
pub async fn run_summary_pipeline(
    ctx: &PipelineContext,
    multi_progress: Option<&MultiProgress>,
) -> Result<RunStats> {
    let start = Instant::now();
    let mut stats = RunStats::new(Uuid::new_v4().to_string());
    info!("🚀 Starting summary run {}", stats.run_id);

    verify_collaborators(ctx).await?;

    let settings = ctx.settings.clone();
    let mut selector = WorkSelector::new(
        ctx.entity_store.clone(),
        settings.batch_size,
        settings.max_batches,
    );
    let entity_semaphore = Arc::new(Semaphore::new(settings.max_entity_workers.max(1)));

    while let Some(batch) = selector.next_batch().await? {
        stats.batches += 1;
        info!("📦 Batch {}: processing {} entities", stats.batches, batch.len());
        let progress = Arc::new(BatchProgress::new(multi_progress, batch.len(), stats.batches));

        let ids: Vec<String> = batch.iter().map(|e| e.id.clone()).collect();
        let mut tasks = Vec::with_capacity(batch.len());
        for entity in batch {
            let ctx = ctx.clone();
            let semaphore = entity_semaphore.clone();
            let progress = progress.clone();
            tasks.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return EntityOutcome::Failed("entity worker pool closed".to_string()),
                };
                let outcome = process_single_entity(&ctx, &entity).await;
                progress.increment(outcome.short_label());
                outcome
            }));
        }

        for (entity_id, joined) in ids.iter().zip(join_all(tasks).await) {
            let outcome = joined
                .unwrap_or_else(|e| EntityOutcome::Failed(format!("entity task did not complete: {}", e)));
            log_outcome(entity_id, &outcome);
            if matches!(outcome, EntityOutcome::Processed { .. }) {
                selector.mark_completed(entity_id);
            }
            stats.record(&outcome);
        }
        progress.finish(&format!("Batch {} complete", stats.batches));
    }

    stats.elapsed = start.elapsed();
    Ok(stats)
}

/// Fetch, cluster, summarize, synthesize and write one entity.
pub async fn process_single_entity(ctx: &PipelineContext, entity: &Entity) -> EntityOutcome {
    let settings = &ctx.settings;
    let k = settings.num_clusters;

    let fetcher = VectorFetcher::new(ctx.vector_store.clone(), settings.feedback_fetch_limit);
    let records = match fetcher.fetch(&entity.id).await {
        Ok(records) => records,
        Err(e) => return EntityOutcome::Failed(format!("{:#}", e)),
    };
    if records.len() < k {
        return EntityOutcome::Skipped(SkipReason::InsufficientData {
            found: records.len(),
            required: k,
        });
    }

    // k-means is CPU-bound; keep it off the async workers.
    let clusterer = ctx.clusterer.clone();
    let clustered = tokio::task::spawn_blocking(move || clusterer.cluster(&records, k)).await;
    let themes = match clustered {
        Ok(Ok(themes)) => non_empty_themes(themes),
        Ok(Err(ClusteringError::InsufficientData { found, required })) => {
            return EntityOutcome::Skipped(SkipReason::InsufficientData { found, required })
        }
        Ok(Err(e)) => return EntityOutcome::Failed(format!("clustering: {}", e)),
        Err(e) => return EntityOutcome::Failed(format!("clustering task did not complete: {}", e)),
    };

    let attempted = themes.len();
    let summarizer = ThemeSummarizer::new(ctx.model.clone(), settings.theme_temperature);
    let summaries: Vec<String> = summarizer
        .summarize_all(&entity.id, themes, settings.max_theme_workers)
        .await
        .into_iter()
        .filter_map(|theme| theme.summary)
        .collect();
    if summaries.is_empty() {
        return EntityOutcome::Skipped(SkipReason::NoThemeSummaries { attempted });
    }

    let synthesizer = HolisticSynthesizer::new(ctx.model.clone(), settings.synthesis_temperature);
    let result = synthesizer.synthesize(&summaries, entity).await;

    let writer = ResultWriter::new(ctx.entity_store.clone());
    match writer.write(&entity.id, &result).await {
        Ok(_) => EntityOutcome::Processed {
            themes: summaries.len(),
            tags: result.tags.len(),
        },
        Err(e) => EntityOutcome::Failed(format!("{:#}", e)),
    }
}

fn log_outcome(entity_id: &str, outcome: &EntityOutcome) {
    match outcome {
        EntityOutcome::Processed { themes, tags } => info!(
            "[{}] ✅ processed ({} themes, {} tags)",
            entity_id, themes, tags
        ),
        EntityOutcome::Skipped(reason) => info!("[{}] ⏭️  skipped: {}", entity_id, reason),
        EntityOutcome::Failed(reason) => warn!("[{}] ❌ failed: {}", entity_id, reason),
    }
}
