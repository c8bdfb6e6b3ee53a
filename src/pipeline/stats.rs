// src/pipeline/stats.rs

use log::info;
use std::fmt;
use std::time::Duration;

/// Why an entity was left pending without being an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    InsufficientData { found: usize, required: usize },
    NoThemeSummaries { attempted: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InsufficientData { found, required } => write!(
                f,
                "insufficient data ({} valid feedback records, {} required)",
                found, required
            ),
            SkipReason::NoThemeSummaries { attempted } => {
                write!(f, "all {} theme summaries failed", attempted)
            }
        }
    }
}

/// Result of processing one entity. Only `Processed` writes anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityOutcome {
    Processed { themes: usize, tags: usize },
    Skipped(SkipReason),
    Failed(String),
}

impl EntityOutcome {
    pub fn short_label(&self) -> &'static str {
        match self {
            EntityOutcome::Processed { .. } => "✅ processed",
            EntityOutcome::Skipped(_) => "⏭️ skipped",
            EntityOutcome::Failed(_) => "❌ failed",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub run_id: String,
    pub batches: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub themes_summarized: usize,
    pub elapsed: Duration,
}

impl RunStats {
    pub fn new(run_id: String) -> Self {
        Self {
            run_id,
            ..Default::default()
        }
    }

    pub fn record(&mut self, outcome: &EntityOutcome) {
        match outcome {
            EntityOutcome::Processed { themes, .. } => {
                self.processed += 1;
                self.themes_summarized += themes;
            }
            EntityOutcome::Skipped(_) => self.skipped += 1,
            EntityOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn attempted(&self) -> usize {
        self.processed + self.skipped + self.failed
    }

    pub fn log_summary(&self) {
        info!("=== Pipeline Summary ===");
        info!("Run ID: {}", self.run_id);
        info!(
            "Batches: {} | Entities attempted: {}",
            self.batches,
            self.attempted()
        );
        info!(
            "✅ Processed: {} | ⏭️  Skipped: {} | ❌ Failed: {}",
            self.processed, self.skipped, self.failed
        );
        info!("Theme summaries used in syntheses: {}", self.themes_summarized);
        info!("Elapsed: {:.2?}", self.elapsed);
    }
}
