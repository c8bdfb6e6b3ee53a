// src/pipeline/mod.rs

pub mod orchestrator;
pub mod progress;
pub mod result_writer;
pub mod stats;
pub mod vector_fetcher;
pub mod work_selector;

pub use orchestrator::{process_single_entity, run_summary_pipeline, verify_collaborators, PipelineContext};
pub use stats::{EntityOutcome, RunStats, SkipReason};
