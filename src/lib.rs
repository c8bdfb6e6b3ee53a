//! Theme-clustering summary pipeline.
//!
//! Selects entities that have no AI summary yet, clusters each entity's feedback
//! embeddings into themes, summarizes every theme with a language model,
//! synthesizes one holistic summary plus descriptor tags, and writes the result
//! back onto the entity record.

pub mod clustering;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod stores;
pub mod summarization;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use pipeline::{run_summary_pipeline, PipelineContext};
