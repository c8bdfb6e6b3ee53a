// src/summarization/mod.rs

pub mod sanitize;
pub mod synthesizer;
pub mod theme_summarizer;

pub use synthesizer::{parse_synthesis_output, HolisticSynthesizer};
pub use theme_summarizer::ThemeSummarizer;

/// Renders texts as a `- ` bulleted list, one per line.
pub(crate) fn bullet_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item.as_ref().trim()))
        .collect::<Vec<_>>()
        .join("\n")
}
