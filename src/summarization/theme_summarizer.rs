// src/summarization/theme_summarizer.rs

use anyhow::{anyhow, bail, Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::llm::{ChatMessage, ChatRequest, LanguageModel};
use crate::models::Theme;
use crate::summarization::bullet_list;
use crate::summarization::sanitize::extract_clean_summary;

pub const THEME_SYSTEM_PROMPT: &str = "You are a helpful assistant that summarizes feedback.";

pub fn build_theme_prompt(texts: &[String], label: &str) -> String {
    format!(
        "The following are feedback comments that all discuss a similar theme: '{}'.\n\
         Summarize the main point of these comments in one or two concise sentences.\n\n\
         Feedback:\n{}\n\n\
         Concise Summary:",
        label,
        bullet_list(texts)
    )
}

/// Turns one theme's texts into a short summary.
#[derive(Clone)]
pub struct ThemeSummarizer {
    model: Arc<dyn LanguageModel>,
    temperature: f32,
}

impl ThemeSummarizer {
    pub fn new(model: Arc<dyn LanguageModel>, temperature: f32) -> Self {
        Self { model, temperature }
    }

    pub fn request_for(&self, texts: &[String], label: &str) -> ChatRequest {
        ChatRequest {
            messages: vec![
                ChatMessage::system(THEME_SYSTEM_PROMPT),
                ChatMessage::user(build_theme_prompt(texts, label)),
            ],
            temperature: self.temperature,
            json_output: false,
        }
    }

    /// Errors on a model failure or when nothing is left after sanitizing.
    pub async fn summarize_theme(&self, texts: &[String], label: &str) -> Result<String> {
        let raw = self
            .model
            .chat(&self.request_for(texts, label))
            .await
            .with_context(|| format!("model call failed for {}", label))?;
        let summary = extract_clean_summary(&raw);
        if summary.is_empty() {
            bail!("model returned no usable summary for {}", label);
        }
        Ok(summary)
    }

    /// Summarizes every theme on a worker pool private to this call. Failed themes
    /// are logged and dropped; survivors come back in completion order.
    pub async fn summarize_all(&self, entity_id: &str, themes: Vec<Theme>, max_workers: usize) -> Vec<Theme> {
        let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
        let mut tasks = FuturesUnordered::new();

        for theme in themes {
            let summarizer = self.clone();
            let semaphore = semaphore.clone();
            tasks.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (theme, Err(anyhow!("theme worker pool closed"))),
                };
                let label = theme.label();
                let result = summarizer.summarize_theme(&theme.texts, &label).await;
                (theme, result)
            }));
        }

        let mut summarized = Vec::new();
        while let Some(joined) = tasks.next().await {
            match joined {
                Ok((mut theme, Ok(summary))) => {
                    debug!("[{}] {} summarized from {} texts", entity_id, theme.label(), theme.texts.len());
                    theme.summary = Some(summary);
                    summarized.push(theme);
                }
                Ok((theme, Err(e))) => {
                    warn!("[{}] ⚠️  {} dropped: {:#}", entity_id, theme.label(), e);
                }
                Err(e) => {
                    warn!("[{}] ⚠️  Theme task failed to complete: {}", entity_id, e);
                }
            }
        }
        summarized
    }
}
