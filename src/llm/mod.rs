// src/llm/mod.rs

pub mod ollama;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

pub use ollama::OllamaClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// One chat completion request. The model identifier belongs to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    /// Ask the model to constrain its answer to a JSON object
    pub json_output: bool,
}

/// Generative language model collaborator.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Fails when the configured model is unreachable or not loaded.
    async fn ensure_available(&self) -> Result<()>;

    /// Returns the raw text of the model's reply, which may be empty.
    async fn chat(&self, request: &ChatRequest) -> Result<String>;
}
