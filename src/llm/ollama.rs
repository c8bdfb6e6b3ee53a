// src/llm/ollama.rs

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

use crate::llm::{ChatMessage, ChatRequest, LanguageModel};
use crate::utils::pipeline_config::OllamaSettings;

/// OLLAMA chat API request structure
#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// OLLAMA chat API response structure
#[derive(Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaMessage>,
}

#[derive(Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

/// Chat client for a local or remote OLLAMA server.
#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    base_url: Url,
    model: String,
    request_timeout: Duration,
}

impl OllamaClient {
    pub fn new(settings: &OllamaSettings) -> Result<Self> {
        anyhow::ensure!(!settings.model.trim().is_empty(), "missing OLLAMA model name");
        let base_url = Url::parse(&format!("{}/", settings.base_url.trim_end_matches('/')))
            .with_context(|| format!("invalid OLLAMA URL '{}'", settings.base_url))?;
        let http = Client::builder()
            .build()
            .context("failed to build OLLAMA HTTP client")?;
        Ok(Self {
            http,
            base_url,
            model: settings.model.clone(),
            request_timeout: settings.timeout,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("failed to build OLLAMA URL for '{}'", path))
    }

    async fn post_chat(&self, request: &ChatRequest) -> Result<String> {
        let body = OllamaChatRequest {
            model: &self.model,
            messages: &request.messages,
            stream: false,
            format: request.json_output.then_some("json"),
            options: OllamaOptions {
                temperature: request.temperature,
            },
        };

        let response = self
            .http
            .post(self.endpoint("api/chat")?)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to OLLAMA")?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(anyhow!("OLLAMA returned status {}: {}", status, text));
        }

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .context("Failed to parse OLLAMA response")?;
        Ok(parsed.message.map(|m| m.content).unwrap_or_default())
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn ensure_available(&self) -> Result<()> {
        let response = timeout(
            self.request_timeout,
            self.http
                .post(self.endpoint("api/show")?)
                .json(&serde_json::json!({ "model": self.model, "name": self.model }))
                .send(),
        )
        .await
        .map_err(|_| anyhow!("Timed out reaching OLLAMA at {}", self.base_url))?
        .with_context(|| format!("Failed to reach OLLAMA at {}", self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!(
                "OLLAMA model '{}' is not available (status {}). Pull it with: ollama pull {}",
                self.model,
                status,
                self.model
            ));
        }
        info!("✅ OLLAMA model '{}' is available", self.model);
        Ok(())
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String> {
        let content = timeout(self.request_timeout, self.post_chat(request))
            .await
            .map_err(|_| {
                anyhow!(
                    "OLLAMA request timed out after {}s",
                    self.request_timeout.as_secs()
                )
            })??;
        debug!("OLLAMA returned {} chars", content.len());
        Ok(content)
    }
}
