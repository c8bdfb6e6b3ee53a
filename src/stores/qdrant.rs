// src/stores/qdrant.rs

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use url::Url;

use crate::models::RawFeedbackPoint;
use crate::stores::VectorStore;
use crate::utils::pipeline_config::{validate_identifier, QdrantSettings};

/// Reads feedback points from a Qdrant collection over its REST API.
#[derive(Clone)]
pub struct QdrantVectorStore {
    client: Client,
    base_url: Url,
    collection: String,
    vector_name: String,
    entity_key: String,
    text_key: String,
}

impl QdrantVectorStore {
    pub fn new(settings: &QdrantSettings, timeout: Duration) -> Result<Self> {
        validate_identifier(&settings.collection).context("Invalid Qdrant collection name")?;
        anyhow::ensure!(
            !settings.vector_name.trim().is_empty(),
            "missing Qdrant vector name"
        );

        let mut headers = HeaderMap::new();
        if let Some(api_key) = &settings.api_key {
            headers.insert(
                "api-key",
                HeaderValue::from_str(api_key.trim()).context("invalid Qdrant API key")?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Qdrant HTTP client")?;

        // Trailing slash so that `join` appends instead of replacing the last segment.
        let base_url = Url::parse(&format!("{}/", settings.base_url.trim_end_matches('/')))
            .with_context(|| format!("invalid Qdrant URL '{}'", settings.base_url))?;

        Ok(Self {
            client,
            base_url,
            collection: settings.collection.clone(),
            vector_name: settings.vector_name.clone(),
            entity_key: settings.entity_key.clone(),
            text_key: settings.text_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("failed to build Qdrant URL for '{}'", path))
    }

    /// Extracts the configured vector slot from a point. Collections with a single
    /// unnamed vector return it as a bare list.
    fn vector_slot(&self, vector: Option<Value>) -> Option<Value> {
        match vector {
            Some(Value::Object(mut named)) => named.remove(&self.vector_name),
            Some(bare @ Value::Array(_)) => Some(bare),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScrollResponse {
    result: ScrollResult,
}

#[derive(Debug, Deserialize)]
struct ScrollResult {
    #[serde(default)]
    points: Vec<ScrollPoint>,
}

#[derive(Debug, Deserialize)]
struct ScrollPoint {
    #[serde(default)]
    payload: Option<Map<String, Value>>,
    #[serde(default)]
    vector: Option<Value>,
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn check_connection(&self) -> Result<()> {
        let url = self.endpoint(&format!("collections/{}", self.collection))?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("Qdrant is unreachable")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(anyhow!(
                "Qdrant collection '{}' check failed ({}): {}",
                self.collection,
                status,
                body
            ));
        }
        info!("🧮 Qdrant collection '{}' is available", self.collection);
        Ok(())
    }

    async fn fetch_feedback(&self, entity_id: &str, limit: usize) -> Result<Vec<RawFeedbackPoint>> {
        let url = self.endpoint(&format!("collections/{}/points/scroll", self.collection))?;
        let body = json!({
            "filter": {
                "must": [
                    { "key": self.entity_key, "match": { "value": entity_id } }
                ]
            },
            "limit": limit,
            "with_payload": true,
            "with_vector": [self.vector_name],
        });

        let resp = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Qdrant scroll request failed for entity {}", entity_id))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(anyhow!(
                "Qdrant scroll failed for entity {} ({}): {}",
                entity_id,
                status,
                text
            ));
        }
        let scroll: ScrollResponse = resp
            .json()
            .await
            .context("failed to parse Qdrant scroll response")?;

        let points: Vec<RawFeedbackPoint> = scroll
            .result
            .points
            .into_iter()
            .map(|point| {
                let text = point
                    .payload
                    .as_ref()
                    .and_then(|p| p.get(&self.text_key))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                RawFeedbackPoint {
                    text,
                    vector: self.vector_slot(point.vector),
                }
            })
            .collect();
        debug!("Qdrant returned {} points for entity {}", points.len(), entity_id);
        Ok(points)
    }
}
