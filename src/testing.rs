// src/testing.rs
//
// In-memory collaborators for pipeline tests.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::clustering::{group_into_themes, ClusteringError, ThemeClusterer};
use crate::llm::{ChatRequest, LanguageModel, Role};
use crate::models::{Entity, FeedbackRecord, PipelineResult, RawFeedbackPoint, Theme};
use crate::stores::{EntityStore, VectorStore};

pub fn user_prompt(request: &ChatRequest) -> &str {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or("")
}

pub fn point(text: &str, vector: &[f32]) -> RawFeedbackPoint {
    RawFeedbackPoint {
        text: Some(text.to_string()),
        vector: Some(serde_json::Value::from(vector.to_vec())),
    }
}

#[derive(Default)]
pub struct MemoryEntityStore {
    entities: Mutex<BTreeMap<String, Entity>>,
    failing_writes: Mutex<HashSet<String>>,
    writes: AtomicUsize,
}

impl MemoryEntityStore {
    pub fn with_entities(entities: Vec<Entity>) -> Self {
        let store = Self::default();
        {
            let mut map = store.entities.lock().unwrap();
            for entity in entities {
                map.insert(entity.id.clone(), entity);
            }
        }
        store
    }

    pub fn fail_writes_for(&self, entity_id: &str) {
        self.failing_writes
            .lock()
            .unwrap()
            .insert(entity_id.to_string());
    }

    pub fn get(&self, entity_id: &str) -> Option<Entity> {
        self.entities.lock().unwrap().get(entity_id).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, Entity> {
        self.entities.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn check_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn fetch_pending(&self, limit: usize, exclude_ids: &[String]) -> Result<Vec<Entity>> {
        let entities = self.entities.lock().unwrap();
        Ok(entities
            .values()
            .filter(|e| e.is_pending() && !exclude_ids.contains(&e.id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn write_summary(
        &self,
        entity_id: &str,
        result: &PipelineResult,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        if self.failing_writes.lock().unwrap().contains(entity_id) {
            bail!("simulated write failure for {}", entity_id);
        }
        let mut entities = self.entities.lock().unwrap();
        let entity = entities
            .get_mut(entity_id)
            .ok_or_else(|| anyhow!("no entity {}", entity_id))?;
        entity.summary = Some(result.summary.clone());
        entity.tags = Some(result.tags.clone());
        entity.summary_last_updated = Some(updated_at);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryVectorStore {
    points: HashMap<String, Vec<RawFeedbackPoint>>,
    failing: HashSet<String>,
}

impl MemoryVectorStore {
    pub fn with_points(entity_id: &str, points: Vec<RawFeedbackPoint>) -> Self {
        let mut store = Self::default();
        store.points.insert(entity_id.to_string(), points);
        store
    }

    pub fn add(mut self, entity_id: &str, points: Vec<RawFeedbackPoint>) -> Self {
        self.points.insert(entity_id.to_string(), points);
        self
    }

    pub fn failing_for(mut self, entity_id: &str) -> Self {
        self.failing.insert(entity_id.to_string());
        self
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn check_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn fetch_feedback(&self, entity_id: &str, limit: usize) -> Result<Vec<RawFeedbackPoint>> {
        if self.failing.contains(entity_id) {
            bail!("simulated vector store outage for {}", entity_id);
        }
        Ok(self
            .points
            .get(entity_id)
            .map(|p| p.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

type Responder = Box<dyn Fn(&ChatRequest) -> Result<String> + Send + Sync>;

/// Language model whose replies come from a closure; records every request.
pub struct ScriptedModel {
    responder: Responder,
    available: bool,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&ChatRequest) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            available: true,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(|_| Err(anyhow!("model not loaded")))
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn ensure_available(&self) -> Result<()> {
        if self.available {
            Ok(())
        } else {
            bail!("model 'scripted' is not loaded")
        }
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        (self.responder)(request)
    }
}

/// Clusterer that replays a fixed assignment list, one entry per record.
pub struct FixedAssignmentClusterer {
    assignments: Vec<usize>,
}

impl FixedAssignmentClusterer {
    pub fn new(assignments: Vec<usize>) -> Self {
        Self { assignments }
    }
}

impl ThemeClusterer for FixedAssignmentClusterer {
    fn cluster(&self, records: &[FeedbackRecord], k: usize) -> Result<Vec<Theme>, ClusteringError> {
        if records.len() < k {
            return Err(ClusteringError::InsufficientData {
                found: records.len(),
                required: k,
            });
        }
        Ok(group_into_themes(records, &self.assignments, k))
    }
}
