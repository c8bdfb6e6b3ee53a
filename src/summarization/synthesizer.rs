// src/summarization/synthesizer.rs

use log::{debug, warn};
use serde_json::Value;
use std::sync::Arc;

use crate::llm::{ChatMessage, ChatRequest, LanguageModel};
use crate::models::{Entity, PipelineResult};
use crate::summarization::bullet_list;
use crate::summarization::sanitize::{strip_code_fences, strip_reasoning_block};

pub const SYNTHESIS_SYSTEM_PROMPT: &str =
    "You are an advisor who writes insightful and balanced summaries of feedback for readers.";

pub fn build_synthesis_prompt(theme_summaries: &[String], name: &str, category: &str) -> String {
    format!(
        "Act as a helpful advisor writing a brief, insightful summary about {name} from {category}.\n\
         Based on the key themes provided below, please perform two tasks:\n\n\
         TASK 1: Write a Summary\n\
         - Weave the points together into a smooth, narrative paragraph.\n\
         - Adopt a professional, yet approachable and slightly informal tone.\n\
         - Mention {name} by name to make it more personal.\n\
         - When mentioning strengths or weaknesses, be specific. Use the themes to say what the \
         strengths and weaknesses are instead of speaking in general terms.\n\n\
         TASK 2: Generate Tags\n\
         - After writing the summary, generate a list of 4-5 short, descriptive tags \
         (2-4 words each) that quickly summarize {name}'s main characteristics.\n\n\
         INSTRUCTIONS FOR OUTPUT:\n\
         Provide the final output in a single, valid JSON object with exactly two keys: \
         \"summary\" (containing the string from TASK 1) and \"tags\" (containing a list of \
         strings from TASK 2).\n\n\
         Key Themes from Feedback:\n{themes}\n\n\
         JSON Output:",
        name = name,
        category = category,
        themes = bullet_list(theme_summaries),
    )
}

/// Parses a synthesis reply. Never fails: malformed output degrades to the cleaned
/// text with no tags, and an empty reply becomes the fallback summary.
pub fn parse_synthesis_output(raw: &str) -> PipelineResult {
    let cleaned = strip_code_fences(strip_reasoning_block(raw));
    if cleaned.is_empty() {
        return PipelineResult::fallback();
    }

    match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::Object(map)) if map.contains_key("summary") && map.contains_key("tags") => {
            match serde_json::from_value::<PipelineResult>(Value::Object(map)) {
                Ok(result) => result,
                Err(e) => {
                    debug!("Synthesis JSON has the right keys but wrong types: {}", e);
                    PipelineResult::text_only(cleaned)
                }
            }
        }
        Ok(_) => {
            debug!("Synthesis JSON is missing 'summary' or 'tags'");
            PipelineResult::text_only(cleaned)
        }
        Err(_) => PipelineResult::text_only(cleaned),
    }
}

/// Combines theme summaries into one narrative summary plus tags.
#[derive(Clone)]
pub struct HolisticSynthesizer {
    model: Arc<dyn LanguageModel>,
    temperature: f32,
}

impl HolisticSynthesizer {
    pub fn new(model: Arc<dyn LanguageModel>, temperature: f32) -> Self {
        Self { model, temperature }
    }

    pub fn request_for(&self, theme_summaries: &[String], entity: &Entity) -> ChatRequest {
        ChatRequest {
            messages: vec![
                ChatMessage::system(SYNTHESIS_SYSTEM_PROMPT),
                ChatMessage::user(build_synthesis_prompt(
                    theme_summaries,
                    entity.display_name(),
                    entity.category_label(),
                )),
            ],
            temperature: self.temperature,
            json_output: true,
        }
    }

    /// Theme order carries no meaning. Always returns a well-formed result.
    pub async fn synthesize(&self, theme_summaries: &[String], entity: &Entity) -> PipelineResult {
        match self.model.chat(&self.request_for(theme_summaries, entity)).await {
            Ok(raw) => parse_synthesis_output(&raw),
            Err(e) => {
                warn!("[{}] ⚠️  Synthesis call failed, using fallback summary: {:#}", entity.id, e);
                PipelineResult::fallback()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FALLBACK_SUMMARY;
    use crate::testing::{user_prompt, ScriptedModel};
    use anyhow::anyhow;

    #[test]
    fn test_not_json_degrades_to_text() {
        assert_eq!(
            parse_synthesis_output("not json at all"),
            PipelineResult::text_only("not json at all")
        );
    }

    #[test]
    fn test_well_formed_json_is_returned_unchanged() {
        let raw = r#"{"summary": "X excels at clarity.", "tags": ["clear lectures","tough grader"]}"#;
        assert_eq!(
            parse_synthesis_output(raw),
            PipelineResult {
                summary: "X excels at clarity.".to_string(),
                tags: vec!["clear lectures".to_string(), "tough grader".to_string()],
            }
        );
    }

    #[test]
    fn test_reasoning_and_fences_are_stripped_before_parsing() {
        let raw = "<think>draft {\"summary\": 1}</think>\n```json\n{\"summary\": \"Warm and fair.\", \"tags\": [\"fair grader\"]}\n```";
        let result = parse_synthesis_output(raw);
        assert_eq!(result.summary, "Warm and fair.");
        assert_eq!(result.tags, vec!["fair grader".to_string()]);
    }

    #[test]
    fn test_wrong_shape_degrades_to_cleaned_text() {
        let missing_tags = r#"{"summary": "Only a summary."}"#;
        assert_eq!(
            parse_synthesis_output(missing_tags),
            PipelineResult::text_only(missing_tags)
        );

        let tags_as_string = r#"{"summary": "S", "tags": "a, b"}"#;
        assert_eq!(
            parse_synthesis_output(tags_as_string),
            PipelineResult::text_only(tags_as_string)
        );

        assert_eq!(parse_synthesis_output("[1, 2]"), PipelineResult::text_only("[1, 2]"));
    }

    #[test]
    fn test_empty_output_uses_fallback() {
        assert_eq!(parse_synthesis_output(""), PipelineResult::fallback());
        assert_eq!(parse_synthesis_output("<think>nothing</think>  "), PipelineResult::fallback());
        assert_eq!(parse_synthesis_output("```json\n```"), PipelineResult::fallback());
    }

    #[test]
    fn test_prompt_names_entity_and_lists_themes() {
        let prompt = build_synthesis_prompt(
            &["Clear lectures.".to_string(), "Tough exams.".to_string()],
            "Dr. Rivera",
            "their department",
        );
        assert!(prompt.contains("about Dr. Rivera from their department"));
        assert!(prompt.contains("- Clear lectures.\n- Tough exams."));
        assert!(prompt.contains("4-5 short, descriptive tags"));
        assert!(prompt.contains("\"summary\""));
    }

    #[tokio::test]
    async fn test_model_failure_uses_fallback() {
        let model = Arc::new(ScriptedModel::new(|_| Err(anyhow!("timed out"))));
        let synthesizer = HolisticSynthesizer::new(model, 0.65);
        let result = synthesizer
            .synthesize(&["Clear lectures.".to_string()], &Entity::pending("e1", "Dr. Rivera", None))
            .await;
        assert_eq!(result.summary, FALLBACK_SUMMARY);
        assert!(result.tags.is_empty());
    }

    #[tokio::test]
    async fn test_theme_order_does_not_matter() {
        let model = Arc::new(ScriptedModel::new(|req| {
            // Echo the first listed theme so the two calls produce different text.
            let prompt = user_prompt(req);
            let first = prompt
                .split("Key Themes from Feedback:\n")
                .nth(1)
                .and_then(|themes| themes.lines().next())
                .unwrap_or("- none")
                .trim_start_matches("- ")
                .to_string();
            Ok(serde_json::json!({
                "summary": format!("Rivera: {}", first),
                "tags": ["clear lectures", "tough exams", "fair grader", "helpful"]
            })
            .to_string())
        }));
        let synthesizer = HolisticSynthesizer::new(model.clone(), 0.65);
        let entity = Entity::pending("e1", "Dr. Rivera", Some("Biology"));
        let themes = vec!["Clear lectures.".to_string(), "Tough exams.".to_string()];
        let reversed: Vec<String> = themes.iter().rev().cloned().collect();

        let forward = synthesizer.synthesize(&themes, &entity).await;
        let backward = synthesizer.synthesize(&reversed, &entity).await;

        assert_eq!(forward.summary, "Rivera: Clear lectures.");
        assert_eq!(backward.summary, "Rivera: Tough exams.");
        for result in [&forward, &backward] {
            assert!(!result.summary.is_empty());
            assert_eq!(result.tags.len(), 4);
        }
        let requests = model.requests();
        assert!(requests.iter().all(|r| r.json_output));
        assert!(requests.iter().all(|r| (r.temperature - 0.65).abs() < f32::EPSILON));
        assert_eq!(requests[0].messages[0].content, SYNTHESIS_SYSTEM_PROMPT);
    }
}
