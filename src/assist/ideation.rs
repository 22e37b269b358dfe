use serde_json::Value;
use std::sync::Arc;

use super::{parse_json, AssistError};
use crate::providers::{LLMProvider, Message};
use crate::schema::AgentStory;
use crate::validation::{parse_partial_story, validate_partial_story, ValidationResult};

const IDEATION_SYSTEM_PROMPT: &str = r#"You help people design AI agents as Agent Stories.
An Agent Story is a JSON document with camelCase keys: name, role, purpose,
autonomyLevel (full | supervised | collaborative | directed), tags, skills,
humanInteraction, collaboration, memory and guardrails.
Each skill has name, domain, description, acquired (built_in | learned | delegated),
triggers (each with type: message | resource_change | schedule | cascade | manual | condition,
and a description), tools, behavior, reasoning, acceptance (successConditions) and guardrails.
Prefer fewer, focused skills. Leave out anything you cannot infer.
Output one JSON object only, no markdown code fences or explanation."#;

/// A model-drafted story together with its partial validation.
#[derive(Debug, Clone)]
pub struct GeneratedStory {
    pub draft: Value,
    /// The typed draft, when it parses under partial rules.
    pub story: Option<AgentStory>,
    pub validation: ValidationResult,
}

pub struct StoryGenerator {
    llm_provider: Arc<dyn LLMProvider>,
}

impl StoryGenerator {
    pub fn new(llm_provider: Arc<dyn LLMProvider>) -> Self {
        Self { llm_provider }
    }

    /// Ask the model for a story draft matching a free-text description.
    pub async fn generate(&self, description: &str) -> Result<GeneratedStory, AssistError> {
        let response = self
            .llm_provider
            .complete(
                IDEATION_SYSTEM_PROMPT,
                vec![Message::user(build_ideation_prompt(description))],
            )
            .await
            .map_err(|e| {
                log::warn!("story ideation failed: {}", e);
                AssistError::Provider(e)
            })?;

        let draft = parse_json(&response)?;
        if !draft.is_object() {
            return Err(AssistError::MalformedResponse(
                "expected a JSON object describing the story".to_string(),
            ));
        }

        let validation = validate_partial_story(&draft);
        let story = parse_partial_story(&draft).ok();
        log::info!(
            "drafted story: valid={} warnings={}",
            validation.valid,
            validation.warnings.len()
        );

        Ok(GeneratedStory {
            draft,
            story,
            validation,
        })
    }
}

fn build_ideation_prompt(description: &str) -> String {
    format!(
        "Draft an Agent Story for the following agent:\n\n{}\n\n\
         Give it a short human-readable name and at least one skill.",
        description.trim()
    )
}
