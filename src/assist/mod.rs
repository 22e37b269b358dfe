//! LLM-assisted authoring: drafting a story from a description and editing
//! an existing story through a conversation.

pub mod editing;
pub mod ideation;

pub use editing::{apply_actions, parse_actions, ChatEditor, EditAction, EditOutcome};
pub use ideation::{GeneratedStory, StoryGenerator};

use thiserror::Error;

use crate::validation::Violation;

#[derive(Debug, Error)]
pub enum AssistError {
    #[error("LLM provider failed: {0}")]
    Provider(#[from] anyhow::Error),

    #[error("Model response could not be used: {0}")]
    MalformedResponse(String),

    #[error("No {kind} named \"{name}\" in the story")]
    UnknownTarget { kind: &'static str, name: String },

    #[error("Edit would leave the story invalid ({} problems)", .0.len())]
    InvalidEdit(Vec<Violation>),
}

/// Strip a surrounding markdown code fence from a model response.
pub(crate) fn strip_code_fences(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

pub(crate) fn parse_json(response: &str) -> Result<serde_json::Value, AssistError> {
    serde_json::from_str(strip_code_fences(response))
        .map_err(|e| AssistError::MalformedResponse(format!("invalid JSON: {}", e)))
}
