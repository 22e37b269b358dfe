//! Authoring toolkit for Agent Stories: structured specifications of AI
//! agents, their validation, export to agent harness formats, and
//! LLM-assisted drafting.

pub mod api;
pub mod assist;
pub mod config;
pub mod document;
pub mod export;
pub mod providers;
pub mod schema;
pub mod storage;
pub mod validation;

pub use config::Config;
pub use export::{export_story, ExportBundle, ExportFormat};
pub use schema::{AgentStory, Skill};
pub use validation::{
    validate_partial_story, validate_skill, validate_story, ValidationResult, Violation, Warning,
};
