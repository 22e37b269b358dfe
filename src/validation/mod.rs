//! Validation façade: structural parse, then consistency checks.
//!
//! `valid` reflects structural parsing only. Consistency warnings are
//! computed whenever parsing succeeds and never change `valid`.

pub mod completeness;
pub mod consistency;
pub mod structural;

pub use completeness::{check_skill_completeness, check_story_completeness, Completeness};
pub use consistency::{check_skill, check_story, Warning, WarningRule};
pub use structural::{Parser, Schema, Strictness, Violation, ViolationCode};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{AgentStory, Skill};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<Violation>,
    pub warnings: Vec<Warning>,
}

impl ValidationResult {
    fn from_parse<T>(
        parsed: Result<T, Vec<Violation>>,
        check: impl FnOnce(&T) -> Vec<Warning>,
    ) -> Self {
        match parsed {
            Ok(value) => Self {
                valid: true,
                errors: Vec::new(),
                warnings: check(&value),
            },
            Err(errors) => Self {
                valid: false,
                errors,
                warnings: Vec::new(),
            },
        }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Warnings produced by one consistency rule.
    pub fn warnings_for(&self, rule: WarningRule) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |w| w.rule == rule)
    }
}

pub fn parse_story(candidate: &Value) -> Result<AgentStory, Vec<Violation>> {
    Parser::run(candidate, Strictness::Full)
}

/// Parse a draft: only `name` is required, anything present is type-checked.
pub fn parse_partial_story(candidate: &Value) -> Result<AgentStory, Vec<Violation>> {
    Parser::run(candidate, Strictness::Partial)
}

pub fn parse_skill(candidate: &Value) -> Result<Skill, Vec<Violation>> {
    Parser::run(candidate, Strictness::Full)
}

pub fn validate_story(candidate: &Value) -> ValidationResult {
    let result = ValidationResult::from_parse(parse_story(candidate), check_story);
    log::debug!(
        "validated story: valid={} errors={} warnings={}",
        result.valid,
        result.errors.len(),
        result.warnings.len()
    );
    result
}

pub fn validate_partial_story(candidate: &Value) -> ValidationResult {
    let result = ValidationResult::from_parse(parse_partial_story(candidate), check_story);
    log::debug!(
        "validated story draft: valid={} errors={} warnings={}",
        result.valid,
        result.errors.len(),
        result.warnings.len()
    );
    result
}

pub fn validate_skill(candidate: &Value) -> ValidationResult {
    ValidationResult::from_parse(parse_skill(candidate), |skill| check_skill(skill, ""))
}

/// Validate an already typed story by round-tripping it through its wire
/// form, so typed callers get the same checks as untyped ones.
pub fn validate_typed_story(story: &AgentStory) -> ValidationResult {
    match serde_json::to_value(story) {
        Ok(value) => validate_story(&value),
        Err(e) => ValidationResult {
            valid: false,
            errors: vec![Violation {
                path: String::new(),
                message: format!("Story could not be serialized: {}", e),
                code: ViolationCode::InvalidType,
            }],
            warnings: Vec::new(),
        },
    }
}
