//! Readiness checks on structurally valid entities.
//!
//! A skill can parse cleanly with an empty trigger description; it is not
//! ready to hand to a harness until the fields below carry content.

use serde::{Deserialize, Serialize};

use crate::schema::{AgentStory, Skill};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completeness {
    pub complete: bool,
    /// Field paths, relative to the checked entity, that still need content.
    pub missing: Vec<String>,
}

impl Completeness {
    fn from_missing(missing: Vec<String>) -> Self {
        Self {
            complete: missing.is_empty(),
            missing,
        }
    }
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

pub fn check_skill_completeness(skill: &Skill) -> Completeness {
    let mut missing = Vec::new();

    if blank(&skill.name) {
        missing.push("name".to_string());
    }
    if blank(&skill.description) {
        missing.push("description".to_string());
    }
    if blank(&skill.domain) {
        missing.push("domain".to_string());
    }

    if skill.triggers.is_empty() {
        missing.push("triggers".to_string());
    }
    for (i, trigger) in skill.triggers.iter().enumerate() {
        if blank(&trigger.description) {
            missing.push(format!("triggers[{}].description", i));
        }
    }

    let conditions = &skill.acceptance.success_conditions;
    if conditions.is_empty() {
        missing.push("acceptance.successConditions".to_string());
    }
    for (i, condition) in conditions.iter().enumerate() {
        if blank(condition) {
            missing.push(format!("acceptance.successConditions[{}]", i));
        }
    }

    Completeness::from_missing(missing)
}

/// Story readiness: a name, at least one skill, and every skill complete.
pub fn check_story_completeness(story: &AgentStory) -> Completeness {
    let mut missing = Vec::new();

    if blank(&story.name) {
        missing.push("name".to_string());
    }
    if story.skills.is_empty() {
        missing.push("skills".to_string());
    }
    for (i, skill) in story.skills.iter().enumerate() {
        let prefix = format!("skills[{}]", i);
        missing.extend(
            check_skill_completeness(skill)
                .missing
                .into_iter()
                .map(|field| format!("{}.{}", prefix, field)),
        );
    }

    Completeness::from_missing(missing)
}
