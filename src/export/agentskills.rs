//! AgentSkills.io layout: a directory per skill with a SKILL.md.

use serde::Serialize;
use std::fmt::Write;

use super::prompt::render_skill_section;
use super::{skill_slugs, with_frontmatter, ExportError, ExportFormat, ExportedFile, Exporter};
use crate::schema::AgentStory;

/// Longest description the skill index accepts.
const MAX_DESCRIPTION_CHARS: usize = 1024;
const MAX_NAME_CHARS: usize = 64;

pub struct AgentSkillsExporter;

#[derive(Serialize)]
struct SkillFrontmatter {
    name: String,
    description: String,
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

impl Exporter for AgentSkillsExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Agentskills
    }

    fn check(&self, story: &AgentStory) -> Result<Vec<String>, String> {
        let mut warnings = Vec::new();
        if story.human_interaction.is_some()
            || story.collaboration.is_some()
            || story.memory.is_some()
        {
            warnings.push(
                "agent-level configuration is not part of the skill format and is omitted"
                    .to_string(),
            );
        }
        for skill in &story.skills {
            if skill.description.chars().count() > MAX_DESCRIPTION_CHARS {
                warnings.push(format!(
                    "description of skill \"{}\" exceeds {} characters and was truncated",
                    skill.name, MAX_DESCRIPTION_CHARS
                ));
            }
        }
        Ok(warnings)
    }

    fn render(&self, story: &AgentStory) -> Result<Vec<ExportedFile>, ExportError> {
        let mut files = Vec::new();
        let mut index = format!("# {} skills\n\n", story.name);

        for (skill, slug) in story.skills.iter().zip(skill_slugs(story)) {
            let name = truncate(&slug, MAX_NAME_CHARS);
            let description = if skill.description.is_empty() {
                skill.name.clone()
            } else {
                truncate(&skill.description, MAX_DESCRIPTION_CHARS)
            };
            let _ = writeln!(index, "- [{}](skills/{}/SKILL.md): {}", skill.name, name, description);

            let frontmatter = SkillFrontmatter {
                name: name.clone(),
                description,
            };
            files.push(ExportedFile::new(
                format!("skills/{}/SKILL.md", name),
                with_frontmatter(&frontmatter, &render_skill_section(skill, "#"))?,
            ));
        }

        files.push(ExportedFile::new("README.md", index));
        Ok(files)
    }
}
