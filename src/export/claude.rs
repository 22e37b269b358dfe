//! Claude subagent layout: one agent definition plus one SKILL.md per skill.

use serde::Serialize;

use super::prompt::{render_skill_section, render_system_prompt};
use super::{skill_slugs, with_frontmatter, ExportError, ExportFormat, ExportedFile, Exporter};
use crate::schema::AgentStory;

pub struct ClaudeExporter;

#[derive(Serialize)]
struct AgentFrontmatter {
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<String>,
}

#[derive(Serialize)]
struct SkillFrontmatter {
    name: String,
    description: String,
}

fn agent_description(story: &AgentStory) -> String {
    story
        .purpose
        .clone()
        .or_else(|| story.role.clone())
        .unwrap_or_else(|| story.name.clone())
}

impl Exporter for ClaudeExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Claude
    }

    fn check(&self, story: &AgentStory) -> Result<Vec<String>, String> {
        let mut warnings = Vec::new();
        if story
            .memory
            .as_ref()
            .is_some_and(|m| !m.persistent.is_empty())
        {
            warnings.push(
                "persistent memory stores have no subagent equivalent and are described in the prompt only"
                    .to_string(),
            );
        }
        if story.collaboration.is_some() {
            warnings.push(
                "collaboration relations are not expressible as subagent configuration".to_string(),
            );
        }
        Ok(warnings)
    }

    fn render(&self, story: &AgentStory) -> Result<Vec<ExportedFile>, ExportError> {
        let slug = story.slug();

        let mut tools: Vec<&str> = Vec::new();
        for tool in story.skills.iter().flat_map(|s| &s.tools) {
            if !tools.contains(&tool.name.as_str()) {
                tools.push(&tool.name);
            }
        }

        let agent = AgentFrontmatter {
            name: slug.clone(),
            description: agent_description(story),
            tools: if tools.is_empty() {
                None
            } else {
                Some(tools.join(", "))
            },
        };

        let mut files = vec![ExportedFile::new(
            format!(".claude/agents/{}.md", slug),
            with_frontmatter(&agent, &render_system_prompt(story))?,
        )];

        for (skill, skill_slug) in story.skills.iter().zip(skill_slugs(story)) {
            let frontmatter = SkillFrontmatter {
                name: skill_slug.clone(),
                description: if skill.description.is_empty() {
                    skill.name.clone()
                } else {
                    skill.description.clone()
                },
            };
            files.push(ExportedFile::new(
                format!(".claude/skills/{}/SKILL.md", skill_slug),
                with_frontmatter(&frontmatter, &render_skill_section(skill, "#"))?,
            ));
        }

        Ok(files)
    }
}
