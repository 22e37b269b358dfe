//! CrewAI project config: `config/agents.yaml` and `config/tasks.yaml`.

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use super::{skill_slugs, ExportError, ExportFormat, ExportedFile, Exporter};
use crate::schema::{AgentStory, AutonomyLevel, CollaborationRole, Skill};

pub struct CrewAiExporter;

#[derive(Serialize)]
struct AgentConfig {
    role: String,
    goal: String,
    backstory: String,
    allow_delegation: bool,
    verbose: bool,
}

#[derive(Serialize)]
struct TaskConfig {
    description: String,
    expected_output: String,
    agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    human_input: Option<bool>,
}

/// CrewAI keys are python identifiers.
fn key(slug: &str) -> String {
    slug.replace('-', "_")
}

impl Exporter for CrewAiExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Crewai
    }

    fn check(&self, story: &AgentStory) -> Result<Vec<String>, String> {
        let mut warnings = Vec::new();
        if story.skills.iter().any(|s| s.behavior.is_some()) {
            warnings.push(
                "skill behaviors are summarized in task descriptions; CrewAI plans execution itself"
                    .to_string(),
            );
        }
        if story.memory.is_some() {
            warnings.push("memory configuration maps to crew-level memory and is omitted".to_string());
        }
        Ok(warnings)
    }

    fn render(&self, story: &AgentStory) -> Result<Vec<ExportedFile>, ExportError> {
        let agent_key = key(&story.slug());

        let delegates = story
            .collaboration
            .as_ref()
            .is_some_and(|c| c.role == CollaborationRole::Supervisor);
        let agent = AgentConfig {
            role: story.role.clone().unwrap_or_else(|| story.name.clone()),
            goal: story
                .purpose
                .clone()
                .unwrap_or_else(|| format!("Act as {}", story.name)),
            backstory: backstory(story),
            allow_delegation: delegates,
            verbose: false,
        };

        let mut agents = Mapping::new();
        agents.insert(Value::String(agent_key.clone()), serde_yaml::to_value(&agent)?);

        let human_input = story.autonomy_level.map(|level| {
            matches!(level, AutonomyLevel::Directed | AutonomyLevel::Collaborative)
        });

        let mut tasks = Mapping::new();
        for (skill, slug) in story.skills.iter().zip(skill_slugs(story)) {
            let task = TaskConfig {
                description: task_description(skill),
                expected_output: skill.acceptance.success_conditions.join("\n"),
                agent: agent_key.clone(),
                human_input,
            };
            tasks.insert(Value::String(key(&slug)), serde_yaml::to_value(&task)?);
        }

        Ok(vec![
            ExportedFile::new("config/agents.yaml", serde_yaml::to_string(&agents)?),
            ExportedFile::new("config/tasks.yaml", serde_yaml::to_string(&tasks)?),
        ])
    }
}

fn backstory(story: &AgentStory) -> String {
    let mut parts = vec![format!("You are {}.", story.name)];
    for guardrail in &story.guardrails {
        parts.push(format!("{}: {}.", guardrail.name, guardrail.constraint.trim_end_matches('.')));
    }
    parts.join(" ")
}

fn task_description(skill: &Skill) -> String {
    let mut description = if skill.description.is_empty() {
        skill.name.clone()
    } else {
        skill.description.clone()
    };
    if let Some(behavior) = &skill.behavior {
        description.push_str(&format!(" (approach: {})", behavior.model()));
    }
    if let Some(timeout) = &skill.acceptance.timeout {
        description.push_str(&format!(" Finish within {}.", timeout));
    }
    description
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::export_story;
    use crate::export::fixtures::support_story;

    #[test]
    fn test_agents_and_tasks() {
        let bundle = export_story(&support_story(), ExportFormat::Crewai).unwrap();

        let agents: serde_yaml::Value =
            serde_yaml::from_str(&bundle.file("config/agents.yaml").unwrap().content).unwrap();
        assert_eq!(agents["support_bot"]["role"], "Tier-one support agent");
        assert_eq!(agents["support_bot"]["allow_delegation"], false);

        let tasks: serde_yaml::Value =
            serde_yaml::from_str(&bundle.file("config/tasks.yaml").unwrap().content).unwrap();
        assert_eq!(tasks["ticket_triage"]["agent"], "support_bot");
        assert_eq!(
            tasks["ticket_triage"]["expected_output"],
            "Ticket has a queue\nCustomer notified"
        );
        assert_eq!(tasks["ticket_triage"]["human_input"], false);
        assert!(tasks["resolution"]["description"]
            .as_str()
            .unwrap()
            .contains("approach: workflow"));
    }
}
