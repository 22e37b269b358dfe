//! Letta agent file (`.af`): a single JSON document with system prompt,
//! memory blocks and tool stubs.

use serde::Serialize;

use super::prompt::render_system_prompt;
use super::{ExportError, ExportFormat, ExportedFile, Exporter};
use crate::schema::{AgentStory, Behavior, UpdateMode};

pub struct LettaExporter;

#[derive(Serialize)]
struct AgentFile {
    name: String,
    agent_type: &'static str,
    system: String,
    memory_blocks: Vec<MemoryBlock>,
    tools: Vec<ToolStub>,
    tags: Vec<String>,
    metadata: serde_json::Value,
}

#[derive(Serialize)]
struct MemoryBlock {
    label: String,
    value: String,
    read_only: bool,
}

#[derive(Serialize)]
struct ToolStub {
    name: String,
    description: String,
}

impl Exporter for LettaExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Letta
    }

    fn check(&self, story: &AgentStory) -> Result<Vec<String>, String> {
        let mut warnings = Vec::new();
        let structured = story.skills.iter().any(|s| {
            matches!(
                s.behavior,
                Some(Behavior::Workflow(_)) | Some(Behavior::Sequential(_))
            )
        });
        if structured {
            warnings.push(
                "workflow and sequential behaviors are flattened into the system prompt".to_string(),
            );
        }
        if story.collaboration.is_some() {
            warnings.push("multi-agent relations must be wired up in Letta separately".to_string());
        }
        Ok(warnings)
    }

    fn render(&self, story: &AgentStory) -> Result<Vec<ExportedFile>, ExportError> {
        let mut memory_blocks = vec![MemoryBlock {
            label: "persona".to_string(),
            value: persona(story),
            read_only: true,
        }];

        if let Some(memory) = &story.memory {
            if !memory.working.is_empty() {
                memory_blocks.push(MemoryBlock {
                    label: "working".to_string(),
                    value: memory.working.join("\n"),
                    read_only: false,
                });
            }
            for store in &memory.persistent {
                memory_blocks.push(MemoryBlock {
                    label: store.name.clone(),
                    value: store.purpose.clone().unwrap_or_default(),
                    read_only: store.updates == UpdateMode::ReadOnly,
                });
            }
        }

        let mut tools: Vec<ToolStub> = Vec::new();
        for tool in story.skills.iter().flat_map(|s| &s.tools) {
            if !tools.iter().any(|t| t.name == tool.name) {
                tools.push(ToolStub {
                    name: tool.name.clone(),
                    description: tool.purpose.clone(),
                });
            }
        }

        let file = AgentFile {
            name: story.name.clone(),
            agent_type: "memgpt_agent",
            system: render_system_prompt(story),
            memory_blocks,
            tools,
            tags: story.tags.clone(),
            metadata: serde_json::json!({
                "identifier": story.slug(),
                "version": story.version,
                "autonomyLevel": story.autonomy_level,
            }),
        };

        Ok(vec![ExportedFile::new(
            format!("{}.af.json", story.slug()),
            serde_json::to_string_pretty(&file)?,
        )])
    }
}

fn persona(story: &AgentStory) -> String {
    let mut lines = vec![format!("I am {}.", story.name)];
    if let Some(role) = &story.role {
        lines.push(format!("My role: {}.", role.trim_end_matches('.')));
    }
    if let Some(purpose) = &story.purpose {
        lines.push(format!("My purpose: {}.", purpose.trim_end_matches('.')));
    }
    lines.join(" ")
}
