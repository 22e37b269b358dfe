//! Export adapters: turn a validated story into the files a target agent
//! harness expects.

pub mod agentskills;
pub mod claude;
pub mod crewai;
pub mod langgraph;
pub mod letta;
mod prompt;

pub use prompt::render_system_prompt;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::schema::story::slugify;
use crate::schema::AgentStory;
use crate::validation::{check_story_completeness, validate_typed_story, Violation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Claude,
    Letta,
    Langgraph,
    Crewai,
    Agentskills,
}

impl ExportFormat {
    pub const ALL: &'static [ExportFormat] = &[
        ExportFormat::Claude,
        ExportFormat::Letta,
        ExportFormat::Langgraph,
        ExportFormat::Crewai,
        ExportFormat::Agentskills,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Claude => "claude",
            ExportFormat::Letta => "letta",
            ExportFormat::Langgraph => "langgraph",
            ExportFormat::Crewai => "crewai",
            ExportFormat::Agentskills => "agentskills",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "claude" => Some(ExportFormat::Claude),
            "letta" => Some(ExportFormat::Letta),
            "langgraph" => Some(ExportFormat::Langgraph),
            "crewai" => Some(ExportFormat::Crewai),
            "agentskills" | "agentskills.io" => Some(ExportFormat::Agentskills),
            _ => None,
        }
    }

    fn exporter(&self) -> Box<dyn Exporter> {
        match self {
            ExportFormat::Claude => Box::new(claude::ClaudeExporter),
            ExportFormat::Letta => Box::new(letta::LettaExporter),
            ExportFormat::Langgraph => Box::new(langgraph::LangGraphExporter),
            ExportFormat::Crewai => Box::new(crewai::CrewAiExporter),
            ExportFormat::Agentskills => Box::new(agentskills::AgentSkillsExporter),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("story has {} structural error(s) and cannot be exported", .0.len())]
    Invalid(Vec<Violation>),

    #[error("story is not compatible with {format}: {reason}")]
    Incompatible { format: ExportFormat, reason: String },

    #[error("failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedFile {
    pub path: String,
    pub content: String,
}

impl ExportedFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportBundle {
    pub format: ExportFormat,
    pub files: Vec<ExportedFile>,
    /// Parts of the story the target cannot express, and other caveats.
    pub warnings: Vec<String>,
}

impl ExportBundle {
    pub fn file(&self, path: &str) -> Option<&ExportedFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Write every file below `dir`, creating directories as needed.
    pub fn write_to(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.files.len());
        for file in &self.files {
            let target = dir.join(&file.path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&target, &file.content)?;
            written.push(target);
        }
        Ok(written)
    }
}

/// One target harness.
pub trait Exporter {
    fn format(&self) -> ExportFormat;

    /// Format-specific caveats. Return `Err` with a reason when the story
    /// cannot be exported at all.
    fn check(&self, story: &AgentStory) -> Result<Vec<String>, String>;

    fn render(&self, story: &AgentStory) -> Result<Vec<ExportedFile>, ExportError>;
}

pub fn export_story(story: &AgentStory, format: ExportFormat) -> Result<ExportBundle, ExportError> {
    let validation = validate_typed_story(story);
    if !validation.valid {
        return Err(ExportError::Invalid(validation.errors));
    }

    if story.skills.is_empty() {
        return Err(ExportError::Incompatible {
            format,
            reason: "at least one skill is required".to_string(),
        });
    }

    let exporter = format.exporter();
    let mut warnings = exporter
        .check(story)
        .map_err(|reason| ExportError::Incompatible { format, reason })?;

    let completeness = check_story_completeness(story);
    warnings.extend(
        completeness
            .missing
            .iter()
            .map(|field| format!("{} is empty; the export will carry a blank value", field)),
    );
    warnings.extend(duplicate_slug_warnings(story));

    for warning in &warnings {
        log::warn!("{} export of \"{}\": {}", format, story.name, warning);
    }

    let files = exporter.render(story)?;
    log::info!(
        "exported \"{}\" as {} ({} files)",
        story.name,
        format,
        files.len()
    );

    Ok(ExportBundle {
        format,
        files,
        warnings,
    })
}

/// File-safe slugs for every skill, made unique by numeric suffixes. A
/// suffixed slug never collides with one issued earlier, including one a
/// skill got from its own name.
pub(crate) fn skill_slugs(story: &AgentStory) -> Vec<String> {
    let mut issued: HashSet<String> = HashSet::new();
    story
        .skills
        .iter()
        .map(|skill| {
            let base = slugify(&skill.name);
            let mut slug = base.clone();
            let mut suffix = 2;
            while issued.contains(&slug) {
                slug = format!("{}-{}", base, suffix);
                suffix += 1;
            }
            issued.insert(slug.clone());
            slug
        })
        .collect()
}

fn duplicate_slug_warnings(story: &AgentStory) -> Vec<String> {
    story
        .skills
        .iter()
        .zip(skill_slugs(story))
        .filter(|(skill, slug)| slugify(&skill.name) != *slug)
        .map(|(skill, slug)| {
            format!(
                "skill \"{}\" shares a file name with another skill and was exported as \"{}\"",
                skill.name, slug
            )
        })
        .collect()
}

/// Render YAML frontmatter followed by a markdown body.
pub(crate) fn with_frontmatter<T: Serialize>(
    frontmatter: &T,
    body: &str,
) -> Result<String, ExportError> {
    let yaml = serde_yaml::to_string(frontmatter)?;
    Ok(format!("---\n{}---\n\n{}", yaml, body))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::schema::{
        Acceptance, AgentStory, AutonomyLevel, Behavior, Guardrail, HumanInteraction,
        InteractionMode, Skill, SkillTool, StageTransition, Trigger, TriggerType,
        WorkflowBehavior, WorkflowStage,
    };

    pub fn support_story() -> AgentStory {
        let mut triage = Skill::new("Ticket Triage", "Support");
        triage.description = "Classify and route incoming tickets".to_string();
        triage.triggers = vec![Trigger::new(TriggerType::Message, "A new ticket arrives")];
        triage.acceptance = Acceptance::new(["Ticket has a queue", "Customer notified"]);
        triage.tools = vec![SkillTool {
            name: "ticket_api".to_string(),
            purpose: "Read and update tickets".to_string(),
            permissions: vec![],
            required: true,
        }];

        let mut intake = WorkflowStage::new("intake");
        intake.transitions = vec![StageTransition {
            to: "resolve".to_string(),
            when: Some("issue understood".to_string()),
        }];
        let mut resolve = Skill::new("Resolution", "Support");
        resolve.description = "Work a ticket to resolution".to_string();
        resolve.triggers = vec![Trigger::new(TriggerType::Cascade, "Triage assigned a ticket")];
        resolve.acceptance = Acceptance::new(["Customer confirms fix"]);
        resolve.behavior = Some(Behavior::Workflow(WorkflowBehavior {
            stages: vec![intake, WorkflowStage::new("resolve")],
            entry_stage: Some("intake".to_string()),
        }));

        let mut story = AgentStory::new("Support Bot");
        story.role = Some("Tier-one support agent".to_string());
        story.purpose = Some("Resolve customer tickets quickly".to_string());
        story.autonomy_level = Some(AutonomyLevel::Supervised);
        story.human_interaction = Some(HumanInteraction {
            mode: InteractionMode::OnTheLoop,
            ..Default::default()
        });
        story.guardrails = vec![Guardrail::new("No refunds", "Never issue refunds")];
        story.skills = vec![triage, resolve];
        story
    }
}
