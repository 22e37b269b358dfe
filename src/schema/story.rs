use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Guardrail, Skill, StoryId};
use crate::validation::{Parser, Schema};

static IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("identifier pattern is valid"));

string_enum! {
    pub enum AutonomyLevel {
        Full => "full",
        #[default]
        Supervised => "supervised",
        Collaborative => "collaborative",
        Directed => "directed",
    }
}

string_enum! {
    pub enum InteractionMode {
        #[default]
        InTheLoop => "in_the_loop",
        OnTheLoop => "on_the_loop",
        OutOfLoop => "out_of_loop",
    }
}

string_enum! {
    pub enum CheckpointType {
        #[default]
        Approval => "approval",
        Review => "review",
        Notification => "notification",
        Input => "input",
    }
}

string_enum! {
    pub enum CollaborationRole {
        Supervisor => "supervisor",
        #[default]
        Worker => "worker",
        Peer => "peer",
    }
}

string_enum! {
    pub enum RelationKind {
        Supervises => "supervises",
        #[default]
        ReportsTo => "reports_to",
        PeersWith => "peers_with",
        DelegatesTo => "delegates_to",
    }
}

string_enum! {
    pub enum MemoryStoreType {
        #[default]
        KnowledgeBase => "knowledge_base",
        Vector => "vector",
        Relational => "relational",
        KeyValue => "key_value",
        Graph => "graph",
    }
}

string_enum! {
    pub enum UpdateMode {
        #[default]
        ReadOnly => "read_only",
        Append => "append",
        FullCrud => "full_crud",
    }
}

string_enum! {
    pub enum LearningType {
        #[default]
        FeedbackLoop => "feedback_loop",
        Reinforcement => "reinforcement",
        PatternRecognition => "pattern_recognition",
    }
}

/// Specification of one AI agent: identity, skills and agent-wide
/// configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<StoryId>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autonomy_level: Option<AutonomyLevel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_interaction: Option<HumanInteraction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collaboration: Option<Collaboration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<Memory>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guardrails: Vec<Guardrail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl AgentStory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Stable slug for file names: the identifier when set, otherwise
    /// derived from the name.
    pub fn slug(&self) -> String {
        match &self.identifier {
            Some(identifier) if !identifier.is_empty() => identifier.clone(),
            _ => slugify(&self.name),
        }
    }

    pub fn interaction_mode(&self) -> Option<InteractionMode> {
        self.human_interaction.as_ref().map(|h| h.mode)
    }

    /// Assign an id and timestamps to a story about to be stored.
    pub fn stamp_new(&mut self) {
        let now = Utc::now();
        self.id.get_or_insert_with(StoryId::new_v4);
        self.created_at.get_or_insert(now);
        self.updated_at = Some(now);
    }
}

impl Schema for AgentStory {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        Some(Self {
            id: p.field(obj, "id"),
            name: p.always_non_empty_string(obj, "name"),
            identifier: p.matching(
                obj,
                "identifier",
                &IDENTIFIER_PATTERN,
                "Identifier must be lowercase letters, digits and single hyphens",
            ),
            version: p.field(obj, "version"),
            role: p.field(obj, "role"),
            purpose: p.field(obj, "purpose"),
            autonomy_level: p.field(obj, "autonomyLevel"),
            tags: p.list(obj, "tags"),
            skills: p.list(obj, "skills"),
            human_interaction: p.field(obj, "humanInteraction"),
            collaboration: p.field(obj, "collaboration"),
            memory: p.field(obj, "memory"),
            guardrails: p.list(obj, "guardrails"),
            notes: p.field(obj, "notes"),
            created_at: p.field(obj, "createdAt"),
            updated_at: p.field(obj, "updatedAt"),
        })
    }
}

/// Lowercase, hyphen-separated rendering of free text.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    if slug.is_empty() {
        "agent".to_string()
    } else {
        slug
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HumanInteraction {
    pub mode: InteractionMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checkpoints: Vec<Checkpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation: Option<Escalation>,
}

impl Schema for HumanInteraction {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        Some(Self {
            mode: p.required(obj, "mode"),
            checkpoints: p.list(obj, "checkpoints"),
            escalation: p.field(obj, "escalation"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub name: String,
    pub trigger: String,
    #[serde(rename = "type")]
    pub checkpoint_type: CheckpointType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

impl Schema for Checkpoint {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        Some(Self {
            name: p.non_empty_string(obj, "name"),
            trigger: p.required(obj, "trigger"),
            checkpoint_type: p.required(obj, "type"),
            timeout: p.optional_non_empty_string(obj, "timeout"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Escalation {
    pub conditions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl Schema for Escalation {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        Some(Self {
            conditions: p.non_empty_list(obj, "conditions", "escalation condition"),
            channel: p.field(obj, "channel"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collaboration {
    pub role: CollaborationRole,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<AgentRelation>,
}

impl Schema for Collaboration {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        Some(Self {
            role: p.required(obj, "role"),
            relations: p.list(obj, "relations"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRelation {
    pub agent: String,
    pub relationship: RelationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
}

impl Schema for AgentRelation {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        Some(Self {
            agent: p.non_empty_string(obj, "agent"),
            relationship: p.required(obj, "relationship"),
            via: p.field(obj, "via"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub working: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub persistent: Vec<PersistentStore>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub learning: Vec<LearningSignal>,
}

impl Schema for Memory {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        Some(Self {
            working: p.list(obj, "working"),
            persistent: p.list(obj, "persistent"),
            learning: p.list(obj, "learning"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentStore {
    pub name: String,
    #[serde(rename = "type")]
    pub store_type: MemoryStoreType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default)]
    pub updates: UpdateMode,
}

impl Schema for PersistentStore {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        Some(Self {
            name: p.non_empty_string(obj, "name"),
            store_type: p.required(obj, "type"),
            purpose: p.field(obj, "purpose"),
            updates: p.defaulted(obj, "updates", UpdateMode::ReadOnly),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningSignal {
    #[serde(rename = "type")]
    pub learning_type: LearningType,
    pub signal: String,
}

impl Schema for LearningSignal {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        Some(Self {
            learning_type: p.required(obj, "type"),
            signal: p.non_empty_string(obj, "signal"),
        })
    }
}
