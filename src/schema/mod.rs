//! Typed schema of Agent Stories, Skills and organization records.
//!
//! Each type implements [`Schema`](crate::validation::Schema) next to its
//! definition so the structural contract lives with the data it describes.

/// Declares a string-valued enum with its wire names, serde support and a
/// structural parser that reports `invalid_enum_value` for unknown strings.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $wire)] $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $wire ),+
                }
            }

            #[allow(clippy::should_implement_trait)]
            pub fn from_str(s: &str) -> Option<Self> {
                match s {
                    $( $wire => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $crate::validation::Schema for $name {
            fn parse(
                value: &serde_json::Value,
                p: &mut $crate::validation::Parser,
            ) -> Option<Self> {
                let raw = p.string(value)?;
                match Self::from_str(raw) {
                    Some(parsed) => Some(parsed),
                    None => {
                        let allowed: Vec<&str> = Self::ALL.iter().map(|v| v.as_str()).collect();
                        p.invalid_enum(raw, &allowed);
                        None
                    }
                }
            }
        }
    };
}

pub mod guardrail;
pub mod organization;
pub mod patch;
pub mod skill;
pub mod story;

pub use guardrail::{Enforcement, Guardrail};
pub use organization::{
    BusinessDomain, Department, HumanAgentPair, Person, PhaseAssignments, PhaseOwner, Role,
    TaskAssignment, TaskPhase,
};
pub use patch::merge_patch;
pub use skill::{
    Acceptance, Acquisition, AdaptiveBehavior, Backoff, Behavior, ConfidenceConfig,
    DecisionPoint, FailureHandling, FailureMode, IterativeBehavior, Permission, QualityMetric,
    Reasoning, ReasoningStrategy, RetryConfig, SequentialBehavior, Skill, SkillTool, StageTransition,
    Trigger, TriggerType, WorkflowBehavior, WorkflowStage,
};
pub use story::{
    AgentRelation, AgentStory, AutonomyLevel, Checkpoint, CheckpointType, Collaboration,
    CollaborationRole, Escalation, HumanInteraction, InteractionMode, LearningSignal,
    LearningType, Memory, MemoryStoreType, PersistentStore, RelationKind, UpdateMode,
};

use uuid::Uuid;

pub type StoryId = Uuid;
pub type SkillId = Uuid;
