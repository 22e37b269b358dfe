use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Guardrail, SkillId};
use crate::validation::{Parser, Schema, ViolationCode};

string_enum! {
    /// How the agent came to have a skill.
    pub enum Acquisition {
        #[default]
        BuiltIn => "built_in",
        Learned => "learned",
        Delegated => "delegated",
    }
}

string_enum! {
    pub enum TriggerType {
        #[default]
        Message => "message",
        ResourceChange => "resource_change",
        Schedule => "schedule",
        Cascade => "cascade",
        Manual => "manual",
        Condition => "condition",
    }
}

string_enum! {
    pub enum Permission {
        #[default]
        Read => "read",
        Write => "write",
        Execute => "execute",
        Admin => "admin",
    }
}

string_enum! {
    pub enum ReasoningStrategy {
        #[default]
        RuleBased => "rule_based",
        Analytical => "analytical",
        Creative => "creative",
        LlmGuided => "llm_guided",
        Hybrid => "hybrid",
    }
}

string_enum! {
    pub enum Backoff {
        None => "none",
        Linear => "linear",
        #[default]
        Exponential => "exponential",
    }
}

/// A composable unit of agent capability. Owned exclusively by its story.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SkillId>,
    pub name: String,
    pub domain: String,
    pub description: String,
    pub acquired: Acquisition,
    pub triggers: Vec<Trigger>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<SkillTool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<Behavior>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Reasoning>,
    pub acceptance: Acceptance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_handling: Option<FailureHandling>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guardrails: Vec<Guardrail>,
}

impl Skill {
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            ..Default::default()
        }
    }

    pub fn has_trigger(&self, trigger_type: TriggerType) -> bool {
        self.triggers.iter().any(|t| t.trigger_type == trigger_type)
    }

    /// The behavior model tag, if a behavior is declared.
    pub fn behavior_model(&self) -> Option<&'static str> {
        self.behavior.as_ref().map(Behavior::model)
    }
}

impl Schema for Skill {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        Some(Self {
            id: p.field(obj, "id"),
            name: p.non_empty_string(obj, "name"),
            domain: p.required(obj, "domain"),
            description: p.required(obj, "description"),
            acquired: p.required(obj, "acquired"),
            triggers: p.non_empty_list(obj, "triggers", "trigger"),
            tools: p.list(obj, "tools"),
            behavior: p.field(obj, "behavior"),
            reasoning: p.field(obj, "reasoning"),
            acceptance: p.required(obj, "acceptance"),
            failure_handling: p.field(obj, "failureHandling"),
            guardrails: p.list(obj, "guardrails"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    /// May be empty structurally; completeness requires it filled in.
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

impl Trigger {
    pub fn new(trigger_type: TriggerType, description: impl Into<String>) -> Self {
        Self {
            trigger_type,
            description: description.into(),
            conditions: Vec::new(),
            examples: Vec::new(),
        }
    }
}

impl Schema for Trigger {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        Some(Self {
            trigger_type: p.required(obj, "type"),
            description: p.required(obj, "description"),
            conditions: p.list(obj, "conditions"),
            examples: p.list(obj, "examples"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillTool {
    pub name: String,
    pub purpose: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default = "default_true")]
    pub required: bool,
}

impl Schema for SkillTool {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        Some(Self {
            name: p.non_empty_string(obj, "name"),
            purpose: p.required(obj, "purpose"),
            permissions: p.list(obj, "permissions"),
            required: p.defaulted(obj, "required", true),
        })
    }
}

/// Execution model of a skill, tagged by `model` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum Behavior {
    Sequential(SequentialBehavior),
    Workflow(WorkflowBehavior),
    Adaptive(AdaptiveBehavior),
    Iterative(IterativeBehavior),
}

impl Behavior {
    pub const MODELS: &'static [&'static str] = &["sequential", "workflow", "adaptive", "iterative"];

    /// Every model-specific key, across all models.
    const FIELDS: &'static [&'static str] = &[
        "steps",
        "stages",
        "entryStage",
        "capabilities",
        "selectionStrategy",
        "body",
        "terminationCondition",
        "maxIterations",
    ];

    pub fn model(&self) -> &'static str {
        match self {
            Behavior::Sequential(_) => "sequential",
            Behavior::Workflow(_) => "workflow",
            Behavior::Adaptive(_) => "adaptive",
            Behavior::Iterative(_) => "iterative",
        }
    }
}

impl Schema for Behavior {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        let model = match obj.get("model") {
            Some(Value::String(model)) => model.as_str(),
            Some(other) => {
                p.at("model", |p| {
                    p.report(
                        ViolationCode::InvalidUnionDiscriminator,
                        format!("Expected behavior model string, received {}", other),
                    )
                });
                return None;
            }
            None => {
                let filled_in = Behavior::FIELDS.iter().any(|key| obj.contains_key(*key));
                // A draft may not have picked a model yet, as long as it has
                // nothing else in the block either.
                if filled_in || p.strictness() == crate::validation::Strictness::Full {
                    p.at("model", |p| {
                        p.report(ViolationCode::MissingRequiredField, "Required")
                    });
                }
                check_unmodeled_fields(obj, p);
                return None;
            }
        };

        match model {
            "sequential" => Some(Behavior::Sequential(SequentialBehavior {
                steps: p.non_empty_list(obj, "steps", "step"),
            })),
            "workflow" => Some(Behavior::Workflow(WorkflowBehavior {
                stages: p.non_empty_list(obj, "stages", "stage"),
                entry_stage: p.field(obj, "entryStage"),
            })),
            "adaptive" => Some(Behavior::Adaptive(AdaptiveBehavior {
                capabilities: p.non_empty_list(obj, "capabilities", "capability"),
                selection_strategy: p.field(obj, "selectionStrategy"),
            })),
            "iterative" => Some(Behavior::Iterative(IterativeBehavior {
                body: p.non_empty_list(obj, "body", "step"),
                termination_condition: p.non_empty_string(obj, "terminationCondition"),
                max_iterations: p.bounded_int(obj, "maxIterations", 1, u32::MAX),
            })),
            unknown => {
                let options = Behavior::MODELS
                    .iter()
                    .map(|m| format!("'{}'", m))
                    .collect::<Vec<_>>()
                    .join(" | ");
                p.at("model", |p| {
                    p.report(
                        ViolationCode::InvalidUnionDiscriminator,
                        format!(
                            "Invalid discriminator value. Expected {}, received '{}'",
                            options, unknown
                        ),
                    )
                });
                None
            }
        }
    }
}

/// Type-check whatever model-specific fields a behavior without a model
/// carries, so their problems are reported even though no variant is built.
fn check_unmodeled_fields(obj: &Map<String, Value>, p: &mut Parser) {
    let _: Option<Vec<String>> = p.field(obj, "steps");
    let _: Option<Vec<WorkflowStage>> = p.field(obj, "stages");
    let _: Option<String> = p.field(obj, "entryStage");
    let _: Option<Vec<String>> = p.field(obj, "capabilities");
    let _: Option<String> = p.field(obj, "selectionStrategy");
    let _: Option<Vec<String>> = p.field(obj, "body");
    let _: Option<String> = p.field(obj, "terminationCondition");
    let _ = p.bounded_int(obj, "maxIterations", 1, u32::MAX);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequentialBehavior {
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowBehavior {
    pub stages: Vec<WorkflowStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_stage: Option<String>,
}

impl WorkflowBehavior {
    pub fn stage(&self, name: &str) -> Option<&WorkflowStage> {
        self.stages.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStage {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transitions: Vec<StageTransition>,
}

impl WorkflowStage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Schema for WorkflowStage {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        Some(Self {
            name: p.non_empty_string(obj, "name"),
            purpose: p.field(obj, "purpose"),
            transitions: p.list(obj, "transitions"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTransition {
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
}

impl Schema for StageTransition {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        Some(Self {
            to: p.non_empty_string(obj, "to"),
            when: p.field(obj, "when"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveBehavior {
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_strategy: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterativeBehavior {
    pub body: Vec<String>,
    pub termination_condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reasoning {
    pub strategy: ReasoningStrategy,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decision_points: Vec<DecisionPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<ConfidenceConfig>,
}

impl Schema for Reasoning {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        Some(Self {
            strategy: p.required(obj, "strategy"),
            decision_points: p.list(obj, "decisionPoints"),
            retry: p.field(obj, "retry"),
            confidence: p.field(obj, "confidence"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionPoint {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    pub approach: String,
    #[serde(default)]
    pub outcomes: Vec<String>,
}

impl Schema for DecisionPoint {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        Some(Self {
            name: p.non_empty_string(obj, "name"),
            inputs: p.list(obj, "inputs"),
            approach: p.required(obj, "approach"),
            outcomes: p.list(obj, "outcomes"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    pub max_attempts: u32,
    #[serde(default)]
    pub backoff: Backoff,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retry_on: Vec<String>,
}

impl RetryConfig {
    pub const MAX_ATTEMPTS: u32 = 10;
}

impl Schema for RetryConfig {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        Some(Self {
            max_attempts: p.required_bounded_int(obj, "maxAttempts", 1, Self::MAX_ATTEMPTS),
            backoff: p.defaulted(obj, "backoff", Backoff::Exponential),
            retry_on: p.list(obj, "retryOn"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_low_confidence: Option<String>,
}

impl Schema for ConfidenceConfig {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        Some(Self {
            threshold: p.bounded_number(obj, "threshold", 0.0, 1.0),
            fallback_action: p.field(obj, "fallbackAction"),
            on_low_confidence: p.field(obj, "onLowConfidence"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acceptance {
    pub success_conditions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quality_metrics: Vec<QualityMetric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

impl Acceptance {
    pub fn new<I, S>(conditions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            success_conditions: conditions.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

impl Schema for Acceptance {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        Some(Self {
            success_conditions: p.non_empty_list(obj, "successConditions", "success condition"),
            quality_metrics: p.list(obj, "qualityMetrics"),
            timeout: p.optional_non_empty_string(obj, "timeout"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetric {
    pub name: String,
    pub target: String,
}

impl Schema for QualityMetric {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        Some(Self {
            name: p.non_empty_string(obj, "name"),
            target: p.required(obj, "target"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureHandling {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modes: Vec<FailureMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_fallback: Option<String>,
    #[serde(default = "default_true")]
    pub notify_on_failure: bool,
}

impl Default for FailureHandling {
    fn default() -> Self {
        Self {
            modes: Vec::new(),
            default_fallback: None,
            notify_on_failure: true,
        }
    }
}

impl FailureHandling {
    /// Present but configures nothing.
    pub fn is_empty(&self) -> bool {
        self.modes.is_empty() && self.default_fallback.is_none()
    }
}

impl Schema for FailureHandling {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        Some(Self {
            modes: p.list(obj, "modes"),
            default_fallback: p.field(obj, "defaultFallback"),
            notify_on_failure: p.defaulted(obj, "notifyOnFailure", true),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureMode {
    pub condition: String,
    pub recovery: String,
}

impl Schema for FailureMode {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let obj = p.object(value)?;
        Some(Self {
            condition: p.non_empty_string(obj, "condition"),
            recovery: p.required(obj, "recovery"),
        })
    }
}

fn default_true() -> bool {
    true
}
