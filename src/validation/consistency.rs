//! Cross-field checks the structural schema cannot express.
//!
//! Every rule here is advisory. Rules are independent of each other and all
//! of them run on every call; the resulting warnings are simply concatenated.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::completeness::check_skill_completeness;
use crate::schema::{AgentStory, AutonomyLevel, Behavior, InteractionMode, Skill, TriggerType};

/// Which consistency rule produced a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningRule {
    AutonomyContradiction,
    DuplicateSkillName,
    ShadowedGuardrail,
    IncompleteSkill,
    AdaptiveWithoutTools,
    SingleStageWorkflow,
    UnboundedIteration,
    InertConfidenceThreshold,
    EmptyFailureHandling,
    UnboundedSchedule,
    DanglingStageReference,
    #[default]
    Other,
}

/// A non-blocking advisory attached to a field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub path: String,
    pub message: String,
    #[serde(skip)]
    pub rule: WarningRule,
}

impl Warning {
    pub fn new(rule: WarningRule, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            rule,
        }
    }
}

fn join(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}

/// Run every story-level and skill-level rule.
pub fn check_story(story: &AgentStory) -> Vec<Warning> {
    let mut warnings = Vec::new();

    check_autonomy(story, &mut warnings);
    check_duplicate_skill_names(story, &mut warnings);
    check_guardrail_shadowing(story, &mut warnings);

    for (i, skill) in story.skills.iter().enumerate() {
        warnings.extend(check_skill(skill, &format!("skills[{}]", i)));
    }

    warnings
}

fn check_autonomy(story: &AgentStory, warnings: &mut Vec<Warning>) {
    let (Some(level), Some(mode)) = (story.autonomy_level, story.interaction_mode()) else {
        return;
    };

    match (level, mode) {
        (AutonomyLevel::Full, InteractionMode::InTheLoop) => warnings.push(Warning::new(
            WarningRule::AutonomyContradiction,
            "autonomyLevel",
            "Autonomy level 'full' contradicts human interaction mode 'in_the_loop': \
             a fully autonomous agent should not wait on a human for each action",
        )),
        (AutonomyLevel::Directed, InteractionMode::OutOfLoop) => warnings.push(Warning::new(
            WarningRule::AutonomyContradiction,
            "autonomyLevel",
            "Autonomy level 'directed' contradicts human interaction mode 'out_of_loop': \
             a directed agent needs a human giving it direction",
        )),
        _ => {}
    }
}

fn check_duplicate_skill_names(story: &AgentStory, warnings: &mut Vec<Warning>) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for skill in &story.skills {
        *counts.entry(skill.name.as_str()).or_default() += 1;
    }

    // Preserve first-appearance order for a stable message.
    let mut duplicates: Vec<&str> = Vec::new();
    for skill in &story.skills {
        let name = skill.name.as_str();
        if counts[name] > 1 && !duplicates.contains(&name) {
            duplicates.push(name);
        }
    }

    if !duplicates.is_empty() {
        let listed = duplicates
            .iter()
            .map(|n| format!("\"{}\"", n))
            .collect::<Vec<_>>()
            .join(", ");
        warnings.push(Warning::new(
            WarningRule::DuplicateSkillName,
            "skills",
            format!("Duplicate skill names: {}", listed),
        ));
    }
}

fn check_guardrail_shadowing(story: &AgentStory, warnings: &mut Vec<Warning>) {
    if story.guardrails.is_empty() {
        return;
    }

    for (i, skill) in story.skills.iter().enumerate() {
        for (j, guardrail) in skill.guardrails.iter().enumerate() {
            let shadowed = story
                .guardrails
                .iter()
                .find(|agent| agent.name.to_lowercase() == guardrail.name.to_lowercase());
            if let Some(agent_guardrail) = shadowed {
                warnings.push(Warning::new(
                    WarningRule::ShadowedGuardrail,
                    format!("skills[{}].guardrails[{}].name", i, j),
                    format!(
                        "Skill \"{}\" guardrail \"{}\" duplicates agent-level guardrail \"{}\"",
                        skill.name, guardrail.name, agent_guardrail.name
                    ),
                ));
            }
        }
    }
}

/// Rules that look at a single skill. `prefix` is the skill's path inside
/// its story, or empty when the skill is validated on its own.
pub fn check_skill(skill: &Skill, prefix: &str) -> Vec<Warning> {
    let mut warnings = Vec::new();
    let label = if skill.name.trim().is_empty() {
        "(unnamed)"
    } else {
        skill.name.as_str()
    };

    for field in check_skill_completeness(skill).missing {
        warnings.push(Warning::new(
            WarningRule::IncompleteSkill,
            join(prefix, &field),
            format!("Skill \"{}\" is incomplete: {} is empty", label, field),
        ));
    }

    match &skill.behavior {
        Some(Behavior::Adaptive(_)) if skill.tools.is_empty() => {
            warnings.push(Warning::new(
                WarningRule::AdaptiveWithoutTools,
                join(prefix, "tools"),
                format!(
                    "Skill \"{}\" uses adaptive behavior without tools; \
                     adaptive without tools may indicate missing configuration",
                    label
                ),
            ));
        }
        Some(Behavior::Workflow(workflow)) => {
            let message = match workflow.stages.len() {
                0 => Some(format!(
                    "Skill \"{}\" declares a workflow with no stages yet",
                    label
                )),
                1 => Some(format!(
                    "Skill \"{}\" declares a workflow with a single stage; \
                     consider the sequential model",
                    label
                )),
                _ => None,
            };
            if let Some(message) = message {
                warnings.push(Warning::new(
                    WarningRule::SingleStageWorkflow,
                    join(prefix, "behavior.stages"),
                    message,
                ));
            }
            check_stage_references(skill, label, prefix, &mut warnings);
        }
        Some(Behavior::Iterative(iterative)) if iterative.max_iterations.is_none() => {
            warnings.push(Warning::new(
                WarningRule::UnboundedIteration,
                join(prefix, "behavior.maxIterations"),
                format!(
                    "Skill \"{}\" iterates without maxIterations; \
                     the loop may never terminate",
                    label
                ),
            ));
        }
        _ => {}
    }

    if let Some(confidence) = skill.reasoning.as_ref().and_then(|r| r.confidence.as_ref()) {
        if confidence.threshold.is_some() && confidence.fallback_action.is_none() {
            warnings.push(Warning::new(
                WarningRule::InertConfidenceThreshold,
                join(prefix, "reasoning.confidence.fallbackAction"),
                format!(
                    "Skill \"{}\" sets a confidence threshold without a fallbackAction; \
                     the threshold has no effect",
                    label
                ),
            ));
        }
    }

    if let Some(handling) = &skill.failure_handling {
        if handling.is_empty() {
            warnings.push(Warning::new(
                WarningRule::EmptyFailureHandling,
                join(prefix, "failureHandling"),
                format!(
                    "Skill \"{}\" configures failure handling with neither modes nor a default fallback",
                    label
                ),
            ));
        }
    }

    if skill.has_trigger(TriggerType::Schedule) && skill.acceptance.timeout.is_none() {
        warnings.push(Warning::new(
            WarningRule::UnboundedSchedule,
            join(prefix, "acceptance.timeout"),
            format!(
                "Skill \"{}\" runs on a schedule without an acceptance timeout; \
                 scheduled work should bound its execution time",
                label
            ),
        ));
    }

    warnings
}

fn check_stage_references(skill: &Skill, label: &str, prefix: &str, warnings: &mut Vec<Warning>) {
    let Some(Behavior::Workflow(workflow)) = &skill.behavior else {
        return;
    };

    if let Some(entry) = &workflow.entry_stage {
        if workflow.stage(entry).is_none() {
            warnings.push(Warning::new(
                WarningRule::DanglingStageReference,
                join(prefix, "behavior.entryStage"),
                format!(
                    "Skill \"{}\" entry stage \"{}\" is not one of its stages",
                    label, entry
                ),
            ));
        }
    }

    for (k, stage) in workflow.stages.iter().enumerate() {
        for (m, transition) in stage.transitions.iter().enumerate() {
            if workflow.stage(&transition.to).is_none() {
                warnings.push(Warning::new(
                    WarningRule::DanglingStageReference,
                    join(prefix, &format!("behavior.stages[{}].transitions[{}].to", k, m)),
                    format!(
                        "Skill \"{}\" stage \"{}\" transitions to unknown stage \"{}\"",
                        label, stage.name, transition.to
                    ),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        Acceptance, AdaptiveBehavior, ConfidenceConfig, FailureHandling, Guardrail,
        HumanInteraction, IterativeBehavior, Reasoning, StageTransition, Trigger,
        WorkflowBehavior, WorkflowStage,
    };

    fn ready_skill(name: &str) -> Skill {
        let mut skill = Skill::new(name, "Support");
        skill.description = "Route tickets".to_string();
        skill.triggers = vec![Trigger::new(TriggerType::Message, "New ticket")];
        skill.acceptance = Acceptance::new(["Ticket routed"]);
        skill
    }

    fn rules(warnings: &[Warning]) -> Vec<WarningRule> {
        warnings.iter().map(|w| w.rule).collect()
    }

    fn story_with(level: AutonomyLevel, mode: InteractionMode) -> AgentStory {
        let mut story = AgentStory::new("Bot");
        story.autonomy_level = Some(level);
        story.human_interaction = Some(HumanInteraction {
            mode,
            ..Default::default()
        });
        story
    }

    #[test]
    fn test_clean_story_has_no_warnings() {
        let mut story = AgentStory::new("Bot");
        story.skills = vec![ready_skill("Triage")];
        assert!(check_story(&story).is_empty());
    }

    #[test]
    fn test_full_autonomy_in_the_loop() {
        let warnings = check_story(&story_with(AutonomyLevel::Full, InteractionMode::InTheLoop));
        assert_eq!(rules(&warnings), vec![WarningRule::AutonomyContradiction]);
        assert_eq!(warnings[0].path, "autonomyLevel");
    }

    #[test]
    fn test_directed_out_of_loop() {
        let warnings =
            check_story(&story_with(AutonomyLevel::Directed, InteractionMode::OutOfLoop));
        assert_eq!(rules(&warnings), vec![WarningRule::AutonomyContradiction]);
    }

    #[test]
    fn test_compatible_autonomy_is_quiet() {
        let warnings =
            check_story(&story_with(AutonomyLevel::Supervised, InteractionMode::OnTheLoop));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_duplicate_names_listed_once() {
        let mut story = AgentStory::new("Bot");
        story.skills = vec![
            ready_skill("Triage"),
            ready_skill("Reply"),
            ready_skill("Triage"),
            ready_skill("Reply"),
            ready_skill("triage"),
        ];
        let warnings = check_story(&story);
        assert_eq!(rules(&warnings), vec![WarningRule::DuplicateSkillName]);
        assert_eq!(warnings[0].message, "Duplicate skill names: \"Triage\", \"Reply\"");
    }

    #[test]
    fn test_guardrail_shadowing_is_case_insensitive() {
        let mut story = AgentStory::new("Bot");
        story.guardrails = vec![Guardrail::new("No PII", "Never store personal data")];
        let mut skill = ready_skill("Triage");
        skill.guardrails = vec![Guardrail::new("no pii", "Redact emails")];
        story.skills = vec![skill];

        let warnings = check_story(&story);
        assert_eq!(rules(&warnings), vec![WarningRule::ShadowedGuardrail]);
        assert_eq!(warnings[0].path, "skills[0].guardrails[0].name");
        assert!(warnings[0].message.contains("\"no pii\""));
        assert!(warnings[0].message.contains("\"No PII\""));
    }

    #[test]
    fn test_incomplete_skill_one_warning_per_field() {
        let mut skill = ready_skill("Triage");
        skill.description.clear();
        skill.domain.clear();
        let warnings = check_skill(&skill, "skills[2]");
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].path, "skills[2].description");
        assert_eq!(warnings[1].path, "skills[2].domain");
        assert!(warnings
            .iter()
            .all(|w| w.rule == WarningRule::IncompleteSkill));
    }

    #[test]
    fn test_adaptive_without_tools() {
        let mut skill = ready_skill("Research");
        skill.behavior = Some(Behavior::Adaptive(AdaptiveBehavior {
            capabilities: vec!["search".to_string()],
            selection_strategy: None,
        }));
        let warnings = check_skill(&skill, "");
        assert_eq!(rules(&warnings), vec![WarningRule::AdaptiveWithoutTools]);
        assert_eq!(warnings[0].path, "tools");
    }

    #[test]
    fn test_empty_workflow_draft_is_not_called_single_stage() {
        let mut skill = ready_skill("Onboard");
        skill.behavior = Some(Behavior::Workflow(WorkflowBehavior {
            stages: vec![],
            entry_stage: None,
        }));
        let warnings = check_skill(&skill, "");
        assert_eq!(rules(&warnings), vec![WarningRule::SingleStageWorkflow]);
        assert!(warnings[0].message.contains("no stages yet"));
        assert!(!warnings[0].message.contains("single stage"));
    }

    #[test]
    fn test_single_stage_workflow() {
        let mut skill = ready_skill("Onboard");
        skill.behavior = Some(Behavior::Workflow(WorkflowBehavior {
            stages: vec![WorkflowStage::new("collect")],
            entry_stage: None,
        }));
        assert_eq!(
            rules(&check_skill(&skill, "")),
            vec![WarningRule::SingleStageWorkflow]
        );
    }

    #[test]
    fn test_dangling_stage_references() {
        let mut intake = WorkflowStage::new("intake");
        intake.transitions = vec![StageTransition {
            to: "resolve".to_string(),
            when: None,
        }];
        let mut skill = ready_skill("Onboard");
        skill.behavior = Some(Behavior::Workflow(WorkflowBehavior {
            stages: vec![intake, WorkflowStage::new("close")],
            entry_stage: Some("start".to_string()),
        }));

        let warnings = check_skill(&skill, "");
        assert_eq!(
            rules(&warnings),
            vec![
                WarningRule::DanglingStageReference,
                WarningRule::DanglingStageReference
            ]
        );
        assert_eq!(warnings[1].path, "behavior.stages[0].transitions[0].to");
    }

    #[test]
    fn test_iterative_without_limit() {
        let mut skill = ready_skill("Refine");
        skill.behavior = Some(Behavior::Iterative(IterativeBehavior {
            body: vec!["draft".to_string()],
            termination_condition: "approved".to_string(),
            max_iterations: None,
        }));
        assert_eq!(
            rules(&check_skill(&skill, "")),
            vec![WarningRule::UnboundedIteration]
        );

        if let Some(Behavior::Iterative(iterative)) = &mut skill.behavior {
            iterative.max_iterations = Some(5);
        }
        assert!(check_skill(&skill, "").is_empty());
    }

    #[test]
    fn test_threshold_without_fallback() {
        let mut skill = ready_skill("Classify");
        skill.reasoning = Some(Reasoning {
            confidence: Some(ConfidenceConfig {
                threshold: Some(0.7),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert_eq!(
            rules(&check_skill(&skill, "")),
            vec![WarningRule::InertConfidenceThreshold]
        );
    }

    #[test]
    fn test_empty_failure_handling() {
        let mut skill = ready_skill("Classify");
        skill.failure_handling = Some(FailureHandling::default());
        assert_eq!(
            rules(&check_skill(&skill, "")),
            vec![WarningRule::EmptyFailureHandling]
        );
    }

    #[test]
    fn test_schedule_without_timeout() {
        let mut skill = ready_skill("Digest");
        skill.triggers = vec![Trigger::new(TriggerType::Schedule, "daily")];
        let warnings = check_skill(&skill, "skills[0]");
        assert_eq!(rules(&warnings), vec![WarningRule::UnboundedSchedule]);
        assert_eq!(warnings[0].path, "skills[0].acceptance.timeout");

        skill.acceptance.timeout = Some("10m".to_string());
        assert!(check_skill(&skill, "").is_empty());
    }

    #[test]
    fn test_rules_are_additive() {
        let mut story = story_with(AutonomyLevel::Full, InteractionMode::InTheLoop);
        let mut digest = ready_skill("Digest");
        digest.triggers = vec![Trigger::new(TriggerType::Schedule, "")];
        digest.failure_handling = Some(FailureHandling::default());
        story.skills = vec![digest.clone(), digest];

        let found = rules(&check_story(&story));
        assert!(found.contains(&WarningRule::AutonomyContradiction));
        assert!(found.contains(&WarningRule::DuplicateSkillName));
        assert_eq!(
            found
                .iter()
                .filter(|r| **r == WarningRule::UnboundedSchedule)
                .count(),
            2
        );
        assert_eq!(
            found
                .iter()
                .filter(|r| **r == WarningRule::IncompleteSkill)
                .count(),
            2
        );
    }
}
