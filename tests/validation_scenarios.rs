//! End-to-end validation scenarios over raw JSON documents, as a UI or
//! the HTTP layer would submit them.

use serde_json::{json, Value};

use agent_story::validation::{
    validate_partial_story, validate_skill, validate_story, ViolationCode, WarningRule,
};

fn triage(name: &str) -> Value {
    json!({
        "name": name,
        "domain": "NLP",
        "description": "x",
        "acquired": "built_in",
        "triggers": [{ "type": "message", "description": "new ticket" }],
        "acceptance": { "successConditions": ["done"] }
    })
}

#[test]
fn missing_name_is_always_an_error_at_name() {
    let candidates = [
        json!({}),
        json!({ "autonomyLevel": "full" }),
        json!({ "skills": [triage("Triage")] }),
        json!({ "name": null, "tags": ["a"] }),
    ];
    for candidate in candidates {
        let result = validate_story(&candidate);
        assert!(!result.valid, "{candidate}");
        assert!(result.errors.iter().any(|e| e.path == "name"), "{candidate}");
        assert!(result.warnings.is_empty());
    }
}

#[test]
fn support_bot_scenario_has_one_schedule_warning() {
    let story = json!({
        "name": "Support Bot",
        "autonomyLevel": "directed",
        "skills": [{
            "name": "Triage",
            "domain": "NLP",
            "description": "x",
            "acquired": "built_in",
            "triggers": [{ "type": "schedule", "description": "daily" }],
            "acceptance": { "successConditions": ["done"] }
        }]
    });

    let result = validate_story(&story);
    assert!(result.valid);
    assert!(result.errors.is_empty());
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].path, "skills[0].acceptance.timeout");
    assert_eq!(result.warnings_for(WarningRule::UnboundedSchedule).count(), 1);
}

#[test]
fn duplicate_triage_skills_warn_once() {
    let story = json!({ "name": "Support Bot", "skills": [triage("Triage"), triage("Triage")] });

    let result = validate_story(&story);
    assert!(result.valid);
    assert!(result.errors.is_empty());
    let duplicates: Vec<_> = result.warnings_for(WarningRule::DuplicateSkillName).collect();
    assert_eq!(duplicates.len(), 1);
    assert!(duplicates[0].message.contains("\"Triage\""));
}

#[test]
fn duplicate_detection_is_case_sensitive() {
    let story = json!({ "name": "Support Bot", "skills": [triage("Triage"), triage("triage")] });
    let result = validate_story(&story);
    assert_eq!(result.warnings_for(WarningRule::DuplicateSkillName).count(), 0);
}

#[test]
fn full_autonomy_in_the_loop_is_one_contradiction() {
    let story = json!({
        "name": "Overseer",
        "autonomyLevel": "full",
        "humanInteraction": { "mode": "in_the_loop" }
    });

    let result = validate_story(&story);
    assert!(result.valid);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(
        result.warnings_for(WarningRule::AutonomyContradiction).count(),
        1
    );
}

#[test]
fn workflow_stage_bounds() {
    let mut skill = triage("Route");
    skill["behavior"] = json!({ "model": "workflow", "stages": [] });
    let result = validate_skill(&skill);
    assert!(!result.valid);
    assert_eq!(result.errors[0].path, "behavior.stages");
    assert_eq!(result.errors[0].code, ViolationCode::TooSmall);

    skill["behavior"] = json!({ "model": "workflow", "stages": [{ "name": "only" }] });
    let result = validate_skill(&skill);
    assert!(result.valid);
    assert_eq!(result.warnings_for(WarningRule::SingleStageWorkflow).count(), 1);
}

#[test]
fn every_violation_is_reported_in_one_pass() {
    let story = json!({
        "name": "",
        "autonomyLevel": "sometimes",
        "skills": [{
            "name": "Broken",
            "domain": "NLP",
            "description": "x",
            "acquired": "built_in",
            "triggers": [],
            "behavior": { "model": "teleport" },
            "reasoning": {
                "strategy": "rule_based",
                "retry": { "maxAttempts": 11 },
                "confidence": { "threshold": 1.5 }
            },
            "acceptance": { "successConditions": [] }
        }]
    });

    let result = validate_story(&story);
    assert!(!result.valid);
    let mut paths: Vec<_> = result.errors.iter().map(|e| e.path.as_str()).collect();
    paths.sort_unstable();
    assert_eq!(
        paths,
        vec![
            "autonomyLevel",
            "name",
            "skills[0].acceptance.successConditions",
            "skills[0].behavior.model",
            "skills[0].reasoning.confidence.threshold",
            "skills[0].reasoning.retry.maxAttempts",
            "skills[0].triggers",
        ]
    );
}

#[test]
fn validation_is_idempotent() {
    let story = json!({
        "name": "Support Bot",
        "autonomyLevel": "directed",
        "humanInteraction": { "mode": "out_of_loop" },
        "skills": [triage("Triage"), triage("Triage")]
    });
    assert_eq!(validate_story(&story), validate_story(&story));
}

#[test]
fn extra_fields_are_ignored() {
    let mut skill = triage("Triage");
    skill["legacySpecification"] = json!({ "type": "message" });
    let story = json!({ "name": "Support Bot", "uiState": { "tab": 2 }, "skills": [skill] });
    assert!(validate_story(&story).valid);
}

#[test]
fn partial_drafts_need_only_a_name() {
    assert!(validate_partial_story(&json!({ "name": "Draft" })).valid);

    let missing = validate_partial_story(&json!({ "purpose": "tbd" }));
    assert!(!missing.valid);
    assert_eq!(missing.errors[0].path, "name");
    assert_eq!(missing.errors[0].code, ViolationCode::MissingRequiredField);

    let mistyped = validate_partial_story(&json!({ "name": "Draft", "tags": "urgent" }));
    assert!(!mistyped.valid);
    assert_eq!(mistyped.errors[0].path, "tags");
}
