//! Conversational editing. The model proposes a list of [`EditAction`]s and
//! [`apply_actions`] folds them into a new story without touching the input.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{parse_json, AssistError};
use crate::providers::{LLMProvider, Message};
use crate::schema::{merge_patch, AgentStory, Guardrail};
use crate::validation::{parse_partial_story, validate_partial_story, ValidationResult};

/// Fields owned by the store or by dedicated actions.
const PROTECTED_FIELDS: &[&str] = &["id", "createdAt", "updatedAt", "skills", "guardrails"];

const EDIT_SYSTEM_PROMPT: &str = r#"You edit an Agent Story (JSON, camelCase keys) on the user's behalf.
Reply with one JSON object: {"reply": "<short answer to the user>", "actions": [...]}.
Each action has an "action" tag:
- {"action": "set_field", "field": "purpose", "value": "..."}  (dotted paths like "humanInteraction.mode"; null clears)
- {"action": "add_skill", "skill": { ...full skill... }}
- {"action": "update_skill", "name": "<skill name>", "changes": { ...merge patch... }}
- {"action": "remove_skill", "name": "<skill name>"}
- {"action": "add_guardrail", "guardrail": {"name": "...", "constraint": "..."}}
- {"action": "remove_guardrail", "name": "<guardrail name>"}
Use an empty actions list when the user only asks a question.
Output JSON only, no markdown code fences."#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EditAction {
    SetField { field: String, value: Value },
    AddSkill { skill: Value },
    UpdateSkill { name: String, changes: Value },
    RemoveSkill { name: String },
    AddGuardrail { guardrail: Guardrail },
    RemoveGuardrail { name: String },
}

#[derive(Debug, Deserialize)]
struct EditResponse {
    #[serde(default)]
    reply: Option<String>,
    #[serde(default)]
    actions: Vec<EditAction>,
}

/// Read the model's action list. Accepts either a bare array or an object
/// with an `actions` key.
pub fn parse_actions(text: &str) -> Result<Vec<EditAction>, AssistError> {
    parse_response(text).map(|r| r.actions)
}

fn parse_response(text: &str) -> Result<EditResponse, AssistError> {
    let value = parse_json(text)?;
    let response = if value.is_array() {
        serde_json::from_value(value).map(|actions| EditResponse {
            reply: None,
            actions,
        })
    } else {
        serde_json::from_value(value)
    };
    response.map_err(|e| AssistError::MalformedResponse(format!("unrecognized actions: {}", e)))
}

/// Apply `actions` in order to a copy of `story`. The batch is all or
/// nothing: an unknown target or a result that fails partial validation
/// leaves the caller with the original story.
pub fn apply_actions(
    story: &AgentStory,
    actions: &[EditAction],
) -> Result<AgentStory, AssistError> {
    let mut doc = serde_json::to_value(story)
        .map_err(|e| AssistError::MalformedResponse(format!("story not serializable: {}", e)))?;

    for action in actions {
        apply_one(&mut doc, action)?;
    }

    parse_partial_story(&doc).map_err(AssistError::InvalidEdit)
}

fn apply_one(doc: &mut Value, action: &EditAction) -> Result<(), AssistError> {
    match action {
        EditAction::SetField { field, value } => set_field(doc, field, value),
        EditAction::AddSkill { skill } => {
            array_mut(doc, "skills").push(skill.clone());
            Ok(())
        }
        EditAction::UpdateSkill { name, changes } => {
            let skill = array_mut(doc, "skills")
                .iter_mut()
                .find(|s| s["name"] == name.as_str())
                .ok_or_else(|| unknown("skill", name))?;
            merge_patch(skill, changes);
            Ok(())
        }
        EditAction::RemoveSkill { name } => remove_named(array_mut(doc, "skills"), "skill", name),
        EditAction::AddGuardrail { guardrail } => {
            let guardrail = serde_json::to_value(guardrail)
                .map_err(|e| AssistError::MalformedResponse(e.to_string()))?;
            array_mut(doc, "guardrails").push(guardrail);
            Ok(())
        }
        EditAction::RemoveGuardrail { name } => {
            remove_named(array_mut(doc, "guardrails"), "guardrail", name)
        }
    }
}

fn unknown(kind: &'static str, name: &str) -> AssistError {
    AssistError::UnknownTarget {
        kind,
        name: name.to_string(),
    }
}

fn array_mut<'a>(doc: &'a mut Value, key: &str) -> &'a mut Vec<Value> {
    if !doc[key].is_array() {
        doc[key] = Value::Array(Vec::new());
    }
    match &mut doc[key] {
        Value::Array(items) => items,
        _ => unreachable!("just replaced with an array"),
    }
}

fn remove_named(
    items: &mut Vec<Value>,
    kind: &'static str,
    name: &str,
) -> Result<(), AssistError> {
    let before = items.len();
    items.retain(|item| item["name"] != name);
    if items.len() == before {
        return Err(unknown(kind, name));
    }
    Ok(())
}

fn set_field(doc: &mut Value, field: &str, value: &Value) -> Result<(), AssistError> {
    let segments: Vec<&str> = field.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return Err(AssistError::MalformedResponse("empty field path".to_string()));
    };
    if segments.iter().any(|s| s.is_empty()) {
        return Err(AssistError::MalformedResponse(format!(
            "invalid field path \"{}\"",
            field
        )));
    }
    if PROTECTED_FIELDS.contains(&segments[0]) {
        return Err(AssistError::MalformedResponse(format!(
            "field \"{}\" cannot be set directly",
            segments[0]
        )));
    }

    let mut cursor = doc;
    for segment in parents {
        if !cursor[*segment].is_object() {
            cursor[*segment] = Value::Object(Map::new());
        }
        cursor = &mut cursor[*segment];
    }
    if let Value::Object(fields) = cursor {
        if value.is_null() {
            fields.remove(*last);
        } else {
            fields.insert(last.to_string(), value.clone());
        }
    }
    Ok(())
}

/// Result of one conversational edit turn.
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub story: AgentStory,
    pub actions: Vec<EditAction>,
    pub reply: Option<String>,
    pub validation: ValidationResult,
}

pub struct ChatEditor {
    llm_provider: Arc<dyn LLMProvider>,
}

impl ChatEditor {
    pub fn new(llm_provider: Arc<dyn LLMProvider>) -> Self {
        Self { llm_provider }
    }

    /// Ask the model how to carry out `instruction` on `story`, then apply
    /// its actions. `history` holds earlier turns of the same conversation.
    pub async fn edit(
        &self,
        story: &AgentStory,
        history: &[Message],
        instruction: &str,
    ) -> Result<EditOutcome, AssistError> {
        let current = serde_json::to_string_pretty(story)
            .map_err(|e| AssistError::MalformedResponse(format!("story not serializable: {}", e)))?;
        let system = format!("{}\n\nCurrent story:\n{}", EDIT_SYSTEM_PROMPT, current);

        let mut messages = history.to_vec();
        messages.push(Message::user(instruction));

        let response = self
            .llm_provider
            .complete(&system, messages)
            .await
            .map_err(|e| {
                log::warn!("chat edit failed: {}", e);
                AssistError::Provider(e)
            })?;

        let EditResponse { reply, actions } = parse_response(&response)?;
        let edited = apply_actions(story, &actions)?;
        let validation = serde_json::to_value(&edited)
            .map(|doc| validate_partial_story(&doc))
            .map_err(|e| AssistError::MalformedResponse(e.to_string()))?;
        log::info!(
            "applied {} edit action(s) to story \"{}\"",
            actions.len(),
            edited.name
        );

        Ok(EditOutcome {
            story: edited,
            actions,
            reply,
            validation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockLLMProvider;
    use crate::schema::{Acceptance, AutonomyLevel, Skill, Trigger, TriggerType};
    use serde_json::json;

    fn story() -> AgentStory {
        let mut skill = Skill::new("Triage", "Support");
        skill.description = "Sort tickets".to_string();
        skill.triggers = vec![Trigger::new(TriggerType::Message, "New ticket")];
        skill.acceptance = Acceptance::new(["Ticket labeled"]);

        let mut story = AgentStory::new("Support Bot");
        story.purpose = Some("Answer tickets".to_string());
        story.skills.push(skill);
        story.guardrails.push(Guardrail::new("No refunds", "Never issue refunds"));
        story
    }

    #[test]
    fn test_parse_actions_accepts_both_shapes() {
        let bare = parse_actions(r#"[{"action": "remove_skill", "name": "Triage"}]"#).unwrap();
        assert_eq!(
            bare,
            vec![EditAction::RemoveSkill {
                name: "Triage".to_string()
            }]
        );

        let wrapped = parse_actions(
            r#"```json
{"reply": "Done", "actions": [{"action": "set_field", "field": "purpose", "value": "Help"}]}
```"#,
        )
        .unwrap();
        assert_eq!(wrapped.len(), 1);
    }

    #[test]
    fn test_parse_actions_rejects_unknown_action() {
        let err = parse_actions(r#"[{"action": "rename_story", "name": "x"}]"#).unwrap_err();
        assert!(matches!(err, AssistError::MalformedResponse(_)));
    }

    #[test]
    fn test_apply_is_pure() {
        let original = story();
        let edited = apply_actions(
            &original,
            &[EditAction::SetField {
                field: "purpose".to_string(),
                value: json!("Resolve tickets"),
            }],
        )
        .unwrap();
        assert_eq!(edited.purpose.as_deref(), Some("Resolve tickets"));
        assert_eq!(original.purpose.as_deref(), Some("Answer tickets"));
    }

    #[test]
    fn test_set_nested_field_and_clear() {
        let edited = apply_actions(
            &story(),
            &[
                EditAction::SetField {
                    field: "humanInteraction.mode".to_string(),
                    value: json!("in_the_loop"),
                },
                EditAction::SetField {
                    field: "purpose".to_string(),
                    value: Value::Null,
                },
                EditAction::SetField {
                    field: "autonomyLevel".to_string(),
                    value: json!("directed"),
                },
            ],
        )
        .unwrap();
        assert!(edited.human_interaction.is_some());
        assert_eq!(edited.purpose, None);
        assert_eq!(edited.autonomy_level, Some(AutonomyLevel::Directed));
    }

    #[test]
    fn test_skill_actions() {
        let edited = apply_actions(
            &story(),
            &[
                EditAction::AddSkill {
                    skill: json!({
                        "name": "Reply",
                        "domain": "Support",
                        "description": "Answer the customer",
                        "acquired": "built_in",
                        "triggers": [{ "type": "cascade", "description": "After triage" }],
                        "acceptance": { "successConditions": ["Customer answered"] }
                    }),
                },
                EditAction::UpdateSkill {
                    name: "Triage".to_string(),
                    changes: json!({ "description": "Label and route tickets" }),
                },
            ],
        )
        .unwrap();
        assert_eq!(edited.skills.len(), 2);
        assert_eq!(edited.skills[0].description, "Label and route tickets");
        assert_eq!(edited.skills[1].triggers[0].trigger_type, TriggerType::Cascade);

        let removed = apply_actions(
            &edited,
            &[EditAction::RemoveSkill {
                name: "Triage".to_string(),
            }],
        )
        .unwrap();
        assert_eq!(removed.skills.len(), 1);
        assert_eq!(removed.skills[0].name, "Reply");
    }

    #[test]
    fn test_guardrail_actions() {
        let edited = apply_actions(
            &story(),
            &[
                EditAction::AddGuardrail {
                    guardrail: Guardrail::new("Polite", "Stay courteous"),
                },
                EditAction::RemoveGuardrail {
                    name: "No refunds".to_string(),
                },
            ],
        )
        .unwrap();
        let names: Vec<_> = edited.guardrails.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Polite"]);
    }

    #[test]
    fn test_unknown_target_aborts_batch() {
        let err = apply_actions(
            &story(),
            &[EditAction::UpdateSkill {
                name: "Billing".to_string(),
                changes: json!({}),
            }],
        )
        .unwrap_err();
        assert!(matches!(err, AssistError::UnknownTarget { kind: "skill", .. }));
    }

    #[test]
    fn test_invalid_result_is_rejected() {
        let err = apply_actions(
            &story(),
            &[EditAction::SetField {
                field: "autonomyLevel".to_string(),
                value: json!("total"),
            }],
        )
        .unwrap_err();
        match err {
            AssistError::InvalidEdit(errors) => assert_eq!(errors[0].path, "autonomyLevel"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_behavior_fields_without_model_are_rejected() {
        let err = apply_actions(
            &story(),
            &[EditAction::UpdateSkill {
                name: "Triage".to_string(),
                changes: json!({ "behavior": { "stages": [{ "name": "Sort" }] } }),
            }],
        )
        .unwrap_err();
        match err {
            AssistError::InvalidEdit(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].path, "skills[0].behavior.model");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_protected_fields() {
        let err = apply_actions(
            &story(),
            &[EditAction::SetField {
                field: "skills".to_string(),
                value: json!([]),
            }],
        )
        .unwrap_err();
        assert!(matches!(err, AssistError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_chat_edit_round() {
        let provider = Arc::new(MockLLMProvider::with_response(
            r#"{"reply": "Purpose updated.", "actions": [{"action": "set_field", "field": "purpose", "value": "Resolve tickets fast"}]}"#,
        ));
        let editor = ChatEditor::new(provider.clone());
        let history = vec![Message::user("hi"), Message::assistant("Hello!")];

        let outcome = editor
            .edit(&story(), &history, "Make the purpose snappier")
            .await
            .unwrap();
        assert_eq!(outcome.reply.as_deref(), Some("Purpose updated."));
        assert_eq!(outcome.story.purpose.as_deref(), Some("Resolve tickets fast"));
        assert!(outcome.validation.valid);

        let (system, messages) = &provider.requests()[0];
        assert!(system.contains("\"name\": \"Support Bot\""));
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].content, "Make the purpose snappier");
    }
}
