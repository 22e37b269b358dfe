use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::export::{export_story, ExportBundle, ExportFormat};
use crate::schema::{merge_patch, AgentStory, StoryId};
use crate::storage::{OrgRecord, Storage};
use crate::validation::{
    parse_story, validate_partial_story, validate_skill, validate_story, ValidationResult, Warning,
};

/// Story keys the server owns.
const MANAGED_STORY_KEYS: &[&str] = &["id", "createdAt", "updatedAt"];

/// A stored story plus the consistency warnings it was saved with.
#[derive(Serialize)]
pub struct SavedStory {
    pub story: AgentStory,
    pub warnings: Vec<Warning>,
}

pub async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn validate_story_handler(Json(candidate): Json<Value>) -> Json<ValidationResult> {
    Json(validate_story(&candidate))
}

pub async fn validate_partial_story_handler(
    Json(candidate): Json<Value>,
) -> Json<ValidationResult> {
    Json(validate_partial_story(&candidate))
}

pub async fn validate_skill_handler(Json(candidate): Json<Value>) -> Json<ValidationResult> {
    Json(validate_skill(&candidate))
}

/// Validate a full story document, answering 422 with the result when it
/// has structural errors.
fn accept_story(candidate: &Value) -> Result<(AgentStory, Vec<Warning>), ApiError> {
    let result = validate_story(candidate);
    if !result.valid {
        return Err(ApiError::Invalid(result));
    }
    let story = parse_story(candidate).map_err(|errors| {
        ApiError::Invalid(ValidationResult {
            valid: false,
            errors,
            warnings: Vec::new(),
        })
    })?;
    Ok((story, result.warnings))
}

pub async fn create_story(
    State(storage): State<Arc<dyn Storage>>,
    Json(candidate): Json<Value>,
) -> Result<(StatusCode, Json<SavedStory>), ApiError> {
    let (mut story, warnings) = accept_story(&candidate)?;
    story.created_at = None;
    story.stamp_new();

    storage.create_story(&story).await?;

    Ok((StatusCode::CREATED, Json(SavedStory { story, warnings })))
}

pub async fn list_stories(
    State(storage): State<Arc<dyn Storage>>,
) -> Result<Json<Vec<AgentStory>>, ApiError> {
    Ok(Json(storage.list_stories().await?))
}

async fn load_story(storage: &dyn Storage, id: StoryId) -> Result<AgentStory, ApiError> {
    storage
        .get_story(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("story {}", id)))
}

pub async fn get_story(
    State(storage): State<Arc<dyn Storage>>,
    Path(id): Path<StoryId>,
) -> Result<Json<AgentStory>, ApiError> {
    Ok(Json(load_story(storage.as_ref(), id).await?))
}

/// Apply a JSON merge patch and re-validate the whole story.
pub async fn patch_story(
    State(storage): State<Arc<dyn Storage>>,
    Path(id): Path<StoryId>,
    Json(mut patch): Json<Value>,
) -> Result<Json<SavedStory>, ApiError> {
    let existing = load_story(storage.as_ref(), id).await?;

    if let Value::Object(fields) = &mut patch {
        for key in MANAGED_STORY_KEYS {
            fields.remove(*key);
        }
    } else {
        return Err(ApiError::BadRequest("patch must be a JSON object".to_string()));
    }

    let mut doc = serde_json::to_value(&existing)?;
    merge_patch(&mut doc, &patch);
    let (mut story, warnings) = accept_story(&doc)?;
    story.id = existing.id;
    story.created_at = existing.created_at;
    story.updated_at = Some(Utc::now());

    storage.update_story(&story).await?;

    Ok(Json(SavedStory { story, warnings }))
}

pub async fn delete_story(
    State(storage): State<Arc<dyn Storage>>,
    Path(id): Path<StoryId>,
) -> Result<StatusCode, ApiError> {
    storage.delete_story(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn export_story_handler(
    State(storage): State<Arc<dyn Storage>>,
    Path((id, format)): Path<(StoryId, String)>,
) -> Result<Json<ExportBundle>, ApiError> {
    let format = ExportFormat::from_str(&format).ok_or_else(|| {
        let known: Vec<_> = ExportFormat::ALL.iter().map(|f| f.as_str()).collect();
        ApiError::BadRequest(format!(
            "unknown export format \"{}\"; expected one of {}",
            format,
            known.join(", ")
        ))
    })?;
    let story = load_story(storage.as_ref(), id).await?;
    Ok(Json(export_story(&story, format)?))
}

pub async fn create_record<R: OrgRecord>(
    State(storage): State<Arc<dyn Storage>>,
    Json(input): Json<Value>,
) -> Result<(StatusCode, Json<R>), ApiError> {
    let record = R::from_input(input)?;
    record.insert(storage.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list_records<R: OrgRecord>(
    State(storage): State<Arc<dyn Storage>>,
) -> Result<Json<Vec<R>>, ApiError> {
    Ok(Json(R::list(storage.as_ref()).await?))
}

async fn load_record<R: OrgRecord>(storage: &dyn Storage, id: Uuid) -> Result<R, ApiError> {
    R::fetch(storage, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("{} {}", R::KIND, id)))
}

pub async fn get_record<R: OrgRecord>(
    State(storage): State<Arc<dyn Storage>>,
    Path(id): Path<Uuid>,
) -> Result<Json<R>, ApiError> {
    Ok(Json(load_record::<R>(storage.as_ref(), id).await?))
}

pub async fn patch_record<R: OrgRecord>(
    State(storage): State<Arc<dyn Storage>>,
    Path(id): Path<Uuid>,
    Json(changes): Json<Value>,
) -> Result<Json<R>, ApiError> {
    let existing = load_record::<R>(storage.as_ref(), id).await?;
    let updated = existing.patched(&changes)?;
    updated.replace(storage.as_ref()).await?;
    Ok(Json(updated))
}

pub async fn delete_record<R: OrgRecord>(
    State(storage): State<Arc<dyn Storage>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    R::remove(storage.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
