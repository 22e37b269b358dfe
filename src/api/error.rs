use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::export::ExportError;
use crate::storage::StorageError;
use crate::validation::ValidationResult;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    /// Structural validation failed; the body is the full result.
    #[error("story failed validation")]
    Invalid(ValidationResult),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("internal error: {0}")]
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Invalid(_) | ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            ApiError::Invalid(result) => (status, Json(result)).into_response(),
            ApiError::Internal(err) => {
                log::error!("request failed: {:#}", err);
                let body = serde_json::json!({ "error": "internal server error" });
                (status, Json(body)).into_response()
            }
            other => {
                let body = serde_json::json!({ "error": other.to_string() });
                (status, Json(body)).into_response()
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { kind, id } => ApiError::NotFound(format!("{} {}", kind, id)),
            StorageError::Duplicate { .. } | StorageError::InUse { .. } => {
                ApiError::Conflict(err.to_string())
            }
            StorageError::DanglingReference { .. } => ApiError::Unprocessable(err.to_string()),
            StorageError::MissingId => ApiError::BadRequest(err.to_string()),
            StorageError::Poisoned => ApiError::Internal(err.into()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<StorageError>() {
            Ok(storage) => storage.into(),
            Err(other) => ApiError::Internal(other),
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Invalid(errors) => ApiError::Invalid(ValidationResult {
                valid: false,
                errors,
                warnings: Vec::new(),
            }),
            ExportError::Incompatible { .. } => ApiError::Unprocessable(err.to_string()),
            ExportError::Yaml(_) | ExportError::Json(_) => ApiError::Internal(err.into()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_storage_errors_map_to_statuses() {
        let id = Uuid::nil();
        let cases = [
            (StorageError::NotFound { kind: "story", id }, StatusCode::NOT_FOUND),
            (StorageError::Duplicate { kind: "story", id }, StatusCode::CONFLICT),
            (
                StorageError::InUse { kind: "role", id, by: "person" },
                StatusCode::CONFLICT,
            ),
            (
                StorageError::DanglingReference { kind: "domain", id },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (err, status) in cases {
            let api: ApiError = anyhow::Error::from(err).into();
            assert_eq!(api.status_code(), status);
        }
    }

    #[test]
    fn test_unknown_errors_are_internal() {
        let api: ApiError = anyhow::anyhow!("disk on fire").into();
        assert_eq!(api.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
