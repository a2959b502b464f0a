use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tracing::error;

use crate::errors::{AttachmentError, CaseError, FilterError, SchemaError};

/// API error envelope: every failure serializes to
/// `{"error": ..., "code": ..., "fields": [...]}` with `fields` present
/// only for immutable-field violations.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub fields: Option<Vec<String>>,
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::UNAUTHORIZED,
            code: "UNAUTHORIZED",
            message: message.into(),
            fields: None,
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::FORBIDDEN,
            code: "FORBIDDEN",
            message: message.into(),
            fields: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            code: "VALIDATION_FAILED",
            message: message.into(),
            fields: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR",
            message: message.into(),
            fields: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(code = self.code, "request failed: {}", self.message);
        }
        let mut body = json!({
            "error": self.message,
            "code": self.code,
        });
        if let Some(fields) = &self.fields {
            body["fields"] = json!(fields);
        }
        (self.status, Json(body)).into_response()
    }
}

impl From<SchemaError> for ApiError {
    fn from(err: SchemaError) -> Self {
        let status = match &err {
            SchemaError::NotFound(_) => StatusCode::NOT_FOUND,
            SchemaError::DuplicateName { .. } => StatusCode::CONFLICT,
            _ if err.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let fields = match &err {
            SchemaError::ImmutableFieldViolation { fields } => Some(fields.clone()),
            _ => None,
        };
        ApiError {
            status,
            code: err.error_code(),
            message: err.to_string(),
            fields,
        }
    }
}

impl From<CaseError> for ApiError {
    fn from(err: CaseError) -> Self {
        let status = match &err {
            CaseError::NotFound(_) | CaseError::SchemaNotFound(_) => StatusCode::NOT_FOUND,
            CaseError::NumberConflict { .. } | CaseError::SequenceAllocationFailed(_) => {
                StatusCode::CONFLICT
            }
            CaseError::Forbidden(_) => StatusCode::FORBIDDEN,
            CaseError::Attachment(inner) => return attachment_status(inner, err.to_string()),
            CaseError::SchemaInactive(_) => StatusCode::BAD_REQUEST,
            _ if err.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError {
            status,
            code: err.error_code(),
            message: err.to_string(),
            fields: None,
        }
    }
}

impl From<AttachmentError> for ApiError {
    fn from(err: AttachmentError) -> Self {
        let message = err.to_string();
        attachment_status(&err, message)
    }
}

fn attachment_status(err: &AttachmentError, message: String) -> ApiError {
    let status = match err {
        AttachmentError::NotFound(_) => StatusCode::NOT_FOUND,
        AttachmentError::DuplicateBinding { .. } => StatusCode::CONFLICT,
        _ if err.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ApiError {
        status,
        code: err.error_code(),
        message,
        fields: None,
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        ApiError {
            status,
            code: err.error_code(),
            message: err.to_string(),
            fields: None,
        }
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(err: sea_orm::DbErr) -> Self {
        ApiError::internal(format!("Database error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_schema_violation_carries_fields() {
        let api: ApiError = SchemaError::ImmutableFieldViolation {
            fields: vec!["amount".to_string()],
        }
        .into();
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.code, "SCHEMA_IMMUTABLE_FIELD_VIOLATION");
        assert_eq!(api.fields, Some(vec!["amount".to_string()]));
    }

    #[test]
    fn test_case_conflicts_are_409() {
        let api: ApiError = CaseError::SequenceAllocationFailed(5).into();
        assert_eq!(api.status, StatusCode::CONFLICT);

        let api: ApiError = CaseError::NumberConflict {
            organization_id: 1,
            number: 3,
        }
        .into();
        assert_eq!(api.status, StatusCode::CONFLICT);
    }

    #[test]
    fn test_not_found_mapping() {
        let api: ApiError = CaseError::NotFound(Uuid::nil()).into();
        assert_eq!(api.status, StatusCode::NOT_FOUND);

        let api: ApiError = AttachmentError::NotFound(Uuid::nil()).into();
        assert_eq!(api.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_filter_scan_limit_is_client_error() {
        let api: ApiError = FilterError::ScanLimitExceeded {
            candidates: 20_000,
            limit: 10_000,
        }
        .into();
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.code, "SCAN_LIMIT_EXCEEDED");
    }
}
