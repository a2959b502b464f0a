//! Case lifecycle error types
//!
//! Covers case creation (including per-organization sequence allocation),
//! payload updates, completion, and verification.

use thiserror::Error;
use uuid::Uuid;

use super::attachment::AttachmentError;

/// Case operation errors
#[derive(Error, Debug)]
pub enum CaseError {
    /// Case not found by id
    #[error("Case {0} not found")]
    NotFound(Uuid),

    /// Referenced form schema not found
    #[error("Form schema {0} not found")]
    SchemaNotFound(Uuid),

    /// Submissions against an inactive schema are rejected
    #[error("Form schema '{0}' is not active")]
    SchemaInactive(String),

    /// Payload or request validation failed
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Explicitly supplied case number is already taken in the organization
    #[error("Case number {number} is already taken in organization {organization_id}")]
    NumberConflict { organization_id: i32, number: i64 },

    /// Exhausted allocation retries under write contention; the whole
    /// create may safely be retried by the caller
    #[error("Could not allocate a case number after {0} attempts")]
    SequenceAllocationFailed(u32),

    /// Actor is not permitted to perform this operation on the case
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Attachment rebinding inside the create/update transaction failed
    #[error(transparent)]
    Attachment(#[from] AttachmentError),

    /// Stored payload is not valid JSON
    #[error("Invalid payload JSON: {0}")]
    InvalidPayloadJson(#[from] serde_json::Error),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl CaseError {
    /// Check if this is a client error (400-series)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CaseError::Validation(_) | CaseError::InvalidPayloadJson(_)
        )
    }

    /// Check if this is a not found error (404)
    pub fn is_not_found(&self) -> bool {
        matches!(self, CaseError::NotFound(_) | CaseError::SchemaNotFound(_))
    }

    /// Conflicts are retryable by re-submitting the whole request
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            CaseError::NumberConflict { .. } | CaseError::SequenceAllocationFailed(_)
        )
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            CaseError::NotFound(_) | CaseError::SchemaNotFound(_) => "NOT_FOUND",
            CaseError::SchemaInactive(_) => "SCHEMA_INACTIVE",
            CaseError::Validation(_) | CaseError::InvalidPayloadJson(_) => "VALIDATION_FAILED",
            CaseError::NumberConflict { .. } => "CONFLICT",
            CaseError::SequenceAllocationFailed(_) => "SEQUENCE_ALLOCATION_FAILED",
            CaseError::Forbidden(_) => "FORBIDDEN",
            CaseError::Attachment(inner) => inner.error_code(),
            CaseError::Database(_) => "DATABASE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_failure_is_conflict() {
        let err = CaseError::SequenceAllocationFailed(5);
        assert_eq!(
            err.to_string(),
            "Could not allocate a case number after 5 attempts"
        );
        assert!(err.is_conflict());
        assert_eq!(err.error_code(), "SEQUENCE_ALLOCATION_FAILED");
    }

    #[test]
    fn test_number_conflict() {
        let err = CaseError::NumberConflict {
            organization_id: 3,
            number: 12,
        };
        assert!(err.is_conflict());
        assert_eq!(err.error_code(), "CONFLICT");
    }

    #[test]
    fn test_schema_inactive() {
        let err = CaseError::SchemaInactive("KYC".to_string());
        assert_eq!(err.to_string(), "Form schema 'KYC' is not active");
        assert_eq!(err.error_code(), "SCHEMA_INACTIVE");
    }

    #[test]
    fn test_attachment_error_code_passthrough() {
        let err = CaseError::Attachment(AttachmentError::DuplicateBinding {
            case_id: Uuid::nil(),
            field_name: "photo".to_string(),
        });
        assert_eq!(err.error_code(), "DUPLICATE_BINDING");
    }
}
