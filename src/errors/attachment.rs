//! Attachment error types
//!
//! Attachments are created temporary and detached, then atomically re-bound
//! to a finished case and field name at submission time.

use thiserror::Error;
use uuid::Uuid;

/// Attachment operation errors
#[derive(Error, Debug)]
pub enum AttachmentError {
    /// Attachment not found by id
    #[error("Attachment {0} not found")]
    NotFound(Uuid),

    /// The permanent (case, field) slot is already occupied
    #[error("Case {case_id} already has an attachment bound to field '{field_name}'")]
    DuplicateBinding { case_id: Uuid, field_name: String },

    /// Attachment is already permanently bound and cannot be re-bound
    /// without an explicit unbind
    #[error("Attachment {0} is already bound to a case")]
    NotBindable(Uuid),

    /// Upload validation failed (empty file, missing filename, ...)
    #[error("Attachment validation failed: {0}")]
    Validation(String),

    /// Blob store failed
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl AttachmentError {
    /// Check if this is a client error (400-series)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AttachmentError::Validation(_) | AttachmentError::NotBindable(_)
        )
    }

    /// Check if this is a not found error (404)
    pub fn is_not_found(&self) -> bool {
        matches!(self, AttachmentError::NotFound(_))
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AttachmentError::NotFound(_) => "NOT_FOUND",
            AttachmentError::DuplicateBinding { .. } => "DUPLICATE_BINDING",
            AttachmentError::NotBindable(_) => "NOT_BINDABLE",
            AttachmentError::Validation(_) => "VALIDATION_FAILED",
            AttachmentError::Storage(_) => "STORAGE_ERROR",
            AttachmentError::Database(_) => "DATABASE_ERROR",
        }
    }
}
