//! Form schema error types
//!
//! Covers schema CRUD and the append-restricted field-set contract: once a
//! schema exists, only reordering its fields (plus name, description, TAT
//! limit, and active flag) is a legal update.

use thiserror::Error;
use uuid::Uuid;

/// Form schema operation errors
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Schema not found by id
    #[error("Form schema {0} not found")]
    NotFound(Uuid),

    /// A schema with this name already exists in the organization
    #[error("Form schema '{name}' already exists in organization {organization_id}")]
    DuplicateName { organization_id: i32, name: String },

    /// Attempted to add, remove, or mutate fields of an existing schema
    #[error("Cannot modify fields of an existing schema (only reordering is allowed): {}", fields.join(", "))]
    ImmutableFieldViolation { fields: Vec<String> },

    /// Malformed or out-of-range schema definition
    #[error("Schema validation failed: {0}")]
    Validation(String),

    /// Stored or submitted fields definition is not valid JSON
    #[error("Invalid fields definition: {0}")]
    InvalidFieldsJson(#[from] serde_json::Error),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl SchemaError {
    /// Check if this is a client error (400-series)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SchemaError::DuplicateName { .. }
                | SchemaError::ImmutableFieldViolation { .. }
                | SchemaError::Validation(_)
                | SchemaError::InvalidFieldsJson(_)
        )
    }

    /// Check if this is a not found error (404)
    pub fn is_not_found(&self) -> bool {
        matches!(self, SchemaError::NotFound(_))
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            SchemaError::NotFound(_) => "NOT_FOUND",
            SchemaError::DuplicateName { .. } => "CONFLICT",
            SchemaError::ImmutableFieldViolation { .. } => "SCHEMA_IMMUTABLE_FIELD_VIOLATION",
            SchemaError::Validation(_) | SchemaError::InvalidFieldsJson(_) => "VALIDATION_FAILED",
            SchemaError::Database(_) => "DATABASE_ERROR",
        }
    }
}
