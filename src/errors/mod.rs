//! Domain-specific error types for casetrack
//!
//! One structured error enum per domain, so service code can propagate
//! precise failures and the HTTP layer can map them to status codes and
//! machine-readable error codes without string matching.
//!
//! # Error Categories
//!
//! - **SchemaError**: form schema CRUD and the immutable-field-set contract
//! - **CaseError**: case creation, sequence allocation, lifecycle updates
//! - **FilterError**: search/filter request validation and execution
//! - **AttachmentError**: upload, binding, and blob storage

pub mod attachment;
pub mod case;
pub mod filter;
pub mod schema;

pub use attachment::AttachmentError;
pub use case::CaseError;
pub use filter::FilterError;
pub use schema::SchemaError;

/// Result type alias for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type alias for case operations
pub type CaseResult<T> = Result<T, CaseError>;

/// Result type alias for filter/search operations
pub type FilterResult<T> = Result<T, FilterError>;

/// Result type alias for attachment operations
pub type AttachmentResult<T> = Result<T, AttachmentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_result_alias() {
        let result: SchemaResult<()> = Err(SchemaError::Validation("bad".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_case_result_alias() {
        let result: CaseResult<i64> = Err(CaseError::SequenceAllocationFailed(5));
        assert!(result.is_err());
    }

    #[test]
    fn test_filter_result_alias() {
        let result: FilterResult<()> = Err(FilterError::InvalidFilterValue {
            field: "start_date".to_string(),
            value: "not-a-date".to_string(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_attachment_result_alias() {
        let result: AttachmentResult<()> = Err(AttachmentError::NotFound(uuid::Uuid::nil()));
        assert!(result.is_err());
    }
}
