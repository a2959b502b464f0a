//! Filter/search error types
//!
//! Malformed filter values fail the whole request; filters referencing
//! fields undeclared in any visible schema are advisory warnings attached
//! to successful responses, not errors, and so never appear here.

use thiserror::Error;

/// Filter/search request errors
#[derive(Error, Debug)]
pub enum FilterError {
    /// A filter value could not be parsed (e.g. a malformed date string)
    #[error("Invalid value '{value}' for filter '{field}'")]
    InvalidFilterValue { field: String, value: String },

    /// The post-SQL candidate set is too large for the in-memory
    /// TAT/search stages; the caller must narrow the filters first
    #[error("Filter would scan {candidates} cases (limit {limit}); narrow the filters")]
    ScanLimitExceeded { candidates: usize, limit: usize },

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Stored payload or schema definition was not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FilterError {
    /// Check if this is a client error (400-series)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FilterError::InvalidFilterValue { .. } | FilterError::ScanLimitExceeded { .. }
        )
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            FilterError::InvalidFilterValue { .. } => "INVALID_FILTER_VALUE",
            FilterError::ScanLimitExceeded { .. } => "SCAN_LIMIT_EXCEEDED",
            FilterError::Database(_) => "DATABASE_ERROR",
            FilterError::Json(_) => "JSON_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_value_names_field() {
        let err = FilterError::InvalidFilterValue {
            field: "start_date".to_string(),
            value: "not-a-date".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value 'not-a-date' for filter 'start_date'"
        );
        assert!(err.is_client_error());
        assert_eq!(err.error_code(), "INVALID_FILTER_VALUE");
    }

    #[test]
    fn test_scan_limit() {
        let err = FilterError::ScanLimitExceeded {
            candidates: 50_000,
            limit: 10_000,
        };
        assert!(err.is_client_error());
        assert_eq!(err.error_code(), "SCAN_LIMIT_EXCEEDED");
    }
}
