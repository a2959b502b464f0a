use anyhow::{anyhow, Result};
use regex::Regex;
use serde_json::{Map, Value};

use crate::fields::FieldDef;

/// Service for input validation and sanitization
pub struct ValidationService;

impl ValidationService {
    /// Sanitize and validate a schema name
    pub fn validate_schema_name(name: &str) -> Result<String> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(anyhow!("Schema name cannot be empty"));
        }

        if trimmed.len() > 100 {
            return Err(anyhow!("Schema name is too long (max 100 characters)"));
        }

        let sanitized = trimmed
            .chars()
            .filter(|c| c.is_alphanumeric() || " -_().".contains(*c))
            .collect::<String>();

        if sanitized.is_empty() {
            return Err(anyhow!("Schema name contains only invalid characters"));
        }

        Ok(sanitized)
    }

    /// Validate a schema description
    pub fn validate_description(description: &str) -> Result<String> {
        let trimmed = description.trim();

        if trimmed.len() > 1000 {
            return Err(anyhow!("Description is too long (max 1000 characters)"));
        }

        Ok(trimmed.to_string())
    }

    /// Validate a turnaround-time limit in hours
    pub fn validate_tat_hours_limit(hours: i32) -> Result<i32> {
        if hours <= 0 {
            return Err(anyhow!("TAT limit must be a positive number of hours"));
        }

        // One year is already far beyond any real case workflow
        if hours > 24 * 365 {
            return Err(anyhow!("TAT limit is too large (max {} hours)", 24 * 365));
        }

        Ok(hours)
    }

    /// Validate a single field name as it appears in a schema definition
    pub fn validate_field_name(name: &str) -> Result<String> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(anyhow!("Field name cannot be empty"));
        }

        if trimmed.len() > 64 {
            return Err(anyhow!("Field name is too long (max 64 characters)"));
        }

        let regex = Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]*$")
            .map_err(|e| anyhow!("Failed to compile field name regex: {}", e))?;
        if !regex.is_match(trimmed) {
            return Err(anyhow!(
                "Field name must start with a letter and contain only letters, numbers, and underscores"
            ));
        }

        Ok(trimmed.to_string())
    }

    /// Validate a full field definition list against schema limits
    pub fn validate_field_definitions(fields: &[FieldDef], max_fields: i32) -> Result<()> {
        if fields.len() > max_fields as usize {
            return Err(anyhow!(
                "Schema has too many fields ({} > max {})",
                fields.len(),
                max_fields
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for field in fields {
            let name = Self::validate_field_name(&field.name)?;
            if !seen.insert(name.to_lowercase()) {
                return Err(anyhow!("Duplicate field name '{}'", field.name));
            }
            if let Some(pattern) = &field.validation_rules.pattern {
                Regex::new(pattern)
                    .map_err(|e| anyhow!("Invalid pattern for field '{}': {}", field.name, e))?;
            }
        }

        Ok(())
    }

    /// Validate that a submitted payload is a string-keyed JSON object
    pub fn validate_payload_object(value: &Value) -> Result<&Map<String, Value>> {
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(anyhow!("Payload must be a JSON object")),
        }
    }

    /// Validate an uploaded filename, rejecting path components
    pub fn validate_filename(filename: &str) -> Result<String> {
        let trimmed = filename.trim();

        if trimmed.is_empty() {
            return Err(anyhow!("Filename cannot be empty"));
        }

        if trimmed.len() > 255 {
            return Err(anyhow!("Filename is too long (max 255 characters)"));
        }

        if trimmed.contains("..") || trimmed.contains('/') || trimmed.contains('\\') {
            return Err(anyhow!("Filename cannot contain path separators"));
        }

        Ok(trimmed.to_string())
    }
}
