//! Typed view over a schema's `fields_definition` JSON.
//!
//! Field definitions are stored as a JSON array on the schema row. This
//! module owns the serde shapes, the immutability diff used by schema
//! updates (only reordering is legal), and per-value validation of case
//! payload entries against their declared field.

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Numeric,
    String,
    Alphanumeric,
    SymbolsAlphanumeric,
    Boolean,
    Date,
    Email,
    Phone,
    ImageUpload,
    DocumentUpload,
}

impl FieldType {
    /// Upload fields hold attachment ids (or resolved URLs) rather than
    /// user-entered text.
    pub fn is_upload(&self) -> bool {
        matches!(self, FieldType::ImageUpload | FieldType::DocumentUpload)
    }
}

/// Type-specific constraints attached to a field definition.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub pattern: Option<String>,
}

impl ValidationRules {
    pub fn is_empty(&self) -> bool {
        self == &ValidationRules::default()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub display_name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub validation_rules: ValidationRules,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub help_text: Option<String>,
    #[serde(default)]
    pub order: u32,
}

pub fn parse_fields(json: &str) -> Result<Vec<FieldDef>, serde_json::Error> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(json)
}

pub fn fields_to_json(fields: &[FieldDef]) -> Result<String, serde_json::Error> {
    serde_json::to_string(fields)
}

/// Lowercased field names, for case-insensitive filter-key validation.
pub fn field_name_set(fields: &[FieldDef]) -> HashSet<String> {
    fields.iter().map(|f| f.name.to_lowercase()).collect()
}

/// Diff two field definitions under the append-restricted schema contract.
///
/// Returns the names of fields that were added, removed, or mutated in any
/// property other than `order`. An empty result means the update is a pure
/// reorder and is legal.
pub fn immutable_field_diff(current: &[FieldDef], proposed: &[FieldDef]) -> Vec<String> {
    let mut offending: Vec<String> = Vec::new();

    for field in current {
        match proposed.iter().find(|p| p.name == field.name) {
            None => offending.push(field.name.clone()),
            Some(candidate) => {
                let mut normalized = candidate.clone();
                normalized.order = field.order;
                if &normalized != field {
                    offending.push(field.name.clone());
                }
            }
        }
    }
    for field in proposed {
        if !current.iter().any(|c| c.name == field.name) {
            offending.push(field.name.clone());
        }
    }

    offending.sort();
    offending.dedup();
    offending
}

/// Validate a single payload value against its declared field.
///
/// Returns a human-readable reason on failure. `Null` is only rejected for
/// required fields; presence checks for missing keys are the caller's job.
pub fn validate_value(field: &FieldDef, value: &Value) -> Result<(), String> {
    if value.is_null() {
        if field.required {
            return Err(format!("field '{}' is required", field.name));
        }
        return Ok(());
    }

    match field.field_type {
        FieldType::Numeric => {
            let number = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            let number = number
                .ok_or_else(|| format!("field '{}' must be numeric", field.name))?;
            if let Some(min) = field.validation_rules.min_value {
                if number < min {
                    return Err(format!("field '{}' must be >= {}", field.name, min));
                }
            }
            if let Some(max) = field.validation_rules.max_value {
                if number > max {
                    return Err(format!("field '{}' must be <= {}", field.name, max));
                }
            }
            Ok(())
        }
        FieldType::Boolean => match value {
            Value::Bool(_) => Ok(()),
            Value::String(s) if matches!(s.to_lowercase().as_str(), "true" | "false") => Ok(()),
            _ => Err(format!("field '{}' must be a boolean", field.name)),
        },
        FieldType::Date => {
            let text = string_value(field, value)?;
            let parsed = chrono::NaiveDate::parse_from_str(&text, "%Y-%m-%d").is_ok()
                || chrono::DateTime::parse_from_rfc3339(&text).is_ok();
            if parsed {
                Ok(())
            } else {
                Err(format!("field '{}' must be an ISO date", field.name))
            }
        }
        FieldType::Email => {
            let text = string_value(field, value)?;
            let at = text.find('@');
            match at {
                Some(pos) if pos > 0 && text[pos + 1..].contains('.') => Ok(()),
                _ => Err(format!("field '{}' must be an email address", field.name)),
            }
        }
        FieldType::Phone => {
            let text = string_value(field, value)?;
            let digits = text.chars().filter(|c| c.is_ascii_digit()).count();
            if digits >= 7 && text.chars().all(|c| c.is_ascii_digit() || "+-() ".contains(c)) {
                check_length(field, &text)
            } else {
                Err(format!("field '{}' must be a phone number", field.name))
            }
        }
        FieldType::String | FieldType::SymbolsAlphanumeric => {
            let text = string_value(field, value)?;
            check_length(field, &text)?;
            check_pattern(field, &text)
        }
        FieldType::Alphanumeric => {
            let text = string_value(field, value)?;
            if !text.chars().all(|c| c.is_alphanumeric() || c.is_whitespace()) {
                return Err(format!("field '{}' must be alphanumeric", field.name));
            }
            check_length(field, &text)?;
            check_pattern(field, &text)
        }
        FieldType::ImageUpload | FieldType::DocumentUpload => {
            // Upload values are opaque attachment references.
            string_value(field, value).map(|_| ())
        }
    }
}

fn string_value(field: &FieldDef, value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(format!("field '{}' must be a string", field.name)),
    }
}

fn check_length(field: &FieldDef, text: &str) -> Result<(), String> {
    let len = text.chars().count();
    if let Some(min) = field.validation_rules.min_length {
        if len < min {
            return Err(format!(
                "field '{}' must be at least {} characters",
                field.name, min
            ));
        }
    }
    if let Some(max) = field.validation_rules.max_length {
        if len > max {
            return Err(format!(
                "field '{}' must be at most {} characters",
                field.name, max
            ));
        }
    }
    Ok(())
}

fn check_pattern(field: &FieldDef, text: &str) -> Result<(), String> {
    if let Some(pattern) = &field.validation_rules.pattern {
        let regex = Regex::new(pattern)
            .map_err(|_| format!("field '{}' has an invalid validation pattern", field.name))?;
        if !regex.is_match(text) {
            return Err(format!(
                "field '{}' does not match the required pattern",
                field.name
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(name: &str, field_type: FieldType) -> FieldDef {
        FieldDef {
            name: name.to_string(),
            display_name: name.to_string(),
            field_type,
            validation_rules: ValidationRules::default(),
            required: false,
            unique: false,
            default_value: None,
            help_text: None,
            order: 0,
        }
    }

    #[test]
    fn test_parse_round_trip() {
        let fields = vec![field("amount", FieldType::Numeric)];
        let json = fields_to_json(&fields).unwrap();
        assert_eq!(parse_fields(&json).unwrap(), fields);
        assert!(parse_fields("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_tolerates_minimal_definitions() {
        let parsed = parse_fields(
            r#"[{"name": "city", "display_name": "City", "field_type": "string"}]"#,
        )
        .unwrap();
        assert_eq!(parsed[0].field_type, FieldType::String);
        assert!(!parsed[0].required);
        assert!(parsed[0].validation_rules.is_empty());
    }

    #[test]
    fn test_field_name_set_is_lowercased() {
        let fields = vec![field("BankName", FieldType::String)];
        assert!(field_name_set(&fields).contains("bankname"));
    }

    #[test]
    fn test_reorder_is_not_a_violation() {
        let mut a = field("a", FieldType::String);
        let mut b = field("b", FieldType::Numeric);
        a.order = 0;
        b.order = 1;
        let mut a2 = a.clone();
        let mut b2 = b.clone();
        a2.order = 1;
        b2.order = 0;
        assert!(immutable_field_diff(&[a, b], &[b2, a2]).is_empty());
    }

    #[test]
    fn test_type_change_is_a_violation() {
        let a = field("a", FieldType::String);
        let mut changed = a.clone();
        changed.field_type = FieldType::Numeric;
        assert_eq!(immutable_field_diff(&[a], &[changed]), vec!["a"]);
    }

    #[test]
    fn test_add_and_remove_are_violations() {
        let a = field("a", FieldType::String);
        let b = field("b", FieldType::String);
        let d = field("d", FieldType::String);
        let diff = immutable_field_diff(&[a.clone(), b], &[a, d]);
        assert_eq!(diff, vec!["b", "d"]);
    }

    #[test]
    fn test_numeric_validation() {
        let mut f = field("amount", FieldType::Numeric);
        f.validation_rules.min_value = Some(0.0);
        f.validation_rules.max_value = Some(1000.0);
        assert!(validate_value(&f, &json!(100)).is_ok());
        assert!(validate_value(&f, &json!("100")).is_ok());
        assert!(validate_value(&f, &json!("abc")).is_err());
        assert!(validate_value(&f, &json!(-1)).is_err());
        assert!(validate_value(&f, &json!(1001)).is_err());
    }

    #[test]
    fn test_required_null_handling() {
        let mut f = field("name", FieldType::String);
        assert!(validate_value(&f, &Value::Null).is_ok());
        f.required = true;
        assert!(validate_value(&f, &Value::Null).is_err());
    }

    #[test]
    fn test_email_and_phone_validation() {
        let email = field("email", FieldType::Email);
        assert!(validate_value(&email, &json!("a@b.com")).is_ok());
        assert!(validate_value(&email, &json!("not-an-email")).is_err());

        let phone = field("phone", FieldType::Phone);
        assert!(validate_value(&phone, &json!("+91 98765 43210")).is_ok());
        assert!(validate_value(&phone, &json!("call me")).is_err());
    }

    #[test]
    fn test_alphanumeric_and_pattern() {
        let f = field("code", FieldType::Alphanumeric);
        assert!(validate_value(&f, &json!("AB12")).is_ok());
        assert!(validate_value(&f, &json!("AB-12")).is_err());

        let mut pinned = field("pin", FieldType::String);
        pinned.validation_rules.pattern = Some("^[0-9]{6}$".to_string());
        assert!(validate_value(&pinned, &json!("560001")).is_ok());
        assert!(validate_value(&pinned, &json!("5600")).is_err());
    }

    #[test]
    fn test_date_validation() {
        let f = field("dob", FieldType::Date);
        assert!(validate_value(&f, &json!("2026-01-15")).is_ok());
        assert!(validate_value(&f, &json!("2026-01-15T10:00:00Z")).is_ok());
        assert!(validate_value(&f, &json!("15/01/2026")).is_err());
    }
}
