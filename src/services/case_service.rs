use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::entities::{form_entries, form_schemas, users};
use crate::database::entities::users::UserRole;
use crate::errors::{CaseError, CaseResult};
use crate::fields::{self, FieldDef};
use crate::services::{AttachmentService, SequenceService, ValidationService};
use crate::tat;

/// Bounded retries for the optimistic max+1 number allocation.
const MAX_ALLOCATION_ATTEMPTS: u32 = 5;

/// Linear backoff step between allocation attempts.
const ALLOCATION_BACKOFF_MS: u64 = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct NewCase {
    pub schema_id: Uuid,
    pub payload: Value,
    /// Explicit number, admin-only; omitted means allocate the next one
    #[serde(default)]
    pub case_number: Option<i64>,
}

/// A created or updated case plus any advisory warnings raised while
/// validating its payload.
#[derive(Debug, Clone, Serialize)]
pub struct CaseCreated {
    pub case: form_entries::Model,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseStatistics {
    pub total: u64,
    pub pending: u64,
    pub completed: u64,
    pub verified: u64,
    pub out_of_tat: u64,
    /// Mean hours from start to completion over completed cases
    pub average_completion_hours: Option<f64>,
}

#[derive(Clone)]
pub struct CaseService {
    db: DatabaseConnection,
}

impl CaseService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a case against an active schema.
    ///
    /// The payload is validated against the schema's field definitions;
    /// keys the schema does not declare are accepted with a warning. The
    /// case number is allocated inside the insert transaction and the
    /// whole attempt is retried on allocation conflicts.
    pub async fn create_case(
        &self,
        actor: &users::Model,
        new_case: NewCase,
    ) -> CaseResult<CaseCreated> {
        let schema = self.load_schema(actor, new_case.schema_id).await?;
        if !schema.is_active {
            return Err(CaseError::SchemaInactive(schema.name.clone()));
        }
        let organization_id = schema.organization_id;

        let schema_fields = parse_schema_fields(&schema)?;
        let payload_map = ValidationService::validate_payload_object(&new_case.payload)
            .map_err(|e| CaseError::Validation(e.to_string()))?;
        let warnings = validate_payload(&schema_fields, payload_map, true)?;
        let payload_json = serde_json::to_string(payload_map)?;

        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            let result = self
                .try_insert(
                    organization_id,
                    actor.id,
                    &schema,
                    &schema_fields,
                    &payload_json,
                    new_case.case_number,
                )
                .await;

            match result {
                Ok(case) => {
                    info!(
                        case_id = %case.id,
                        case_number = case.case_number,
                        organization_id,
                        "created case"
                    );
                    return Ok(CaseCreated { case, warnings });
                }
                Err(CaseError::Database(err)) if is_case_number_conflict(&err) => {
                    if let Some(number) = new_case.case_number {
                        return Err(CaseError::NumberConflict {
                            organization_id,
                            number,
                        });
                    }
                    warn!(organization_id, attempt, "case number allocation conflict, retrying");
                    tokio::time::sleep(Duration::from_millis(ALLOCATION_BACKOFF_MS * attempt as u64))
                        .await;
                }
                Err(CaseError::Database(err)) if is_transient_lock(&err) => {
                    warn!(organization_id, attempt, "database busy during case insert, retrying");
                    tokio::time::sleep(Duration::from_millis(ALLOCATION_BACKOFF_MS * attempt as u64))
                        .await;
                }
                Err(other) => return Err(other),
            }
        }

        Err(CaseError::SequenceAllocationFailed(MAX_ALLOCATION_ATTEMPTS))
    }

    async fn try_insert(
        &self,
        organization_id: i32,
        submitter_id: i32,
        schema: &form_schemas::Model,
        schema_fields: &[FieldDef],
        payload_json: &str,
        explicit_number: Option<i64>,
    ) -> CaseResult<form_entries::Model> {
        let txn = self.db.begin().await?;

        let case_number = match explicit_number {
            Some(number) if number > 0 => number,
            Some(number) => {
                return Err(CaseError::Validation(format!(
                    "case number must be positive, got {}",
                    number
                )))
            }
            None => SequenceService::next_case_number(&txn, organization_id).await?,
        };

        let now = Utc::now();
        let case = form_entries::ActiveModel {
            id: Set(Uuid::new_v4()),
            case_number: Set(Some(case_number)),
            organization_id: Set(organization_id),
            schema_id: Set(schema.id),
            submitter_id: Set(submitter_id),
            payload: Set(payload_json.to_string()),
            is_completed: Set(false),
            is_verified: Set(false),
            verification_notes: Set(None),
            verifier_id: Set(None),
            verified_at: Set(None),
            started_at: Set(now),
            completed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        AttachmentService::bind_referenced(&txn, &case, schema_fields).await?;

        txn.commit().await?;
        Ok(case)
    }

    /// Get a case, scoped to the actor's organization
    pub async fn get_case(
        &self,
        actor: &users::Model,
        case_id: Uuid,
    ) -> CaseResult<form_entries::Model> {
        let case = form_entries::Entity::find_by_id(case_id)
            .one(&self.db)
            .await?
            .ok_or(CaseError::NotFound(case_id))?;
        if !can_view(actor, &case) {
            // Cross-organization ids are indistinguishable from missing ones
            return Err(CaseError::NotFound(case_id));
        }
        Ok(case)
    }

    /// Merge a partial payload into an open case.
    ///
    /// Only the submitter (or an org admin) may edit, and only while the
    /// case is not completed. Attachment references in the patch are
    /// re-bound, displacing earlier files in the same slots.
    pub async fn update_payload(
        &self,
        actor: &users::Model,
        case_id: Uuid,
        patch: Value,
    ) -> CaseResult<CaseCreated> {
        let case = self.get_case(actor, case_id).await?;

        if case.is_completed {
            return Err(CaseError::Validation(
                "cannot modify a completed case".to_string(),
            ));
        }
        if case.submitter_id != actor.id && !is_admin(actor) {
            return Err(CaseError::Forbidden(
                "only the submitter may edit this case".to_string(),
            ));
        }

        let schema = form_schemas::Entity::find_by_id(case.schema_id)
            .one(&self.db)
            .await?
            .ok_or(CaseError::SchemaNotFound(case.schema_id))?;
        let schema_fields = parse_schema_fields(&schema)?;

        let patch_map = ValidationService::validate_payload_object(&patch)
            .map_err(|e| CaseError::Validation(e.to_string()))?;

        let mut merged = case.payload_map()?;
        for (key, value) in patch_map {
            merged.insert(key.clone(), value.clone());
        }
        let warnings = validate_payload(&schema_fields, &merged, false)?;
        let payload_json = serde_json::to_string(&merged)?;

        let txn = self.db.begin().await?;
        let mut active: form_entries::ActiveModel = case.into();
        active.payload = Set(payload_json);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        AttachmentService::bind_referenced(&txn, &updated, &schema_fields).await?;
        txn.commit().await?;

        Ok(CaseCreated {
            case: updated,
            warnings,
        })
    }

    /// Close the TAT window. Idempotent: completing a completed case
    /// returns it unchanged with the `already_completed` flag set.
    pub async fn mark_completed(
        &self,
        actor: &users::Model,
        case_id: Uuid,
    ) -> CaseResult<(form_entries::Model, bool)> {
        let case = self.get_case(actor, case_id).await?;
        if case.is_completed {
            return Ok((case, true));
        }
        if case.submitter_id != actor.id && !is_admin(actor) {
            return Err(CaseError::Forbidden(
                "only the submitter may complete this case".to_string(),
            ));
        }

        let schema = form_schemas::Entity::find_by_id(case.schema_id)
            .one(&self.db)
            .await?
            .ok_or(CaseError::SchemaNotFound(case.schema_id))?;
        let schema_fields = parse_schema_fields(&schema)?;
        let payload = case.payload_map()?;
        for field in schema_fields.iter().filter(|f| f.required) {
            match payload.get(&field.name) {
                Some(value) if !value.is_null() => {}
                _ => {
                    return Err(CaseError::Validation(format!(
                        "required field '{}' must be filled before completion",
                        field.name
                    )))
                }
            }
        }

        let mut active: form_entries::ActiveModel = case.into();
        active.is_completed = Set(true);
        active.completed_at = Set(Some(Utc::now()));
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.db).await?;

        info!(case_id = %case_id, "marked case completed");
        Ok((updated, false))
    }

    /// Record the verification verdict on a completed case
    pub async fn mark_verified(
        &self,
        actor: &users::Model,
        case_id: Uuid,
        notes: Option<String>,
    ) -> CaseResult<form_entries::Model> {
        if !is_admin(actor) {
            return Err(CaseError::Forbidden(
                "only admins may verify cases".to_string(),
            ));
        }

        let case = self.get_case(actor, case_id).await?;
        if !case.is_completed {
            return Err(CaseError::Validation(
                "only completed cases can be verified".to_string(),
            ));
        }
        if case.is_verified {
            return Ok(case);
        }

        let mut active: form_entries::ActiveModel = case.into();
        active.is_verified = Set(true);
        active.verifier_id = Set(Some(actor.id));
        active.verified_at = Set(Some(Utc::now()));
        if notes.is_some() {
            active.verification_notes = Set(notes);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.db).await?;

        info!(case_id = %case_id, verifier_id = actor.id, "marked case verified");
        Ok(updated)
    }

    /// Delete a case. Submitters may delete their own unverified cases;
    /// admins may delete any case in their organization.
    pub async fn delete_case(&self, actor: &users::Model, case_id: Uuid) -> CaseResult<()> {
        let case = self.get_case(actor, case_id).await?;

        let own_unverified = case.submitter_id == actor.id && !case.is_verified;
        if !own_unverified && !is_admin(actor) {
            return Err(CaseError::Forbidden(
                "cannot delete this case".to_string(),
            ));
        }

        form_entries::Entity::delete_by_id(case_id)
            .exec(&self.db)
            .await?;
        info!(case_id = %case_id, "deleted case");
        Ok(())
    }

    /// Aggregate counts for an organization's dashboard
    pub async fn statistics(&self, organization_id: i32) -> CaseResult<CaseStatistics> {
        let base = form_entries::Entity::find()
            .filter(form_entries::Column::OrganizationId.eq(organization_id));

        let total = base.clone().count(&self.db).await?;
        let completed = base
            .clone()
            .filter(form_entries::Column::IsCompleted.eq(true))
            .count(&self.db)
            .await?;
        let verified = base
            .clone()
            .filter(form_entries::Column::IsVerified.eq(true))
            .count(&self.db)
            .await?;

        let limits: HashMap<Uuid, i32> = form_schemas::Entity::find()
            .filter(form_schemas::Column::OrganizationId.eq(organization_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|s| (s.id, s.tat_hours_limit))
            .collect();

        let now = Utc::now();
        let mut out_of_tat = 0u64;
        let mut completion_hours = Vec::new();
        for entry in base.all(&self.db).await? {
            if let Some(hours) = tat::duration_hours(entry.started_at, entry.completed_at) {
                completion_hours.push(hours);
            }
            let Some(limit) = limits.get(&entry.schema_id) else {
                continue;
            };
            if tat::is_out_of_tat(entry.started_at, entry.completed_at, now, *limit) {
                out_of_tat += 1;
            }
        }
        let average_completion_hours = if completion_hours.is_empty() {
            None
        } else {
            Some(completion_hours.iter().sum::<f64>() / completion_hours.len() as f64)
        };

        Ok(CaseStatistics {
            total,
            pending: total - completed,
            completed,
            verified,
            out_of_tat,
            average_completion_hours,
        })
    }

    async fn load_schema(
        &self,
        actor: &users::Model,
        schema_id: Uuid,
    ) -> CaseResult<form_schemas::Model> {
        let schema = form_schemas::Entity::find_by_id(schema_id)
            .one(&self.db)
            .await?
            .ok_or(CaseError::SchemaNotFound(schema_id))?;
        let in_scope = actor.role() == UserRole::SuperAdmin
            || actor.organization_id == Some(schema.organization_id);
        if !in_scope {
            return Err(CaseError::SchemaNotFound(schema_id));
        }
        Ok(schema)
    }
}

fn is_admin(actor: &users::Model) -> bool {
    matches!(actor.role(), UserRole::Admin | UserRole::SuperAdmin)
}

fn can_view(actor: &users::Model, case: &form_entries::Model) -> bool {
    actor.role() == UserRole::SuperAdmin
        || actor.organization_id == Some(case.organization_id)
}

fn parse_schema_fields(schema: &form_schemas::Model) -> CaseResult<Vec<FieldDef>> {
    schema
        .fields()
        .map_err(|e| CaseError::Validation(format!("schema has invalid field definitions: {}", e)))
}

/// Check every payload entry against its declared field. Keys the schema
/// does not declare are advisory warnings, never errors; a real deployment
/// sees them whenever a schema gains fields after old clients cached it.
fn validate_payload(
    schema_fields: &[FieldDef],
    payload: &Map<String, Value>,
    enforce_required: bool,
) -> CaseResult<Vec<String>> {
    let mut warnings = Vec::new();

    for (key, value) in payload {
        match schema_fields.iter().find(|f| &f.name == key) {
            Some(field) => fields::validate_value(field, value)
                .map_err(CaseError::Validation)?,
            None => warnings.push(format!("field '{}' is not declared by the schema", key)),
        }
    }

    if enforce_required {
        for field in schema_fields.iter().filter(|f| f.required) {
            match payload.get(&field.name) {
                Some(value) if !value.is_null() => {}
                _ => {
                    return Err(CaseError::Validation(format!(
                        "field '{}' is required",
                        field.name
                    )))
                }
            }
        }
    }

    Ok(warnings)
}

fn is_case_number_conflict(err: &DbErr) -> bool {
    matches!(
        err.sql_err(),
        Some(SqlErr::UniqueConstraintViolation(message)) if message.contains("case_number")
    )
}

/// SQLite reports contention between concurrent write transactions as a
/// busy error, not a constraint violation; the allocation retry covers both.
fn is_transient_lock(err: &DbErr) -> bool {
    err.to_string().contains("database is locked")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::setup_test_db;
    use crate::fields::FieldType;
    use crate::services::schema_service::{NewSchema, SchemaService};
    use serde_json::json;

    async fn seed_org(db: &DatabaseConnection, name: &str) -> i32 {
        use crate::database::entities::organizations;
        organizations::ActiveModel {
            name: Set(name.to_string()),
            display_name: Set(name.to_string()),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
        .id
    }

    async fn seed_user(
        db: &DatabaseConnection,
        org_id: i32,
        role: &str,
    ) -> users::Model {
        users::ActiveModel {
            email: Set(format!("{}-{}@test.test", role.to_lowercase(), Uuid::new_v4())),
            first_name: Set("Test".to_string()),
            last_name: Set(role.to_string()),
            role: Set(role.to_string()),
            organization_id: Set(Some(org_id)),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    fn field(name: &str, field_type: FieldType, required: bool) -> FieldDef {
        FieldDef {
            name: name.to_string(),
            display_name: name.to_string(),
            field_type,
            validation_rules: Default::default(),
            required,
            unique: false,
            default_value: None,
            help_text: None,
            order: 0,
        }
    }

    async fn seed_schema(db: &DatabaseConnection, org_id: i32) -> form_schemas::Model {
        SchemaService::new(db.clone())
            .create_schema(
                org_id,
                None,
                NewSchema {
                    name: "KYC".to_string(),
                    description: None,
                    fields: vec![
                        field("applicant_name", FieldType::String, true),
                        field("amount", FieldType::Numeric, false),
                    ],
                    tat_hours_limit: Some(24),
                },
            )
            .await
            .unwrap()
    }

    #[test]
    fn test_conflict_detection_requires_unique_violation() {
        // An unrelated error that happens to mention the column is not an
        // allocation conflict and must not be retried as one.
        let err = DbErr::Custom("NOT NULL constraint failed: form_entries.case_number".to_string());
        assert!(!is_case_number_conflict(&err));
        assert!(!is_transient_lock(&err));
    }

    #[tokio::test]
    async fn test_create_allocates_sequential_numbers() {
        let db = setup_test_db().await.unwrap();
        let org_id = seed_org(&db, "acme").await;
        let user = seed_user(&db, org_id, "EMPLOYEE").await;
        let schema = seed_schema(&db, org_id).await;
        let service = CaseService::new(db);

        let first = service
            .create_case(
                &user,
                NewCase {
                    schema_id: schema.id,
                    payload: json!({"applicant_name": "Asha"}),
                    case_number: None,
                },
            )
            .await
            .unwrap();
        let second = service
            .create_case(
                &user,
                NewCase {
                    schema_id: schema.id,
                    payload: json!({"applicant_name": "Ravi"}),
                    case_number: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(first.case.case_number, Some(1));
        assert_eq!(second.case.case_number, Some(2));
        assert!(first.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_payload_key_is_a_warning() {
        let db = setup_test_db().await.unwrap();
        let org_id = seed_org(&db, "acme").await;
        let user = seed_user(&db, org_id, "EMPLOYEE").await;
        let schema = seed_schema(&db, org_id).await;
        let service = CaseService::new(db);

        let created = service
            .create_case(
                &user,
                NewCase {
                    schema_id: schema.id,
                    payload: json!({"applicant_name": "Asha", "nickname": "A"}),
                    case_number: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(created.warnings.len(), 1);
        assert!(created.warnings[0].contains("nickname"));
    }

    #[tokio::test]
    async fn test_missing_required_field_rejected() {
        let db = setup_test_db().await.unwrap();
        let org_id = seed_org(&db, "acme").await;
        let user = seed_user(&db, org_id, "EMPLOYEE").await;
        let schema = seed_schema(&db, org_id).await;
        let service = CaseService::new(db);

        let err = service
            .create_case(
                &user,
                NewCase {
                    schema_id: schema.id,
                    payload: json!({"amount": 10}),
                    case_number: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CaseError::Validation(_)));
    }

    #[tokio::test]
    async fn test_explicit_number_conflict() {
        let db = setup_test_db().await.unwrap();
        let org_id = seed_org(&db, "acme").await;
        let user = seed_user(&db, org_id, "ADMIN").await;
        let schema = seed_schema(&db, org_id).await;
        let service = CaseService::new(db);

        service
            .create_case(
                &user,
                NewCase {
                    schema_id: schema.id,
                    payload: json!({"applicant_name": "Asha"}),
                    case_number: Some(7),
                },
            )
            .await
            .unwrap();
        let err = service
            .create_case(
                &user,
                NewCase {
                    schema_id: schema.id,
                    payload: json!({"applicant_name": "Ravi"}),
                    case_number: Some(7),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CaseError::NumberConflict { number: 7, .. }));
    }

    #[tokio::test]
    async fn test_inactive_schema_rejected() {
        let db = setup_test_db().await.unwrap();
        let org_id = seed_org(&db, "acme").await;
        let user = seed_user(&db, org_id, "EMPLOYEE").await;
        let schema = seed_schema(&db, org_id).await;
        SchemaService::new(db.clone())
            .deactivate_schema(schema.id)
            .await
            .unwrap();
        let service = CaseService::new(db);

        let err = service
            .create_case(
                &user,
                NewCase {
                    schema_id: schema.id,
                    payload: json!({"applicant_name": "Asha"}),
                    case_number: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CaseError::SchemaInactive(_)));
    }

    #[tokio::test]
    async fn test_cross_org_case_reads_as_not_found() {
        let db = setup_test_db().await.unwrap();
        let org_a = seed_org(&db, "acme").await;
        let org_b = seed_org(&db, "globex").await;
        let user_a = seed_user(&db, org_a, "EMPLOYEE").await;
        let user_b = seed_user(&db, org_b, "ADMIN").await;
        let schema = seed_schema(&db, org_a).await;
        let service = CaseService::new(db);

        let created = service
            .create_case(
                &user_a,
                NewCase {
                    schema_id: schema.id,
                    payload: json!({"applicant_name": "Asha"}),
                    case_number: None,
                },
            )
            .await
            .unwrap();

        let err = service.get_case(&user_b, created.case.id).await.unwrap_err();
        assert!(matches!(err, CaseError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_complete_is_idempotent() {
        let db = setup_test_db().await.unwrap();
        let org_id = seed_org(&db, "acme").await;
        let user = seed_user(&db, org_id, "EMPLOYEE").await;
        let schema = seed_schema(&db, org_id).await;
        let service = CaseService::new(db);

        let created = service
            .create_case(
                &user,
                NewCase {
                    schema_id: schema.id,
                    payload: json!({"applicant_name": "Asha"}),
                    case_number: None,
                },
            )
            .await
            .unwrap();

        let (completed, already) = service.mark_completed(&user, created.case.id).await.unwrap();
        assert!(!already);
        assert!(completed.is_completed);
        let first_completed_at = completed.completed_at;

        let (again, already) = service.mark_completed(&user, created.case.id).await.unwrap();
        assert!(already);
        assert_eq!(again.completed_at, first_completed_at);
    }

    #[tokio::test]
    async fn test_verify_requires_admin_and_completion() {
        let db = setup_test_db().await.unwrap();
        let org_id = seed_org(&db, "acme").await;
        let employee = seed_user(&db, org_id, "EMPLOYEE").await;
        let admin = seed_user(&db, org_id, "ADMIN").await;
        let schema = seed_schema(&db, org_id).await;
        let service = CaseService::new(db);

        let created = service
            .create_case(
                &employee,
                NewCase {
                    schema_id: schema.id,
                    payload: json!({"applicant_name": "Asha"}),
                    case_number: None,
                },
            )
            .await
            .unwrap();

        let err = service
            .mark_verified(&employee, created.case.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CaseError::Forbidden(_)));

        let err = service
            .mark_verified(&admin, created.case.id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CaseError::Validation(_)));

        service.mark_completed(&employee, created.case.id).await.unwrap();
        let verified = service
            .mark_verified(&admin, created.case.id, Some("checked".to_string()))
            .await
            .unwrap();
        assert!(verified.is_verified);
        assert_eq!(verified.verifier_id, Some(admin.id));
        assert!(verified.verified_at.is_some());
        assert_eq!(verified.verification_notes.as_deref(), Some("checked"));
    }

    #[tokio::test]
    async fn test_delete_own_unverified_only() {
        let db = setup_test_db().await.unwrap();
        let org_id = seed_org(&db, "acme").await;
        let employee = seed_user(&db, org_id, "EMPLOYEE").await;
        let other = seed_user(&db, org_id, "EMPLOYEE").await;
        let admin = seed_user(&db, org_id, "ADMIN").await;
        let schema = seed_schema(&db, org_id).await;
        let service = CaseService::new(db);

        let created = service
            .create_case(
                &employee,
                NewCase {
                    schema_id: schema.id,
                    payload: json!({"applicant_name": "Asha"}),
                    case_number: None,
                },
            )
            .await
            .unwrap();

        let err = service.delete_case(&other, created.case.id).await.unwrap_err();
        assert!(matches!(err, CaseError::Forbidden(_)));

        service.delete_case(&employee, created.case.id).await.unwrap();

        // Admins can delete cases they did not submit
        let second = service
            .create_case(
                &employee,
                NewCase {
                    schema_id: schema.id,
                    payload: json!({"applicant_name": "Ravi"}),
                    case_number: None,
                },
            )
            .await
            .unwrap();
        service.delete_case(&admin, second.case.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_statistics_counts() {
        let db = setup_test_db().await.unwrap();
        let org_id = seed_org(&db, "acme").await;
        let user = seed_user(&db, org_id, "ADMIN").await;
        let schema = seed_schema(&db, org_id).await;
        let service = CaseService::new(db);

        for name in ["a", "b", "c"] {
            let created = service
                .create_case(
                    &user,
                    NewCase {
                        schema_id: schema.id,
                        payload: json!({"applicant_name": name}),
                        case_number: None,
                    },
                )
                .await
                .unwrap();
            if name != "a" {
                service.mark_completed(&user, created.case.id).await.unwrap();
            }
            if name == "c" {
                service.mark_verified(&user, created.case.id, None).await.unwrap();
            }
        }

        let stats = service.statistics(org_id).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.verified, 1);
        assert_eq!(stats.out_of_tat, 0);
        // Two completed cases, both near-instant
        let average = stats.average_completion_hours.unwrap();
        assert!(average >= 0.0 && average < 1.0);
    }

    #[tokio::test]
    async fn test_update_payload_merges_and_locks_after_completion() {
        let db = setup_test_db().await.unwrap();
        let org_id = seed_org(&db, "acme").await;
        let user = seed_user(&db, org_id, "EMPLOYEE").await;
        let schema = seed_schema(&db, org_id).await;
        let service = CaseService::new(db);

        let created = service
            .create_case(
                &user,
                NewCase {
                    schema_id: schema.id,
                    payload: json!({"applicant_name": "Asha"}),
                    case_number: None,
                },
            )
            .await
            .unwrap();

        let updated = service
            .update_payload(&user, created.case.id, json!({"amount": 250}))
            .await
            .unwrap();
        let payload = updated.case.payload_map().unwrap();
        assert_eq!(payload.get("applicant_name"), Some(&json!("Asha")));
        assert_eq!(payload.get("amount"), Some(&json!(250)));

        service.mark_completed(&user, created.case.id).await.unwrap();
        let err = service
            .update_payload(&user, created.case.id, json!({"amount": 300}))
            .await
            .unwrap_err();
        assert!(matches!(err, CaseError::Validation(_)));
    }
}
