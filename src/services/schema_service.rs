use std::collections::HashSet;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::database::entities::form_schemas;
use crate::errors::{SchemaError, SchemaResult};
use crate::fields::{self, FieldDef};
use crate::services::ValidationService;

/// Default cap on the number of fields a schema may declare.
pub const DEFAULT_MAX_FIELDS: i32 = 120;

/// Default turnaround-time limit for new schemas, in hours.
pub const DEFAULT_TAT_HOURS: i32 = 24;

#[derive(Debug, Clone, Deserialize)]
pub struct NewSchema {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub tat_hours_limit: Option<i32>,
}

/// Partial update. Fields may only be reordered; any other change to the
/// field set is rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tat_hours_limit: Option<i32>,
    pub is_active: Option<bool>,
    pub fields: Option<Vec<FieldDef>>,
}

#[derive(Clone)]
pub struct SchemaService {
    db: DatabaseConnection,
}

impl SchemaService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a schema for an organization
    pub async fn create_schema(
        &self,
        organization_id: i32,
        created_by: Option<i32>,
        new_schema: NewSchema,
    ) -> SchemaResult<form_schemas::Model> {
        let name = ValidationService::validate_schema_name(&new_schema.name)
            .map_err(|e| SchemaError::Validation(e.to_string()))?;

        let description = match &new_schema.description {
            Some(desc) => Some(
                ValidationService::validate_description(desc)
                    .map_err(|e| SchemaError::Validation(e.to_string()))?,
            ),
            None => None,
        };

        let tat_hours_limit = ValidationService::validate_tat_hours_limit(
            new_schema.tat_hours_limit.unwrap_or(DEFAULT_TAT_HOURS),
        )
        .map_err(|e| SchemaError::Validation(e.to_string()))?;

        ValidationService::validate_field_definitions(&new_schema.fields, DEFAULT_MAX_FIELDS)
            .map_err(|e| SchemaError::Validation(e.to_string()))?;

        let txn = self.db.begin().await?;

        let existing = form_schemas::Entity::find()
            .filter(form_schemas::Column::OrganizationId.eq(organization_id))
            .filter(form_schemas::Column::Name.eq(name.clone()))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(SchemaError::DuplicateName {
                organization_id,
                name,
            });
        }

        let schema = form_schemas::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(organization_id),
            name: Set(name),
            description: Set(description),
            fields_definition: Set(fields::fields_to_json(&new_schema.fields)?),
            tat_hours_limit: Set(tat_hours_limit),
            max_fields: Set(DEFAULT_MAX_FIELDS),
            is_active: Set(true),
            created_by: Set(created_by),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(schema_id = %schema.id, organization_id, "created form schema");
        Ok(schema)
    }

    /// Get a schema by id
    pub async fn get_schema(&self, schema_id: Uuid) -> SchemaResult<form_schemas::Model> {
        form_schemas::Entity::find_by_id(schema_id)
            .one(&self.db)
            .await?
            .ok_or(SchemaError::NotFound(schema_id))
    }

    /// List schemas for an organization, newest first
    pub async fn list_schemas(
        &self,
        organization_id: i32,
        include_inactive: bool,
    ) -> SchemaResult<Vec<form_schemas::Model>> {
        let mut query = form_schemas::Entity::find()
            .filter(form_schemas::Column::OrganizationId.eq(organization_id));

        if !include_inactive {
            query = query.filter(form_schemas::Column::IsActive.eq(true));
        }

        Ok(query
            .order_by_desc(form_schemas::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Apply a partial update.
    ///
    /// When `fields` is present the whole list must be a pure reorder of
    /// the stored one; adding, removing, or mutating a field raises
    /// `ImmutableFieldViolation` naming every offender.
    pub async fn update_schema(
        &self,
        schema_id: Uuid,
        update: SchemaUpdate,
    ) -> SchemaResult<form_schemas::Model> {
        let txn = self.db.begin().await?;

        let schema = form_schemas::Entity::find_by_id(schema_id)
            .one(&txn)
            .await?
            .ok_or(SchemaError::NotFound(schema_id))?;

        let mut active: form_schemas::ActiveModel = schema.clone().into();

        if let Some(name) = &update.name {
            let name = ValidationService::validate_schema_name(name)
                .map_err(|e| SchemaError::Validation(e.to_string()))?;
            if name != schema.name {
                let clash = form_schemas::Entity::find()
                    .filter(form_schemas::Column::OrganizationId.eq(schema.organization_id))
                    .filter(form_schemas::Column::Name.eq(name.clone()))
                    .filter(form_schemas::Column::Id.ne(schema_id))
                    .one(&txn)
                    .await?;
                if clash.is_some() {
                    return Err(SchemaError::DuplicateName {
                        organization_id: schema.organization_id,
                        name,
                    });
                }
            }
            active.name = Set(name);
        }

        if let Some(description) = &update.description {
            let description = ValidationService::validate_description(description)
                .map_err(|e| SchemaError::Validation(e.to_string()))?;
            active.description = Set(Some(description));
        }

        if let Some(hours) = update.tat_hours_limit {
            let hours = ValidationService::validate_tat_hours_limit(hours)
                .map_err(|e| SchemaError::Validation(e.to_string()))?;
            active.tat_hours_limit = Set(hours);
        }

        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }

        if let Some(proposed) = &update.fields {
            let current = schema.fields()?;
            let offending = fields::immutable_field_diff(&current, proposed);
            if !offending.is_empty() {
                return Err(SchemaError::ImmutableFieldViolation { fields: offending });
            }
            ValidationService::validate_field_definitions(proposed, schema.max_fields)
                .map_err(|e| SchemaError::Validation(e.to_string()))?;
            active.fields_definition = Set(fields::fields_to_json(proposed)?);
        }

        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        Ok(updated)
    }

    /// Soft-delete: cases submitted against the schema remain readable
    pub async fn deactivate_schema(&self, schema_id: Uuid) -> SchemaResult<form_schemas::Model> {
        let schema = self.get_schema(schema_id).await?;
        let mut active: form_schemas::ActiveModel = schema.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.db).await?;
        info!(schema_id = %schema_id, "deactivated form schema");
        Ok(updated)
    }

    /// Lowercased names of every field declared by the organization's
    /// active schemas. Filter keys outside this set draw a warning.
    pub async fn visible_field_names(&self, organization_id: i32) -> SchemaResult<HashSet<String>> {
        let schemas = self.list_schemas(organization_id, false).await?;
        let mut names = HashSet::new();
        for schema in &schemas {
            names.extend(fields::field_name_set(&schema.fields()?));
        }
        Ok(names)
    }
}
