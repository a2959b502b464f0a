use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "form_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Human-facing per-organization sequence value. Null only for legacy
    /// rows written before the allocator existed; backfilled on read.
    pub case_number: Option<i64>,
    pub organization_id: i32,
    pub schema_id: Uuid,
    pub submitter_id: i32,
    /// String-keyed JSON object of submitted values
    #[sea_orm(column_type = "Text")]
    pub payload: String,
    pub is_completed: bool,
    pub is_verified: bool,
    pub verification_notes: Option<String>,
    pub verifier_id: Option<i32>,
    pub verified_at: Option<ChronoDateTimeUtc>,
    pub started_at: ChronoDateTimeUtc,
    pub completed_at: Option<ChronoDateTimeUtc>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

impl Model {
    pub fn payload_map(&self) -> Result<Map<String, Value>, serde_json::Error> {
        if self.payload.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&self.payload)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::organizations::Entity",
        from = "Column::OrganizationId",
        to = "super::organizations::Column::Id"
    )]
    Organization,
    #[sea_orm(
        belongs_to = "super::form_schemas::Entity",
        from = "Column::SchemaId",
        to = "super::form_schemas::Column::Id"
    )]
    FormSchema,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::SubmitterId",
        to = "super::users::Column::Id"
    )]
    Submitter,
    #[sea_orm(has_many = "super::attachments::Entity")]
    Attachments,
}

impl Related<super::organizations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl Related<super::form_schemas::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FormSchema.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Submitter.def()
    }
}

impl Related<super::attachments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
