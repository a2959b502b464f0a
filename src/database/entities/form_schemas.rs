use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::fields::{self, FieldDef};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "form_schemas")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: i32,
    pub name: String,
    pub description: Option<String>,
    /// Ordered JSON array of field definitions; see `crate::fields`
    #[sea_orm(column_type = "Text")]
    pub fields_definition: String,
    pub tat_hours_limit: i32,
    pub max_fields: i32,
    pub is_active: bool,
    pub created_by: Option<i32>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

impl Model {
    pub fn fields(&self) -> Result<Vec<FieldDef>, serde_json::Error> {
        fields::parse_fields(&self.fields_definition)
    }

    pub fn fields_count(&self) -> usize {
        self.fields().map(|f| f.len()).unwrap_or(0)
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
    #[sea_orm(has_many = "super::form_entries::Entity")]
    FormEntries,
}

impl Related<super::organizations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl Related<super::form_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FormEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
