use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "organizations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub display_name: String,
    pub is_active: bool,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::users::Entity")]
    Users,
    #[sea_orm(has_many = "super::form_schemas::Entity")]
    FormSchemas,
    #[sea_orm(has_many = "super::form_entries::Entity")]
    FormEntries,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::form_schemas::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FormSchemas.def()
    }
}

impl Related<super::form_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FormEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
