use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Capability tier the core needs to know: who may write vs. only read,
/// and whether the caller's view spans all organizations.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    SuperAdmin,
    Admin,
    Employee,
}

impl UserRole {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SUPER_ADMIN" => Some(UserRole::SuperAdmin),
            "ADMIN" => Some(UserRole::Admin),
            "EMPLOYEE" => Some(UserRole::Employee),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub organization_id: Option<i32>,
    pub is_active: bool,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

impl Model {
    pub fn role(&self) -> UserRole {
        UserRole::parse(&self.role).unwrap_or(UserRole::Employee)
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
