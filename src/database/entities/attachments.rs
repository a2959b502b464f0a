use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attachments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Null while the attachment is temporary (not yet bound to a case)
    pub case_id: Option<Uuid>,
    pub field_name: String,
    /// Opaque blob-store key
    pub blob_ref: String,
    pub original_filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploader_id: i32,
    pub is_temporary: bool,
    pub is_verified: bool,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::form_entries::Entity",
        from = "Column::CaseId",
        to = "super::form_entries::Column::Id"
    )]
    FormEntry,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UploaderId",
        to = "super::users::Column::Id"
    )]
    Uploader,
}

impl Related<super::form_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FormEntry.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Uploader.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
