use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create organizations table
        manager
            .create_table(
                Table::create()
                    .table(Organizations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Organizations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Organizations::Name).string().not_null())
                    .col(
                        ColumnDef::new(Organizations::DisplayName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Organizations::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Organizations::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Organizations::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::FirstName).string().not_null())
                    .col(ColumnDef::new(Users::LastName).string().not_null())
                    .col(
                        ColumnDef::new(Users::Role)
                            .string()
                            .not_null()
                            .default("EMPLOYEE"),
                    )
                    .col(ColumnDef::new(Users::OrganizationId).integer())
                    .col(
                        ColumnDef::new(Users::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Users::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_organization_id")
                            .from(Users::Table, Users::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Create form_schemas table
        manager
            .create_table(
                Table::create()
                    .table(FormSchemas::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FormSchemas::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FormSchemas::OrganizationId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FormSchemas::Name).string().not_null())
                    .col(ColumnDef::new(FormSchemas::Description).string())
                    .col(
                        ColumnDef::new(FormSchemas::FieldsDefinition)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(FormSchemas::TatHoursLimit)
                            .integer()
                            .not_null()
                            .default(24),
                    )
                    .col(
                        ColumnDef::new(FormSchemas::MaxFields)
                            .integer()
                            .not_null()
                            .default(120),
                    )
                    .col(
                        ColumnDef::new(FormSchemas::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(FormSchemas::CreatedBy).integer())
                    .col(
                        ColumnDef::new(FormSchemas::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FormSchemas::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_form_schemas_organization_id")
                            .from(FormSchemas::Table, FormSchemas::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_form_schemas_created_by")
                            .from(FormSchemas::Table, FormSchemas::CreatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .index(
                        Index::create()
                            .name("idx_form_schemas_org_name")
                            .col(FormSchemas::OrganizationId)
                            .col(FormSchemas::Name)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_form_schemas_org_active")
                    .table(FormSchemas::Table)
                    .col(FormSchemas::OrganizationId)
                    .col(FormSchemas::IsActive)
                    .to_owned(),
            )
            .await?;

        // Create form_entries table
        manager
            .create_table(
                Table::create()
                    .table(FormEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FormEntries::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FormEntries::CaseNumber).big_integer())
                    .col(
                        ColumnDef::new(FormEntries::OrganizationId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FormEntries::SchemaId).uuid().not_null())
                    .col(
                        ColumnDef::new(FormEntries::SubmitterId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FormEntries::Payload)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .col(
                        ColumnDef::new(FormEntries::IsCompleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(FormEntries::IsVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(FormEntries::VerificationNotes).text())
                    .col(ColumnDef::new(FormEntries::VerifierId).integer())
                    .col(ColumnDef::new(FormEntries::VerifiedAt).timestamp())
                    .col(
                        ColumnDef::new(FormEntries::StartedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FormEntries::CompletedAt).timestamp())
                    .col(
                        ColumnDef::new(FormEntries::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FormEntries::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_form_entries_organization_id")
                            .from(FormEntries::Table, FormEntries::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_form_entries_schema_id")
                            .from(FormEntries::Table, FormEntries::SchemaId)
                            .to(FormSchemas::Table, FormSchemas::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_form_entries_submitter_id")
                            .from(FormEntries::Table, FormEntries::SubmitterId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .index(
                        Index::create()
                            .name("idx_form_entries_org_case_number")
                            .col(FormEntries::OrganizationId)
                            .col(FormEntries::CaseNumber)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_form_entries_org_submitter")
                    .table(FormEntries::Table)
                    .col(FormEntries::OrganizationId)
                    .col(FormEntries::SubmitterId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_form_entries_schema_id")
                    .table(FormEntries::Table)
                    .col(FormEntries::SchemaId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_form_entries_is_completed")
                    .table(FormEntries::Table)
                    .col(FormEntries::IsCompleted)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_form_entries_created_at")
                    .table(FormEntries::Table)
                    .col(FormEntries::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Create attachments table
        manager
            .create_table(
                Table::create()
                    .table(Attachments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Attachments::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Attachments::CaseId).uuid())
                    .col(ColumnDef::new(Attachments::FieldName).string().not_null())
                    .col(ColumnDef::new(Attachments::BlobRef).string().not_null())
                    .col(
                        ColumnDef::new(Attachments::OriginalFilename)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Attachments::ContentType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Attachments::SizeBytes)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Attachments::UploaderId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Attachments::IsTemporary)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Attachments::IsVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Attachments::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Attachments::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attachments_case_id")
                            .from(Attachments::Table, Attachments::CaseId)
                            .to(FormEntries::Table, FormEntries::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attachments_uploader_id")
                            .from(Attachments::Table, Attachments::UploaderId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The (case_id, field_name) slot is unique only for permanent
        // attachments; sea-query has no portable partial-index builder,
        // so this one is raw SQL.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_attachments_case_field \
                 ON attachments (case_id, field_name) WHERE is_temporary = 0",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Attachments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FormEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FormSchemas::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Organizations::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Iden)]
enum Organizations {
    Table,
    Id,
    Name,
    DisplayName,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Email,
    FirstName,
    LastName,
    Role,
    OrganizationId,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum FormSchemas {
    Table,
    Id,
    OrganizationId,
    Name,
    Description,
    FieldsDefinition,
    TatHoursLimit,
    MaxFields,
    IsActive,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum FormEntries {
    Table,
    Id,
    CaseNumber,
    OrganizationId,
    SchemaId,
    SubmitterId,
    Payload,
    IsCompleted,
    IsVerified,
    VerificationNotes,
    VerifierId,
    VerifiedAt,
    StartedAt,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Attachments {
    Table,
    Id,
    CaseId,
    FieldName,
    BlobRef,
    OriginalFilename,
    ContentType,
    SizeBytes,
    UploaderId,
    IsTemporary,
    IsVerified,
    CreatedAt,
    UpdatedAt,
}
