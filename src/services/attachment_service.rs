use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::entities::{attachments, form_entries};
use crate::errors::{AttachmentError, AttachmentResult};
use crate::fields::FieldDef;
use crate::services::{BlobStore, ValidationService};

/// Uploads land temporary and detached; case submission re-binds them to a
/// permanent (case, field) slot. A partial unique index enforces one
/// permanent attachment per slot.
#[derive(Clone)]
pub struct AttachmentService {
    db: DatabaseConnection,
    store: Arc<dyn BlobStore>,
}

impl AttachmentService {
    pub fn new(db: DatabaseConnection, store: Arc<dyn BlobStore>) -> Self {
        Self { db, store }
    }

    /// Store the bytes and record a temporary attachment
    pub async fn upload(
        &self,
        uploader_id: i32,
        field_name: &str,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> AttachmentResult<attachments::Model> {
        let filename = ValidationService::validate_filename(filename)
            .map_err(|e| AttachmentError::Validation(e.to_string()))?;
        let field_name = ValidationService::validate_field_name(field_name)
            .map_err(|e| AttachmentError::Validation(e.to_string()))?;

        if bytes.is_empty() {
            return Err(AttachmentError::Validation("file is empty".to_string()));
        }

        let blob_ref = self.store.put(&filename, bytes).await?;

        let attachment = attachments::ActiveModel {
            id: Set(Uuid::new_v4()),
            case_id: Set(None),
            field_name: Set(field_name),
            blob_ref: Set(blob_ref),
            original_filename: Set(filename),
            content_type: Set(content_type.to_string()),
            size_bytes: Set(bytes.len() as i64),
            uploader_id: Set(uploader_id),
            is_temporary: Set(true),
            is_verified: Set(false),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;

        info!(attachment_id = %attachment.id, uploader_id, "uploaded temporary attachment");
        Ok(attachment)
    }

    pub async fn get_attachment(&self, attachment_id: Uuid) -> AttachmentResult<attachments::Model> {
        attachments::Entity::find_by_id(attachment_id)
            .one(&self.db)
            .await?
            .ok_or(AttachmentError::NotFound(attachment_id))
    }

    /// Fetch metadata plus the stored bytes
    pub async fn download(&self, attachment_id: Uuid) -> AttachmentResult<(attachments::Model, Vec<u8>)> {
        let attachment = self.get_attachment(attachment_id).await?;
        let bytes = self.store.get(&attachment.blob_ref).await?;
        Ok((attachment, bytes))
    }

    pub async fn list_for_case(&self, case_id: Uuid) -> AttachmentResult<Vec<attachments::Model>> {
        Ok(attachments::Entity::find()
            .filter(attachments::Column::CaseId.eq(case_id))
            .filter(attachments::Column::IsTemporary.eq(false))
            .all(&self.db)
            .await?)
    }

    /// Permanently bind a temporary attachment to a case field slot.
    ///
    /// Fails with `DuplicateBinding` when the slot is taken and
    /// `NotBindable` when the attachment is already permanent.
    pub async fn bind<C: ConnectionTrait>(
        conn: &C,
        attachment_id: Uuid,
        case_id: Uuid,
        field_name: &str,
    ) -> AttachmentResult<attachments::Model> {
        let attachment = attachments::Entity::find_by_id(attachment_id)
            .one(conn)
            .await?
            .ok_or(AttachmentError::NotFound(attachment_id))?;

        if !attachment.is_temporary {
            return Err(AttachmentError::NotBindable(attachment_id));
        }

        let occupied = attachments::Entity::find()
            .filter(attachments::Column::CaseId.eq(case_id))
            .filter(attachments::Column::FieldName.eq(field_name))
            .filter(attachments::Column::IsTemporary.eq(false))
            .one(conn)
            .await?;
        if occupied.is_some() {
            return Err(AttachmentError::DuplicateBinding {
                case_id,
                field_name: field_name.to_string(),
            });
        }

        Self::make_permanent(conn, attachment, case_id, field_name).await
    }

    /// Bind like [`Self::bind`], but displace any attachment already holding the
    /// slot. The displaced one reverts to temporary so it stays reachable
    /// until cleanup.
    pub async fn bind_replacing<C: ConnectionTrait>(
        conn: &C,
        attachment_id: Uuid,
        case_id: Uuid,
        field_name: &str,
    ) -> AttachmentResult<attachments::Model> {
        let attachment = attachments::Entity::find_by_id(attachment_id)
            .one(conn)
            .await?
            .ok_or(AttachmentError::NotFound(attachment_id))?;

        if !attachment.is_temporary {
            // Re-binding the already-bound attachment to its own slot is a no-op
            if attachment.case_id == Some(case_id) && attachment.field_name == field_name {
                return Ok(attachment);
            }
            return Err(AttachmentError::NotBindable(attachment_id));
        }

        let occupied = attachments::Entity::find()
            .filter(attachments::Column::CaseId.eq(case_id))
            .filter(attachments::Column::FieldName.eq(field_name))
            .filter(attachments::Column::IsTemporary.eq(false))
            .one(conn)
            .await?;
        if let Some(previous) = occupied {
            debug!(attachment_id = %previous.id, case_id = %case_id, field_name, "displacing bound attachment");
            let mut active: attachments::ActiveModel = previous.into();
            active.case_id = Set(None);
            active.is_temporary = Set(true);
            active.updated_at = Set(Utc::now());
            active.update(conn).await?;
        }

        Self::make_permanent(conn, attachment, case_id, field_name).await
    }

    /// Revert a bound attachment to the temporary, detached state
    pub async fn unbind(&self, attachment_id: Uuid) -> AttachmentResult<attachments::Model> {
        let attachment = self.get_attachment(attachment_id).await?;
        if attachment.is_temporary {
            return Ok(attachment);
        }
        let mut active: attachments::ActiveModel = attachment.into();
        active.case_id = Set(None);
        active.is_temporary = Set(true);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.db).await?;
        info!(attachment_id = %attachment_id, "unbound attachment");
        Ok(updated)
    }

    /// Delete the row and its stored bytes. Bound attachments must be
    /// unbound first.
    pub async fn delete(&self, attachment_id: Uuid) -> AttachmentResult<()> {
        let attachment = self.get_attachment(attachment_id).await?;
        if !attachment.is_temporary {
            return Err(AttachmentError::NotBindable(attachment_id));
        }
        attachments::Entity::delete_by_id(attachment_id)
            .exec(&self.db)
            .await?;
        self.store.delete(&attachment.blob_ref).await?;
        Ok(())
    }

    /// Walk a case payload's upload fields and bind every attachment id
    /// they reference. Values that are not UUID-shaped (e.g. already
    /// resolved URLs) are skipped. Returns the number of bindings made.
    pub async fn bind_referenced<C: ConnectionTrait>(
        conn: &C,
        case: &form_entries::Model,
        fields: &[FieldDef],
    ) -> AttachmentResult<usize> {
        let payload = case
            .payload_map()
            .map_err(|e| AttachmentError::Validation(format!("invalid payload JSON: {}", e)))?;

        let mut bound = 0;
        for field in fields.iter().filter(|f| f.field_type.is_upload()) {
            let Some(value) = payload.get(&field.name) else {
                continue;
            };
            let Some(text) = value.as_str() else {
                continue;
            };
            let Ok(attachment_id) = Uuid::parse_str(text) else {
                continue;
            };
            Self::bind_replacing(conn, attachment_id, case.id, &field.name).await?;
            bound += 1;
        }
        Ok(bound)
    }

    async fn make_permanent<C: ConnectionTrait>(
        conn: &C,
        attachment: attachments::Model,
        case_id: Uuid,
        field_name: &str,
    ) -> AttachmentResult<attachments::Model> {
        let attachment_id = attachment.id;
        let mut active: attachments::ActiveModel = attachment.into();
        active.case_id = Set(Some(case_id));
        active.field_name = Set(field_name.to_string());
        active.is_temporary = Set(false);
        active.updated_at = Set(Utc::now());
        let updated = active.update(conn).await?;
        debug!(attachment_id = %attachment_id, case_id = %case_id, field_name, "bound attachment");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::setup_test_db;
    use crate::services::LocalBlobStore;

    use crate::database::entities::{form_schemas, organizations, users};

    async fn seed(db: &DatabaseConnection) -> (i32, Uuid) {
        let org = organizations::ActiveModel {
            name: Set("acme".to_string()),
            display_name: Set("Acme".to_string()),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();

        let user = users::ActiveModel {
            email: Set("uploader@acme.test".to_string()),
            first_name: Set("Up".to_string()),
            last_name: Set("Loader".to_string()),
            role: Set("EMPLOYEE".to_string()),
            organization_id: Set(Some(org.id)),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();

        let schema = form_schemas::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(org.id),
            name: Set("KYC".to_string()),
            description: Set(None),
            fields_definition: Set("[]".to_string()),
            tat_hours_limit: Set(24),
            max_fields: Set(120),
            is_active: Set(true),
            created_by: Set(Some(user.id)),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .unwrap();

        let case = form_entries::ActiveModel {
            id: Set(Uuid::new_v4()),
            case_number: Set(Some(1)),
            organization_id: Set(org.id),
            schema_id: Set(schema.id),
            submitter_id: Set(user.id),
            payload: Set("{}".to_string()),
            is_completed: Set(false),
            is_verified: Set(false),
            verification_notes: Set(None),
            verifier_id: Set(None),
            verified_at: Set(None),
            started_at: Set(Utc::now()),
            completed_at: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .unwrap();

        (user.id, case.id)
    }

    fn service(db: &DatabaseConnection, dir: &tempfile::TempDir) -> AttachmentService {
        AttachmentService::new(db.clone(), Arc::new(LocalBlobStore::new(dir.path())))
    }

    #[tokio::test]
    async fn test_upload_is_temporary() {
        let db = setup_test_db().await.unwrap();
        let (user_id, _) = seed(&db).await;
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&db, &dir);

        let attachment = svc
            .upload(user_id, "photo", "me.jpg", "image/jpeg", b"jpegdata")
            .await
            .unwrap();
        assert!(attachment.is_temporary);
        assert!(attachment.case_id.is_none());
        assert_eq!(attachment.size_bytes, 8);

        let (_, bytes) = svc.download(attachment.id).await.unwrap();
        assert_eq!(bytes, b"jpegdata");
    }

    #[tokio::test]
    async fn test_empty_upload_rejected() {
        let db = setup_test_db().await.unwrap();
        let (user_id, _) = seed(&db).await;
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&db, &dir);

        let err = svc
            .upload(user_id, "photo", "me.jpg", "image/jpeg", b"")
            .await
            .unwrap_err();
        assert!(matches!(err, AttachmentError::Validation(_)));
    }

    #[tokio::test]
    async fn test_bind_occupied_slot_is_duplicate() {
        let db = setup_test_db().await.unwrap();
        let (user_id, case_id) = seed(&db).await;
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&db, &dir);

        let first = svc
            .upload(user_id, "photo", "a.jpg", "image/jpeg", b"a")
            .await
            .unwrap();
        let second = svc
            .upload(user_id, "photo", "b.jpg", "image/jpeg", b"b")
            .await
            .unwrap();

        AttachmentService::bind(&db, first.id, case_id, "photo")
            .await
            .unwrap();
        let err = AttachmentService::bind(&db, second.id, case_id, "photo")
            .await
            .unwrap_err();
        assert!(matches!(err, AttachmentError::DuplicateBinding { .. }));
    }

    #[tokio::test]
    async fn test_bind_replacing_displaces_previous() {
        let db = setup_test_db().await.unwrap();
        let (user_id, case_id) = seed(&db).await;
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&db, &dir);

        let first = svc
            .upload(user_id, "photo", "a.jpg", "image/jpeg", b"a")
            .await
            .unwrap();
        let second = svc
            .upload(user_id, "photo", "b.jpg", "image/jpeg", b"b")
            .await
            .unwrap();

        AttachmentService::bind(&db, first.id, case_id, "photo")
            .await
            .unwrap();
        AttachmentService::bind_replacing(&db, second.id, case_id, "photo")
            .await
            .unwrap();

        let first = svc.get_attachment(first.id).await.unwrap();
        let second = svc.get_attachment(second.id).await.unwrap();
        assert!(first.is_temporary);
        assert!(first.case_id.is_none());
        assert!(!second.is_temporary);
        assert_eq!(second.case_id, Some(case_id));
    }

    #[tokio::test]
    async fn test_already_bound_attachment_is_not_bindable() {
        let db = setup_test_db().await.unwrap();
        let (user_id, case_id) = seed(&db).await;
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&db, &dir);

        let attachment = svc
            .upload(user_id, "photo", "a.jpg", "image/jpeg", b"a")
            .await
            .unwrap();
        AttachmentService::bind(&db, attachment.id, case_id, "photo")
            .await
            .unwrap();

        let err = AttachmentService::bind(&db, attachment.id, case_id, "signature")
            .await
            .unwrap_err();
        assert!(matches!(err, AttachmentError::NotBindable(_)));
    }

    #[tokio::test]
    async fn test_unbind_then_delete() {
        let db = setup_test_db().await.unwrap();
        let (user_id, case_id) = seed(&db).await;
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&db, &dir);

        let attachment = svc
            .upload(user_id, "photo", "a.jpg", "image/jpeg", b"a")
            .await
            .unwrap();
        AttachmentService::bind(&db, attachment.id, case_id, "photo")
            .await
            .unwrap();

        // Bound attachments cannot be deleted directly
        assert!(svc.delete(attachment.id).await.is_err());

        svc.unbind(attachment.id).await.unwrap();
        svc.delete(attachment.id).await.unwrap();
        assert!(matches!(
            svc.get_attachment(attachment.id).await.unwrap_err(),
            AttachmentError::NotFound(_)
        ));
    }
}
