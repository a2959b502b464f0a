use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use sea_orm::EntityTrait;
use uuid::Uuid;

use crate::database::entities::users::UserRole;
use crate::database::entities::{attachments, form_entries};
use crate::errors::AttachmentError;
use crate::server::app::AppState;
use crate::server::auth::CurrentUser;
use crate::server::error::ApiError;

/// Multipart upload with two parts: `field_name` (text) and `file`.
/// The attachment is created temporary; binding happens when a case
/// payload references its id.
pub async fn upload(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<attachments::Model>), ApiError> {
    let mut field_name: Option<String> = None;
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(part) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {}", e)))?
    {
        match part.name() {
            Some("field_name") => {
                let text = part
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("invalid field_name part: {}", e)))?;
                field_name = Some(text);
            }
            Some("file") => {
                let filename = part
                    .file_name()
                    .unwrap_or("upload.bin")
                    .to_string();
                let content_type = part
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = part
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("invalid file part: {}", e)))?;
                file = Some((filename, content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let field_name =
        field_name.ok_or_else(|| ApiError::bad_request("missing field_name part"))?;
    let (filename, content_type, bytes) =
        file.ok_or_else(|| ApiError::bad_request("missing file part"))?;

    let attachment = state
        .attachments
        .upload(user.0.id, &field_name, &filename, &content_type, &bytes)
        .await?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

pub async fn get_attachment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<attachments::Model>, ApiError> {
    let attachment = state.attachments.get_attachment(id).await?;
    check_access(&state, &user, &attachment).await?;
    Ok(Json(attachment))
}

pub async fn download(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let attachment = state.attachments.get_attachment(id).await?;
    check_access(&state, &user, &attachment).await?;

    let (attachment, bytes) = state.attachments.download(id).await?;
    let headers = [
        (header::CONTENT_TYPE, attachment.content_type.clone()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", attachment.original_filename),
        ),
    ];
    Ok((headers, bytes).into_response())
}

pub async fn list_for_case(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<attachments::Model>>, ApiError> {
    // Scope check happens via the case lookup
    let case = state.cases.get_case(&user.0, id).await?;
    let list = state.attachments.list_for_case(case.id).await?;
    Ok(Json(list))
}

/// Revert a bound attachment to the temporary pool
pub async fn unbind(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<attachments::Model>, ApiError> {
    let attachment = state.attachments.get_attachment(id).await?;
    check_access(&state, &user, &attachment).await?;
    let updated = state.attachments.unbind(id).await?;
    Ok(Json(updated))
}

pub async fn delete_attachment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let attachment = state.attachments.get_attachment(id).await?;
    check_access(&state, &user, &attachment).await?;
    state.attachments.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Temporary attachments are private to their uploader; bound ones follow
/// the owning case's organization scope. Out-of-scope ids read as missing.
async fn check_access(
    state: &AppState,
    user: &CurrentUser,
    attachment: &attachments::Model,
) -> Result<(), ApiError> {
    if user.0.role() == UserRole::SuperAdmin || attachment.uploader_id == user.0.id {
        return Ok(());
    }
    if let Some(case_id) = attachment.case_id {
        let case = form_entries::Entity::find_by_id(case_id)
            .one(&state.db)
            .await?;
        if let Some(case) = case {
            if user.can_see_organization(case.organization_id) {
                return Ok(());
            }
        }
    }
    Err(AttachmentError::NotFound(attachment.id).into())
}
