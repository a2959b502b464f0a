use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::database::entities::form_schemas;
use crate::errors::SchemaError;
use crate::server::app::AppState;
use crate::server::auth::CurrentUser;
use crate::server::error::ApiError;
use crate::services::schema_service::{NewSchema, SchemaUpdate};

#[derive(Deserialize)]
pub struct ListSchemasQuery {
    pub organization_id: Option<i32>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Deserialize)]
pub struct CreateSchemaRequest {
    pub organization_id: Option<i32>,
    #[serde(flatten)]
    pub schema: NewSchema,
}

pub async fn list_schemas(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListSchemasQuery>,
) -> Result<Json<Vec<form_schemas::Model>>, ApiError> {
    let organization_id = user.resolve_organization(query.organization_id)?;
    let schemas = state
        .schemas
        .list_schemas(organization_id, query.include_inactive)
        .await?;
    Ok(Json(schemas))
}

pub async fn create_schema(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateSchemaRequest>,
) -> Result<(StatusCode, Json<form_schemas::Model>), ApiError> {
    user.require_admin()?;
    let organization_id = user.resolve_organization(request.organization_id)?;
    let schema = state
        .schemas
        .create_schema(organization_id, Some(user.0.id), request.schema)
        .await?;
    Ok((StatusCode::CREATED, Json(schema)))
}

pub async fn get_schema(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<form_schemas::Model>, ApiError> {
    let schema = state.schemas.get_schema(id).await?;
    if !user.can_see_organization(schema.organization_id) {
        return Err(SchemaError::NotFound(id).into());
    }
    Ok(Json(schema))
}

pub async fn update_schema(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(update): Json<SchemaUpdate>,
) -> Result<Json<form_schemas::Model>, ApiError> {
    user.require_admin()?;
    let schema = state.schemas.get_schema(id).await?;
    if !user.can_see_organization(schema.organization_id) {
        return Err(SchemaError::NotFound(id).into());
    }
    let updated = state.schemas.update_schema(id, update).await?;
    Ok(Json(updated))
}

pub async fn delete_schema(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require_admin()?;
    let schema = state.schemas.get_schema(id).await?;
    if !user.can_see_organization(schema.organization_id) {
        return Err(SchemaError::NotFound(id).into());
    }
    state.schemas.deactivate_schema(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
