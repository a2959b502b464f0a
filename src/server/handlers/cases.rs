use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::database::entities::form_entries;
use crate::server::app::AppState;
use crate::server::auth::CurrentUser;
use crate::server::error::ApiError;
use crate::services::case_service::{CaseCreated, CaseStatistics, NewCase};
use crate::services::filter_service::{CaseFilter, CasePage, CaseView};

#[derive(Deserialize)]
pub struct OrganizationQuery {
    pub organization_id: Option<i32>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct VerifyRequest {
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct CompleteResponse {
    pub already_completed: bool,
    pub case: form_entries::Model,
}

pub async fn create_case(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(new_case): Json<NewCase>,
) -> Result<(StatusCode, Json<CaseCreated>), ApiError> {
    if new_case.case_number.is_some() && !user.is_admin() {
        return Err(ApiError::forbidden(
            "explicit case numbers are admin-only",
        ));
    }
    let created = state.cases.create_case(&user.0, new_case).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_case(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CaseView>, ApiError> {
    let case = state.cases.get_case(&user.0, id).await?;
    let schema = state.schemas.get_schema(case.schema_id).await?;
    Ok(Json(CaseView::build(
        &case,
        schema.tat_hours_limit,
        Utc::now(),
    )))
}

pub async fn update_case(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<Value>,
) -> Result<Json<CaseCreated>, ApiError> {
    let updated = state.cases.update_payload(&user.0, id, patch).await?;
    Ok(Json(updated))
}

pub async fn delete_case(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.cases.delete_case(&user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn complete_case(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CompleteResponse>, ApiError> {
    let (case, already_completed) = state.cases.mark_completed(&user.0, id).await?;
    Ok(Json(CompleteResponse {
        already_completed,
        case,
    }))
}

pub async fn verify_case(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<form_entries::Model>, ApiError> {
    let case = state
        .cases
        .mark_verified(&user.0, id, request.notes)
        .await?;
    Ok(Json(case))
}

pub async fn search_cases(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<OrganizationQuery>,
    Json(filter): Json<CaseFilter>,
) -> Result<Json<CasePage>, ApiError> {
    let organization_id = user.resolve_organization(query.organization_id)?;
    let page = state.filters.search(organization_id, &filter).await?;
    Ok(Json(page))
}

pub async fn statistics(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<OrganizationQuery>,
) -> Result<Json<CaseStatistics>, ApiError> {
    let organization_id = user.resolve_organization(query.organization_id)?;
    let stats = state.cases.statistics(organization_id).await?;
    Ok(Json(stats))
}
