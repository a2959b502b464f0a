use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sea_orm::EntityTrait;

use crate::database::entities::users::{self, UserRole};
use crate::server::app::AppState;
use crate::server::error::ApiError;

/// Request identity, resolved from the `X-User-Id` header against the
/// users table. Upstream infrastructure terminates real authentication;
/// this service only needs to know who the verified caller is.
pub struct CurrentUser(pub users::Model);

const USER_HEADER: &str = "x-user-id";

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("missing X-User-Id header"))?;

        let user_id: i32 = raw
            .parse()
            .map_err(|_| ApiError::unauthorized(format!("invalid X-User-Id '{}'", raw)))?;

        let user = users::Entity::find_by_id(user_id)
            .one(&state.db)
            .await?
            .ok_or_else(|| ApiError::unauthorized(format!("unknown user {}", user_id)))?;

        if !user.is_active {
            return Err(ApiError::unauthorized(format!(
                "user {} is deactivated",
                user_id
            )));
        }

        Ok(CurrentUser(user))
    }
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        matches!(self.0.role(), UserRole::Admin | UserRole::SuperAdmin)
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("admin role required"))
        }
    }

    /// Resolve the organization a request operates on. Super admins may
    /// target any organization via an explicit override; everyone else is
    /// pinned to their own.
    pub fn resolve_organization(&self, requested: Option<i32>) -> Result<i32, ApiError> {
        match (self.0.role(), requested, self.0.organization_id) {
            (UserRole::SuperAdmin, Some(org), _) => Ok(org),
            (_, Some(org), Some(own)) if org == own => Ok(own),
            (_, Some(_), _) => Err(ApiError::forbidden(
                "cannot operate on another organization",
            )),
            (_, None, Some(own)) => Ok(own),
            (_, None, None) => Err(ApiError::bad_request(
                "user has no organization; pass organization_id",
            )),
        }
    }

    /// Whether a resource belonging to `organization_id` is visible
    pub fn can_see_organization(&self, organization_id: i32) -> bool {
        self.0.role() == UserRole::SuperAdmin
            || self.0.organization_id == Some(organization_id)
    }
}
