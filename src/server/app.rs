use std::sync::Arc;

use anyhow::Result;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use super::handlers::{attachments, cases, health, schemas};
use crate::services::{
    AttachmentService, BlobStore, CaseService, FilterService, SchemaService,
};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub schemas: SchemaService,
    pub cases: CaseService,
    pub filters: FilterService,
    pub attachments: AttachmentService,
}

pub async fn create_app(
    db: DatabaseConnection,
    blob_store: Arc<dyn BlobStore>,
    cors_origin: Option<&str>,
) -> Result<Router> {
    let state = AppState {
        schemas: SchemaService::new(db.clone()),
        cases: CaseService::new(db.clone()),
        filters: FilterService::new(db.clone()),
        attachments: AttachmentService::new(db.clone(), blob_store),
        db,
    };

    let cors = match cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<axum::http::HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_v1_routes())
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state);

    Ok(app)
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Schema routes
        .route("/schemas", get(schemas::list_schemas))
        .route("/schemas", post(schemas::create_schema))
        .route("/schemas/:id", get(schemas::get_schema))
        .route("/schemas/:id", patch(schemas::update_schema))
        .route("/schemas/:id", delete(schemas::delete_schema))
        // Case routes
        .route("/cases", post(cases::create_case))
        .route("/cases/search", post(cases::search_cases))
        .route("/cases/statistics", get(cases::statistics))
        .route("/cases/:id", get(cases::get_case))
        .route("/cases/:id", patch(cases::update_case))
        .route("/cases/:id", delete(cases::delete_case))
        .route("/cases/:id/complete", post(cases::complete_case))
        .route("/cases/:id/verify", post(cases::verify_case))
        .route("/cases/:id/attachments", get(attachments::list_for_case))
        // Attachment routes
        .route("/attachments", post(attachments::upload))
        .route("/attachments/:id", get(attachments::get_attachment))
        .route("/attachments/:id", delete(attachments::delete_attachment))
        .route("/attachments/:id/download", get(attachments::download))
        .route("/attachments/:id/binding", delete(attachments::unbind))
}
