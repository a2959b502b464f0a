pub mod app;
pub mod auth;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum MigrateDirection {
    Up,
    Down,
    Fresh,
}

use crate::database::{connection::*, migrations::Migrator};
use crate::services::{LocalBlobStore, SequenceService};
use anyhow::Result;
use sea_orm::EntityTrait;
use sea_orm_migration::prelude::*;
use tracing::info;

pub async fn start_server(
    port: u16,
    database_path: &str,
    blob_dir: &str,
    cors_origin: Option<&str>,
) -> Result<()> {
    let database_url = get_database_url(Some(database_path));
    let db = establish_connection(&database_url).await?;

    Migrator::up(&db, None).await?;
    info!("Database migrations completed");

    let store = Arc::new(LocalBlobStore::new(blob_dir));
    let app = app::create_app(db, store, cors_origin).await?;

    log_routes();

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Server running on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn log_routes() {
    info!("API Endpoints:");
    info!("  /health                     - Health check");
    info!("  /api/v1/schemas             - Form schema CRUD");
    info!("  /api/v1/cases               - Case lifecycle (create, complete, verify)");
    info!("  /api/v1/cases/search        - Schema-driven case filtering");
    info!("  /api/v1/attachments         - File uploads and case binding");
}

pub async fn migrate_database(database_path: &str, direction: MigrateDirection) -> Result<()> {
    let database_url = get_database_url(Some(database_path));
    let db = establish_connection(&database_url).await?;

    match direction {
        MigrateDirection::Up => {
            info!("Running migrations up");
            Migrator::up(&db, None).await?;
        }
        MigrateDirection::Down => {
            info!("Running migrations down");
            Migrator::down(&db, None).await?;
        }
        MigrateDirection::Fresh => {
            info!("Running fresh migrations (down then up)");
            Migrator::down(&db, None).await?;
            Migrator::up(&db, None).await?;
        }
    }

    info!("Database migration completed");
    Ok(())
}

/// Renumber cases to dense per-organization sequences. With no
/// organization given, every organization is processed.
pub async fn reassign_case_numbers(database_path: &str, organization: Option<i32>) -> Result<()> {
    use crate::database::entities::organizations;

    let database_url = get_database_url(Some(database_path));
    let db = establish_connection(&database_url).await?;
    Migrator::up(&db, None).await?;

    let targets = match organization {
        Some(id) => vec![id],
        None => organizations::Entity::find()
            .all(&db)
            .await?
            .into_iter()
            .map(|org| org.id)
            .collect(),
    };

    for organization_id in targets {
        let summary = SequenceService::reassign_for_organization(&db, organization_id).await?;
        info!(
            organization_id = summary.organization_id,
            reassigned = summary.reassigned,
            "case numbers reassigned"
        );
    }

    Ok(())
}
