#[cfg(test)]
use sea_orm::{Database, DatabaseConnection, DbErr};

#[cfg(test)]
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    // In-memory SQLite with the full migration set applied
    let db = Database::connect("sqlite::memory:").await?;

    use sea_orm_migration::MigratorTrait;
    crate::database::migrations::Migrator::up(&db, None).await?;

    Ok(db)
}
