pub mod executions;
pub mod migrator;
pub mod users;
pub mod workflows;

use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;

/// Connect and bring the schema up to date.
pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;
    migrator::Migrator::up(&db, None).await?;
    Ok(db)
}
