//! Persistence layer for the taskdeck backend
//!
//! One `DatabaseConnection` handle is constructed at process start and
//! threaded through every component call; there is no global store.

pub mod entities;
pub mod migrator;

use migrator::Migrator;
use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::info;

/// Connect to the backing store (`sqlite::...` or `postgres://...`).
pub async fn connect(url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(url).await
}

/// Apply all pending migrations.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    info!("Running database migrations");
    Migrator::up(db, None).await
}
