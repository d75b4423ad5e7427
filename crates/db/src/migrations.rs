use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Tables the application reads and writes.
pub const SCHEMA_TABLES: [&str; 5] = ["users", "trips", "events", "conversations", "chat_messages"];

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// How many of [`SCHEMA_TABLES`] exist; anything short of all of them
/// means migrations have not been applied.
pub async fn count_schema_tables(pool: &DbPool) -> Result<usize, sqlx::Error> {
    let names: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table'")
            .fetch_all(pool)
            .await?;
    Ok(SCHEMA_TABLES.iter().filter(|table| names.iter().any(|name| name == *table)).count())
}
