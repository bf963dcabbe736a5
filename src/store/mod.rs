//! SQLite persistence.
//!
//! Single-statement helpers are generic over [`sqlx::Executor`] so they run
//! against the pool or inside a transaction. Helpers that issue several
//! statements take `&mut SqliteConnection`.

pub mod catalog;
pub mod reports;
pub mod users;

use sqlx::migrate::MigrateDatabase;
#[cfg(test)]
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::info;

use crate::error::{FastciliError, Result};

/// Open the database, creating the file if needed, and optionally migrate.
pub async fn connect(database_url: &str, auto_migrate: bool) -> Result<SqlitePool> {
    if !Sqlite::database_exists(database_url).await? {
        info!("Creating database at {}", database_url);
        Sqlite::create_database(database_url).await?;
    }

    let pool = SqlitePool::connect(database_url).await?;

    if auto_migrate {
        migrate(&pool).await?;
    }

    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations completed");
    Ok(())
}

/// Start a transaction holding the write lock from its first statement.
///
/// Concurrent writers queue on the busy timeout and then see each other's
/// committed rows, instead of failing with `SQLITE_BUSY` on lock upgrade.
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Migrated in-memory database on a single connection.
///
/// Every connection to `sqlite::memory:` is its own database, so the pool is
/// capped at one.
#[cfg(test)]
pub async fn in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}

/// Wrap a malformed column value as a decode error.
pub(crate) fn decode_error(column: &str, value: &str) -> FastciliError {
    FastciliError::Database(sqlx::Error::Decode(
        format!("unexpected value {value:?} in column {column}").into(),
    ))
}
