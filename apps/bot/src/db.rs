use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

/// Creates a SQLite connection pool, creating the database file if missing,
/// and makes sure the schema exists.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    info!("Connecting to SQLite...");

    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("DATABASE_URL '{database_url}' is not a valid SQLite URL"))?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;

    info!("SQLite connection pool established");
    Ok(pool)
}

/// Creates the `saved_posts` table and its owner index if they do not exist.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS saved_posts (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            cid          TEXT NOT NULL,
            uri          TEXT NOT NULL,
            saved_by_did TEXT NOT NULL,
            saved_at     TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS saved_posts_saved_by_did ON saved_posts (saved_by_did)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
