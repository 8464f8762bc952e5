use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;

pub type DbPool = PgPool;

/// Opens the pool backing the token and user stores
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(Some(config.idle_timeout))
        .max_lifetime(Some(config.max_lifetime))
        .connect(&config.url)
        .await?;

    log::info!(
        "Token database pool ready (max: {}, min: {})",
        config.max_connections,
        config.min_connections
    );

    Ok(pool)
}

/// Creates or upgrades the `users` and `tokens` tables
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    log::info!("Token schema is up to date");
    Ok(())
}

/// Checks that the `tokens` table can be queried
///
/// Fails both when the database is unreachable and when migrations have not
/// been applied.
pub async fn check_token_table(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1 FROM tokens LIMIT 1")
        .fetch_optional(pool)
        .await?;
    Ok(())
}
