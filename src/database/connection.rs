use crate::config::DatabaseConfig;
use crate::logging::log_error;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Build the shared pool from configuration
pub async fn connect_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(&config.url)
        .await
        .inspect_err(|e| {
            log_error("database", "connect_pool", &e.to_string(), None);
        })?;

    info!(
        max_connections = config.max_connections,
        "Database pool established"
    );
    Ok(pool)
}

/// Round-trip a trivial query through the pool
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await?;
    Ok(())
}
