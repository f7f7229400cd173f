//! Schema migrations embedded from the crate's `migrations/` directory.
//!
//! Tests use the same migrator: `#[sqlx::test(migrator = "opsdesk::database::MIGRATOR")]`.

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::PgPool;
use tracing::info;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply outstanding migrations; sqlx takes an advisory lock so concurrent
/// processes starting together do not race
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await?;
    info!(
        migrations = MIGRATOR.iter().count(),
        "Database schema is up to date"
    );
    Ok(())
}
