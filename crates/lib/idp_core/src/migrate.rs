//! Embedded schema migrations for admins, applications and users.

use sqlx::PgPool;
use sqlx::migrate::MigrateError;
use tracing::debug;

/// Apply every pending migration under `idp_core/migrations/`.
pub async fn migrate(pool: &PgPool) -> Result<(), MigrateError> {
    let migrator = sqlx::migrate!("./migrations");
    debug!(embedded = migrator.iter().count(), "applying schema migrations");
    migrator.run(pool).await
}
