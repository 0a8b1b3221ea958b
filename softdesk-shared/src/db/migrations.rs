/// Schema migrations
///
/// Migrations live in `migrations/` at the workspace root and are embedded at
/// compile time with `sqlx::migrate!`. Each one has an `.up.sql` and a
/// `.down.sql` file.
///
/// # Example
///
/// ```no_run
/// use softdesk_shared::db::migrations::{ensure_database_exists, run_migrations};
/// use softdesk_shared::db::pool::{create_pool, PoolConfig};
///
/// # async fn example(url: String) -> Result<(), Box<dyn std::error::Error>> {
/// ensure_database_exists(&url).await?;
/// let pool = create_pool(PoolConfig { url, ..Default::default() }).await?;
/// run_migrations(&pool).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::{migrate::MigrateDatabase, postgres::PgPool, Postgres};
use tracing::{debug, info, warn};

/// Applies every pending migration
///
/// # Errors
///
/// Returns an error if a migration fails; sqlx rolls that migration back.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");

    let migrator = sqlx::migrate!("../migrations");

    match migrator.run(pool).await {
        Ok(()) => {
            info!(count = migrator.iter().count(), "Database schema up to date");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Migration failed");
            Err(e)
        }
    }
}

/// Creates the database named in `database_url` if it is missing
///
/// Meant for development; production databases are provisioned ahead of time.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        debug!("Database already exists");
        return Ok(());
    }

    info!("Database does not exist, creating it");
    Postgres::create_database(database_url).await?;

    Ok(())
}
