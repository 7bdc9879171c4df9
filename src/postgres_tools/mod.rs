// Ampere Charging Data Project
// Connection pooling for the charging database

use anyhow::{Context, Result};
use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::bb8::Pool;
use diesel_async::pooled_connection::{AsyncDieselConnectionManager, ManagerConfig, RecyclingMethod};

/// Shared async connection pool, wrapped in an Arc by callers.
pub type AmperePostgresPool = Pool<AsyncPgConnection>;

/// Build the pool from `DATABASE_URL`. A missing or unreachable database is
/// an error for the caller to report, not a panic.
pub async fn make_async_pool() -> Result<AmperePostgresPool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let mut manager_config = ManagerConfig::default();
    manager_config.recycling_method = RecyclingMethod::Fast;
    let manager =
        AsyncDieselConnectionManager::<AsyncPgConnection>::new_with_config(
            database_url,
            manager_config,
        );

    // the merge driver is the only client, a small pool is plenty
    Pool::builder()
        .max_size(16)
        .min_idle(Some(2))
        .build(manager)
        .await
        .context("building database connection pool")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_database_url_is_an_error_not_a_panic() {
        unsafe { std::env::remove_var("DATABASE_URL") };
        assert!(make_async_pool().await.is_err());
    }
}
