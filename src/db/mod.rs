//! Persistence plumbing for Loanee
//!
//! PostgreSQL pool setup and migrations, the repository error type shared by every
//! store, and an in-memory store used for local runs and tests.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use uuid::Uuid;

use crate::config::Config;
use crate::error::LendingError;

pub mod memory;

pub use memory::MemoryStore;

/// Database connection error
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Failed to connect to database: {0}")]
    ConnectionError(String),

    #[error("Failed to run migrations: {0}")]
    MigrationError(String),

    #[error("Database health check failed: {0}")]
    HealthCheckError(String),
}

/// Failure reported by a repository implementation
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// A unique key (such as a collateral's tx hash) is already taken
    #[error("duplicate record: {0}")]
    Duplicate(String),

    #[error("record {0} not found")]
    NotFound(Uuid),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        let unique = err
            .as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);
        if unique {
            return RepoError::Duplicate(err.to_string());
        }
        RepoError::Database(err)
    }
}

impl From<RepoError> for LendingError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(id) => LendingError::NotFound(format!("record {}", id)),
            RepoError::Duplicate(what) => LendingError::InvalidState(what),
            other => LendingError::PersistenceError(other.to_string()),
        }
    }
}

/// Create a database connection pool
pub async fn create_pool(config: &Config) -> Result<PgPool, DbError> {
    tracing::info!("Connecting to database at {}", config.database_url_masked());

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .connect(&config.database_url)
        .await
        .map_err(|e| DbError::ConnectionError(e.to_string()))?;

    tracing::info!("Database connection pool created");

    Ok(pool)
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    tracing::info!("Running database migrations...");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DbError::MigrationError(e.to_string()))?;

    tracing::info!("Database migrations completed");

    Ok(())
}

/// Check database connectivity (for health checks)
pub async fn check_health(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| DbError::HealthCheckError(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_repo_error_mapping() {
        let id = Uuid::new_v4();
        assert_eq!(
            LendingError::from(RepoError::NotFound(id)).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            LendingError::from(RepoError::Unavailable("down".into())).kind(),
            ErrorKind::PersistenceError
        );
        assert_eq!(
            LendingError::from(RepoError::from(sqlx::Error::PoolTimedOut)).kind(),
            ErrorKind::PersistenceError
        );
        assert_eq!(
            LendingError::from(RepoError::Duplicate("tx_hash 0xabc".into())).kind(),
            ErrorKind::InvalidState
        );
    }
}
