//! `rh-cli` subcommand implementations.

pub mod data;
pub mod migrate;
pub mod seed;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by every command that opens the database.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Neither `RH_DATABASE_URL` nor `DATABASE_URL` is set.
    #[error("Missing environment variable: RH_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect using `RH_DATABASE_URL`, falling back to `DATABASE_URL`.
///
/// # Errors
///
/// Returns `ConnectError::MissingDatabaseUrl` when neither variable is set.
pub async fn connect() -> Result<PgPool, ConnectError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("RH_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConnectError::MissingDatabaseUrl)?;

    tracing::info!("Connecting to database...");
    Ok(rich_habits_server::db::create_pool(&database_url).await?)
}
