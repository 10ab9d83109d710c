//! Database operations for the Rich Habits `PostgreSQL` schema.
//!
//! ## Tables
//!
//! - `users` - Staff accounts and their built-in role
//! - `roles`, `resources`, `role_permissions` - Permission matrix
//! - `organizations`, `contacts`, `leads` - Sales pipeline
//! - `products`, `product_variants`, `orders`, `order_line_items` - Orders
//! - `design_jobs` - Design work assigned to designers
//! - `manufacturing`, `manufacturing_updates` - Production workflow
//! - `notifications` - Per-user in-app notifications
//! - `object_uploads` - Direct-to-storage upload tickets
//! - `settings` - Persisted runtime settings (JSONB)
//! - `status_remap_log` - Completed steps of the manufacturing status remap
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p rich-habits-cli -- migrate run
//! ```

pub mod design_jobs;
pub mod dump;
pub mod leads;
pub mod manufacturing;
pub mod notifications;
pub mod orders;
pub mod organizations;
pub mod permissions;
pub mod settings;
pub mod uploads;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use rich_habits_core::{UnknownVariant, UserId};

pub use design_jobs::DesignJobRepository;
pub use leads::LeadRepository;
pub use manufacturing::ManufacturingRepository;
pub use notifications::NotificationRepository;
pub use orders::OrderRepository;
pub use organizations::OrganizationRepository;
pub use permissions::PermissionRepository;
pub use uploads::UploadRepository;
pub use users::UserRepository;

/// Embedded schema migrations.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Classify a sqlx error, turning unique and foreign-key violations into `Conflict`.
    pub(crate) fn from_write(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Self::Conflict(format!("{what} already exists"));
            }
            if db_err.is_foreign_key_violation() {
                return Self::Conflict(format!("{what} references a missing record"));
            }
            if db_err.is_check_violation() {
                return Self::Conflict(format!("{what} violates a check constraint"));
            }
        }
        Self::Database(err)
    }
}

/// Parse a `TEXT` status/role column into its domain enum.
///
/// # Errors
///
/// Returns `RepositoryError::DataCorruption` if the stored value is not a known variant.
pub(crate) fn parse_column<T>(value: &str) -> Result<T, RepositoryError>
where
    T: FromStr<Err = UnknownVariant>,
{
    value
        .parse()
        .map_err(|e: UnknownVariant| RepositoryError::DataCorruption(e.to_string()))
}

/// `SELECT <column>, COUNT(*) FROM <table> GROUP BY <column>`, optionally
/// restricted to rows whose `owner_column` is `owner`.
///
/// `table`, `column` and `owner_column` are always compile-time constants.
pub(crate) async fn count_by(
    pool: &PgPool,
    table: &'static str,
    column: &'static str,
    owner_column: &'static str,
    owner: Option<UserId>,
) -> Result<Vec<(String, i64)>, RepositoryError> {
    let rows: Vec<(String, i64)> = sqlx::query_as(&format!(
        "SELECT {column}, COUNT(*) FROM {table}
         WHERE ($1::INTEGER IS NULL OR {owner_column} = $1)
         GROUP BY {column} ORDER BY {column}"
    ))
    .bind(owner)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
