//! Seed the permission matrix from the built-in static table.

use rich_habits_server::db::{PermissionRepository, RepositoryError};
use thiserror::Error;

use super::ConnectError;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Seeding failed: {0}")]
    Repository(#[from] RepositoryError),
}

/// Write the static role/resource/permission rows, inserting missing ones.
///
/// # Errors
///
/// Returns an error if the connection or any write fails.
pub async fn permissions() -> Result<(), SeedError> {
    let pool = super::connect().await?;

    tracing::info!("Seeding permission matrix...");
    let report = PermissionRepository::new(&pool).seed_static().await?;

    tracing::info!(
        roles = report.roles,
        resources = report.resources,
        permissions = report.permissions,
        "Permission matrix seeded!"
    );
    Ok(())
}
