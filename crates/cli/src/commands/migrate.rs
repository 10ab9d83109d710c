//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! # Apply embedded schema migrations
//! rh-cli migrate run
//!
//! # Rewrite legacy manufacturing statuses
//! rh-cli migrate manufacturing-status
//! ```
//!
//! # Environment Variables
//!
//! - `RH_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use rich_habits_server::db::MIGRATOR;
use rich_habits_server::services::status_remap::{self, RemapStep, StepOutcome};
use thiserror::Error;

use super::ConnectError;

/// Errors from migration commands.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    StatusRemap(#[from] status_remap::StatusRemapError),
}

/// Apply every pending schema migration.
///
/// # Errors
///
/// Returns an error if the connection or any migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let pool = super::connect().await?;

    tracing::info!("Running migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}

/// Rewrite legacy manufacturing statuses, one logged step per (table, status).
///
/// # Errors
///
/// Returns the first failing step. Steps before it stay applied.
pub async fn manufacturing_status() -> Result<(), MigrationError> {
    let pool = super::connect().await?;

    tracing::info!("Remapping manufacturing statuses...");
    let steps = status_remap::run(&pool).await?;

    for step in &steps {
        tracing::info!("  {}", describe(step));
    }

    let total: u64 = steps
        .iter()
        .map(|step| match step.outcome {
            StepOutcome::Applied(rows) => rows,
            StepOutcome::Skipped => 0,
        })
        .sum();
    tracing::info!(rows = total, "Manufacturing status remap complete!");
    Ok(())
}

fn describe(step: &RemapStep) -> String {
    match step.outcome {
        StepOutcome::Applied(rows) => format!(
            "{}: {} -> {} ({rows} rows)",
            step.table, step.old_status, step.new_status
        ),
        StepOutcome::Skipped => format!(
            "{}: {} -> {} (nothing left to remap)",
            step.table, step.old_status, step.new_status
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_applied_step() {
        let step = RemapStep {
            table: "manufacturing",
            old_status: "pending",
            new_status: "awaiting_admin_confirmation",
            outcome: StepOutcome::Applied(3),
        };
        assert_eq!(
            describe(&step),
            "manufacturing: pending -> awaiting_admin_confirmation (3 rows)"
        );
    }

    #[test]
    fn test_describe_skipped_step() {
        let step = RemapStep {
            table: "manufacturing_updates",
            old_status: "in_progress",
            new_status: "cutting_sewing",
            outcome: StepOutcome::Skipped,
        };
        assert!(describe(&step).ends_with("(nothing left to remap)"));
    }
}
