//! Rewrite legacy manufacturing statuses onto the seven-stage workflow.
//!
//! Each (table, legacy status) pair is one step. A step runs in its own
//! transaction together with its `status_remap_log` row, so a failed run
//! keeps every committed step. Every run rewrites whatever legacy rows
//! exist; the log records when each step last ran and how many rows it
//! has rewritten in total.

use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};

/// Legacy status to current status, applied in this order.
pub const STATUS_MAP: &[(&str, &str)] = &[
    ("pending", "awaiting_admin_confirmation"),
    ("in_progress", "cutting_sewing"),
    ("complete", "complete"),
];

/// Tables whose `status` column is rewritten.
pub const REMAP_TABLES: &[&str] = &["manufacturing", "manufacturing_updates"];

/// The replacement for a legacy status, or `None` if `status` is not legacy.
#[must_use]
pub fn remap_status(status: &str) -> Option<&'static str> {
    STATUS_MAP
        .iter()
        .find(|(old, _)| *old == status)
        .map(|(_, new)| *new)
}

/// Apply [`STATUS_MAP`] to a slice of statuses. Returns how many values changed.
pub fn remap_in_place(statuses: &mut [String]) -> usize {
    let mut changed = 0;
    for status in statuses.iter_mut() {
        if let Some(new) = remap_status(status)
            && *status != new
        {
            new.clone_into(status);
            changed += 1;
        }
    }
    changed
}

/// A remap step failed. Earlier steps stay committed.
#[derive(Debug, Error)]
#[error("remapping {table}.status '{old_status}' failed: {source}")]
pub struct StatusRemapError {
    pub table: &'static str,
    pub old_status: &'static str,
    #[source]
    pub source: sqlx::Error,
}

/// What happened to one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Rows whose status matched and were rewritten.
    Applied(u64),
    /// Logged by an earlier run and no legacy rows were left.
    Skipped,
}

/// One (table, legacy status) step of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapStep {
    pub table: &'static str,
    pub old_status: &'static str,
    pub new_status: &'static str,
    pub outcome: StepOutcome,
}

/// Run every step not yet logged.
///
/// # Errors
///
/// Returns the first failing step; the run stops there.
pub async fn run(pool: &PgPool) -> Result<Vec<RemapStep>, StatusRemapError> {
    let mut steps = Vec::with_capacity(REMAP_TABLES.len() * STATUS_MAP.len());

    for &table in REMAP_TABLES {
        for &(old_status, new_status) in STATUS_MAP {
            let outcome = run_step(pool, table, old_status, new_status)
                .await
                .map_err(|source| {
                    warn!(table, old_status, error = %source, "Status remap step failed");
                    StatusRemapError {
                        table,
                        old_status,
                        source,
                    }
                })?;

            match outcome {
                StepOutcome::Applied(rows) => {
                    info!(table, old_status, new_status, rows, "Remapped status");
                }
                StepOutcome::Skipped => {
                    info!(table, old_status, "No legacy rows left for status remap step");
                }
            }

            steps.push(RemapStep {
                table,
                old_status,
                new_status,
                outcome,
            });
        }
    }

    Ok(steps)
}

/// The outcome of a step given whether an earlier run logged it.
const fn step_outcome(previously_logged: bool, rows: u64) -> StepOutcome {
    if previously_logged && rows == 0 {
        StepOutcome::Skipped
    } else {
        StepOutcome::Applied(rows)
    }
}

async fn run_step(
    pool: &PgPool,
    table: &'static str,
    old_status: &'static str,
    new_status: &'static str,
) -> Result<StepOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    // Locks the log row so concurrent runs serialize on this step.
    let previously_logged = sqlx::query_scalar::<_, i64>(
        "SELECT rows_updated FROM status_remap_log
         WHERE table_name = $1 AND old_status = $2
         FOR UPDATE",
    )
    .bind(table)
    .bind(old_status)
    .fetch_optional(&mut *tx)
    .await?
    .is_some();

    let rows = sqlx::query(&format!(
        "UPDATE {table} SET status = $1 WHERE status = $2 AND status <> $1"
    ))
    .bind(new_status)
    .bind(old_status)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    sqlx::query(
        "INSERT INTO status_remap_log (table_name, old_status, new_status, rows_updated)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (table_name, old_status) DO UPDATE
         SET new_status = EXCLUDED.new_status,
             rows_updated = status_remap_log.rows_updated + EXCLUDED.rows_updated,
             completed_at = NOW()",
    )
    .bind(table)
    .bind(old_status)
    .bind(new_status)
    .bind(i64::try_from(rows).unwrap_or(i64::MAX))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(step_outcome(previously_logged, rows))
}
