//! Design jobs.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use rich_habits_core::{DesignJobId, DesignJobStatus, OrderId, OrganizationId, UserId};

use super::{RepositoryError, count_by, parse_column};
use crate::models::{CreateDesignJobInput, DesignJob, DesignJobFilter, UpdateDesignJobInput};

const DESIGN_JOB_COLUMNS: &str = "id, order_id, organization_id, assigned_designer_id, status, \
                                  brief, due_at, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct DesignJobRow {
    id: DesignJobId,
    order_id: Option<OrderId>,
    organization_id: Option<OrganizationId>,
    assigned_designer_id: Option<UserId>,
    status: String,
    brief: String,
    due_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DesignJobRow> for DesignJob {
    type Error = RepositoryError;

    fn try_from(row: DesignJobRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            organization_id: row.organization_id,
            assigned_designer_id: row.assigned_designer_id,
            status: parse_column(&row.status)?,
            brief: row.brief,
            due_at: row.due_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for design jobs.
pub struct DesignJobRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DesignJobRepository<'a> {
    /// Create a new design job repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List design jobs, soonest due first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a stored status is invalid.
    pub async fn list(&self, filter: &DesignJobFilter) -> Result<Vec<DesignJob>, RepositoryError> {
        let rows: Vec<DesignJobRow> = sqlx::query_as(&format!(
            "SELECT {DESIGN_JOB_COLUMNS} FROM design_jobs
             WHERE ($1::TEXT IS NULL OR status = $1)
               AND ($2::INTEGER IS NULL OR assigned_designer_id = $2)
             ORDER BY due_at ASC NULLS LAST, id"
        ))
        .bind(filter.status.map(DesignJobStatus::as_str))
        .bind(filter.assigned_designer_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(DesignJob::try_from).collect()
    }

    /// Jobs that are assigned to someone and in active work.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a stored status is invalid.
    pub async fn list_active_assignments(&self) -> Result<Vec<DesignJob>, RepositoryError> {
        let rows: Vec<DesignJobRow> = sqlx::query_as(&format!(
            "SELECT {DESIGN_JOB_COLUMNS} FROM design_jobs
             WHERE assigned_designer_id IS NOT NULL AND status IN ($1, $2)"
        ))
        .bind(DesignJobStatus::Assigned.as_str())
        .bind(DesignJobStatus::InProgress.as_str())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(DesignJob::try_from).collect()
    }

    /// Get a design job by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored status is invalid.
    pub async fn get(&self, id: DesignJobId) -> Result<Option<DesignJob>, RepositoryError> {
        let row: Option<DesignJobRow> = sqlx::query_as(&format!(
            "SELECT {DESIGN_JOB_COLUMNS} FROM design_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        row.map(DesignJob::try_from).transpose()
    }

    /// Create a design job. It starts `assigned` when a designer is given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a referenced record is missing.
    pub async fn create(&self, input: &CreateDesignJobInput) -> Result<DesignJob, RepositoryError> {
        let status = if input.assigned_designer_id.is_some() {
            DesignJobStatus::Assigned
        } else {
            DesignJobStatus::Pending
        };

        let row: DesignJobRow = sqlx::query_as(&format!(
            "INSERT INTO design_jobs
                (order_id, organization_id, assigned_designer_id, status, brief, due_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {DESIGN_JOB_COLUMNS}"
        ))
        .bind(input.order_id)
        .bind(input.organization_id)
        .bind(input.assigned_designer_id)
        .bind(status.as_str())
        .bind(&input.brief)
        .bind(input.due_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "design job"))?;

        DesignJob::try_from(row)
    }

    /// Update a design job.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the job does not exist.
    pub async fn update(
        &self,
        id: DesignJobId,
        input: &UpdateDesignJobInput,
    ) -> Result<DesignJob, RepositoryError> {
        let (designer_set, designer) = input
            .assigned_designer_id
            .map_or((false, None), |value| (true, value));
        let (due_set, due_at) = input.due_at.map_or((false, None), |value| (true, value));

        let row: Option<DesignJobRow> = sqlx::query_as(&format!(
            "UPDATE design_jobs SET
                status = COALESCE($2, status),
                assigned_designer_id = CASE WHEN $3 THEN $4 ELSE assigned_designer_id END,
                brief = COALESCE($5, brief),
                due_at = CASE WHEN $6 THEN $7 ELSE due_at END,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {DESIGN_JOB_COLUMNS}"
        ))
        .bind(id)
        .bind(input.status.map(DesignJobStatus::as_str))
        .bind(designer_set)
        .bind(designer)
        .bind(input.brief.as_deref())
        .bind(due_set)
        .bind(due_at)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "design job"))?;

        row.ok_or(RepositoryError::NotFound)
            .and_then(DesignJob::try_from)
    }

    /// Delete a design job.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the job does not exist.
    pub async fn delete(&self, id: DesignJobId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM design_jobs WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Design job counts grouped by status, limited to one designer when given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_by_status(
        &self,
        owner: Option<UserId>,
    ) -> Result<Vec<(String, i64)>, RepositoryError> {
        count_by(self.pool, "design_jobs", "status", "assigned_designer_id", owner).await
    }
}
