//! Manufacturing records and status updates.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use rich_habits_core::{
    ManufacturingId, ManufacturingStatus, ManufacturingUpdateId, OrderId, UserId,
};

use super::{RepositoryError, count_by, parse_column};
use crate::models::{
    CreateManufacturingInput, Manufacturing, ManufacturingFilter, ManufacturingUpdate,
    UpdateManufacturingInput,
};

const MANUFACTURING_COLUMNS: &str =
    "id, order_id, manufacturer_id, status, notes, created_at, updated_at";
const UPDATE_COLUMNS: &str = "id, manufacturing_id, status, note, created_by, created_at";

#[derive(Debug, sqlx::FromRow)]
struct ManufacturingRow {
    id: ManufacturingId,
    order_id: OrderId,
    manufacturer_id: Option<UserId>,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ManufacturingRow> for Manufacturing {
    type Error = RepositoryError;

    fn try_from(row: ManufacturingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            manufacturer_id: row.manufacturer_id,
            status: parse_column(&row.status)?,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ManufacturingUpdateRow {
    id: ManufacturingUpdateId,
    manufacturing_id: ManufacturingId,
    status: String,
    note: Option<String>,
    created_by: Option<UserId>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ManufacturingUpdateRow> for ManufacturingUpdate {
    type Error = RepositoryError;

    fn try_from(row: ManufacturingUpdateRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            manufacturing_id: row.manufacturing_id,
            status: parse_column(&row.status)?,
            note: row.note,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

/// Repository for the manufacturing workflow.
pub struct ManufacturingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ManufacturingRepository<'a> {
    /// Create a new manufacturing repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List manufacturing records, most recently touched first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a stored status is not a
    /// current stage (for example, before the legacy status remap has run).
    pub async fn list(
        &self,
        filter: &ManufacturingFilter,
    ) -> Result<Vec<Manufacturing>, RepositoryError> {
        let rows: Vec<ManufacturingRow> = sqlx::query_as(&format!(
            "SELECT {MANUFACTURING_COLUMNS} FROM manufacturing
             WHERE ($1::TEXT IS NULL OR status = $1)
               AND ($2::INTEGER IS NULL OR manufacturer_id = $2)
             ORDER BY updated_at DESC, id DESC"
        ))
        .bind(filter.status.map(ManufacturingStatus::as_str))
        .bind(filter.manufacturer_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Manufacturing::try_from).collect()
    }

    /// Get a manufacturing record by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored status is invalid.
    pub async fn get(&self, id: ManufacturingId) -> Result<Option<Manufacturing>, RepositoryError> {
        let row: Option<ManufacturingRow> = sqlx::query_as(&format!(
            "SELECT {MANUFACTURING_COLUMNS} FROM manufacturing WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        row.map(Manufacturing::try_from).transpose()
    }

    /// Create a record in the first stage.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order does not exist.
    pub async fn create(
        &self,
        input: &CreateManufacturingInput,
    ) -> Result<Manufacturing, RepositoryError> {
        let row: ManufacturingRow = sqlx::query_as(&format!(
            "INSERT INTO manufacturing (order_id, manufacturer_id, status, notes)
             VALUES ($1, $2, $3, $4)
             RETURNING {MANUFACTURING_COLUMNS}"
        ))
        .bind(input.order_id)
        .bind(input.manufacturer_id)
        .bind(ManufacturingStatus::default().as_str())
        .bind(input.notes.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "manufacturing record"))?;

        Manufacturing::try_from(row)
    }

    /// Update manufacturer or notes. Status changes go through [`Self::add_update`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the record does not exist.
    pub async fn update(
        &self,
        id: ManufacturingId,
        input: &UpdateManufacturingInput,
    ) -> Result<Manufacturing, RepositoryError> {
        let row: Option<ManufacturingRow> = sqlx::query_as(&format!(
            "UPDATE manufacturing SET
                manufacturer_id = COALESCE($2, manufacturer_id),
                notes = COALESCE($3, notes),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {MANUFACTURING_COLUMNS}"
        ))
        .bind(id)
        .bind(input.manufacturer_id)
        .bind(input.notes.as_deref())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "manufacturing record"))?;

        row.ok_or(RepositoryError::NotFound)
            .and_then(Manufacturing::try_from)
    }

    /// Record a status update and move the record to that status, atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the record does not exist.
    pub async fn add_update(
        &self,
        id: ManufacturingId,
        status: ManufacturingStatus,
        note: Option<&str>,
        created_by: UserId,
    ) -> Result<(Manufacturing, ManufacturingUpdate), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let record: Option<ManufacturingRow> = sqlx::query_as(&format!(
            "UPDATE manufacturing SET status = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {MANUFACTURING_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&mut *tx)
        .await?;
        let record = record.ok_or(RepositoryError::NotFound)?;

        let update: ManufacturingUpdateRow = sqlx::query_as(&format!(
            "INSERT INTO manufacturing_updates (manufacturing_id, status, note, created_by)
             VALUES ($1, $2, $3, $4)
             RETURNING {UPDATE_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(note)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((
            Manufacturing::try_from(record)?,
            ManufacturingUpdate::try_from(update)?,
        ))
    }

    /// Status history of a record, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a stored status is invalid.
    pub async fn list_updates(
        &self,
        id: ManufacturingId,
    ) -> Result<Vec<ManufacturingUpdate>, RepositoryError> {
        let rows: Vec<ManufacturingUpdateRow> = sqlx::query_as(&format!(
            "SELECT {UPDATE_COLUMNS} FROM manufacturing_updates
             WHERE manufacturing_id = $1
             ORDER BY created_at, id"
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(ManufacturingUpdate::try_from).collect()
    }

    /// Manufacturing counts grouped by raw status text, limited to one manufacturer when given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_by_status(
        &self,
        owner: Option<UserId>,
    ) -> Result<Vec<(String, i64)>, RepositoryError> {
        count_by(self.pool, "manufacturing", "status", "manufacturer_id", owner).await
    }
}
