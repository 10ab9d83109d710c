//! Sales pipeline leads.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use rich_habits_core::{ContactId, LeadId, LeadStage, OrganizationId, UserId};

use super::{RepositoryError, count_by, parse_column};
use crate::models::{CreateLeadInput, Lead, LeadFilter, UpdateLeadInput};

const LEAD_COLUMNS: &str =
    "id, organization_id, contact_id, owner_user_id, stage, source, notes, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct LeadRow {
    id: LeadId,
    organization_id: Option<OrganizationId>,
    contact_id: Option<ContactId>,
    owner_user_id: Option<UserId>,
    stage: String,
    source: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LeadRow> for Lead {
    type Error = RepositoryError;

    fn try_from(row: LeadRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            organization_id: row.organization_id,
            contact_id: row.contact_id,
            owner_user_id: row.owner_user_id,
            stage: parse_column(&row.stage)?,
            source: row.source,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for leads.
pub struct LeadRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> LeadRepository<'a> {
    /// Create a new lead repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List leads, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a stored stage is invalid.
    pub async fn list(&self, filter: &LeadFilter) -> Result<Vec<Lead>, RepositoryError> {
        let rows: Vec<LeadRow> = sqlx::query_as(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads
             WHERE ($1::TEXT IS NULL OR stage = $1)
               AND ($2::INTEGER IS NULL OR owner_user_id = $2)
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(filter.stage.map(LeadStage::as_str))
        .bind(filter.owner_user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Lead::try_from).collect()
    }

    /// Get a lead by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored stage is invalid.
    pub async fn get(&self, id: LeadId) -> Result<Option<Lead>, RepositoryError> {
        let row: Option<LeadRow> =
            sqlx::query_as(&format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        row.map(Lead::try_from).transpose()
    }

    /// Create a lead owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a referenced record is missing.
    pub async fn create(&self, input: &CreateLeadInput, owner: UserId) -> Result<Lead, RepositoryError> {
        let row: LeadRow = sqlx::query_as(&format!(
            "INSERT INTO leads (organization_id, contact_id, owner_user_id, stage, source, notes)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {LEAD_COLUMNS}"
        ))
        .bind(input.organization_id)
        .bind(input.contact_id)
        .bind(input.owner_user_id.unwrap_or(owner))
        .bind(input.stage.as_str())
        .bind(input.source.as_deref())
        .bind(input.notes.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "lead"))?;

        Lead::try_from(row)
    }

    /// Update a lead.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the lead does not exist.
    pub async fn update(&self, id: LeadId, input: &UpdateLeadInput) -> Result<Lead, RepositoryError> {
        let (owner_set, owner_value) = match input.owner_user_id {
            None => (false, None),
            Some(value) => (true, value),
        };

        let row: Option<LeadRow> = sqlx::query_as(&format!(
            "UPDATE leads SET
                stage = COALESCE($2, stage),
                owner_user_id = CASE WHEN $3 THEN $4 ELSE owner_user_id END,
                source = COALESCE($5, source),
                notes = COALESCE($6, notes),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {LEAD_COLUMNS}"
        ))
        .bind(id)
        .bind(input.stage.map(LeadStage::as_str))
        .bind(owner_set)
        .bind(owner_value)
        .bind(input.source.as_deref())
        .bind(input.notes.as_deref())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "lead"))?;

        row.ok_or(RepositoryError::NotFound).and_then(Lead::try_from)
    }

    /// Delete a lead.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the lead does not exist.
    pub async fn delete(&self, id: LeadId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM leads WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Lead counts grouped by stage, limited to `owner`'s leads when given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_by_stage(
        &self,
        owner: Option<UserId>,
    ) -> Result<Vec<(String, i64)>, RepositoryError> {
        count_by(self.pool, "leads", "stage", "owner_user_id", owner).await
    }
}
