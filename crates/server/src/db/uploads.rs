//! Direct-to-storage upload tickets.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use rich_habits_core::{UploadStatus, UserId};

use super::{RepositoryError, parse_column};

/// An upload ticket issued to a client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectUpload {
    pub id: Uuid,
    pub owner_user_id: Option<UserId>,
    pub content_type: String,
    pub status: UploadStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
struct ObjectUploadRow {
    id: Uuid,
    owner_user_id: Option<UserId>,
    content_type: String,
    status: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<ObjectUploadRow> for ObjectUpload {
    type Error = RepositoryError;

    fn try_from(row: ObjectUploadRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            owner_user_id: row.owner_user_id,
            content_type: row.content_type,
            status: parse_column(&row.status)?,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

const UPLOAD_COLUMNS: &str = "id, owner_user_id, content_type, status, created_at, completed_at";

/// Repository for upload tickets.
pub struct UploadRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UploadRepository<'a> {
    /// Create a new upload repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a pending upload.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        id: Uuid,
        owner: UserId,
        content_type: &str,
    ) -> Result<ObjectUpload, RepositoryError> {
        let row: ObjectUploadRow = sqlx::query_as(&format!(
            "INSERT INTO object_uploads (id, owner_user_id, content_type)
             VALUES ($1, $2, $3)
             RETURNING {UPLOAD_COLUMNS}"
        ))
        .bind(id)
        .bind(owner)
        .bind(content_type)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "upload"))?;

        ObjectUpload::try_from(row)
    }

    /// Get an upload ticket.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: Uuid) -> Result<Option<ObjectUpload>, RepositoryError> {
        let row: Option<ObjectUploadRow> = sqlx::query_as(&format!(
            "SELECT {UPLOAD_COLUMNS} FROM object_uploads WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        row.map(ObjectUpload::try_from).transpose()
    }

    /// Mark an upload owned by `owner` completed. Completing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such upload belongs to `owner`.
    pub async fn complete(&self, id: Uuid, owner: UserId) -> Result<ObjectUpload, RepositoryError> {
        let row: Option<ObjectUploadRow> = sqlx::query_as(&format!(
            "UPDATE object_uploads
             SET status = 'completed', completed_at = COALESCE(completed_at, NOW())
             WHERE id = $1 AND owner_user_id = $2
             RETURNING {UPLOAD_COLUMNS}"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)
            .and_then(ObjectUpload::try_from)
    }
}
