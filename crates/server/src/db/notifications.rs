//! Per-user notifications.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use rich_habits_core::{NotificationId, UserId};

use super::{RepositoryError, parse_column};
use crate::models::{CreateNotification, Notification};

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, type, title, message, link, metadata, is_read, read_at, created_at";

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: NotificationId,
    user_id: UserId,
    #[sqlx(rename = "type")]
    kind: String,
    title: String,
    message: String,
    link: Option<String>,
    metadata: Option<serde_json::Value>,
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = RepositoryError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            kind: parse_column(&row.kind)?,
            title: row.title,
            message: row.message,
            link: row.link,
            metadata: row.metadata,
            is_read: row.is_read,
            read_at: row.read_at,
            created_at: row.created_at,
        })
    }
}

/// Repository for notifications. Every query is scoped to one user.
pub struct NotificationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationRepository<'a> {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a user's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a stored type is invalid.
    pub async fn list(
        &self,
        user_id: UserId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let rows: Vec<NotificationRow> = sqlx::query_as(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE user_id = $1 AND (NOT $2 OR NOT is_read)
             ORDER BY created_at DESC, id DESC
             LIMIT 200"
        ))
        .bind(user_id)
        .bind(unread_only)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Notification::try_from).collect()
    }

    /// Number of unread notifications for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unread_count(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Insert a notification.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user does not exist.
    pub async fn create(&self, input: &CreateNotification) -> Result<Notification, RepositoryError> {
        let row: NotificationRow = sqlx::query_as(&format!(
            "INSERT INTO notifications (user_id, type, title, message, link, metadata)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(input.user_id)
        .bind(input.kind.as_str())
        .bind(&input.title)
        .bind(&input.message)
        .bind(input.link.as_deref())
        .bind(input.metadata.as_ref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "notification"))?;

        Notification::try_from(row)
    }

    /// Mark one of the user's notifications read.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the notification does not
    /// exist or belongs to someone else.
    pub async fn mark_read(
        &self,
        id: NotificationId,
        user_id: UserId,
    ) -> Result<Notification, RepositoryError> {
        let row: Option<NotificationRow> = sqlx::query_as(&format!(
            "UPDATE notifications
             SET is_read = TRUE, read_at = COALESCE(read_at, NOW())
             WHERE id = $1 AND user_id = $2
             RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)
            .and_then(Notification::try_from)
    }

    /// Mark every unread notification of a user read. Returns how many changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_all_read(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = NOW()
             WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
