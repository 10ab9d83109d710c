//! In-app notifications.

use chrono::{DateTime, Utc};
use serde::Serialize;

use rich_habits_core::{NotificationId, NotificationType, UserId};

/// A notification addressed to one user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A notification to be inserted.
#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub user_id: UserId,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub metadata: Option<serde_json::Value>,
}
