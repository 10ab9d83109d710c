//! The caller's own notifications.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use rich_habits_core::NotificationId;

use crate::{
    db::NotificationRepository,
    error::AppError,
    middleware::RequireAuth,
    models::Notification,
    state::AppState,
};

/// Query parameters for the notification list.
#[derive(Debug, Default, Deserialize)]
pub struct NotificationsQuery {
    #[serde(default)]
    pub unread: bool,
}

#[derive(Debug, Serialize)]
struct UnreadCount {
    count: i64,
}

#[derive(Debug, Serialize)]
struct MarkedRead {
    updated: u64,
}

/// Build the notifications router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(list))
        .route("/api/notifications/unread-count", get(unread_count))
        .route("/api/notifications/{id}/read", patch(mark_read))
        .route("/api/notifications/read-all", post(mark_all_read))
}

#[instrument(skip_all)]
async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<NotificationsQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let notifications = NotificationRepository::new(state.pool())
        .list(user.id, query.unread)
        .await?;
    Ok(Json(notifications))
}

#[instrument(skip_all)]
async fn unread_count(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<UnreadCount>, AppError> {
    let count = NotificationRepository::new(state.pool())
        .unread_count(user.id)
        .await?;
    Ok(Json(UnreadCount { count }))
}

/// Mark one notification read. Another user's notification is a 404.
#[instrument(skip_all)]
async fn mark_read(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<NotificationId>,
) -> Result<Json<Notification>, AppError> {
    let notification = NotificationRepository::new(state.pool())
        .mark_read(id, user.id)
        .await?;
    Ok(Json(notification))
}

#[instrument(skip_all)]
async fn mark_all_read(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<MarkedRead>, AppError> {
    let updated = NotificationRepository::new(state.pool())
        .mark_all_read(user.id)
        .await?;
    tracing::debug!(user_id = %user.id, updated, "Notifications marked read");
    Ok(Json(MarkedRead { updated }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unread_query_defaults_to_false() {
        let query: NotificationsQuery = serde_json::from_str("{}").unwrap();
        assert!(!query.unread);
        let query: NotificationsQuery = serde_json::from_str(r#"{"unread":true}"#).unwrap();
        assert!(query.unread);
    }
}
