//! Authentication extractors and permission guards.
//!
//! The logged-in user lives in the session as a [`CurrentUser`]. Handlers
//! take [`RequireAuth`] and then call [`require_permission`] for the
//! resource they touch.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use rich_habits_core::{PermissionKind, UserId, UserRole};

use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Where the single-page app sends unauthenticated users.
pub const LOGIN_URL: &str = "/api/auth/login";

/// Extractor that requires an authenticated user.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when an extractor rejects the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No logged-in user.
    Unauthorized,
    /// Logged in, but not allowed.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "message": "Authentication required",
                    "loginUrl": LOGIN_URL,
                })),
            )
                .into_response(),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(json!({ "message": "Admin access required" })),
            )
                .into_response(),
        }
    }
}

async fn session_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_user(parts)
            .await
            .map(Self)
            .ok_or(AuthRejection::Unauthorized)
    }
}

/// Extractor that optionally gets the current user.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await))
    }
}

/// Extractor that requires a user whose real role is `admin`.
///
/// Test mode does not affect this check, so an admin previewing another
/// role can still switch back.
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = session_user(parts)
            .await
            .ok_or(AuthRejection::Unauthorized)?;
        if !user.role.is_admin() {
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

/// The role used for permission checks, after the test-mode override.
#[must_use]
pub fn effective_role(state: &AppState, user: &CurrentUser) -> UserRole {
    state.settings().effective_role(user.role)
}

/// Fail with 403 unless the user may perform `kind` on `resource`.
///
/// # Errors
///
/// Returns `AppError::Forbidden` when the permission is denied.
pub async fn require_permission(
    state: &AppState,
    user: &CurrentUser,
    resource: &str,
    kind: PermissionKind,
) -> Result<(), AppError> {
    let role = effective_role(state, user);
    if state.authorizer().check(role, resource, kind).await {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %user.id,
            role = %role,
            resource,
            kind = %kind,
            "Permission denied"
        );
        Err(AppError::Forbidden(format!(
            "You do not have {kind} access to {resource}"
        )))
    }
}

/// The owner to scope a list to, or `None` when the user sees every record.
pub async fn record_scope(state: &AppState, user: &CurrentUser, resource: &str) -> Option<UserId> {
    let role = effective_role(state, user);
    if state.authorizer().can_view_all(role, resource).await {
        None
    } else {
        Some(user.id)
    }
}

/// Store the logged-in user, rotating the session id.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Drop everything in the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be deleted.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_unauthorized_rejection_carries_login_url() {
        let response = AuthRejection::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["loginUrl"], LOGIN_URL);
    }

    #[tokio::test]
    async fn test_missing_session_is_unauthorized() {
        let (mut parts, ()) = axum::http::Request::builder()
            .uri("/api/leads")
            .body(())
            .unwrap()
            .into_parts();

        let result = RequireAuth::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AuthRejection::Unauthorized)));

        let OptionalAuth(user) = OptionalAuth::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(user.is_none());
    }
}
