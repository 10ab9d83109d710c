//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /api/health                         - Liveness
//! GET  /api/ready                          - Readiness (database, session, auth)
//!
//! # Auth
//! POST /api/auth/login                     - Email + password login (rate limited)
//! POST /api/auth/logout                    - Logout
//! GET  /api/auth/user                      - Current user
//! GET  /api/auth/csrf-token                - Per-session CSRF token
//! GET  /api/login                          - 401 with the login URL
//! POST /api/license/accept                 - Accept the software license
//!
//! # Users (admin)
//! GET/POST   /api/users
//! PATCH      /api/users/{id}
//!
//! # Permissions
//! GET  /api/permissions/user-permissions   - Effective matrix for the caller
//! GET/POST /api/permissions/roles          - Roles with their rows (admin)
//! PUT  /api/permissions/roles/{role_id}/resources/{resource_id}
//! GET  /api/permissions/resources
//!
//! # Business records
//! /api/leads, /api/organizations, /api/orders, /api/design-jobs,
//! /api/manufacturing, /api/notifications, /api/hub/counts
//!
//! # Uploads
//! POST /api/upload/image                   - Signed PUT URL
//! POST /api/upload/complete                - Canonical object path
//! GET  /public-objects/{upload_id}         - Redirect to a signed GET URL
//!
//! # Runtime settings
//! GET  /api/settings/runtime
//! PUT  /api/settings/feature-flags/{name}  (admin)
//! PUT  /api/settings/test-mode             (admin)
//! ```

pub mod auth;
pub mod design_jobs;
pub mod health;
pub mod hub;
pub mod leads;
pub mod license;
pub mod manufacturing;
pub mod notifications;
pub mod orders;
pub mod organizations;
pub mod permissions;
pub mod settings;
pub mod uploads;
pub mod users;

use axum::Router;

use rich_habits_core::UserId;

use crate::error::AppError;
use crate::state::AppState;

/// Build the API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(license::router())
        .merge(users::router())
        .merge(permissions::router())
        .merge(leads::router())
        .merge(organizations::router())
        .merge(orders::router())
        .merge(design_jobs::router())
        .merge(manufacturing::router())
        .merge(notifications::router())
        .merge(uploads::router())
        .merge(settings::router())
        .merge(hub::router())
}

/// Hide a record outside the caller's scope.
///
/// `scope` is `None` when the caller sees every record; otherwise only
/// records owned by that user are visible. Out-of-scope records look
/// missing rather than forbidden.
pub(crate) fn ensure_in_scope(
    scope: Option<UserId>,
    owner: Option<UserId>,
    what: &str,
) -> Result<(), AppError> {
    match scope {
        Some(user_id) if owner != Some(user_id) => Err(AppError::NotFound(format!("{what} not found"))),
        _ => Ok(()),
    }
}

/// The owner to store on a new record: the caller when scoped, otherwise
/// whoever the request names.
pub(crate) fn owner_for_new_record(scope: Option<UserId>, requested: Option<UserId>) -> Option<UserId> {
    scope.or(requested)
}

/// Turn a missing row into a 404 with a readable message.
pub(crate) fn found<T>(value: Option<T>, what: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::NotFound(format!("{what} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_in_scope() {
        let me = UserId::new(1);
        let other = UserId::new(2);

        assert!(ensure_in_scope(None, Some(other), "Lead").is_ok());
        assert!(ensure_in_scope(None, None, "Lead").is_ok());
        assert!(ensure_in_scope(Some(me), Some(me), "Lead").is_ok());
        assert!(matches!(
            ensure_in_scope(Some(me), Some(other), "Lead"),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            ensure_in_scope(Some(me), None, "Lead"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_scoped_caller_owns_new_records() {
        let me = UserId::new(1);
        let other = UserId::new(2);

        assert_eq!(owner_for_new_record(Some(me), Some(other)), Some(me));
        assert_eq!(owner_for_new_record(Some(me), None), Some(me));
        assert_eq!(owner_for_new_record(None, Some(other)), Some(other));
        assert_eq!(owner_for_new_record(None, None), None);
    }
}
