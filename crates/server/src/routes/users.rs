//! Staff account administration (admin only).

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
};
use serde::Deserialize;
use tracing::instrument;

use rich_habits_core::{UserId, UserRole};

use crate::{
    db::UserRepository,
    error::AppError,
    middleware::RequireAdmin,
    models::{CreateUserInput, UpdateUserInput, User},
    services::AuthService,
    state::AppState,
};

/// Query parameters for the user list.
#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    pub role: Option<UserRole>,
}

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list).post(create))
        .route("/api/users/{id}", patch(update))
}

#[instrument(skip_all)]
async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<UsersQuery>,
) -> Result<Json<Vec<User>>, AppError> {
    let users = UserRepository::new(state.pool()).list(query.role).await?;
    Ok(Json(users))
}

#[instrument(skip_all)]
async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreateUserInput>,
) -> Result<impl IntoResponse, AppError> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }

    let user = AuthService::new(state.pool())
        .create_user(
            &input.email,
            input.name.trim(),
            input.role,
            input.password.as_deref(),
        )
        .await?;

    tracing::info!(admin_id = %admin.id, user_id = %user.id, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip_all)]
async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    Json(input): Json<UpdateUserInput>,
) -> Result<Json<User>, AppError> {
    check_self_update(admin.id, id, &input)?;

    let user = UserRepository::new(state.pool()).update(id, &input).await?;
    tracing::info!(admin_id = %admin.id, user_id = %id, "User updated");
    Ok(Json(user))
}

/// An admin may not deactivate or demote their own account.
fn check_self_update(admin: UserId, target: UserId, input: &UpdateUserInput) -> Result<(), AppError> {
    if admin != target {
        return Ok(());
    }
    if input.is_active == Some(false) {
        return Err(AppError::BadRequest(
            "You cannot deactivate your own account".to_string(),
        ));
    }
    if input.role.is_some_and(|role| !role.is_admin()) {
        return Err(AppError::BadRequest(
            "You cannot remove your own admin role".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_cannot_lock_themselves_out() {
        let me = UserId::new(1);

        let deactivate = UpdateUserInput {
            is_active: Some(false),
            ..Default::default()
        };
        assert!(check_self_update(me, me, &deactivate).is_err());
        assert!(check_self_update(me, UserId::new(2), &deactivate).is_ok());

        let demote = UpdateUserInput {
            role: Some(UserRole::Sales),
            ..Default::default()
        };
        assert!(check_self_update(me, me, &demote).is_err());

        let rename = UpdateUserInput {
            name: Some("New Name".to_string()),
            ..Default::default()
        };
        assert!(check_self_update(me, me, &rename).is_ok());
    }
}
