//! Login, logout and session identity.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;

use rich_habits_core::UserRole;

use crate::{
    db::UserRepository,
    error::{AppError, clear_sentry_user, set_sentry_user},
    middleware::{
        RequireAuth, auth::LOGIN_URL, clear_current_user, effective_role, ensure_csrf_token,
        login_rate_limiter, set_current_user,
    },
    models::{CurrentUser, User},
    services::AuthService,
    state::AppState,
};

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The signed-in user as the single-page app sees it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUserResponse {
    #[serde(flatten)]
    pub user: User,
    /// Role used for permission checks; differs from `role` in test mode.
    pub effective_role: UserRole,
    pub home_route: &'static str,
}

impl AuthUserResponse {
    fn new(user: User, effective_role: UserRole) -> Self {
        Self {
            home_route: effective_role.home_route(),
            user,
            effective_role,
        }
    }
}

/// Build the auth router.
pub fn router() -> Router<AppState> {
    let login = Router::new()
        .route("/api/auth/login", post(login))
        .layer(login_rate_limiter());

    Router::new()
        .merge(login)
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/user", get(current_user))
        .route("/api/auth/csrf-token", get(csrf_token))
        .route("/api/login", get(login_required))
}

/// Verify credentials and start a session.
#[instrument(skip_all)]
async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthUserResponse>, AppError> {
    let user = AuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await
        .inspect_err(|e| tracing::info!(error = %e, "Login failed"))?;

    let current = CurrentUser::from(&user);
    set_current_user(&session, &current).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

    let role = effective_role(&state, &current);
    Ok(Json(AuthUserResponse::new(user, role)))
}

/// End the session.
#[instrument(skip_all)]
async fn logout(session: Session) -> Result<impl IntoResponse, AppError> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Json(json!({ "message": "Logged out" })))
}

/// The current user, re-read from the database.
///
/// A user deactivated or deleted since login loses the session here.
#[instrument(skip_all)]
async fn current_user(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
) -> Result<Json<AuthUserResponse>, AppError> {
    let user = UserRepository::new(state.pool()).get_by_id(current.id).await?;

    match user {
        Some(user) if user.is_active => {
            let role = effective_role(&state, &current);
            Ok(Json(AuthUserResponse::new(user, role)))
        }
        _ => {
            clear_current_user(&session).await?;
            Err(AppError::Unauthorized("Session is no longer valid".to_string()))
        }
    }
}

/// The per-session CSRF token, created on first request.
async fn csrf_token(session: Session) -> Result<impl IntoResponse, AppError> {
    let token = ensure_csrf_token(&session).await?;
    Ok(Json(json!({ "csrfToken": token })))
}

/// Where unauthenticated single-page app routes are sent.
async fn login_required() -> impl IntoResponse {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "message": "Authentication required",
            "loginUrl": LOGIN_URL,
        })),
    )
}
