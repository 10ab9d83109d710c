//! Runtime settings: feature flags and the test-mode role.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use rich_habits_core::UserRole;

use crate::{
    error::AppError,
    middleware::{RequireAdmin, RequireAuth},
    services::RuntimeSettings,
    state::AppState,
};

/// Runtime settings as sent to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSettingsResponse {
    #[serde(flatten)]
    pub settings: RuntimeSettings,
    pub environment: &'static str,
    /// Whether the test-mode role can be set in this environment.
    pub test_mode_available: bool,
}

#[derive(Debug, Deserialize)]
pub struct FeatureFlagRequest {
    pub enabled: bool,
}

/// `{"role": "sales"}` enters test mode, `{"role": null}` leaves it.
#[derive(Debug, Deserialize)]
pub struct TestModeRequest {
    pub role: Option<UserRole>,
}

/// Build the settings router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/settings/runtime", get(runtime))
        .route("/api/settings/feature-flags/{name}", put(set_feature_flag))
        .route("/api/settings/test-mode", put(set_test_mode))
}

fn respond(state: &AppState, settings: RuntimeSettings) -> Json<RuntimeSettingsResponse> {
    let environment = state.config().environment;
    Json(RuntimeSettingsResponse {
        settings,
        environment: environment.as_str(),
        test_mode_available: !environment.is_production(),
    })
}

async fn runtime(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
) -> Json<RuntimeSettingsResponse> {
    respond(&state, state.settings().snapshot())
}

#[instrument(skip_all)]
async fn set_feature_flag(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(name): Path<String>,
    Json(body): Json<FeatureFlagRequest>,
) -> Result<Json<RuntimeSettingsResponse>, AppError> {
    let settings = state.settings().set_feature_flag(&name, body.enabled).await?;
    tracing::info!(admin_id = %admin.id, flag = %name, enabled = body.enabled, "Feature flag set");
    Ok(respond(&state, settings))
}

#[instrument(skip_all)]
async fn set_test_mode(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<TestModeRequest>,
) -> Result<Json<RuntimeSettingsResponse>, AppError> {
    let settings = state.settings().set_test_mode_role(body.role).await?;
    tracing::info!(admin_id = %admin.id, role = ?body.role, "Test mode changed");
    Ok(respond(&state, settings))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_test_mode_request_accepts_null() {
        let body: TestModeRequest = serde_json::from_str(r#"{"role":null}"#).unwrap();
        assert_eq!(body.role, None);
        let body: TestModeRequest = serde_json::from_str(r#"{"role":"designer"}"#).unwrap();
        assert_eq!(body.role, Some(UserRole::Designer));
        assert!(serde_json::from_str::<TestModeRequest>(r#"{"role":"owner"}"#).is_err());
    }
}
