//! Software license acceptance.

use axum::{Json, Router, extract::State, routing::post};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use crate::{db::UserRepository, error::AppError, middleware::RequireAuth, state::AppState};

/// Response for a license acceptance.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseAcceptance {
    pub accepted: bool,
    pub accepted_at: DateTime<Utc>,
}

/// Build the license router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/license/accept", post(accept))
}

/// Record that the caller accepted the license. The first timestamp is kept.
#[instrument(skip_all)]
async fn accept(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<LicenseAcceptance>, AppError> {
    let accepted_at = UserRepository::new(state.pool()).accept_license(user.id).await?;
    tracing::info!(user_id = %user.id, %accepted_at, "License accepted");

    Ok(Json(LicenseAcceptance {
        accepted: true,
        accepted_at,
    }))
}
