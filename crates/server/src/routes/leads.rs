//! Sales pipeline leads.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use tracing::instrument;

use rich_habits_core::{LeadId, PermissionKind};

use crate::{
    db::LeadRepository,
    error::AppError,
    middleware::{RequireAuth, record_scope, require_permission},
    models::{CreateLeadInput, Lead, LeadFilter, UpdateLeadInput},
    state::AppState,
};

use super::{ensure_in_scope, found};

const RESOURCE: &str = "leads";

/// Build the leads router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/leads", get(list).post(create))
        .route("/api/leads/{id}", get(show).patch(update).delete(destroy))
}

/// List leads, optionally by `?stage=`. Without view-all, only the caller's own.
#[instrument(skip_all)]
async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(mut filter): Query<LeadFilter>,
) -> Result<Json<Vec<Lead>>, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Read).await?;
    filter.owner_user_id = record_scope(&state, &user, RESOURCE).await;

    let leads = LeadRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(leads))
}

#[instrument(skip_all)]
async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<LeadId>,
) -> Result<Json<Lead>, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Read).await?;

    let lead = found(LeadRepository::new(state.pool()).get(id).await?, "Lead")?;
    ensure_in_scope(
        record_scope(&state, &user, RESOURCE).await,
        lead.owner_user_id,
        "Lead",
    )?;
    Ok(Json(lead))
}

#[instrument(skip_all)]
async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(mut input): Json<CreateLeadInput>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Write).await?;

    // Users limited to their own leads cannot assign one to someone else
    if record_scope(&state, &user, RESOURCE).await.is_some() {
        input.owner_user_id = None;
    }

    let lead = LeadRepository::new(state.pool()).create(&input, user.id).await?;
    tracing::info!(lead_id = %lead.id, user_id = %user.id, "Lead created");
    Ok((StatusCode::CREATED, Json(lead)))
}

#[instrument(skip_all)]
async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<LeadId>,
    Json(mut input): Json<UpdateLeadInput>,
) -> Result<Json<Lead>, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Write).await?;

    let repo = LeadRepository::new(state.pool());
    let existing = found(repo.get(id).await?, "Lead")?;
    let scope = record_scope(&state, &user, RESOURCE).await;
    ensure_in_scope(scope, existing.owner_user_id, "Lead")?;
    if scope.is_some() {
        input.owner_user_id = None;
    }

    let lead = repo.update(id, &input).await?;
    tracing::info!(lead_id = %lead.id, stage = %lead.stage, "Lead updated");
    Ok(Json(lead))
}

#[instrument(skip_all)]
async fn destroy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<LeadId>,
) -> Result<StatusCode, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Delete).await?;

    let repo = LeadRepository::new(state.pool());
    let existing = found(repo.get(id).await?, "Lead")?;
    ensure_in_scope(
        record_scope(&state, &user, RESOURCE).await,
        existing.owner_user_id,
        "Lead",
    )?;

    repo.delete(id).await?;
    tracing::info!(lead_id = %id, user_id = %user.id, "Lead deleted");
    Ok(StatusCode::NO_CONTENT)
}
