//! Manufacturing workflow.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use tracing::instrument;

use rich_habits_core::{ManufacturingId, ManufacturingStatus, PermissionKind, UserRole};

use crate::{
    db::ManufacturingRepository,
    error::AppError,
    middleware::{RequireAuth, effective_role, record_scope, require_permission},
    models::{
        CreateManufacturingInput, CreateManufacturingUpdateInput, CurrentUser, Manufacturing,
        ManufacturingFilter, ManufacturingUpdate, UpdateManufacturingInput,
    },
    state::AppState,
};

use super::{ensure_in_scope, found, owner_for_new_record};

const RESOURCE: &str = "manufacturing";

/// Result of posting a status update.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateResponse {
    pub manufacturing: Manufacturing,
    pub update: ManufacturingUpdate,
}

/// Build the manufacturing router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/manufacturing", get(list).post(create))
        .route("/api/manufacturing/{id}", get(show).patch(update))
        .route(
            "/api/manufacturing/{id}/updates",
            get(list_updates).post(add_update),
        )
}

/// Moving backwards through the workflow is reserved for admins.
fn check_transition(
    role: UserRole,
    current: ManufacturingStatus,
    target: ManufacturingStatus,
) -> Result<(), AppError> {
    if current.is_regression_to(target) && !role.is_admin() {
        return Err(AppError::Forbidden(format!(
            "Only admins can move manufacturing back from {current} to {target}"
        )));
    }
    Ok(())
}

async fn visible_record(
    state: &AppState,
    user: &CurrentUser,
    id: ManufacturingId,
) -> Result<Manufacturing, AppError> {
    let record = found(
        ManufacturingRepository::new(state.pool()).get(id).await?,
        "Manufacturing record",
    )?;
    ensure_in_scope(
        record_scope(state, user, RESOURCE).await,
        record.manufacturer_id,
        "Manufacturing record",
    )?;
    Ok(record)
}

/// List records by `?status=`. Without view-all, only the caller's assignments.
#[instrument(skip_all)]
async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(mut filter): Query<ManufacturingFilter>,
) -> Result<Json<Vec<Manufacturing>>, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Read).await?;
    filter.manufacturer_id = record_scope(&state, &user, RESOURCE).await;

    let records = ManufacturingRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(records))
}

#[instrument(skip_all)]
async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ManufacturingId>,
) -> Result<Json<Manufacturing>, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Read).await?;
    Ok(Json(visible_record(&state, &user, id).await?))
}

#[instrument(skip_all)]
async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(mut input): Json<CreateManufacturingInput>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Write).await?;

    input.manufacturer_id = owner_for_new_record(
        record_scope(&state, &user, RESOURCE).await,
        input.manufacturer_id,
    );

    let record = ManufacturingRepository::new(state.pool()).create(&input).await?;
    tracing::info!(
        manufacturing_id = %record.id,
        order_id = %record.order_id,
        "Manufacturing record created"
    );
    Ok((StatusCode::CREATED, Json(record)))
}

#[instrument(skip_all)]
async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ManufacturingId>,
    Json(mut input): Json<UpdateManufacturingInput>,
) -> Result<Json<Manufacturing>, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Write).await?;
    visible_record(&state, &user, id).await?;

    // Manufacturers limited to their own records cannot hand them off
    if record_scope(&state, &user, RESOURCE).await.is_some() {
        input.manufacturer_id = None;
    }

    let record = ManufacturingRepository::new(state.pool()).update(id, &input).await?;
    tracing::info!(manufacturing_id = %record.id, "Manufacturing record updated");
    Ok(Json(record))
}

#[instrument(skip_all)]
async fn list_updates(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ManufacturingId>,
) -> Result<Json<Vec<ManufacturingUpdate>>, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Read).await?;
    visible_record(&state, &user, id).await?;

    let updates = ManufacturingRepository::new(state.pool()).list_updates(id).await?;
    Ok(Json(updates))
}

/// Append a status update and move the record to that status.
#[instrument(skip_all)]
async fn add_update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ManufacturingId>,
    Json(input): Json<CreateManufacturingUpdateInput>,
) -> Result<(StatusCode, Json<StatusUpdateResponse>), AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Write).await?;

    let current = visible_record(&state, &user, id).await?;
    check_transition(effective_role(&state, &user), current.status, input.status)?;

    let note = input.note.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let (manufacturing, update) = ManufacturingRepository::new(state.pool())
        .add_update(id, input.status, note, user.id)
        .await?;

    tracing::info!(
        manufacturing_id = %id,
        from = %current.status,
        to = %manufacturing.status,
        user_id = %user.id,
        "Manufacturing status updated"
    );
    Ok((
        StatusCode::CREATED,
        Json(StatusUpdateResponse {
            manufacturing,
            update,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_moves_allowed_for_everyone() {
        assert!(
            check_transition(
                UserRole::Manufacturer,
                ManufacturingStatus::CuttingSewing,
                ManufacturingStatus::Printing,
            )
            .is_ok()
        );
        assert!(
            check_transition(
                UserRole::Manufacturer,
                ManufacturingStatus::Printing,
                ManufacturingStatus::Printing,
            )
            .is_ok()
        );
    }

    #[test]
    fn test_regression_is_admin_only() {
        let result = check_transition(
            UserRole::Ops,
            ManufacturingStatus::Packaging,
            ManufacturingStatus::CuttingSewing,
        );
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        assert!(
            check_transition(
                UserRole::Admin,
                ManufacturingStatus::Packaging,
                ManufacturingStatus::CuttingSewing,
            )
            .is_ok()
        );
    }
}
