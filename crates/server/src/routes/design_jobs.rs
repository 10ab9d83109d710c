//! Design job queue and designer assignment.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use tracing::instrument;

use rich_habits_core::{DesignJobId, NotificationType, PermissionKind, UserId, UserRole};

use crate::{
    db::{DesignJobRepository, NotificationRepository, UserRepository},
    error::AppError,
    middleware::{RequireAuth, record_scope, require_permission},
    models::{
        CreateDesignJobInput, CreateNotification, DesignJob, DesignJobFilter,
        DesignerAvailability, UpdateDesignJobInput, partition_designers,
    },
    state::AppState,
};

use super::{ensure_in_scope, found, owner_for_new_record};

const RESOURCE: &str = "design_jobs";

/// Build the design jobs router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/design-jobs", get(list).post(create))
        .route("/api/design-jobs/designers", get(designers))
        .route(
            "/api/design-jobs/{id}",
            get(show).patch(update).delete(destroy),
        )
}

/// The notification sent to a designer when a job is assigned to them.
pub(crate) fn assignment_notification(job: &DesignJob, designer: UserId) -> CreateNotification {
    let brief = job.brief.trim();
    let message = if brief.is_empty() {
        format!("Design job #{} has been assigned to you.", job.id)
    } else {
        format!("Design job #{} has been assigned to you: {brief}", job.id)
    };

    CreateNotification {
        user_id: designer,
        kind: NotificationType::Design,
        title: "New design job assigned".to_string(),
        message,
        link: Some(format!("/designer/jobs/{}", job.id)),
        metadata: Some(json!({ "designJobId": job.id })),
    }
}

/// The designer to notify after a write, if the assignment changed.
fn newly_assigned(previous: Option<UserId>, job: &DesignJob) -> Option<UserId> {
    job.assigned_designer_id.filter(|&designer| previous != Some(designer))
}

/// Notify without failing the request that triggered it.
async fn notify_assignment(state: &AppState, job: &DesignJob, designer: UserId) {
    let notification = assignment_notification(job, designer);
    match NotificationRepository::new(state.pool()).create(&notification).await {
        Ok(created) => tracing::info!(
            design_job_id = %job.id,
            designer_id = %designer,
            notification_id = %created.id,
            "Designer notified of assignment"
        ),
        Err(e) => tracing::warn!(
            design_job_id = %job.id,
            designer_id = %designer,
            error = %e,
            "Failed to notify designer of assignment"
        ),
    }
}

/// List jobs by `?status=`. Without view-all, only jobs assigned to the caller.
#[instrument(skip_all)]
async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(mut filter): Query<DesignJobFilter>,
) -> Result<Json<Vec<DesignJob>>, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Read).await?;
    filter.assigned_designer_id = record_scope(&state, &user, RESOURCE).await;

    let jobs = DesignJobRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(jobs))
}

/// Active designers split into busy (holding assigned or in-progress work) and available.
#[instrument(skip_all)]
async fn designers(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<DesignerAvailability>, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::ViewAll).await?;

    let designers: Vec<_> = UserRepository::new(state.pool())
        .list(Some(UserRole::Designer))
        .await?
        .into_iter()
        .filter(|designer| designer.is_active)
        .collect();
    let jobs = DesignJobRepository::new(state.pool())
        .list_active_assignments()
        .await?;

    Ok(Json(partition_designers(designers, &jobs)))
}

#[instrument(skip_all)]
async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DesignJobId>,
) -> Result<Json<DesignJob>, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Read).await?;

    let job = found(DesignJobRepository::new(state.pool()).get(id).await?, "Design job")?;
    ensure_in_scope(
        record_scope(&state, &user, RESOURCE).await,
        job.assigned_designer_id,
        "Design job",
    )?;
    Ok(Json(job))
}

#[instrument(skip_all)]
async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(mut input): Json<CreateDesignJobInput>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Write).await?;

    input.assigned_designer_id = owner_for_new_record(
        record_scope(&state, &user, RESOURCE).await,
        input.assigned_designer_id,
    );

    let job = DesignJobRepository::new(state.pool()).create(&input).await?;
    tracing::info!(design_job_id = %job.id, user_id = %user.id, "Design job created");

    if let Some(designer) = newly_assigned(None, &job) {
        notify_assignment(&state, &job, designer).await;
    }

    Ok((StatusCode::CREATED, Json(job)))
}

#[instrument(skip_all)]
async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DesignJobId>,
    Json(mut input): Json<UpdateDesignJobInput>,
) -> Result<Json<DesignJob>, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Write).await?;

    let repo = DesignJobRepository::new(state.pool());
    let existing = found(repo.get(id).await?, "Design job")?;
    let scope = record_scope(&state, &user, RESOURCE).await;
    ensure_in_scope(scope, existing.assigned_designer_id, "Design job")?;

    // Designers working their own queue cannot reassign jobs
    if scope.is_some() {
        input.assigned_designer_id = None;
    }

    let job = repo.update(id, &input).await?;
    tracing::info!(design_job_id = %job.id, status = %job.status, "Design job updated");

    if let Some(designer) = newly_assigned(existing.assigned_designer_id, &job) {
        notify_assignment(&state, &job, designer).await;
    }

    Ok(Json(job))
}

#[instrument(skip_all)]
async fn destroy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DesignJobId>,
) -> Result<StatusCode, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Delete).await?;

    let repo = DesignJobRepository::new(state.pool());
    let existing = found(repo.get(id).await?, "Design job")?;
    ensure_in_scope(
        record_scope(&state, &user, RESOURCE).await,
        existing.assigned_designer_id,
        "Design job",
    )?;

    repo.delete(id).await?;
    tracing::info!(design_job_id = %id, user_id = %user.id, "Design job deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rich_habits_core::DesignJobStatus;

    fn job(designer: Option<i32>, brief: &str) -> DesignJob {
        DesignJob {
            id: DesignJobId::new(7),
            order_id: None,
            organization_id: None,
            assigned_designer_id: designer.map(UserId::new),
            status: DesignJobStatus::Assigned,
            brief: brief.to_string(),
            due_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_assignment_notification() {
        let notification = assignment_notification(&job(Some(3), "Eagles singlet"), UserId::new(3));

        assert_eq!(notification.user_id, UserId::new(3));
        assert_eq!(notification.kind, NotificationType::Design);
        assert!(notification.message.contains("Eagles singlet"));
        assert_eq!(notification.link.as_deref(), Some("/designer/jobs/7"));
        assert_eq!(
            notification.metadata,
            Some(json!({ "designJobId": 7 }))
        );
    }

    #[test]
    fn test_newly_assigned() {
        assert_eq!(newly_assigned(None, &job(Some(3), "")), Some(UserId::new(3)));
        assert_eq!(
            newly_assigned(Some(UserId::new(2)), &job(Some(3), "")),
            Some(UserId::new(3))
        );
        assert_eq!(newly_assigned(Some(UserId::new(3)), &job(Some(3), "")), None);
        assert_eq!(newly_assigned(Some(UserId::new(3)), &job(None, "")), None);
    }
}
