//! Hub tiles: live record counts by workflow stage.
//!
//! A tile is only returned for resources the caller may read, and counts
//! follow the same record scope as the matching list endpoint.

use std::collections::BTreeMap;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use tracing::instrument;

use rich_habits_core::{PermissionKind, UserId};

use crate::{
    db::{DesignJobRepository, LeadRepository, ManufacturingRepository, OrderRepository, RepositoryError},
    error::AppError,
    middleware::{RequireAuth, effective_role, record_scope, require_permission},
    models::CurrentUser,
    state::AppState,
};

type Tile = BTreeMap<String, i64>;

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubCounts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leads_by_stage: Option<Tile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orders_by_status: Option<Tile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub design_jobs_by_status: Option<Tile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturing_by_status: Option<Tile>,
}

/// Build the hub router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/hub/counts", get(counts))
}

/// `None` when the caller cannot read `resource`, otherwise its record scope.
async fn tile_scope(
    state: &AppState,
    user: &CurrentUser,
    resource: &str,
) -> Option<Option<UserId>> {
    let role = effective_role(state, user);
    if state.authorizer().check(role, resource, PermissionKind::Read).await {
        Some(record_scope(state, user, resource).await)
    } else {
        None
    }
}

async fn tile<F, Fut>(scope: Option<Option<UserId>>, count: F) -> Result<Option<Tile>, RepositoryError>
where
    F: FnOnce(Option<UserId>) -> Fut,
    Fut: Future<Output = Result<Vec<(String, i64)>, RepositoryError>>,
{
    match scope {
        Some(owner) => Ok(Some(count(owner).await?.into_iter().collect())),
        None => Ok(None),
    }
}

#[instrument(skip_all)]
async fn counts(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<HubCounts>, AppError> {
    require_permission(&state, &user, "dashboard", PermissionKind::Read).await?;

    let pool = state.pool();
    let leads = LeadRepository::new(pool);
    let orders = OrderRepository::new(pool);
    let design_jobs = DesignJobRepository::new(pool);
    let manufacturing = ManufacturingRepository::new(pool);

    let leads_scope = tile_scope(&state, &user, "leads").await;
    let orders_scope = tile_scope(&state, &user, "orders").await;
    let design_jobs_scope = tile_scope(&state, &user, "design_jobs").await;
    let manufacturing_scope = tile_scope(&state, &user, "manufacturing").await;

    let (leads_by_stage, orders_by_status, design_jobs_by_status, manufacturing_by_status) =
        tokio::try_join!(
            tile(leads_scope, |owner| leads.count_by_stage(owner)),
            tile(orders_scope, |owner| orders.count_by_status(owner)),
            tile(design_jobs_scope, |owner| design_jobs.count_by_status(owner)),
            tile(manufacturing_scope, |owner| manufacturing.count_by_status(owner)),
        )?;

    Ok(Json(HubCounts {
        leads_by_stage,
        orders_by_status,
        design_jobs_by_status,
        manufacturing_by_status,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_denied_tile_is_omitted() {
        let counts = HubCounts {
            orders_by_status: tile(Some(None), |_| async { Ok(vec![("new".to_string(), 2)]) })
                .await
                .unwrap(),
            leads_by_stage: tile(None, |_| async { Ok(vec![("lead".to_string(), 9)]) })
                .await
                .unwrap(),
            ..HubCounts::default()
        };

        let json = serde_json::to_value(&counts).unwrap();
        assert_eq!(json["ordersByStatus"]["new"], 2);
        assert!(json.get("leadsByStage").is_none());
        assert!(json.get("manufacturingByStatus").is_none());
    }

    #[tokio::test]
    async fn test_scoped_tile_passes_owner_through() {
        let owner = UserId::new(4);
        let tile = tile(Some(Some(owner)), |seen| async move {
            Ok(vec![(seen.map(|id| id.to_string()).unwrap_or_default(), 1)])
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(tile.get("4"), Some(&1));
    }
}
