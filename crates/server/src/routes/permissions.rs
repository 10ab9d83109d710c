//! Permission matrix endpoints.

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use rich_habits_core::{PermissionFlags, ResourceId, RoleId, UserRole};

use crate::{
    db::PermissionRepository,
    error::AppError,
    middleware::{RequireAdmin, RequireAuth, effective_role},
    permissions::{Resource, Role, RolePermission},
    state::AppState,
};

/// The caller's effective permissions.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPermissionsResponse {
    /// Role the matrix was computed for (the test-mode role when active).
    pub role: UserRole,
    pub real_role: UserRole,
    pub resources: BTreeMap<String, PermissionFlags>,
}

/// A role with its permission rows.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<RolePermission>,
}

/// Request body for a custom role.
#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    pub description: Option<String>,
}

/// Build the permissions router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/permissions/user-permissions", get(user_permissions))
        .route("/api/permissions/roles", get(list_roles).post(create_role))
        .route(
            "/api/permissions/roles/{role_id}/resources/{resource_id}",
            put(upsert_permission),
        )
        .route("/api/permissions/resources", get(list_resources))
}

#[instrument(skip_all)]
async fn user_permissions(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Json<UserPermissionsResponse> {
    let role = effective_role(&state, &user);
    let resources = state.authorizer().effective_permissions(role).await;

    Json(UserPermissionsResponse {
        role,
        real_role: user.role,
        resources,
    })
}

#[instrument(skip_all)]
async fn list_roles(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<RoleWithPermissions>>, AppError> {
    let dataset = state.authorizer().try_dataset().await?;

    let roles = dataset
        .roles()
        .iter()
        .map(|role| RoleWithPermissions {
            role: role.clone(),
            permissions: dataset.permissions_for_role(role.id).cloned().collect(),
        })
        .collect();

    Ok(Json(roles))
}

#[instrument(skip_all)]
async fn create_role(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<CreateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = normalize_role_name(&body.name)?;

    let role = PermissionRepository::new(state.pool())
        .create_role(&name, body.description.as_deref())
        .await?;
    state.authorizer().invalidate().await;

    tracing::info!(admin_id = %admin.id, role = %role.name, "Role created");
    Ok((StatusCode::CREATED, Json(role)))
}

#[instrument(skip_all)]
async fn upsert_permission(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path((role_id, resource_id)): Path<(RoleId, ResourceId)>,
    Json(flags): Json<PermissionFlags>,
) -> Result<Json<RolePermission>, AppError> {
    let permission = PermissionRepository::new(state.pool())
        .upsert_permission(role_id, resource_id, flags)
        .await?;
    state.authorizer().invalidate().await;

    tracing::info!(
        admin_id = %admin.id,
        %role_id,
        %resource_id,
        ?flags,
        "Role permission updated"
    );
    Ok(Json(permission))
}

#[instrument(skip_all)]
async fn list_resources(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Resource>>, AppError> {
    let resources = PermissionRepository::new(state.pool()).list_resources().await?;
    Ok(Json(resources))
}

/// Role names are lowercase `snake_case`, up to 64 characters.
fn normalize_role_name(name: &str) -> Result<String, AppError> {
    let name = name.trim().to_lowercase();
    let valid = !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(AppError::BadRequest(
            "Role names may only contain letters, digits and underscores".to_string(),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_role_name() {
        assert_eq!(normalize_role_name(" Team_Lead ").unwrap(), "team_lead");
        assert!(normalize_role_name("").is_err());
        assert!(normalize_role_name("team lead").is_err());
        assert!(normalize_role_name("drop;table").is_err());
    }

    #[test]
    fn test_user_permissions_shape() {
        let mut resources = BTreeMap::new();
        resources.insert("orders".to_string(), PermissionFlags::READ_ONLY);
        let response = UserPermissionsResponse {
            role: UserRole::Sales,
            real_role: UserRole::Admin,
            resources,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["role"], "sales");
        assert_eq!(json["realRole"], "admin");
        assert_eq!(json["resources"]["orders"]["canView"], true);
        assert_eq!(json["resources"]["orders"]["canDelete"], false);
    }
}
