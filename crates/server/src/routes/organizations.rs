//! Organizations and their contacts.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use tracing::instrument;

use rich_habits_core::{OrganizationId, PermissionKind};

use crate::{
    db::OrganizationRepository,
    error::AppError,
    middleware::{RequireAuth, require_permission},
    models::{
        Contact, CreateContactInput, CreateOrganizationInput, Organization,
        UpdateOrganizationInput,
    },
    services::UploadSigner,
    state::AppState,
};

use super::found;

const RESOURCE: &str = "organizations";
const CONTACTS: &str = "contacts";

/// Build the organizations router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/organizations", get(list).post(create))
        .route(
            "/api/organizations/{id}",
            get(show).patch(update).delete(destroy),
        )
        .route(
            "/api/organizations/{id}/contacts",
            get(list_contacts).post(create_contact),
        )
}

/// Normalize a submitted logo reference; blank means no logo.
fn normalize_logo(uploads: &UploadSigner, logo: Option<&str>) -> Result<Option<String>, AppError> {
    match logo.map(str::trim) {
        None | Some("") => Ok(None),
        Some(reference) => Ok(Some(uploads.normalize_object_reference(reference)?)),
    }
}

#[instrument(skip_all)]
async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Organization>>, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Read).await?;
    let organizations = OrganizationRepository::new(state.pool()).list().await?;
    Ok(Json(organizations))
}

#[instrument(skip_all)]
async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrganizationId>,
) -> Result<Json<Organization>, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Read).await?;
    let organization = OrganizationRepository::new(state.pool()).get(id).await?;
    Ok(Json(found(organization, "Organization")?))
}

#[instrument(skip_all)]
async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(mut input): Json<CreateOrganizationInput>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Write).await?;

    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }
    input.logo_url = normalize_logo(state.uploads(), input.logo_url.as_deref())?;

    let organization = OrganizationRepository::new(state.pool()).create(&input).await?;
    tracing::info!(organization_id = %organization.id, "Organization created");
    Ok((StatusCode::CREATED, Json(organization)))
}

#[instrument(skip_all)]
async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrganizationId>,
    Json(mut input): Json<UpdateOrganizationInput>,
) -> Result<Json<Organization>, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Write).await?;

    if let Some(logo) = input.logo_url.take() {
        input.logo_url = Some(normalize_logo(state.uploads(), logo.as_deref())?);
    }

    let organization = OrganizationRepository::new(state.pool()).update(id, &input).await?;
    tracing::info!(organization_id = %organization.id, "Organization updated");
    Ok(Json(organization))
}

#[instrument(skip_all)]
async fn destroy(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrganizationId>,
) -> Result<StatusCode, AppError> {
    require_permission(&state, &user, RESOURCE, PermissionKind::Delete).await?;
    OrganizationRepository::new(state.pool()).delete(id).await?;
    tracing::info!(organization_id = %id, user_id = %user.id, "Organization deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all)]
async fn list_contacts(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrganizationId>,
) -> Result<Json<Vec<Contact>>, AppError> {
    require_permission(&state, &user, CONTACTS, PermissionKind::Read).await?;
    let contacts = OrganizationRepository::new(state.pool()).list_contacts(id).await?;
    Ok(Json(contacts))
}

#[instrument(skip_all)]
async fn create_contact(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrganizationId>,
    Json(input): Json<CreateContactInput>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&state, &user, CONTACTS, PermissionKind::Write).await?;

    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }

    let contact = OrganizationRepository::new(state.pool())
        .create_contact(id, &input)
        .await?;
    tracing::info!(organization_id = %id, contact_id = %contact.id, "Contact created");
    Ok((StatusCode::CREATED, Json(contact)))
}
