//! Direct-to-storage uploads.
//!
//! The client asks for a signed PUT URL, uploads the bytes straight to the
//! object store, then completes the upload to get the canonical
//! `/public-objects/<uploadId>` path. Only that path is ever persisted.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::Redirect,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use rich_habits_core::UploadStatus;

use crate::{
    db::UploadRepository,
    error::AppError,
    middleware::RequireAuth,
    services::{
        UploadError, UploadSigner,
        uploads::{PUBLIC_OBJECTS_PREFIX, public_object_path},
    },
    state::AppState,
};

/// Image types accepted for upload.
const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "image/svg+xml",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub content_type: String,
}

#[derive(Debug, Serialize)]
pub struct UploadTicket {
    #[serde(rename = "uploadURL")]
    pub upload_url: String,
    #[serde(rename = "uploadId")]
    pub upload_id: String,
}

/// Completion request. `uploadId` is preferred; `uploadURL` is accepted from
/// older clients and reduced to its id.
#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    #[serde(rename = "uploadId")]
    pub upload_id: Option<String>,
    #[serde(rename = "uploadURL")]
    pub upload_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteResponse {
    pub object_path: String,
}

/// Build the uploads router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/upload/image", post(request_upload))
        .route("/api/upload/complete", post(complete_upload))
        .route("/public-objects/{upload_id}", get(public_object))
}

/// The canonical object path for a completion request.
///
/// # Errors
///
/// Returns `UploadError::InvalidId` when neither field is usable and
/// `UploadError::InvalidReference` for a URL outside the object store.
pub fn resolve_object_path(
    signer: &UploadSigner,
    request: &CompleteRequest,
) -> Result<String, UploadError> {
    match (&request.upload_id, &request.upload_url) {
        (Some(id), _) => public_object_path(id.trim()),
        (None, Some(url)) => {
            let path = signer.normalize_object_reference(url)?;
            if path.starts_with(PUBLIC_OBJECTS_PREFIX) {
                Ok(path)
            } else {
                Err(UploadError::InvalidReference)
            }
        }
        (None, None) => Err(UploadError::InvalidId),
    }
}

fn upload_uuid(object_path: &str) -> Option<Uuid> {
    object_path
        .strip_prefix(PUBLIC_OBJECTS_PREFIX)
        .and_then(|id| Uuid::parse_str(id).ok())
}

#[instrument(skip_all)]
async fn request_upload(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<UploadRequest>,
) -> Result<Json<UploadTicket>, AppError> {
    let content_type = body.content_type.trim().to_ascii_lowercase();
    if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Unsupported content type: {content_type}"
        )));
    }

    let id = Uuid::new_v4();
    UploadRepository::new(state.pool())
        .create(id, user.id, &content_type)
        .await?;
    let upload_url = state.uploads().sign_put(&id.to_string(), Utc::now())?;

    tracing::info!(upload_id = %id, user_id = %user.id, %content_type, "Upload ticket issued");
    Ok(Json(UploadTicket {
        upload_url: upload_url.to_string(),
        upload_id: id.to_string(),
    }))
}

#[instrument(skip_all)]
async fn complete_upload(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CompleteRequest>,
) -> Result<Json<CompleteResponse>, AppError> {
    let object_path = resolve_object_path(state.uploads(), &body)?;
    let id = upload_uuid(&object_path).ok_or(UploadError::InvalidId)?;

    UploadRepository::new(state.pool()).complete(id, user.id).await?;

    tracing::info!(upload_id = %id, user_id = %user.id, "Upload completed");
    Ok(Json(CompleteResponse { object_path }))
}

/// Redirect to a freshly signed download URL for a completed upload.
#[instrument(skip_all)]
async fn public_object(
    State(state): State<AppState>,
    Path(upload_id): Path<String>,
) -> Result<Redirect, AppError> {
    let not_found = || AppError::NotFound("Object not found".to_string());

    let id = Uuid::parse_str(&upload_id).map_err(|_| not_found())?;
    let upload = UploadRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(not_found)?;
    if upload.status != UploadStatus::Completed {
        return Err(not_found());
    }

    let url = state.uploads().sign_get(&id.to_string(), Utc::now())?;
    Ok(Redirect::temporary(url.as_str()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;

    fn signer() -> UploadSigner {
        UploadSigner::new(&test_config().object_storage).unwrap()
    }

    #[test]
    fn test_upload_id_wins_over_signed_url() {
        let request = CompleteRequest {
            upload_id: Some("abc123".to_string()),
            upload_url: Some("https://signed.example/abc?X-Amz-Signature=f00".to_string()),
        };
        assert_eq!(
            resolve_object_path(&signer(), &request).unwrap(),
            "/public-objects/abc123"
        );
    }

    #[test]
    fn test_signed_url_alone_is_reduced_to_path() {
        let signer = signer();
        let url = signer.sign_put("d3b07384", Utc::now()).unwrap();
        let request = CompleteRequest {
            upload_id: None,
            upload_url: Some(url.to_string()),
        };
        assert_eq!(
            resolve_object_path(&signer, &request).unwrap(),
            "/public-objects/d3b07384"
        );
    }

    #[test]
    fn test_foreign_signed_url_rejected() {
        let request = CompleteRequest {
            upload_id: None,
            upload_url: Some("https://elsewhere.example/x?signature=abc".to_string()),
        };
        assert!(matches!(
            resolve_object_path(&signer(), &request),
            Err(UploadError::SignedUrl)
        ));
    }

    #[test]
    fn test_missing_reference_rejected() {
        let request = CompleteRequest {
            upload_id: None,
            upload_url: None,
        };
        assert!(resolve_object_path(&signer(), &request).is_err());
    }

    #[test]
    fn test_ticket_field_names() {
        let ticket = UploadTicket {
            upload_url: "https://storage.test/u".to_string(),
            upload_id: "abc123".to_string(),
        };
        let json = serde_json::to_value(&ticket).unwrap();
        assert_eq!(json["uploadURL"], "https://storage.test/u");
        assert_eq!(json["uploadId"], "abc123");
    }

    #[test]
    fn test_upload_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(upload_uuid(&format!("/public-objects/{id}")), Some(id));
        assert_eq!(upload_uuid("/public-objects/abc123"), None);
    }
}
