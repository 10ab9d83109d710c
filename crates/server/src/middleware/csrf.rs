//! CSRF protection for the JSON API.
//!
//! Each session carries a random 256-bit token. The single-page app reads
//! it from `GET /api/auth/csrf-token` and echoes it back in the
//! `X-CSRF-Token` header on every state-changing `/api/` request,
//! including login.

use axum::{
    Json,
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde_json::json;
use subtle::ConstantTimeEq;
use tower_sessions::Session;

use crate::models::session_keys;

/// Request header carrying the token.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Token size in bytes (256 bits).
const TOKEN_BYTES: usize = 32;

/// Generate a fresh URL-safe token.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Return the session's token, creating one if it has none yet.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
pub async fn ensure_csrf_token(session: &Session) -> Result<String, tower_sessions::session::Error> {
    if let Some(token) = session.get::<String>(session_keys::CSRF_TOKEN).await? {
        return Ok(token);
    }
    let token = generate_token();
    session.insert(session_keys::CSRF_TOKEN, &token).await?;
    Ok(token)
}

/// Whether a request must present a token.
fn requires_token(method: &Method, path: &str) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    ) && path.starts_with("/api/")
}

/// Constant-time token comparison.
fn tokens_match(expected: &str, presented: &str) -> bool {
    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}

fn forbidden() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "message": "Invalid or missing CSRF token" })),
    )
        .into_response()
}

/// Reject state-changing API requests without a matching `X-CSRF-Token`.
///
/// Must run inside the session layer.
pub async fn csrf_middleware(session: Session, request: Request, next: Next) -> Response {
    if !requires_token(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    let presented = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let expected = match session.get::<String>(session_keys::CSRF_TOKEN).await {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read CSRF token from session");
            None
        }
    };

    match (expected, presented) {
        (Some(expected), Some(presented)) if tokens_match(&expected, &presented) => {
            next.run(request).await
        }
        _ => {
            tracing::debug!(path = %request.uri().path(), "CSRF check failed");
            forbidden()
        }
    }
}
