//! Liveness and readiness probes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use crate::state::AppState;

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    /// Seconds since startup.
    pub uptime: u64,
    pub environment: &'static str,
    pub version: &'static str,
}

/// Individual readiness checks.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReadyChecks {
    pub database: bool,
    pub session: bool,
    pub auth: bool,
}

impl ReadyChecks {
    /// Whether every check passed.
    #[must_use]
    pub const fn all_ok(&self) -> bool {
        self.database && self.session && self.auth
    }
}

/// Readiness response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub checks: ReadyChecks,
}

impl ReadyResponse {
    fn new(checks: ReadyChecks) -> Self {
        Self {
            status: if checks.all_ok() { "ready" } else { "not_ready" },
            timestamp: Utc::now(),
            checks,
        }
    }
}

/// Build the health router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/ready", get(ready))
}

/// Liveness: the process is up. Does not touch dependencies.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        uptime: state.uptime_secs(),
        environment: state.config().environment.as_str(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness: database reachable, session table present, permissions loadable.
///
/// Returns 503 when any check fails.
#[instrument(skip_all)]
async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let database = sqlx::query("SELECT 1").execute(state.pool()).await.is_ok();

    let session = sqlx::query_scalar::<_, bool>(
        "SELECT to_regclass('tower_sessions.session') IS NOT NULL",
    )
    .fetch_one(state.pool())
    .await
    .unwrap_or(false);

    let auth = match state.authorizer().try_dataset().await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness: permission dataset failed to load");
            false
        }
    };

    let response = ReadyResponse::new(ReadyChecks {
        database,
        session,
        auth,
    });
    let status = if response.checks.all_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_status_reflects_checks() {
        let ok = ReadyResponse::new(ReadyChecks {
            database: true,
            session: true,
            auth: true,
        });
        assert_eq!(ok.status, "ready");

        let degraded = ReadyResponse::new(ReadyChecks {
            database: true,
            session: false,
            auth: true,
        });
        assert_eq!(degraded.status, "not_ready");
        assert!(!degraded.checks.all_ok());
    }
}
