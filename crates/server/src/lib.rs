//! Rich Habits OS API library.
//!
//! This crate provides the server as a library so the router can be
//! assembled in tests and the CLI can reuse the repositories.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod permissions;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, middleware::from_fn};
use tower_sessions::{SessionManagerLayer, SessionStore};

use state::AppState;

/// Assemble the application router with its request middleware.
///
/// Tracing and Sentry layers are added by the binary.
pub fn app<Store>(state: AppState, session_layer: SessionManagerLayer<Store>) -> Router
where
    Store: SessionStore + Clone,
{
    Router::new()
        .merge(routes::routes())
        .layer(from_fn(middleware::csrf_middleware))
        .layer(session_layer)
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(from_fn(middleware::request_id_middleware))
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use tower_sessions::MemoryStore;

    use crate::config::tests::test_config;
    use crate::services::{RuntimeSettings, RuntimeSettingsStore};

    /// A router whose pool never connects; handlers that reach it fail.
    fn test_app() -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/rich_habits_test")
            .unwrap();
        app_with_pool(pool)
    }

    fn app_with_pool(pool: sqlx::PgPool) -> Router {
        let config = test_config();
        let settings =
            RuntimeSettingsStore::with_settings(pool.clone(), config.environment, RuntimeSettings::default());
        let state = AppState::new(config, pool, settings).unwrap();
        app(state, SessionManagerLayer::new(MemoryStore::default()))
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_environment_and_version() {
        let response = test_app()
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let json = json_body(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["environment"], "development");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_unauthenticated_api_request_is_401() {
        let response = test_app()
            .oneshot(Request::builder().uri("/api/leads").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["loginUrl"], "/api/auth/login");
    }

    #[tokio::test]
    async fn test_csrf_token_required_for_mutations() {
        let app = test_app();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/auth/csrf-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();
        let token = json_body(response).await["csrfToken"]
            .as_str()
            .unwrap()
            .to_string();

        let logout = |csrf: Option<&str>| {
            let mut request = Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header(header::COOKIE, &cookie);
            if let Some(csrf) = csrf {
                request = request.header(middleware::CSRF_HEADER, csrf);
            }
            request.body(Body::empty()).unwrap()
        };

        let missing = app.clone().oneshot(logout(None)).await.unwrap();
        assert_eq!(missing.status(), StatusCode::FORBIDDEN);

        let wrong = app.clone().oneshot(logout(Some("not-the-token"))).await.unwrap();
        assert_eq!(wrong.status(), StatusCode::FORBIDDEN);

        let ok = app.oneshot(logout(Some(&token))).await.unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_public_object_is_404() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/public-objects/not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    fn first_cookie(response: &axum::response::Response) -> Option<String> {
        let value = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
        value.split(';').next().map(String::from)
    }

    #[tokio::test]
    #[ignore = "Requires RH_TEST_DATABASE_URL pointing at a disposable database"]
    async fn test_scoped_delete_of_another_users_order_is_404() {
        use rich_habits_core::{OrderStatus, PermissionFlags, UserRole};

        use crate::db::orders::OrderRepository;
        use crate::db::permissions::PermissionRepository;
        use crate::models::CreateOrderInput;
        use crate::services::AuthService;

        let Ok(url) = std::env::var("RH_TEST_DATABASE_URL") else {
            return;
        };
        let pool = PgPoolOptions::new().connect(&url).await.unwrap();
        db::MIGRATOR.run(&pool).await.unwrap();

        let permissions = PermissionRepository::new(&pool);
        permissions.seed_static().await.unwrap();
        let dataset = permissions.load_dataset().await.unwrap();
        let flags = PermissionFlags {
            can_view: true,
            can_create: true,
            can_edit: true,
            can_delete: true,
            page_visible: false,
        };
        permissions
            .upsert_permission(
                dataset.role("sales").unwrap().id,
                dataset.resource("orders").unwrap().id,
                flags,
            )
            .await
            .unwrap();

        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let password = "long-enough-password";
        let auth = AuthService::new(&pool);
        let me = auth
            .create_user(&format!("me-{suffix}@example.com"), "Me", UserRole::Sales, Some(password))
            .await
            .unwrap();
        let other = auth
            .create_user(&format!("other-{suffix}@example.com"), "Other", UserRole::Sales, None)
            .await
            .unwrap();

        let orders = OrderRepository::new(&pool);
        let order = |code: String| CreateOrderInput {
            order_code: code,
            organization_id: None,
            lead_id: None,
            salesperson_id: None,
            status: OrderStatus::default(),
            due_at: None,
            notes: None,
        };
        let theirs = orders.create(&order(format!("RH-T-{suffix}")), other.id).await.unwrap();
        let mine = orders.create(&order(format!("RH-M-{suffix}")), me.id).await.unwrap();

        let app = app_with_pool(pool.clone());
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/auth/csrf-token").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let mut cookie = first_cookie(&response).unwrap();
        let token = json_body(response).await["csrfToken"].as_str().unwrap().to_string();

        let login = serde_json::json!({ "email": me.email.as_str(), "password": password });
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/login")
                    .header(header::COOKIE, &cookie)
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(middleware::CSRF_HEADER, &token)
                    .header("x-forwarded-for", "203.0.113.7")
                    .body(Body::from(login.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        if let Some(cycled) = first_cookie(&response) {
            cookie = cycled;
        }

        let delete = |id: String| {
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/orders/{id}"))
                .header(header::COOKIE, &cookie)
                .header(middleware::CSRF_HEADER, &token)
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(delete(theirs.id.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(orders.get(theirs.id).await.unwrap().is_some());

        let response = app.oneshot(delete(mine.id.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(orders.get(mine.id).await.unwrap().is_none());
    }
}
