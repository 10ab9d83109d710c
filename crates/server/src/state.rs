//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Instant;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::permissions::Authorizer;
use crate::services::{RuntimeSettingsStore, UploadError, UploadSigner};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    authorizer: Authorizer,
    settings: RuntimeSettingsStore,
    uploads: UploadSigner,
    started_at: Instant,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the object storage configuration is unusable.
    pub fn new(
        config: ServerConfig,
        pool: PgPool,
        settings: RuntimeSettingsStore,
    ) -> Result<Self, UploadError> {
        let uploads = UploadSigner::new(&config.object_storage)?;
        let authorizer = Authorizer::new(pool.clone(), config.permission_cache_ttl);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                authorizer,
                settings,
                uploads,
                started_at: Instant::now(),
            }),
        })
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Permission checks against the role/resource matrix.
    #[must_use]
    pub fn authorizer(&self) -> &Authorizer {
        &self.inner.authorizer
    }

    /// Feature flags and the test-mode override.
    #[must_use]
    pub fn settings(&self) -> &RuntimeSettingsStore {
        &self.inner.settings
    }

    /// Object store URL signing.
    #[must_use]
    pub fn uploads(&self) -> &UploadSigner {
        &self.inner.uploads
    }

    /// Seconds since the state was built.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }
}
