//! Feature flags and the test-mode role override.
//!
//! Loaded from the `settings` table at startup and held in application
//! state. Every setter writes the database first and only then updates the
//! in-memory copy, so a failed write leaves the running value unchanged.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use rich_habits_core::UserRole;

use crate::config::Environment;
use crate::db::settings::{self, SettingsError};

const FEATURE_FLAGS_KEY: &str = "feature_flags";
const TEST_MODE_ROLE_KEY: &str = "test_mode_role";

/// Errors from changing runtime settings.
#[derive(Debug, Error)]
pub enum RuntimeSettingsError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("test mode is not available in production")]
    TestModeInProduction,

    #[error("invalid feature flag name: {0}")]
    InvalidFlagName(String),
}

/// A snapshot of the current runtime settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSettings {
    pub feature_flags: BTreeMap<String, bool>,
    /// Role admins act as for permission checks; `None` when test mode is off.
    pub test_mode_role: Option<UserRole>,
}

impl RuntimeSettings {
    /// Whether a flag is on. Unknown flags are off.
    #[must_use]
    pub fn is_enabled(&self, flag: &str) -> bool {
        self.feature_flags.get(flag).copied().unwrap_or(false)
    }
}

/// Shared holder of [`RuntimeSettings`].
pub struct RuntimeSettingsStore {
    pool: PgPool,
    environment: Environment,
    current: RwLock<RuntimeSettings>,
    writer: Mutex<()>,
}

impl RuntimeSettingsStore {
    /// Load persisted settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the settings cannot be read or decoded.
    pub async fn load(pool: PgPool, environment: Environment) -> Result<Self, SettingsError> {
        let feature_flags = settings::get_typed::<BTreeMap<String, bool>>(&pool, FEATURE_FLAGS_KEY)
            .await?
            .unwrap_or_default();
        let test_mode_role = settings::get_typed::<Option<UserRole>>(&pool, TEST_MODE_ROLE_KEY)
            .await?
            .flatten();

        Ok(Self::with_settings(
            pool,
            environment,
            RuntimeSettings {
                feature_flags,
                test_mode_role,
            },
        ))
    }

    /// Build a store around already-known settings.
    #[must_use]
    pub fn with_settings(pool: PgPool, environment: Environment, settings: RuntimeSettings) -> Self {
        Self {
            pool,
            environment,
            current: RwLock::new(settings),
            writer: Mutex::new(()),
        }
    }

    /// Current settings.
    #[must_use]
    pub fn snapshot(&self) -> RuntimeSettings {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The role used for permission checks for a user whose real role is `real`.
    ///
    /// Only admins are affected, and never in production.
    #[must_use]
    pub fn effective_role(&self, real: UserRole) -> UserRole {
        if !real.is_admin() || self.environment.is_production() {
            return real;
        }
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .test_mode_role
            .unwrap_or(real)
    }

    /// Turn a feature flag on or off.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeSettingsError::InvalidFlagName` or a persistence error.
    pub async fn set_feature_flag(
        &self,
        name: &str,
        enabled: bool,
    ) -> Result<RuntimeSettings, RuntimeSettingsError> {
        validate_flag_name(name)?;

        let _guard = self.writer.lock().await;
        let mut flags = self.snapshot().feature_flags;
        flags.insert(name.to_string(), enabled);

        settings::set_typed(&self.pool, FEATURE_FLAGS_KEY, &flags).await?;
        info!(flag = name, enabled, "Feature flag updated");

        Ok(self.replace(|s| s.feature_flags = flags))
    }

    /// Set or clear the test-mode role.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeSettingsError::TestModeInProduction` when enabling in
    /// production, or a persistence error.
    pub async fn set_test_mode_role(
        &self,
        role: Option<UserRole>,
    ) -> Result<RuntimeSettings, RuntimeSettingsError> {
        if role.is_some() && self.environment.is_production() {
            return Err(RuntimeSettingsError::TestModeInProduction);
        }

        let _guard = self.writer.lock().await;
        settings::set_typed(&self.pool, TEST_MODE_ROLE_KEY, &role).await?;
        info!(role = ?role, "Test mode role updated");

        Ok(self.replace(|s| s.test_mode_role = role))
    }

    fn replace(&self, update: impl FnOnce(&mut RuntimeSettings)) -> RuntimeSettings {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        update(&mut current);
        current.clone()
    }
}

fn validate_flag_name(name: &str) -> Result<(), RuntimeSettingsError> {
    let valid = !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(RuntimeSettingsError::InvalidFlagName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn store(environment: Environment, test_mode_role: Option<UserRole>) -> RuntimeSettingsStore {
        // A lazy pool never connects unless a query runs.
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/rich_habits_test")
            .unwrap_or_else(|e| panic!("lazy pool: {e}"));
        RuntimeSettingsStore::with_settings(
            pool,
            environment,
            RuntimeSettings {
                feature_flags: BTreeMap::from([("bulk_import".to_string(), true)]),
                test_mode_role,
            },
        )
    }

    #[tokio::test]
    async fn test_override_applies_to_admins_only() {
        let store = store(Environment::Development, Some(UserRole::Sales));
        assert_eq!(store.effective_role(UserRole::Admin), UserRole::Sales);
        assert_eq!(store.effective_role(UserRole::Designer), UserRole::Designer);
    }

    #[tokio::test]
    async fn test_override_ignored_in_production() {
        let store = store(Environment::Production, Some(UserRole::Sales));
        assert_eq!(store.effective_role(UserRole::Admin), UserRole::Admin);
    }

    #[tokio::test]
    async fn test_enabling_test_mode_in_production_fails_before_writing() {
        let store = store(Environment::Production, None);
        let result = store.set_test_mode_role(Some(UserRole::Ops)).await;
        assert!(matches!(result, Err(RuntimeSettingsError::TestModeInProduction)));
        assert_eq!(store.snapshot().test_mode_role, None);
    }

    #[tokio::test]
    async fn test_invalid_flag_name_rejected() {
        let store = store(Environment::Development, None);
        let result = store.set_feature_flag("Bad Name", true).await;
        assert!(matches!(result, Err(RuntimeSettingsError::InvalidFlagName(_))));
    }

    #[test]
    fn test_unknown_flag_is_off() {
        let settings = RuntimeSettings::default();
        assert!(!settings.is_enabled("anything"));
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let settings = RuntimeSettings {
            feature_flags: BTreeMap::from([("bulk_import".to_string(), true)]),
            test_mode_role: Some(UserRole::Sales),
        };
        let json = serde_json::to_value(&settings).unwrap_or_default();
        assert_eq!(json["featureFlags"]["bulk_import"], true);
        assert_eq!(json["testModeRole"], "sales");
    }
}
