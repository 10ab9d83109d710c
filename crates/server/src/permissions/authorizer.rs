//! Database-backed authorization with a short-lived dataset cache.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::{debug, warn};

use rich_habits_core::{PermissionFlags, PermissionKind, UserRole};

use super::{PermissionDataset, resolver, seed};
use crate::db::{PermissionRepository, RepositoryError};

/// Authorizes requests against the permission matrix in `PostgreSQL`.
///
/// The dataset is cached for the configured TTL and dropped on every
/// permission write. If it cannot be loaded, decisions are made from the
/// seed alone and `write`/`delete` are always denied.
#[derive(Clone)]
pub struct Authorizer {
    pool: PgPool,
    cache: Cache<(), Arc<PermissionDataset>>,
}

impl Authorizer {
    /// Create an authorizer caching the dataset for `ttl`.
    #[must_use]
    pub fn new(pool: PgPool, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        Self { pool, cache }
    }

    /// Load the dataset, from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the dataset cannot be read.
    pub async fn try_dataset(&self) -> Result<Arc<PermissionDataset>, RepositoryError> {
        if let Some(dataset) = self.cache.get(&()).await {
            return Ok(dataset);
        }

        let dataset = Arc::new(PermissionRepository::new(&self.pool).load_dataset().await?);
        debug!(
            roles = dataset.roles().len(),
            resources = dataset.resources().len(),
            permissions = dataset.permissions().len(),
            "Loaded permission dataset"
        );
        self.cache.insert((), Arc::clone(&dataset)).await;
        Ok(dataset)
    }

    /// Load the dataset, or `None` (logged) when it is unavailable.
    pub async fn dataset(&self) -> Option<Arc<PermissionDataset>> {
        match self.try_dataset().await {
            Ok(dataset) => Some(dataset),
            Err(e) => {
                warn!(error = %e, "Permission dataset unavailable; using seed only");
                None
            }
        }
    }

    /// Drop the cached dataset so the next check reloads it.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&()).await;
    }

    /// Whether `role` may perform `kind` on `resource`.
    pub async fn check(&self, role: UserRole, resource: &str, kind: PermissionKind) -> bool {
        let dataset = self.dataset().await;
        decide(dataset.as_deref(), role, resource, kind)
    }

    /// Whether `role` sees every record of `resource`.
    pub async fn can_view_all(&self, role: UserRole, resource: &str) -> bool {
        let dataset = self.dataset().await;
        resolver::can_view_all(dataset.as_deref(), Some(role.as_str()), resource)
    }

    /// Effective flags of `role` on every known resource.
    pub async fn effective_permissions(&self, role: UserRole) -> BTreeMap<String, PermissionFlags> {
        let dataset = self.dataset().await;
        effective_matrix(dataset.as_deref(), role)
    }
}

/// A single guarded decision. Without a dataset, destructive kinds are denied.
pub(crate) fn decide(
    dataset: Option<&PermissionDataset>,
    role: UserRole,
    resource: &str,
    kind: PermissionKind,
) -> bool {
    if dataset.is_none() && matches!(kind, PermissionKind::Write | PermissionKind::Delete) {
        return false;
    }
    resolver::has_permission(dataset, Some(role.as_str()), resource, kind)
}

/// The flags of `role` on the seed resources plus any database resources.
pub(crate) fn effective_matrix(
    dataset: Option<&PermissionDataset>,
    role: UserRole,
) -> BTreeMap<String, PermissionFlags> {
    let mut names: Vec<&str> = seed::SYSTEM_RESOURCES.iter().map(|(name, _)| *name).collect();
    if let Some(dataset) = dataset {
        names.extend(dataset.resources().iter().map(|r| r.name.as_str()));
    }

    names
        .into_iter()
        .map(|name| {
            let mut flags =
                resolver::resolve(dataset, role.as_str(), name).unwrap_or(PermissionFlags::NONE);
            if dataset.is_none() {
                flags.can_create = false;
                flags.can_edit = false;
                flags.can_delete = false;
            }
            (name.to_string(), flags)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destructive_kinds_denied_without_dataset() {
        assert!(!decide(None, UserRole::Admin, "orders", PermissionKind::Write));
        assert!(!decide(None, UserRole::Admin, "orders", PermissionKind::Delete));
        assert!(decide(None, UserRole::Admin, "orders", PermissionKind::Read));
        assert!(decide(None, UserRole::Admin, "orders", PermissionKind::ViewAll));
    }

    #[test]
    fn test_destructive_kinds_allowed_with_dataset() {
        let empty = PermissionDataset::default();
        assert!(decide(Some(&empty), UserRole::Admin, "orders", PermissionKind::Delete));
    }

    #[test]
    fn test_effective_matrix_without_dataset_is_read_only() {
        let matrix = effective_matrix(None, UserRole::Admin);
        assert_eq!(matrix.len(), seed::SYSTEM_RESOURCES.len());
        for flags in matrix.values() {
            assert!(flags.can_view);
            assert!(flags.page_visible);
            assert!(!flags.can_create && !flags.can_edit && !flags.can_delete);
        }
    }

    #[test]
    fn test_effective_matrix_with_dataset_matches_seed() {
        let matrix = effective_matrix(Some(&PermissionDataset::default()), UserRole::Sales);
        assert_eq!(
            matrix.get("leads"),
            Some(&PermissionFlags::EDITOR)
        );
        assert_eq!(matrix.get("users"), Some(&PermissionFlags::NONE));
    }
}
