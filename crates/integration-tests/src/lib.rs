//! Integration tests for Rich Habits OS.
//!
//! # Running Tests
//!
//! ```bash
//! # Pure tests (no services needed)
//! cargo test -p rich-habits-integration-tests
//!
//! # Database and server tests
//! RH_TEST_DATABASE_URL=postgres://localhost/rich_habits_test \
//! RH_TEST_BASE_URL=http://localhost:3000 \
//!     cargo test -p rich-habits-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `permissions` - Resolution precedence over the seeded matrix
//! - `status_remap` - Legacy manufacturing status rewrite
//! - `uploads` - Canonical object references
//! - `data_dump` - Export/import row-count preservation
//! - `api` - HTTP smoke tests against a running server
//!
//! Ignored tests wipe the database they point at. Never aim them at real data.

use rich_habits_core::{ResourceId, RoleId, RolePermissionId, UserRole};
use rich_habits_server::permissions::seed::{SYSTEM_RESOURCES, entries};
use rich_habits_server::permissions::{PermissionDataset, Resource, Role, RolePermission};
use secrecy::SecretString;

/// Connection string for the throwaway test database, if configured.
#[must_use]
pub fn test_database_url() -> Option<SecretString> {
    std::env::var("RH_TEST_DATABASE_URL")
        .ok()
        .map(SecretString::from)
}

/// Base URL of a running server for HTTP tests.
#[must_use]
pub fn test_base_url() -> String {
    std::env::var("RH_TEST_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A dataset holding exactly the built-in permission matrix, as it looks
/// after a fresh seed.
#[must_use]
pub fn seeded_dataset() -> PermissionDataset {
    DatasetBuilder::system().with_seed_rows().build()
}

/// Hand-built permission data for resolution tests.
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    roles: Vec<Role>,
    resources: Vec<Resource>,
    permissions: Vec<RolePermission>,
}

impl DatasetBuilder {
    /// Every system role and system resource, with no permission rows.
    #[must_use]
    pub fn system() -> Self {
        let mut builder = Self::default();
        for role in UserRole::ALL {
            builder = builder.role(role.as_str(), true);
        }
        for (name, _) in SYSTEM_RESOURCES {
            builder = builder.resource(name);
        }
        builder
    }

    /// Add a role row.
    #[must_use]
    pub fn role(mut self, name: &str, is_system: bool) -> Self {
        let id = RoleId::new(next_id(self.roles.len()));
        self.roles.push(Role {
            id,
            name: name.to_string(),
            description: None,
            is_system,
        });
        self
    }

    /// Add a resource row.
    #[must_use]
    pub fn resource(mut self, name: &str) -> Self {
        let id = ResourceId::new(next_id(self.resources.len()));
        self.resources.push(Resource {
            id,
            name: name.to_string(),
            description: None,
        });
        self
    }

    /// Add one permission row per seed entry.
    #[must_use]
    pub fn with_seed_rows(mut self) -> Self {
        for (role, resource, flags) in entries() {
            self = self.permission(role.as_str(), resource, flags);
        }
        self
    }

    /// Add a permission row. Unknown role or resource names are ignored.
    #[must_use]
    pub fn permission(
        mut self,
        role: &str,
        resource: &str,
        flags: rich_habits_core::PermissionFlags,
    ) -> Self {
        let role_id = self.roles.iter().find(|r| r.name == role).map(|r| r.id);
        let resource_id = self
            .resources
            .iter()
            .find(|r| r.name == resource)
            .map(|r| r.id);
        if let (Some(role_id), Some(resource_id)) = (role_id, resource_id) {
            let id = RolePermissionId::new(next_id(self.permissions.len()));
            self.permissions.push(RolePermission {
                id,
                role_id,
                resource_id,
                flags,
            });
        }
        self
    }

    #[must_use]
    pub fn build(self) -> PermissionDataset {
        PermissionDataset::new(self.roles, self.resources, self.permissions)
    }
}

fn next_id(len: usize) -> i32 {
    i32::try_from(len).map_or(i32::MAX, |n| n + 1)
}
