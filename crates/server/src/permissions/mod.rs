//! Role/resource permission resolution.
//!
//! Access for a (role, resource, kind) triple is resolved with one
//! precedence: the database row, then the built-in seed for system roles
//! on system resources, then deny. The seed is also written into the
//! database (see [`seed`]) so a fully seeded install never reaches it.
//!
//! - [`resolver`] holds the pure decision functions over a loaded
//!   [`PermissionDataset`] (or none).
//! - [`Authorizer`] loads the dataset from `PostgreSQL` through a short TTL
//!   cache and guards handlers with it.

mod authorizer;
pub mod resolver;
pub mod seed;

use std::collections::HashMap;

use serde::Serialize;

use rich_habits_core::{PermissionFlags, ResourceId, RoleId, RolePermissionId};

pub use authorizer::Authorizer;
pub use resolver::{can_view_all, has_permission, is_page_visible, translate_permission_to_db};

/// A role row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: Option<String>,
    /// Built-in roles matching a `UserRole` variant.
    pub is_system: bool,
}

/// A resource row: a named page or data domain.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    pub description: Option<String>,
}

/// One (role, resource) permission row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePermission {
    pub id: RolePermissionId,
    pub role_id: RoleId,
    pub resource_id: ResourceId,
    #[serde(flatten)]
    pub flags: PermissionFlags,
}

/// Roles, resources and permission rows as loaded from the database.
#[derive(Debug, Clone, Default)]
pub struct PermissionDataset {
    roles: Vec<Role>,
    resources: Vec<Resource>,
    permissions: Vec<RolePermission>,
    role_index: HashMap<String, usize>,
    resource_index: HashMap<String, usize>,
    permission_index: HashMap<(RoleId, ResourceId), usize>,
}

impl PermissionDataset {
    /// Build a dataset and its lookup indexes.
    ///
    /// A duplicated (role, resource) pair keeps the last row; the database
    /// enforces uniqueness so this only matters for hand-built fixtures.
    #[must_use]
    pub fn new(roles: Vec<Role>, resources: Vec<Resource>, permissions: Vec<RolePermission>) -> Self {
        let role_index = roles
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.clone(), i))
            .collect();
        let resource_index = resources
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.clone(), i))
            .collect();
        let permission_index = permissions
            .iter()
            .enumerate()
            .map(|(i, p)| ((p.role_id, p.resource_id), i))
            .collect();

        Self {
            roles,
            resources,
            permissions,
            role_index,
            resource_index,
            permission_index,
        }
    }

    #[must_use]
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    #[must_use]
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    #[must_use]
    pub fn permissions(&self) -> &[RolePermission] {
        &self.permissions
    }

    /// Look up a role row by name.
    #[must_use]
    pub fn role(&self, name: &str) -> Option<&Role> {
        self.role_index.get(name).and_then(|&i| self.roles.get(i))
    }

    /// Look up a resource row by name.
    #[must_use]
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resource_index
            .get(name)
            .and_then(|&i| self.resources.get(i))
    }

    /// The permission row for a (role, resource) pair, if one exists.
    #[must_use]
    pub fn permission(&self, role_id: RoleId, resource_id: ResourceId) -> Option<&RolePermission> {
        self.permission_index
            .get(&(role_id, resource_id))
            .and_then(|&i| self.permissions.get(i))
    }

    /// Permission rows belonging to one role.
    pub fn permissions_for_role(&self, role_id: RoleId) -> impl Iterator<Item = &RolePermission> {
        self.permissions
            .iter()
            .filter(move |p| p.role_id == role_id)
    }
}
