//! Roles, resources and the role-permission matrix.

use sqlx::PgPool;

use rich_habits_core::{PermissionFlags, ResourceId, RoleId, RolePermissionId};

use super::RepositoryError;
use crate::permissions::{PermissionDataset, Resource, Role, RolePermission, seed};

#[derive(Debug, sqlx::FromRow)]
struct RoleRow {
    id: RoleId,
    name: String,
    description: Option<String>,
    is_system: bool,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            is_system: row.is_system,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ResourceRow {
    id: ResourceId,
    name: String,
    description: Option<String>,
}

impl From<ResourceRow> for Resource {
    fn from(row: ResourceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
#[allow(clippy::struct_excessive_bools)]
struct RolePermissionRow {
    id: RolePermissionId,
    role_id: RoleId,
    resource_id: ResourceId,
    can_view: bool,
    can_create: bool,
    can_edit: bool,
    can_delete: bool,
    page_visible: bool,
}

impl From<RolePermissionRow> for RolePermission {
    fn from(row: RolePermissionRow) -> Self {
        Self {
            id: row.id,
            role_id: row.role_id,
            resource_id: row.resource_id,
            flags: PermissionFlags {
                can_view: row.can_view,
                can_create: row.can_create,
                can_edit: row.can_edit,
                can_delete: row.can_delete,
                page_visible: row.page_visible,
            },
        }
    }
}

const ROLE_QUERY: &str = "SELECT id, name, description, is_system FROM roles ORDER BY name";

const RESOURCE_QUERY: &str = "SELECT id, name, description FROM resources ORDER BY name";

const PERMISSION_COLUMNS: &str =
    "id, role_id, resource_id, can_view, can_create, can_edit, can_delete, page_visible";

/// Rows written by [`PermissionRepository::seed_static`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub roles: u64,
    pub resources: u64,
    pub permissions: u64,
}

/// Repository for the permission matrix.
pub struct PermissionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PermissionRepository<'a> {
    /// Create a new permission repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load every role, resource and permission row from one snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any query fails.
    pub async fn load_dataset(&self) -> Result<PermissionDataset, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let roles: Vec<RoleRow> = sqlx::query_as(ROLE_QUERY).fetch_all(&mut *tx).await?;
        let resources: Vec<ResourceRow> =
            sqlx::query_as(RESOURCE_QUERY).fetch_all(&mut *tx).await?;
        let rows: Vec<RolePermissionRow> = sqlx::query_as(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM role_permissions ORDER BY role_id, resource_id"
        ))
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(PermissionDataset::new(
            roles.into_iter().map(Role::from).collect(),
            resources.into_iter().map(Resource::from).collect(),
            rows.into_iter().map(RolePermission::from).collect(),
        ))
    }

    /// List roles by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_roles(&self) -> Result<Vec<Role>, RepositoryError> {
        let rows: Vec<RoleRow> = sqlx::query_as(ROLE_QUERY).fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(Role::from).collect())
    }

    /// List resources by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_resources(&self) -> Result<Vec<Resource>, RepositoryError> {
        let rows: Vec<ResourceRow> = sqlx::query_as(RESOURCE_QUERY).fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(Resource::from).collect())
    }

    /// Create a custom (non-system) role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn create_role(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Role, RepositoryError> {
        let row: RoleRow = sqlx::query_as(
            "INSERT INTO roles (name, description, is_system)
             VALUES ($1, $2, FALSE)
             RETURNING id, name, description, is_system",
        )
        .bind(name)
        .bind(description)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "role"))?;

        Ok(row.into())
    }

    /// Insert or replace the permission row for a (role, resource) pair.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the role or resource does not exist.
    pub async fn upsert_permission(
        &self,
        role_id: RoleId,
        resource_id: ResourceId,
        flags: PermissionFlags,
    ) -> Result<RolePermission, RepositoryError> {
        let row: RolePermissionRow = sqlx::query_as(&format!(
            "INSERT INTO role_permissions
                (role_id, resource_id, can_view, can_create, can_edit, can_delete, page_visible)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (role_id, resource_id) DO UPDATE SET
                can_view = EXCLUDED.can_view,
                can_create = EXCLUDED.can_create,
                can_edit = EXCLUDED.can_edit,
                can_delete = EXCLUDED.can_delete,
                page_visible = EXCLUDED.page_visible,
                updated_at = NOW()
             RETURNING {PERMISSION_COLUMNS}"
        ))
        .bind(role_id)
        .bind(resource_id)
        .bind(flags.can_view)
        .bind(flags.can_create)
        .bind(flags.can_edit)
        .bind(flags.can_delete)
        .bind(flags.page_visible)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "role permission"))?;

        Ok(row.into())
    }

    /// Write the built-in roles, resources and permission rows.
    ///
    /// Existing rows are left untouched, so edits made through the API
    /// survive a re-seed. Runs in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails.
    pub async fn seed_static(&self) -> Result<SeedReport, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut report = SeedReport::default();

        for role in rich_habits_core::UserRole::ALL {
            let result = sqlx::query(
                "INSERT INTO roles (name, description, is_system)
                 VALUES ($1, $2, TRUE)
                 ON CONFLICT (name) DO NOTHING",
            )
            .bind(role.as_str())
            .bind(format!("Built-in {role} role"))
            .execute(&mut *tx)
            .await?;
            report.roles += result.rows_affected();
        }

        for (name, description) in seed::SYSTEM_RESOURCES {
            let result = sqlx::query(
                "INSERT INTO resources (name, description)
                 VALUES ($1, $2)
                 ON CONFLICT (name) DO NOTHING",
            )
            .bind(name)
            .bind(description)
            .execute(&mut *tx)
            .await?;
            report.resources += result.rows_affected();
        }

        for (role, resource, flags) in seed::entries() {
            let result = sqlx::query(
                "INSERT INTO role_permissions
                    (role_id, resource_id, can_view, can_create, can_edit, can_delete, page_visible)
                 SELECT r.id, s.id, $3, $4, $5, $6, $7
                 FROM roles r, resources s
                 WHERE r.name = $1 AND s.name = $2
                 ON CONFLICT (role_id, resource_id) DO NOTHING",
            )
            .bind(role.as_str())
            .bind(resource)
            .bind(flags.can_view)
            .bind(flags.can_create)
            .bind(flags.can_edit)
            .bind(flags.can_delete)
            .bind(flags.page_visible)
            .execute(&mut *tx)
            .await?;
            report.permissions += result.rows_affected();
        }

        tx.commit().await?;
        Ok(report)
    }
}
