//! Pure permission decisions.
//!
//! Every function takes the caller's role name (`None` when nobody is
//! logged in) and the dataset if it has loaded. They never touch the
//! database; [`super::Authorizer`] supplies the dataset.

use tracing::warn;

use rich_habits_core::{PermissionFlags, PermissionKind};

use super::PermissionDataset;
use super::seed::static_permission_by_name;

/// Translate a permission kind onto a permission row.
#[must_use]
pub const fn translate_permission_to_db(kind: PermissionKind, row: &PermissionFlags) -> bool {
    row.allows(kind)
}

/// Resolve the effective flags of `role` on `resource`.
///
/// `None` means deny everything.
#[must_use]
pub fn resolve(
    dataset: Option<&PermissionDataset>,
    role: &str,
    resource: &str,
) -> Option<PermissionFlags> {
    let Some(dataset) = dataset else {
        return static_permission_by_name(role, resource);
    };

    let (Some(role_row), Some(resource_row)) = (dataset.role(role), dataset.resource(resource))
    else {
        let fallback = static_permission_by_name(role, resource);
        if fallback.is_some() {
            warn!(role, resource, "Role or resource missing from permission data; using seed");
        }
        return fallback;
    };

    if let Some(row) = dataset.permission(role_row.id, resource_row.id) {
        return Some(row.flags);
    }

    if !role_row.is_system {
        return None;
    }

    let fallback = static_permission_by_name(role, resource);
    if fallback.is_some() {
        warn!(role, resource, "No permission row for system role; using seed");
    }
    fallback
}

/// Whether `role` may perform `kind` on `resource`.
#[must_use]
pub fn has_permission(
    dataset: Option<&PermissionDataset>,
    role: Option<&str>,
    resource: &str,
    kind: PermissionKind,
) -> bool {
    let Some(role) = role else {
        return false;
    };

    resolve(dataset, role, resource).is_some_and(|flags| translate_permission_to_db(kind, &flags))
}

/// Whether the page for `resource` is shown to `role`.
///
/// Before the dataset loads this falls back to `read` so the page can render.
#[must_use]
pub fn is_page_visible(dataset: Option<&PermissionDataset>, role: Option<&str>, resource: &str) -> bool {
    match (dataset, role) {
        (_, None) => false,
        (None, role) => has_permission(None, role, resource, PermissionKind::Read),
        (Some(dataset), Some(role)) => {
            resolve(Some(dataset), role, resource).is_some_and(|flags| flags.page_visible)
        }
    }
}

/// Whether `role` sees every record of `resource` rather than only its own.
#[must_use]
pub fn can_view_all(dataset: Option<&PermissionDataset>, role: Option<&str>, resource: &str) -> bool {
    has_permission(dataset, role, resource, PermissionKind::ViewAll)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{Resource, Role, RolePermission};
    use rich_habits_core::{ResourceId, RoleId, RolePermissionId};

    fn role(id: i32, name: &str, is_system: bool) -> Role {
        Role {
            id: RoleId::new(id),
            name: name.to_string(),
            description: None,
            is_system,
        }
    }

    fn resource(id: i32, name: &str) -> Resource {
        Resource {
            id: ResourceId::new(id),
            name: name.to_string(),
            description: None,
        }
    }

    fn grant(id: i32, role_id: i32, resource_id: i32, flags: PermissionFlags) -> RolePermission {
        RolePermission {
            id: RolePermissionId::new(id),
            role_id: RoleId::new(role_id),
            resource_id: ResourceId::new(resource_id),
            flags,
        }
    }

    fn dataset() -> PermissionDataset {
        PermissionDataset::new(
            vec![
                role(1, "sales", true),
                role(2, "designer", true),
                role(3, "regional_manager", false),
            ],
            vec![resource(1, "orders"), resource(2, "leads")],
            vec![
                grant(1, 1, 2, PermissionFlags::READ_ONLY),
                grant(2, 2, 1, PermissionFlags::NONE),
            ],
        )
    }

    #[test]
    fn test_anonymous_is_denied() {
        let ds = dataset();
        for kind in PermissionKind::ALL {
            assert!(!has_permission(Some(&ds), None, "orders", *kind));
            assert!(!has_permission(None, None, "orders", *kind));
        }
        assert!(!is_page_visible(None, None, "orders"));
    }

    #[test]
    fn test_db_row_wins_over_seed() {
        let ds = dataset();
        // designer/orders is READ_ONLY in the seed but NONE in the database.
        assert!(!has_permission(Some(&ds), Some("designer"), "orders", PermissionKind::Read));
        // sales/leads is EDITOR in the seed but READ_ONLY in the database.
        assert!(has_permission(Some(&ds), Some("sales"), "leads", PermissionKind::Read));
        assert!(!has_permission(Some(&ds), Some("sales"), "leads", PermissionKind::Write));
    }

    #[test]
    fn test_system_role_without_row_uses_seed() {
        let ds = dataset();
        assert!(has_permission(Some(&ds), Some("sales"), "orders", PermissionKind::Read));
        assert!(has_permission(Some(&ds), Some("sales"), "orders", PermissionKind::Write));
        assert!(!has_permission(Some(&ds), Some("sales"), "orders", PermissionKind::Delete));
    }

    #[test]
    fn test_custom_role_never_reaches_seed() {
        let ds = dataset();
        for kind in PermissionKind::ALL {
            assert!(!has_permission(Some(&ds), Some("regional_manager"), "orders", *kind));
            assert!(!has_permission(None, Some("regional_manager"), "orders", *kind));
        }
    }

    #[test]
    fn test_missing_resource_row_uses_seed_for_system_pair() {
        let ds = dataset();
        // `manufacturing` has no resource row at all.
        assert!(has_permission(Some(&ds), Some("admin"), "manufacturing", PermissionKind::Delete));
        assert!(!has_permission(Some(&ds), Some("admin"), "quotes", PermissionKind::Read));
    }

    #[test]
    fn test_page_visible_short_circuits_to_read_before_load() {
        // sales/orders: can_view but not page_visible.
        assert!(is_page_visible(None, Some("sales"), "orders"));
        assert!(!is_page_visible(Some(&dataset()), Some("sales"), "orders"));
    }

    #[test]
    fn test_can_view_all_reads_page_visible() {
        let ds = dataset();
        assert!(!can_view_all(Some(&ds), Some("sales"), "orders"));
        assert!(can_view_all(Some(&ds), Some("sales"), "leads"));
        assert!(can_view_all(None, Some("admin"), "orders"));
    }
}
