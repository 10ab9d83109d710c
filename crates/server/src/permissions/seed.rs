//! Built-in permission matrix for the system roles.
//!
//! Written into `roles`, `resources` and `role_permissions` at server start
//! and by `rh-cli seed permissions`. At resolution time it only answers for
//! a system role on a system resource that has no database row.

use rich_habits_core::{PermissionFlags, UserRole};

/// Resources managed by the application, with a short description.
pub const SYSTEM_RESOURCES: &[(&str, &str)] = &[
    ("dashboard", "Role dashboard and hub tiles"),
    ("leads", "Sales pipeline leads"),
    ("organizations", "Customer organizations"),
    ("contacts", "Organization contacts"),
    ("orders", "Customer orders and line items"),
    ("design_jobs", "Design work queue"),
    ("manufacturing", "Manufacturing workflow"),
    ("products", "Product catalog"),
    ("users", "Staff accounts"),
    ("notifications", "In-app notifications"),
    ("settings", "Runtime settings and feature flags"),
    ("permissions", "Role permission matrix"),
];

/// Own records only: view, create and edit with no view-all scope.
const OWN_RECORDS: PermissionFlags = PermissionFlags {
    can_view: true,
    can_create: true,
    can_edit: true,
    can_delete: false,
    page_visible: false,
};

/// The seeded flags for a system role on a system resource.
///
/// Returns `None` for a resource outside [`SYSTEM_RESOURCES`].
#[must_use]
pub fn static_permission(role: UserRole, resource: &str) -> Option<PermissionFlags> {
    if !is_system_resource(resource) {
        return None;
    }

    let flags = match (role, resource) {
        (UserRole::Admin, _) => PermissionFlags::FULL,
        (_, "dashboard" | "notifications") => PermissionFlags::READ_ONLY,

        (UserRole::Sales, "leads" | "organizations" | "contacts") => PermissionFlags::EDITOR,
        (UserRole::Sales, "orders") => OWN_RECORDS,
        (UserRole::Sales, "design_jobs" | "products") => PermissionFlags::READ_ONLY,

        (UserRole::Designer, "design_jobs") => OWN_RECORDS,
        (UserRole::Designer, "orders" | "organizations" | "products") => {
            PermissionFlags::READ_ONLY
        }

        (UserRole::Ops, "orders" | "design_jobs" | "manufacturing" | "products") => {
            PermissionFlags::EDITOR
        }
        (UserRole::Ops, "organizations" | "contacts" | "leads") => PermissionFlags::READ_ONLY,

        (UserRole::Manufacturer, "manufacturing") => OWN_RECORDS,
        (UserRole::Manufacturer, "orders") => PermissionFlags::READ_ONLY,

        _ => PermissionFlags::NONE,
    };

    Some(flags)
}

/// Look up the seed by role name, for names that may not be system roles.
#[must_use]
pub fn static_permission_by_name(role: &str, resource: &str) -> Option<PermissionFlags> {
    role.parse::<UserRole>()
        .ok()
        .and_then(|role| static_permission(role, resource))
}

/// Whether `resource` is one of the built-in resources.
#[must_use]
pub fn is_system_resource(resource: &str) -> bool {
    SYSTEM_RESOURCES.iter().any(|(name, _)| *name == resource)
}

/// Every (role, resource, flags) triple of the seed, in a stable order.
pub fn entries() -> impl Iterator<Item = (UserRole, &'static str, PermissionFlags)> {
    UserRole::ALL.iter().flat_map(|&role| {
        SYSTEM_RESOURCES.iter().filter_map(move |(resource, _)| {
            static_permission(role, resource).map(|flags| (role, *resource, flags))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_system_pair_has_an_entry() {
        assert_eq!(
            entries().count(),
            UserRole::ALL.len() * SYSTEM_RESOURCES.len()
        );
    }

    #[test]
    fn test_admin_has_full_access() {
        for (resource, _) in SYSTEM_RESOURCES {
            assert_eq!(
                static_permission(UserRole::Admin, resource),
                Some(PermissionFlags::FULL)
            );
        }
    }

    #[test]
    fn test_unknown_resource_has_no_entry() {
        assert_eq!(static_permission(UserRole::Admin, "quotes"), None);
        assert_eq!(static_permission_by_name("admin", "quotes"), None);
    }

    #[test]
    fn test_custom_role_name_has_no_entry() {
        assert_eq!(static_permission_by_name("regional_manager", "orders"), None);
    }

    #[test]
    fn test_sales_orders_is_scoped_to_own_records() {
        let flags = static_permission(UserRole::Sales, "orders");
        assert_eq!(flags, Some(OWN_RECORDS));
        assert!(flags.is_some_and(|f| f.can_view && !f.page_visible));
    }

    #[test]
    fn test_only_admin_manages_users_and_permissions() {
        for role in UserRole::ALL.iter().filter(|r| !r.is_admin()) {
            assert_eq!(static_permission(*role, "users"), Some(PermissionFlags::NONE));
            assert_eq!(
                static_permission(*role, "permissions"),
                Some(PermissionFlags::NONE)
            );
        }
    }
}
