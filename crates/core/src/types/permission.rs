//! Permission kinds and the per-(role, resource) flag set.

use serde::{Deserialize, Serialize};

define_text_enum! {
    /// Abstract action being authorized against a resource.
    PermissionKind("permission kind") {
        Read => "read",
        Write => "write",
        Delete => "delete",
        ViewAll => "viewAll",
    }
}

/// The five booleans of one role-permission row.
///
/// Serialized in camelCase to match what the single-page app consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct PermissionFlags {
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub page_visible: bool,
}

impl PermissionFlags {
    /// No access at all.
    pub const NONE: Self = Self {
        can_view: false,
        can_create: false,
        can_edit: false,
        can_delete: false,
        page_visible: false,
    };

    /// Every flag set.
    pub const FULL: Self = Self {
        can_view: true,
        can_create: true,
        can_edit: true,
        can_delete: true,
        page_visible: true,
    };

    /// View-only access with the page shown.
    pub const READ_ONLY: Self = Self {
        can_view: true,
        can_create: false,
        can_edit: false,
        can_delete: false,
        page_visible: true,
    };

    /// View, create and edit; no delete.
    pub const EDITOR: Self = Self {
        can_view: true,
        can_create: true,
        can_edit: true,
        can_delete: false,
        page_visible: true,
    };

    /// Translate an abstract permission kind onto this row.
    ///
    /// `write` is granted by either `can_create` or `can_edit`.
    #[must_use]
    pub const fn allows(&self, kind: PermissionKind) -> bool {
        match kind {
            PermissionKind::Read => self.can_view,
            PermissionKind::Write => self.can_create || self.can_edit,
            PermissionKind::Delete => self.can_delete,
            PermissionKind::ViewAll => self.page_visible,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(PermissionKind::ViewAll.as_str(), "viewAll");
        let kind: PermissionKind = "viewAll".parse().unwrap();
        assert_eq!(kind, PermissionKind::ViewAll);
        assert!("view_all".parse::<PermissionKind>().is_err());
    }

    #[test]
    fn test_none_denies_everything() {
        for kind in PermissionKind::ALL {
            assert!(!PermissionFlags::NONE.allows(*kind));
        }
    }

    #[test]
    fn test_full_allows_everything() {
        for kind in PermissionKind::ALL {
            assert!(PermissionFlags::FULL.allows(*kind));
        }
    }

    #[test]
    fn test_flags_serialize_camel_case() {
        let json = serde_json::to_value(PermissionFlags::READ_ONLY).unwrap();
        assert_eq!(json["canView"], true);
        assert_eq!(json["pageVisible"], true);
        assert_eq!(json["canDelete"], false);
    }
}
