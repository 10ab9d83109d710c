//! User roles.

define_text_enum! {
    /// Built-in role of a user.
    ///
    /// A role is fixed for the lifetime of a session; it selects the home
    /// dashboard and the permission rows that apply to the user.
    UserRole("user role") {
        /// Full access, manages users and permissions.
        Admin => "admin",
        /// Works leads, organizations and orders.
        Sales => "sales",
        /// Works assigned design jobs.
        Designer => "designer",
        /// Operations: fulfilment and production oversight.
        Ops => "ops",
        /// External manufacturer updating production stages.
        Manufacturer => "manufacturer",
    }
}

impl UserRole {
    /// Route of the dashboard a user lands on after login.
    #[must_use]
    pub const fn home_route(&self) -> &'static str {
        match self {
            Self::Admin => "/admin/dashboard",
            Self::Sales => "/sales/dashboard",
            Self::Designer => "/designer/dashboard",
            Self::Ops => "/ops/dashboard",
            Self::Manufacturer => "/manufacturer/dashboard",
        }
    }

    /// Whether this is the administrator role.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_and_display() {
        for role in UserRole::ALL {
            let parsed: UserRole = role.as_str().parse().unwrap();
            assert_eq!(parsed, *role);
            assert_eq!(role.to_string(), role.as_str());
        }
    }

    #[test]
    fn test_role_rejects_unknown() {
        let err = "super_admin".parse::<UserRole>().unwrap_err();
        assert_eq!(err.to_string(), "invalid user role: super_admin");
    }

    #[test]
    fn test_role_serde_matches_db_text() {
        let json = serde_json::to_string(&UserRole::Manufacturer).unwrap();
        assert_eq!(json, "\"manufacturer\"");
        let parsed: UserRole = serde_json::from_str("\"ops\"").unwrap();
        assert_eq!(parsed, UserRole::Ops);
    }

    #[test]
    fn test_home_routes_are_distinct() {
        let mut routes: Vec<_> = UserRole::ALL.iter().map(UserRole::home_route).collect();
        routes.sort_unstable();
        routes.dedup();
        assert_eq!(routes.len(), UserRole::ALL.len());
    }
}
