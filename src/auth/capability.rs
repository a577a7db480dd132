// Role classification
// Single place that maps backend role strings to what a user may do

use serde::{Deserialize, Serialize};

const ADMIN_ROLES: &[&str] = &["admin", "super_admin", "superadmin", "system_admin"];

const STAFF_ROLES: &[&str] = &[
    "staff",
    "officer",
    "inspector",
    "auditor",
    "reviewer",
    "approver",
    "dede_staff",
    "dede_head",
];

/// Which portal a user belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Citizen-facing Web View
    Citizen,
    /// Staff-facing Web Portal
    Staff,
    /// Admin Portal
    Admin,
}

impl Capability {
    /// Classify a role string. Unknown and empty roles are citizens.
    pub fn from_role(role: &str) -> Self {
        let role = role.trim().to_lowercase();
        if ADMIN_ROLES.contains(&role.as_str()) {
            Capability::Admin
        } else if STAFF_ROLES.contains(&role.as_str()) {
            Capability::Staff
        } else {
            Capability::Citizen
        }
    }

    /// Where the user lands after login
    pub fn landing_path(&self) -> &'static str {
        match self {
            Capability::Citizen => "/eservice/dede",
            Capability::Staff => "/web-portal/dashboard",
            Capability::Admin => "/admin-portal/dashboard",
        }
    }

    pub fn can_review(&self) -> bool {
        matches!(self, Capability::Staff | Capability::Admin)
    }

    pub fn can_manage_users(&self) -> bool {
        matches!(self, Capability::Admin)
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Capability::Citizen => "citizen",
            Capability::Staff => "staff",
            Capability::Admin => "admin",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_roles() {
        assert_eq!(Capability::from_role("admin"), Capability::Admin);
        assert_eq!(Capability::from_role("super_admin"), Capability::Admin);
        assert_eq!(Capability::from_role("inspector"), Capability::Staff);
        assert_eq!(Capability::from_role("dede_head"), Capability::Staff);
        assert_eq!(Capability::from_role("user"), Capability::Citizen);
        assert_eq!(Capability::from_role(""), Capability::Citizen);
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        assert_eq!(Capability::from_role("  ADMIN "), Capability::Admin);
        assert_eq!(Capability::from_role("Officer"), Capability::Staff);
    }

    #[test]
    fn test_landing_paths() {
        assert_eq!(Capability::Citizen.landing_path(), "/eservice/dede");
        assert_eq!(Capability::Staff.landing_path(), "/web-portal/dashboard");
        assert_eq!(Capability::Admin.landing_path(), "/admin-portal/dashboard");
    }

    #[test]
    fn test_permissions() {
        assert!(!Capability::Citizen.can_review());
        assert!(Capability::Staff.can_review());
        assert!(Capability::Admin.can_review());
        assert!(!Capability::Staff.can_manage_users());
        assert!(Capability::Admin.can_manage_users());
    }

    #[test]
    fn test_display_matches_serde() {
        for cap in [Capability::Citizen, Capability::Staff, Capability::Admin] {
            let json = serde_json::to_value(cap).unwrap();
            assert_eq!(json.as_str(), Some(cap.to_string().as_str()));
        }
    }

    proptest! {
        #[test]
        fn prop_unlisted_roles_are_citizens(role in "[a-z_]{0,16}") {
            prop_assume!(!ADMIN_ROLES.contains(&role.as_str()));
            prop_assume!(!STAFF_ROLES.contains(&role.as_str()));
            prop_assert_eq!(Capability::from_role(&role), Capability::Citizen);
        }
    }
}
