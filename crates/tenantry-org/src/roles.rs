//! Role hierarchy
//!
//! This module defines the single canonical role attached to every user.
//! Roles form a total order; every authorization decision in the platform
//! is expressed in terms of [`Role::rank`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform role of a user.
///
/// Roles are hierarchical, with each role inheriting the capabilities of lower roles.
/// The hierarchy is: User < OrgMember < OrgAdmin < TenantAdmin < SuperAdmin
///
/// # Scope Model
///
/// - **User**: Unaffiliated account, sees only what it created itself
/// - **OrgMember**: Member of exactly one organization
/// - **OrgAdmin**: Manages one organization, its whitelist and members
/// - **TenantAdmin**: Manages every organization inside one tenant
/// - **SuperAdmin**: Platform operator, bypasses all scope checks
///
/// # Examples
///
/// ```
/// use tenantry_org::Role;
///
/// assert!(Role::SuperAdmin > Role::TenantAdmin);
/// assert_eq!(Role::OrgAdmin.rank(), 2);
/// assert!(Role::OrgMember.is_organization_scoped());
/// assert!(!Role::TenantAdmin.is_organization_scoped());
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Unaffiliated self-registered account
    User = 0,

    /// Member of an organization
    OrgMember = 1,

    /// Administrator of an organization
    OrgAdmin = 2,

    /// Administrator of a tenant
    TenantAdmin = 3,

    /// Platform operator
    SuperAdmin = 4,
}

impl Role {
    /// Every role, lowest rank first.
    pub const ALL: [Role; 5] = [
        Role::User,
        Role::OrgMember,
        Role::OrgAdmin,
        Role::TenantAdmin,
        Role::SuperAdmin,
    ];

    /// Numeric rank of the role. Fixed and total.
    pub fn rank(&self) -> u8 {
        *self as u8
    }

    /// Check whether this role is at least as privileged as `threshold`.
    ///
    /// # Examples
    ///
    /// ```
    /// use tenantry_org::Role;
    ///
    /// assert!(Role::TenantAdmin.is_at_least(Role::OrgAdmin));
    /// assert!(!Role::OrgMember.is_at_least(Role::OrgAdmin));
    /// ```
    pub fn is_at_least(&self, threshold: Role) -> bool {
        self.rank() >= threshold.rank()
    }

    /// Roles that only make sense with an organization attached.
    pub fn is_organization_scoped(&self) -> bool {
        matches!(self, Role::OrgAdmin | Role::OrgMember)
    }

    /// Administrative roles (excludes `org_member` and `user`).
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::TenantAdmin | Role::OrgAdmin)
    }

    /// Parse role from string representation.
    ///
    /// # Arguments
    ///
    /// * `s` - String to parse (case-insensitive)
    ///
    /// # Returns
    ///
    /// `Some(Role)` if valid, `None` otherwise
    ///
    /// # Examples
    ///
    /// ```
    /// use tenantry_org::Role;
    ///
    /// assert_eq!(Role::parse("org_admin"), Some(Role::OrgAdmin));
    /// assert_eq!(Role::parse("SUPER_ADMIN"), Some(Role::SuperAdmin));
    /// assert_eq!(Role::parse("owner"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "user" => Some(Self::User),
            "org_member" => Some(Self::OrgMember),
            "org_admin" => Some(Self::OrgAdmin),
            "tenant_admin" => Some(Self::TenantAdmin),
            "super_admin" => Some(Self::SuperAdmin),
            _ => None,
        }
    }

    /// Get string representation of the role.
    ///
    /// # Examples
    ///
    /// ```
    /// use tenantry_org::Role;
    ///
    /// assert_eq!(Role::TenantAdmin.as_str(), "tenant_admin");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::OrgMember => "org_member",
            Self::OrgAdmin => "org_admin",
            Self::TenantAdmin => "tenant_admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    /// Get a human-readable display name for the role.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::OrgMember => "Organization Member",
            Self::OrgAdmin => "Organization Admin",
            Self::TenantAdmin => "Tenant Admin",
            Self::SuperAdmin => "Super Admin",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::User
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
