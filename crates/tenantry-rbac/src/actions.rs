//! # Actions
//!
//! Defines every operation the authorization resolver rules on. Each action
//! names the guard an actor must pass and the scope rule applied to the
//! target afterwards.

use serde::{Deserialize, Serialize};

use crate::permissions::Guard;

/// How an action's target scope is matched against the actor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScopeRule {
    /// No target scope (platform-level operation).
    Platform,
    /// Target is a tenant; tenant admins must belong to it.
    Tenant,
    /// Target is owned by an organization (and through it, a tenant).
    Organization,
    /// Target is domain data filtered by the data-visibility predicate.
    Data,
}

/// Operations subject to authorization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Create a tenant.
    CreateTenant,
    /// Read a tenant.
    ViewTenant,
    /// Update a tenant.
    UpdateTenant,
    /// Delete a tenant.
    DeleteTenant,

    /// Create an organization inside the target tenant (or none).
    CreateOrganization,
    /// Read an organization.
    ViewOrganization,
    /// Update non-tenant-level organization fields.
    UpdateOrganization,
    /// Update tenant-level organization fields (global data access, tenant, activation).
    ManageOrganizationSettings,
    /// Delete an organization.
    DeleteOrganization,
    /// Replace an organization's join token.
    RegenerateJoinToken,
    /// Add, remove or list whitelist entries.
    ManageWhitelist,
    /// List the members of an organization.
    ListMembers,
    /// Detach a member from an organization.
    RemoveMember,

    /// Provision a user into the target scope.
    CreateUser,
    /// Read a user account.
    ViewUser,
    /// Change a user's role or activation.
    ManageUser,
    /// Delete a user account.
    DeleteUser,

    /// Read domain data (companies, predictions).
    ReadData,
    /// Modify domain data.
    WriteData,
}

impl Action {
    /// Every action.
    pub const ALL: [Action; 19] = [
        Action::CreateTenant,
        Action::ViewTenant,
        Action::UpdateTenant,
        Action::DeleteTenant,
        Action::CreateOrganization,
        Action::ViewOrganization,
        Action::UpdateOrganization,
        Action::ManageOrganizationSettings,
        Action::DeleteOrganization,
        Action::RegenerateJoinToken,
        Action::ManageWhitelist,
        Action::ListMembers,
        Action::RemoveMember,
        Action::CreateUser,
        Action::ViewUser,
        Action::ManageUser,
        Action::DeleteUser,
        Action::ReadData,
        Action::WriteData,
    ];

    /// Guard the actor's role must pass before scope is considered.
    ///
    /// `None` means every authenticated actor passes the role check and the
    /// scope rule alone decides.
    pub fn guard(&self) -> Option<Guard> {
        match self {
            Action::CreateTenant | Action::DeleteTenant => Some(Guard::SuperAdmin),
            Action::ViewTenant
            | Action::UpdateTenant
            | Action::CreateOrganization
            | Action::ManageOrganizationSettings
            | Action::DeleteOrganization
            | Action::DeleteUser => Some(Guard::TenantAdmin),
            Action::UpdateOrganization
            | Action::RegenerateJoinToken
            | Action::ManageWhitelist
            | Action::RemoveMember => Some(Guard::OrgAdmin),
            Action::ViewOrganization | Action::ListMembers => Some(Guard::OrgMember),
            Action::CreateUser | Action::ViewUser | Action::ManageUser => Some(Guard::AnyAdmin),
            Action::ReadData | Action::WriteData => None,
        }
    }

    /// Scope rule applied after the guard.
    pub fn scope_rule(&self) -> ScopeRule {
        match self {
            Action::CreateTenant => ScopeRule::Platform,
            Action::ViewTenant | Action::UpdateTenant | Action::DeleteTenant => ScopeRule::Tenant,
            Action::CreateOrganization => ScopeRule::Tenant,
            Action::ReadData | Action::WriteData => ScopeRule::Data,
            _ => ScopeRule::Organization,
        }
    }

    /// Whether the action only reads.
    ///
    /// Globally visible targets are only ever exposed to read actions.
    pub fn is_read(&self) -> bool {
        matches!(
            self,
            Action::ViewTenant
                | Action::ViewOrganization
                | Action::ListMembers
                | Action::ViewUser
                | Action::ReadData
        )
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateTenant => "create_tenant",
            Action::ViewTenant => "view_tenant",
            Action::UpdateTenant => "update_tenant",
            Action::DeleteTenant => "delete_tenant",
            Action::CreateOrganization => "create_organization",
            Action::ViewOrganization => "view_organization",
            Action::UpdateOrganization => "update_organization",
            Action::ManageOrganizationSettings => "manage_organization_settings",
            Action::DeleteOrganization => "delete_organization",
            Action::RegenerateJoinToken => "regenerate_join_token",
            Action::ManageWhitelist => "manage_whitelist",
            Action::ListMembers => "list_members",
            Action::RemoveMember => "remove_member",
            Action::CreateUser => "create_user",
            Action::ViewUser => "view_user",
            Action::ManageUser => "manage_user",
            Action::DeleteUser => "delete_user",
            Action::ReadData => "read_data",
            Action::WriteData => "write_data",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_actions_are_super_admin_only() {
        assert_eq!(Action::CreateTenant.guard(), Some(Guard::SuperAdmin));
        assert_eq!(Action::DeleteTenant.guard(), Some(Guard::SuperAdmin));
    }

    #[test]
    fn test_org_settings_reserved_for_tenant_admins() {
        assert_eq!(Action::UpdateOrganization.guard(), Some(Guard::OrgAdmin));
        assert_eq!(
            Action::ManageOrganizationSettings.guard(),
            Some(Guard::TenantAdmin)
        );
    }

    #[test]
    fn test_data_actions_have_no_role_guard() {
        assert_eq!(Action::ReadData.guard(), None);
        assert_eq!(Action::ReadData.scope_rule(), ScopeRule::Data);
    }

    #[test]
    fn test_action_names_are_unique() {
        let mut names: Vec<_> = Action::ALL.iter().map(|a| a.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Action::ALL.len());
    }
}
