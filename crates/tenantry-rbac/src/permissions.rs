//! # Permissions
//!
//! Role guards and the authorization resolver. A decision is a pure function
//! of the actor's role and scope, the target's scope and the action: the
//! same inputs always produce the same answer.

use serde::{Deserialize, Serialize};
use tenantry_org::Role;
use thiserror::Error;
use tracing::instrument;

use crate::actions::{Action, ScopeRule};
use crate::actor::Actor;
use crate::resources::Target;
use crate::visibility::Visibility;

/// Authorization failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The actor's role or scope is insufficient.
    #[error("Forbidden: {reason}")]
    Forbidden {
        /// Human-readable reason naming the required role or scope
        reason: String,
    },

    /// The actor's own record is inconsistent (e.g. a tenant admin without a tenant).
    #[error("Actor misconfigured: {0}")]
    MisconfiguredActor(String),
}

impl AccessError {
    /// Build a `Forbidden` error.
    pub fn forbidden(reason: impl Into<String>) -> Self {
        AccessError::Forbidden {
            reason: reason.into(),
        }
    }
}

/// Result type for authorization checks.
pub type AccessResult<T> = Result<T, AccessError>;

/// `rank(actor_role) >= rank(threshold)`.
pub fn require_at_least(actor_role: Role, threshold: Role) -> bool {
    actor_role.rank() >= threshold.rank()
}

/// The five named role guards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Guard {
    /// `super_admin` only.
    SuperAdmin,
    /// `tenant_admin` or above.
    TenantAdmin,
    /// `org_admin` or above.
    OrgAdmin,
    /// `org_member` or above.
    OrgMember,
    /// `super_admin`, `tenant_admin` or `org_admin`; never `org_member`.
    AnyAdmin,
}

impl Guard {
    /// Check a role against the guard.
    ///
    /// # Example
    ///
    /// ```
    /// use tenantry_rbac::Guard;
    /// use tenantry_org::Role;
    ///
    /// assert!(Guard::OrgAdmin.check(Role::TenantAdmin).is_ok());
    /// assert!(Guard::AnyAdmin.check(Role::OrgMember).is_err());
    /// ```
    pub fn check(&self, role: Role) -> AccessResult<()> {
        if self.allows(role) {
            Ok(())
        } else {
            Err(AccessError::forbidden(self.requirement()))
        }
    }

    /// Whether the role passes the guard.
    pub fn allows(&self, role: Role) -> bool {
        match self {
            Guard::SuperAdmin => require_at_least(role, Role::SuperAdmin),
            Guard::TenantAdmin => require_at_least(role, Role::TenantAdmin),
            Guard::OrgAdmin => require_at_least(role, Role::OrgAdmin),
            Guard::OrgMember => require_at_least(role, Role::OrgMember),
            Guard::AnyAdmin => role.is_admin(),
        }
    }

    /// Description of the minimum role.
    pub fn requirement(&self) -> &'static str {
        match self {
            Guard::SuperAdmin => "requires super_admin",
            Guard::TenantAdmin => "requires tenant_admin or above",
            Guard::OrgAdmin => "requires org_admin or above",
            Guard::OrgMember => "requires org_member or above",
            Guard::AnyAdmin => "requires an administrator role (super_admin, tenant_admin or org_admin)",
        }
    }
}

/// Decide whether `actor` may perform `action` on `target`.
///
/// Two phases:
///
/// 1. **Role guard**: the action's [`Guard`], if any
/// 2. **Scope match**: `super_admin` bypasses; tenant admins must share the
///    target's tenant; organization roles must share the target's
///    organization, except that read actions on globally visible targets are
///    allowed when the actor's organization has global data access
///
/// # Example
///
/// ```
/// use tenantry_rbac::{authorize, Action, Actor, Target};
/// use tenantry_org::Role;
/// use uuid::Uuid;
///
/// let tenant_x = Uuid::now_v7();
/// let tenant_y = Uuid::now_v7();
/// let admin = Actor::new(Uuid::now_v7(), Role::TenantAdmin).with_tenant(tenant_x);
///
/// assert!(authorize(&admin, Action::CreateOrganization, &Target::tenant(tenant_x)).is_ok());
/// assert!(authorize(&admin, Action::CreateOrganization, &Target::tenant(tenant_y)).is_err());
/// ```
#[instrument(
    level = "debug",
    skip(actor, target),
    fields(user_id = %actor.user_id, role = %actor.role, action = %action)
)]
pub fn authorize(actor: &Actor, action: Action, target: &Target) -> AccessResult<()> {
    if let Some(guard) = action.guard() {
        guard.check(actor.role)?;
    }

    if actor.is_super_admin() {
        return Ok(());
    }

    match action.scope_rule() {
        ScopeRule::Platform => Ok(()),
        ScopeRule::Tenant => check_tenant_scope(actor, target),
        ScopeRule::Organization => check_organization_scope(actor, action, target),
        ScopeRule::Data => {
            let visibility = Visibility::for_actor(actor)?;
            let row = if action.is_read() {
                *target
            } else {
                target.globally_visible(false)
            };
            if visibility.permits(&row) {
                Ok(())
            } else {
                Err(AccessError::forbidden(
                    "data scope required: row is outside the actor's visibility",
                ))
            }
        }
    }
}

fn actor_tenant(actor: &Actor) -> AccessResult<uuid::Uuid> {
    actor
        .tenant_id
        .ok_or_else(|| AccessError::MisconfiguredActor("tenant_admin has no tenant assigned".into()))
}

fn check_tenant_scope(actor: &Actor, target: &Target) -> AccessResult<()> {
    match actor.role {
        Role::TenantAdmin => {
            let tenant_id = actor_tenant(actor)?;
            if target.tenant_id == Some(tenant_id) {
                Ok(())
            } else {
                Err(AccessError::forbidden(
                    "tenant scope required: tenant_admin may only act inside their own tenant",
                ))
            }
        }
        _ => Err(AccessError::forbidden("requires tenant_admin or above")),
    }
}

fn check_organization_scope(actor: &Actor, action: Action, target: &Target) -> AccessResult<()> {
    match actor.role {
        Role::SuperAdmin => Ok(()),
        Role::TenantAdmin => {
            let tenant_id = actor_tenant(actor)?;
            if target.tenant_id == Some(tenant_id) {
                Ok(())
            } else {
                Err(AccessError::forbidden(
                    "tenant scope required: target is outside the actor's tenant",
                ))
            }
        }
        Role::OrgAdmin | Role::OrgMember => {
            let same_org = actor.organization_id.is_some()
                && target.organization_id == actor.organization_id;
            let global_read =
                action.is_read() && target.globally_visible && actor.global_data_access;
            if same_org || global_read {
                Ok(())
            } else {
                Err(AccessError::forbidden(
                    "organization scope required: target is outside the actor's organization",
                ))
            }
        }
        Role::User => Err(AccessError::forbidden("requires org_member or above")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn tenant_admin(tenant_id: Uuid) -> Actor {
        Actor::new(Uuid::now_v7(), Role::TenantAdmin).with_tenant(tenant_id)
    }

    fn org_actor(role: Role, org_id: Uuid, tenant_id: Uuid) -> Actor {
        Actor::new(Uuid::now_v7(), role)
            .with_organization(org_id)
            .with_tenant(tenant_id)
    }

    mod guards {
        use super::*;

        #[test]
        fn super_admin_only() {
            assert!(Guard::SuperAdmin.allows(Role::SuperAdmin));
            assert!(!Guard::SuperAdmin.allows(Role::TenantAdmin));
        }

        #[test]
        fn any_admin_excludes_members() {
            assert!(Guard::AnyAdmin.allows(Role::SuperAdmin));
            assert!(Guard::AnyAdmin.allows(Role::TenantAdmin));
            assert!(Guard::AnyAdmin.allows(Role::OrgAdmin));
            assert!(!Guard::AnyAdmin.allows(Role::OrgMember));
            assert!(!Guard::AnyAdmin.allows(Role::User));
        }

        #[test]
        fn failure_names_requirement() {
            let err = Guard::TenantAdmin.check(Role::OrgAdmin).unwrap_err();
            assert_eq!(
                err,
                AccessError::forbidden("requires tenant_admin or above")
            );
        }
    }

    mod scope {
        use super::*;

        #[test]
        fn super_admin_bypasses_scope() {
            let actor = Actor::new(Uuid::now_v7(), Role::SuperAdmin);
            let target = Target::organization(Uuid::now_v7(), Some(Uuid::now_v7()));
            for action in Action::ALL {
                assert!(authorize(&actor, action, &target).is_ok(), "{action}");
            }
        }

        #[test]
        fn tenant_admin_cannot_create_org_in_other_tenant() {
            let own = Uuid::now_v7();
            let other = Uuid::now_v7();
            let actor = tenant_admin(own);

            assert!(authorize(&actor, Action::CreateOrganization, &Target::tenant(own)).is_ok());
            let err = authorize(&actor, Action::CreateOrganization, &Target::tenant(other));
            assert!(matches!(err, Err(AccessError::Forbidden { .. })));
            assert!(authorize(&actor, Action::CreateOrganization, &Target::platform()).is_err());
        }

        #[test]
        fn tenant_admin_without_tenant_is_misconfigured() {
            let actor = Actor::new(Uuid::now_v7(), Role::TenantAdmin);
            let err = authorize(&actor, Action::ViewOrganization, &Target::organization(Uuid::now_v7(), None));
            assert!(matches!(err, Err(AccessError::MisconfiguredActor(_))));
        }

        #[test]
        fn org_admin_limited_to_own_org() {
            let tenant = Uuid::now_v7();
            let org = Uuid::now_v7();
            let actor = org_actor(Role::OrgAdmin, org, tenant);

            assert!(authorize(&actor, Action::ManageWhitelist, &Target::organization(org, Some(tenant))).is_ok());
            assert!(authorize(&actor, Action::ManageWhitelist, &Target::organization(Uuid::now_v7(), Some(tenant))).is_err());
            assert!(authorize(&actor, Action::ManageOrganizationSettings, &Target::organization(org, Some(tenant))).is_err());
            assert!(authorize(&actor, Action::DeleteOrganization, &Target::organization(org, Some(tenant))).is_err());
        }

        #[test]
        fn org_member_cannot_administer() {
            let tenant = Uuid::now_v7();
            let org = Uuid::now_v7();
            let actor = org_actor(Role::OrgMember, org, tenant);
            let target = Target::organization(org, Some(tenant));

            assert!(authorize(&actor, Action::ViewOrganization, &target).is_ok());
            assert!(authorize(&actor, Action::ListMembers, &target).is_ok());
            assert!(authorize(&actor, Action::CreateUser, &target).is_err());
            assert!(authorize(&actor, Action::RegenerateJoinToken, &target).is_err());
        }

        #[test]
        fn global_targets_are_read_only_for_other_orgs() {
            let org = Uuid::now_v7();
            let actor = org_actor(Role::OrgMember, org, Uuid::now_v7()).with_global_data_access(true);
            let foreign = Target::data(Some(Uuid::now_v7()), None, Uuid::now_v7()).globally_visible(true);

            assert!(authorize(&actor, Action::ReadData, &foreign).is_ok());
            assert!(authorize(&actor, Action::WriteData, &foreign).is_err());

            let without_flag = actor.clone().with_global_data_access(false);
            assert!(authorize(&without_flag, Action::ReadData, &foreign).is_err());
        }

        #[test]
        fn plain_user_reads_only_own_unowned_rows() {
            let actor = Actor::new(Uuid::now_v7(), Role::User);
            let own = Target::data(None, None, actor.user_id);
            let other = Target::data(None, None, Uuid::now_v7());

            assert!(authorize(&actor, Action::ReadData, &own).is_ok());
            assert!(authorize(&actor, Action::WriteData, &own).is_ok());
            assert!(authorize(&actor, Action::ReadData, &other).is_err());
            assert!(authorize(&actor, Action::ViewOrganization, &Target::platform()).is_err());
        }
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    fn any_action() -> impl Strategy<Value = Action> {
        prop::sample::select(Action::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_authorize_is_pure(
            role in any_role(),
            action in any_action(),
            same_tenant in any::<bool>(),
            same_org in any::<bool>(),
            global in any::<bool>(),
        ) {
            let tenant = Uuid::from_u128(1);
            let org = Uuid::from_u128(2);
            let actor = Actor::new(Uuid::from_u128(3), role)
                .with_tenant(tenant)
                .with_organization(org)
                .with_global_data_access(global);
            let target = Target::organization(
                if same_org { org } else { Uuid::from_u128(4) },
                Some(if same_tenant { tenant } else { Uuid::from_u128(5) }),
            )
            .globally_visible(global);

            let first = authorize(&actor, action, &target);
            let second = authorize(&actor, action, &target);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_guards_are_monotonic(a in any_role(), b in any_role()) {
            for guard in [Guard::SuperAdmin, Guard::TenantAdmin, Guard::OrgAdmin, Guard::OrgMember] {
                if a.rank() >= b.rank() && guard.allows(b) {
                    prop_assert!(guard.allows(a));
                }
            }
        }

        #[test]
        fn prop_higher_rank_same_scope_allows_superset(
            x in any_role(),
            y in any_role(),
            action in any_action(),
        ) {
            let (low, high) = if x <= y { (x, y) } else { (y, x) };
            let tenant = Uuid::from_u128(1);
            let org = Uuid::from_u128(2);
            let scoped = |role: Role| Actor::new(Uuid::from_u128(3), role)
                .with_tenant(tenant)
                .with_organization(org);
            let target = Target::data(Some(org), Some(tenant), Uuid::from_u128(6));

            if authorize(&scoped(low), action, &target).is_ok() {
                prop_assert!(authorize(&scoped(high), action, &target).is_ok());
            }
        }
    }
}
