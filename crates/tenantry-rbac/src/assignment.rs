//! # Role Assignment
//!
//! Who may grant which role. Used by admin provisioning and by role updates.
//!
//! | Actor role     | May assign                                           |
//! |----------------|------------------------------------------------------|
//! | `super_admin`  | any role                                             |
//! | `tenant_admin` | `user`, `org_member`, `org_admin`, `tenant_admin`    |
//! | `org_admin`    | `org_member`, `org_admin`                            |
//! | others         | nothing                                              |

use tenantry_org::Role;

use crate::actor::Actor;
use crate::permissions::{AccessError, AccessResult};

const TENANT_ADMIN_ASSIGNABLE: [Role; 4] = [
    Role::User,
    Role::OrgMember,
    Role::OrgAdmin,
    Role::TenantAdmin,
];

const ORG_ADMIN_ASSIGNABLE: [Role; 2] = [Role::OrgMember, Role::OrgAdmin];

/// Roles an actor with `actor_role` may grant.
pub fn assignable_roles(actor_role: Role) -> &'static [Role] {
    match actor_role {
        Role::SuperAdmin => &Role::ALL,
        Role::TenantAdmin => &TENANT_ADMIN_ASSIGNABLE,
        Role::OrgAdmin => &ORG_ADMIN_ASSIGNABLE,
        Role::OrgMember | Role::User => &[],
    }
}

/// Whether `actor_role` may grant `role`.
pub fn can_assign(actor_role: Role, role: Role) -> bool {
    assignable_roles(actor_role).contains(&role)
}

/// Check that `actor` may grant `role`.
///
/// The error names the attempted role and the allowed set.
///
/// # Example
///
/// ```
/// use tenantry_rbac::{check_assignment, Actor};
/// use tenantry_org::Role;
/// use uuid::Uuid;
///
/// let admin = Actor::new(Uuid::now_v7(), Role::TenantAdmin).with_tenant(Uuid::now_v7());
/// assert!(check_assignment(&admin, Role::OrgAdmin).is_ok());
/// assert!(check_assignment(&admin, Role::SuperAdmin).is_err());
/// ```
pub fn check_assignment(actor: &Actor, role: Role) -> AccessResult<()> {
    if can_assign(actor.role, role) {
        return Ok(());
    }

    Err(AccessError::forbidden(format!(
        "{} may not assign role {}; allowed: {}",
        actor.role,
        role,
        describe(assignable_roles(actor.role))
    )))
}

/// Check that `actor` may manage an account whose current role is `current`.
///
/// An actor may only touch accounts whose role is itself within the set it
/// could assign, so a `tenant_admin` can never demote a `super_admin`.
pub fn check_manageable(actor: &Actor, current: Role) -> AccessResult<()> {
    if can_assign(actor.role, current) {
        return Ok(());
    }

    Err(AccessError::forbidden(format!(
        "{} may not manage a {} account; requires {} or above",
        actor.role,
        current,
        minimum_manager(current)
    )))
}

fn minimum_manager(role: Role) -> Role {
    Role::ALL
        .iter()
        .copied()
        .find(|candidate| can_assign(*candidate, role))
        .unwrap_or(Role::SuperAdmin)
}

fn describe(roles: &[Role]) -> String {
    if roles.is_empty() {
        return "none".to_string();
    }
    roles
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
