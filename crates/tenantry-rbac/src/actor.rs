//! # Actor
//!
//! The authenticated identity performing an operation. An actor is resolved
//! once per request and carries everything the authorization resolver
//! needs, so authorization never touches the store.

use serde::{Deserialize, Serialize};
use tenantry_org::{Role, User};
use uuid::Uuid;

/// Request-scoped identity: user, role and scope.
///
/// `global_data_access` mirrors the `allow_global_data_access` flag of the
/// actor's organization at resolution time.
///
/// # Example
///
/// ```
/// use tenantry_rbac::Actor;
/// use tenantry_org::Role;
/// use uuid::Uuid;
///
/// let org_id = Uuid::now_v7();
/// let actor = Actor::new(Uuid::now_v7(), Role::OrgAdmin).with_organization(org_id);
/// assert_eq!(actor.organization_id, Some(org_id));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// The acting user.
    pub user_id: Uuid,
    /// The acting user's email (lower-case).
    pub email: String,
    /// The acting user's role.
    pub role: Role,
    /// Tenant scope.
    pub tenant_id: Option<Uuid>,
    /// Organization scope.
    pub organization_id: Option<Uuid>,
    /// Whether the actor's organization may see globally visible data.
    pub global_data_access: bool,
}

impl Actor {
    /// Create an actor with no tenant or organization scope.
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self {
            user_id,
            email: String::new(),
            role,
            tenant_id: None,
            organization_id: None,
            global_data_access: false,
        }
    }

    /// Build the actor for a stored user.
    ///
    /// # Arguments
    ///
    /// * `user` - The authenticated user
    /// * `global_data_access` - The user's organization `allow_global_data_access` flag
    pub fn from_user(user: &User, global_data_access: bool) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            tenant_id: user.tenant_id,
            organization_id: user.organization_id,
            global_data_access: global_data_access && user.organization_id.is_some(),
        }
    }

    /// Set the email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Set the tenant scope.
    pub fn with_tenant(mut self, tenant_id: Uuid) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Set the organization scope.
    pub fn with_organization(mut self, organization_id: Uuid) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    /// Set the global data access flag.
    pub fn with_global_data_access(mut self, allowed: bool) -> Self {
        self.global_data_access = allowed;
        self
    }

    /// Whether the actor is the platform operator.
    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    /// Whether the actor is a member of `organization_id`.
    pub fn belongs_to_organization(&self, organization_id: Uuid) -> bool {
        self.organization_id == Some(organization_id)
    }

    /// Whether the actor belongs to `tenant_id`.
    pub fn belongs_to_tenant(&self, tenant_id: Uuid) -> bool {
        self.tenant_id == Some(tenant_id)
    }
}
