//! # Resources
//!
//! The scope attributes of whatever an actor is operating on. Authorization
//! and the data-visibility predicate only ever look at these attributes,
//! never at the full entity.

use serde::{Deserialize, Serialize};
use tenantry_org::{Organization, Tenant, User};
use uuid::Uuid;

/// Scope attributes of an authorization target or a data row.
///
/// - `tenant_id`: the owning tenant (for rows owned by an organization, the
///   organization's tenant)
/// - `organization_id`: the owning organization
/// - `created_by`: the user who created the row
/// - `globally_visible`: whether the row is published platform-wide
///
/// # Example
///
/// ```
/// use tenantry_rbac::Target;
/// use uuid::Uuid;
///
/// let org_id = Uuid::now_v7();
/// let tenant_id = Uuid::now_v7();
/// let target = Target::organization(org_id, Some(tenant_id));
/// assert_eq!(target.organization_id, Some(org_id));
/// assert!(!target.globally_visible);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    /// Owning tenant.
    pub tenant_id: Option<Uuid>,
    /// Owning organization.
    pub organization_id: Option<Uuid>,
    /// Creator of the row.
    pub created_by: Option<Uuid>,
    /// Published platform-wide.
    pub globally_visible: bool,
}

/// The scope of one data row, as seen by [`Visibility`](crate::Visibility).
pub type RowScope = Target;

impl Target {
    /// A platform-level target with no owner.
    pub fn platform() -> Self {
        Self::default()
    }

    /// A tenant, or an operation placed inside a tenant.
    pub fn tenant(tenant_id: Uuid) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            ..Self::default()
        }
    }

    /// Something owned by an organization.
    pub fn organization(organization_id: Uuid, tenant_id: Option<Uuid>) -> Self {
        Self {
            tenant_id,
            organization_id: Some(organization_id),
            ..Self::default()
        }
    }

    /// A row created by a user, optionally owned by an organization.
    pub fn data(
        organization_id: Option<Uuid>,
        tenant_id: Option<Uuid>,
        created_by: Uuid,
    ) -> Self {
        Self {
            tenant_id,
            organization_id,
            created_by: Some(created_by),
            globally_visible: false,
        }
    }

    /// Mark the target as published platform-wide.
    pub fn globally_visible(mut self, visible: bool) -> Self {
        self.globally_visible = visible;
        self
    }

    /// Scope of a stored tenant.
    pub fn of_tenant(tenant: &Tenant) -> Self {
        Self::tenant(tenant.id)
    }

    /// Scope of a stored organization.
    pub fn of_organization(org: &Organization) -> Self {
        Self {
            created_by: Some(org.created_by),
            ..Self::organization(org.id, org.tenant_id)
        }
    }

    /// Scope of a stored user account.
    ///
    /// A user's tenant is its own `tenant_id`, falling back to the tenant of
    /// its organization when the caller knows it.
    pub fn of_user(user: &User, organization_tenant_id: Option<Uuid>) -> Self {
        Self {
            tenant_id: user.tenant_id.or(organization_tenant_id),
            organization_id: user.organization_id,
            created_by: None,
            globally_visible: false,
        }
    }
}
