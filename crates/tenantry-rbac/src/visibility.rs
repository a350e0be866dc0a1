//! # Data Visibility
//!
//! The role- and scope-derived filter applied to every listing or read over
//! organization-, tenant- or user-owned data. Domain services (companies,
//! predictions) scope their own queries with [`Visibility`] rather than
//! re-implementing authorization.

use serde::{Deserialize, Serialize};
use tenantry_org::Role;
use uuid::Uuid;

use crate::actor::Actor;
use crate::permissions::{AccessError, AccessResult};
use crate::resources::Target;

/// Which rows an actor may see.
///
/// # Example
///
/// ```
/// use tenantry_rbac::{Actor, Target, Visibility};
/// use tenantry_org::Role;
/// use uuid::Uuid;
///
/// let org_id = Uuid::now_v7();
/// let member = Actor::new(Uuid::now_v7(), Role::OrgMember).with_organization(org_id);
/// let visibility = Visibility::for_actor(&member).unwrap();
///
/// assert!(visibility.permits(&Target::data(Some(org_id), None, Uuid::now_v7())));
/// assert!(!visibility.permits(&Target::data(Some(Uuid::now_v7()), None, Uuid::now_v7())));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Visibility {
    /// No filter.
    All,

    /// Rows whose owning organization belongs to the tenant.
    Tenant {
        /// The actor's tenant
        tenant_id: Uuid,
    },

    /// Rows owned by the organization, plus globally visible rows when allowed.
    Organization {
        /// The actor's organization
        organization_id: Uuid,
        /// The organization's `allow_global_data_access` flag
        include_global: bool,
    },

    /// Rows the user created that have no organization owner.
    Personal {
        /// The actor
        user_id: Uuid,
    },
}

impl Visibility {
    /// Derive the predicate for an actor.
    ///
    /// A tenant admin without a tenant, or an organization role without an
    /// organization, is a configuration error rather than an empty or
    /// unrestricted result.
    pub fn for_actor(actor: &Actor) -> AccessResult<Self> {
        match actor.role {
            Role::SuperAdmin => Ok(Visibility::All),
            Role::TenantAdmin => actor
                .tenant_id
                .map(|tenant_id| Visibility::Tenant { tenant_id })
                .ok_or_else(|| {
                    AccessError::MisconfiguredActor("tenant_admin has no tenant assigned".into())
                }),
            Role::OrgAdmin | Role::OrgMember => actor
                .organization_id
                .map(|organization_id| Visibility::Organization {
                    organization_id,
                    include_global: actor.global_data_access,
                })
                .ok_or_else(|| {
                    AccessError::MisconfiguredActor(format!(
                        "{} has no organization assigned",
                        actor.role
                    ))
                }),
            Role::User => Ok(Visibility::Personal {
                user_id: actor.user_id,
            }),
        }
    }

    /// Evaluate the predicate for one row.
    pub fn permits(&self, row: &Target) -> bool {
        match *self {
            Visibility::All => true,
            Visibility::Tenant { tenant_id } => row.tenant_id == Some(tenant_id),
            Visibility::Organization {
                organization_id,
                include_global,
            } => {
                row.organization_id == Some(organization_id)
                    || (include_global && row.globally_visible)
            }
            Visibility::Personal { user_id } => {
                row.organization_id.is_none() && row.created_by == Some(user_id)
            }
        }
    }

    /// Keep only the rows the predicate permits.
    pub fn filter<T, F>(&self, rows: Vec<T>, scope_of: F) -> Vec<T>
    where
        F: Fn(&T) -> Target,
    {
        rows.into_iter()
            .filter(|row| self.permits(&scope_of(row)))
            .collect()
    }

    /// Whether the predicate is unrestricted.
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Visibility::All)
    }
}
