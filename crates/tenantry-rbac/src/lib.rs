//! # Tenantry RBAC (Role-Based Access Control)
//!
//! Role guards, scope matching and data visibility for the tenantry
//! platform. Everything in this crate is pure: decisions depend only on the
//! actor, the action and the target scope, never on the store.
//!
//! ## Overview
//!
//! The tenantry-rbac crate handles:
//! - **Guards**: the five named role thresholds (super admin, tenant admin,
//!   org admin, org member, any admin)
//! - **Actions**: every operation the resolver rules on, with its guard and
//!   scope rule
//! - **Authorization**: `authorize(actor, action, target)`
//! - **Visibility**: the per-row filter applied to listings and reads
//! - **Assignment**: which roles an actor may grant
//!
//! ## Architecture
//!
//! ```text
//! authorize = role guard (rank check) + scope match
//!
//!   super_admin   bypasses scope
//!   tenant_admin  actor.tenant_id == target.tenant_id
//!   org_admin     actor.organization_id == target.organization_id
//!   org_member      (or: read of a globally visible target with global access)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use tenantry_rbac::{authorize, Action, Actor, Target, Visibility};
//! use tenantry_org::Role;
//! use uuid::Uuid;
//!
//! let tenant = Uuid::now_v7();
//! let org = Uuid::now_v7();
//! let admin = Actor::new(Uuid::now_v7(), Role::OrgAdmin)
//!     .with_tenant(tenant)
//!     .with_organization(org);
//!
//! // Own organization
//! assert!(authorize(&admin, Action::ManageWhitelist, &Target::organization(org, Some(tenant))).is_ok());
//!
//! // Tenant-level settings are reserved for tenant admins
//! assert!(authorize(&admin, Action::ManageOrganizationSettings, &Target::organization(org, Some(tenant))).is_err());
//!
//! // Row filter for listings
//! let visibility = Visibility::for_actor(&admin).unwrap();
//! assert!(visibility.permits(&Target::data(Some(org), Some(tenant), admin.user_id)));
//! ```
//!
//! ## Integration with tenantry-org
//!
//! Roles come from `tenantry-org`; `Target::of_tenant`,
//! `Target::of_organization` and `Target::of_user` derive scopes from the
//! stored entities.

pub mod actions;
pub mod actor;
pub mod assignment;
pub mod permissions;
pub mod resources;
pub mod visibility;

// Re-export main types for convenience
pub use actions::{Action, ScopeRule};
pub use actor::Actor;
pub use assignment::{assignable_roles, can_assign, check_assignment, check_manageable};
pub use permissions::{authorize, require_at_least, AccessError, AccessResult, Guard};
pub use resources::{RowScope, Target};
pub use visibility::Visibility;
