//! # Tenantry Domain Model
//!
//! This crate provides the identity and tenancy entities shared by every
//! tenantry crate.
//!
//! ## Overview
//!
//! The tenantry-org crate handles:
//! - **Roles**: The fixed five-tier role hierarchy
//! - **Tenants**: Top-level administrative containers
//! - **Organizations**: Member groups with join tokens and capacity limits
//! - **Users**: Accounts with one role and optional tenant/organization
//! - **Whitelist**: Per-organization email allow-lists for self-service joins
//! - **Naming**: Slug, username, email and domain normalization
//!
//! ## Architecture
//!
//! ```text
//! Tenant
//!   └─ Organization (tenant_id, nullable)
//!        ├─ WhitelistEntry (organization_id)
//!        └─ User (organization_id, nullable; tenant_id, nullable)
//! ```
//!
//! All references are foreign ids. Detaching a user from an organization
//! is a field write, never a graph mutation.
//!
//! ## Usage
//!
//! ```rust
//! use tenantry_org::{Organization, Role, Tenant, User};
//! use uuid::Uuid;
//!
//! let operator = Uuid::now_v7();
//! let tenant = Tenant::new("Acme", "acme", operator);
//! let org = Organization::new("Acme Risk", "acme-risk", "token", operator).with_tenant(tenant.id);
//!
//! let mut user = User::new("jane@acme.com", "jane", "digest");
//! user.organization_id = Some(org.id);
//! user.role = Role::OrgMember;
//! assert!(user.role_is_consistent());
//! ```

pub mod naming;
pub mod organization;
pub mod roles;
pub mod tenant;
pub mod user;
pub mod whitelist;

// Re-export main types for convenience
pub use organization::{
    Organization, OrganizationPatch, OrganizationSummary, DEFAULT_MAX_USERS, JOIN_TOKEN_LENGTH,
};
pub use roles::Role;
pub use tenant::{Tenant, TenantPatch};
pub use user::{User, UserView};
pub use whitelist::{WhitelistEntry, WhitelistStatus};
