//! # Tenantry Services
//!
//! This crate provides the tenancy operations of the platform on top of a
//! transactional credential store.
//!
//! ## Overview
//!
//! The tenantry-service crate handles:
//! - **Tenants**: create, update, force-delete, read
//! - **Organizations**: create, update, delete, join-token rotation, members
//! - **Whitelist**: per-organization email allow-lists
//! - **Join**: the ordered, whitelist-gated self-service join
//! - **Users**: self-registration, admin provisioning, role changes
//! - **Sessions**: login and per-request actor resolution
//!
//! Each operation runs in one store transaction. A rejected operation never
//! commits, so it leaves the store unchanged. Notifications are published
//! after commit; a failed publish is logged and does not undo the change.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tenantry_auth::{RegistrationRequest, TenantryConfig};
//! use tenantry_service::{store::MemoryStore, CreateOrganizationRequest, TenantryServices};
//!
//! # async fn example() -> tenantry_auth::TenancyResult<()> {
//! let services = TenantryServices::new(TenantryConfig::from_env(), Arc::new(MemoryStore::new()))?;
//!
//! services
//!     .bootstrap_super_admin(RegistrationRequest::new("root@acme.com", "change-me-now"))
//!     .await?;
//! let session = services.authenticate("root@acme.com", "change-me-now").await?;
//! let root = services.resolve_actor(&session.token.access_token).await?;
//!
//! let org = services
//!     .create_organization(&root, CreateOrganizationRequest::new("Acme Risk"))
//!     .await?;
//! services.add_to_whitelist(&root, org.id, "jane@acme.com").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Integration
//!
//! This crate integrates with:
//! - `tenantry-rbac`: every operation is decided by `authorize` or `Visibility`
//! - `tenantry-auth`: errors, password hashing, join tokens, access tokens
//! - `tenantry-events`: lifecycle notifications

pub mod context;
pub mod join;
pub mod organizations;
pub mod session;
pub mod store;
pub mod tenants;
pub mod users;
pub mod whitelist;

// Re-export main types
pub use context::TenantryServices;
pub use join::JoinOutcome;
pub use organizations::{CreateOrganizationRequest, OrganizationDeletion};
pub use session::Session;
pub use store::{CredentialStore, MemoryStore, StoreError, StoreResult, StoreTransaction};
pub use tenants::{CreateTenantRequest, TenantDeletion};
