//! Credential store
//!
//! Services reach persistence only through these traits. Every logical
//! operation opens one [`StoreTransaction`], reads and writes through it, and
//! calls [`StoreTransaction::commit`]. Dropping a transaction without
//! committing discards every write made through it.
//!
//! Stores enforce the unique constraints (email, username, slugs, domains,
//! join tokens, whitelist `(organization, email)`) even though services
//! pre-check them; a violation surfaces as [`StoreError::UniqueViolation`].

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use tenantry_auth::TenancyError;
use tenantry_org::{Organization, Role, Tenant, User, WhitelistEntry};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// Store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("unique constraint violated: {entity}.{field}")]
    UniqueViolation {
        entity: &'static str,
        field: &'static str,
    },

    /// The row to update or delete does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// A referenced row is missing, or a deleted row is still referenced
    #[error("foreign key violated: {entity}.{field}")]
    ForeignKeyViolation {
        entity: &'static str,
        field: &'static str,
    },

    /// Backend failure
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for TenancyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { entity, field } => {
                TenancyError::Conflict(unique_violation_message(entity, field))
            }
            StoreError::NotFound { entity, .. } => {
                TenancyError::NotFound(format!("{entity} not found"))
            }
            StoreError::ForeignKeyViolation { entity, field } => {
                TenancyError::Conflict(format!("{entity} {field} references a missing or live row"))
            }
            StoreError::Backend(detail) => {
                error!(detail = %detail, "credential store failure");
                TenancyError::Internal("storage failure".to_string())
            }
        }
    }
}

fn unique_violation_message(entity: &str, field: &str) -> String {
    match (entity, field) {
        ("user", "email") => "email is already registered".to_string(),
        ("user", "username") => "username is already taken".to_string(),
        (_, "domain") => "domain is already registered".to_string(),
        (_, "slug") => format!("{entity} slug is already in use"),
        ("organization", "join_token") => "join token collision".to_string(),
        ("whitelist_entry", _) => "email is already whitelisted".to_string(),
        _ => format!("{entity} {field} must be unique"),
    }
}

/// Tenant lookup keys.
#[derive(Debug, Clone, Copy)]
pub enum TenantLookup<'a> {
    Id(Uuid),
    Slug(&'a str),
    Domain(&'a str),
}

/// Organization lookup keys.
#[derive(Debug, Clone, Copy)]
pub enum OrganizationLookup<'a> {
    Id(Uuid),
    Slug(&'a str),
    Domain(&'a str),
    JoinToken(&'a str),
}

/// User lookup keys.
#[derive(Debug, Clone, Copy)]
pub enum UserLookup<'a> {
    Id(Uuid),
    Email(&'a str),
    Username(&'a str),
}

/// Organization listing filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizationFilter {
    All,
    Tenant(Uuid),
}

impl OrganizationFilter {
    /// Whether `org` passes the filter.
    pub fn matches(&self, org: &Organization) -> bool {
        match *self {
            OrganizationFilter::All => true,
            OrganizationFilter::Tenant(tenant_id) => org.tenant_id == Some(tenant_id),
        }
    }
}

/// User listing and counting filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFilter {
    All,
    /// Every user whose `organization_id` is the organization
    Organization(Uuid),
    /// Every user whose `tenant_id` is the tenant
    Tenant(Uuid),
    /// Users of the organization holding exactly `role`
    OrganizationRole { organization_id: Uuid, role: Role },
    /// Users holding `role` anywhere
    Role(Role),
}

impl UserFilter {
    /// Whether `user` passes the filter.
    pub fn matches(&self, user: &User) -> bool {
        match *self {
            UserFilter::All => true,
            UserFilter::Organization(org_id) => user.organization_id == Some(org_id),
            UserFilter::Tenant(tenant_id) => user.tenant_id == Some(tenant_id),
            UserFilter::OrganizationRole {
                organization_id,
                role,
            } => user.organization_id == Some(organization_id) && user.role == role,
            UserFilter::Role(role) => user.role == role,
        }
    }
}

/// One unit of work against the credential store.
///
/// A failed write leaves the transaction usable; implementations backed by
/// SQL wrap each statement in a savepoint so services can retry an insert
/// after a unique violation.
#[async_trait]
pub trait StoreTransaction: Send {
    // Tenants

    async fn find_tenant(&mut self, lookup: TenantLookup<'_>) -> StoreResult<Option<Tenant>>;
    async fn list_tenants(&mut self) -> StoreResult<Vec<Tenant>>;
    async fn insert_tenant(&mut self, tenant: &Tenant) -> StoreResult<()>;
    async fn update_tenant(&mut self, tenant: &Tenant) -> StoreResult<()>;
    async fn delete_tenant(&mut self, id: Uuid) -> StoreResult<()>;

    // Organizations

    async fn find_organization(
        &mut self,
        lookup: OrganizationLookup<'_>,
    ) -> StoreResult<Option<Organization>>;
    async fn list_organizations(
        &mut self,
        filter: OrganizationFilter,
    ) -> StoreResult<Vec<Organization>>;
    async fn count_organizations(&mut self, filter: OrganizationFilter) -> StoreResult<u64>;
    async fn insert_organization(&mut self, org: &Organization) -> StoreResult<()>;
    async fn update_organization(&mut self, org: &Organization) -> StoreResult<()>;
    async fn delete_organization(&mut self, id: Uuid) -> StoreResult<()>;

    // Users

    async fn find_user(&mut self, lookup: UserLookup<'_>) -> StoreResult<Option<User>>;
    async fn list_users(&mut self, filter: UserFilter) -> StoreResult<Vec<User>>;
    async fn count_users(&mut self, filter: UserFilter) -> StoreResult<u64>;
    async fn insert_user(&mut self, user: &User) -> StoreResult<()>;
    async fn update_user(&mut self, user: &User) -> StoreResult<()>;
    async fn delete_user(&mut self, id: Uuid) -> StoreResult<()>;

    // Whitelist

    async fn find_whitelist_entry(
        &mut self,
        organization_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<WhitelistEntry>>;
    async fn list_whitelist(&mut self, organization_id: Uuid) -> StoreResult<Vec<WhitelistEntry>>;
    async fn insert_whitelist_entry(&mut self, entry: &WhitelistEntry) -> StoreResult<()>;
    async fn update_whitelist_entry(&mut self, entry: &WhitelistEntry) -> StoreResult<()>;
    /// Remove every entry of an organization, returning how many were removed.
    async fn delete_whitelist(&mut self, organization_id: Uuid) -> StoreResult<u64>;

    /// Make every write visible atomically.
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Transactional credential store.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Open a transaction.
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;
}
