//! In-memory credential store.
//!
//! Transactions are serialized through a `tokio::sync::Mutex`. Each
//! transaction holds the lock for its lifetime and writes to a working copy
//! of the state; `commit` swaps the copy in, and dropping the transaction
//! throws it away.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tenantry_org::{Organization, Tenant, User, WhitelistEntry};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;
use uuid::Uuid;

use super::{
    CredentialStore, OrganizationFilter, OrganizationLookup, StoreError, StoreResult,
    StoreTransaction, TenantLookup, UserFilter, UserLookup,
};

#[derive(Debug, Clone, Default)]
struct State {
    tenants: HashMap<Uuid, Tenant>,
    organizations: HashMap<Uuid, Organization>,
    users: HashMap<Uuid, User>,
    whitelist: HashMap<Uuid, WhitelistEntry>,
}

impl State {
    fn domain_taken(&self, domain: &str, except: Uuid) -> bool {
        self.tenants
            .values()
            .any(|t| t.id != except && t.domain.as_deref() == Some(domain))
            || self
                .organizations
                .values()
                .any(|o| o.id != except && o.domain.as_deref() == Some(domain))
    }

    fn check_tenant(&self, tenant: &Tenant) -> StoreResult<()> {
        if self
            .tenants
            .values()
            .any(|t| t.id != tenant.id && t.slug == tenant.slug)
        {
            return Err(unique("tenant", "slug"));
        }
        if let Some(domain) = tenant.domain.as_deref() {
            if self.domain_taken(domain, tenant.id) {
                return Err(unique("tenant", "domain"));
            }
        }
        Ok(())
    }

    fn check_organization(&self, org: &Organization) -> StoreResult<()> {
        for other in self.organizations.values().filter(|o| o.id != org.id) {
            if other.slug == org.slug {
                return Err(unique("organization", "slug"));
            }
            if other.join_token == org.join_token {
                return Err(unique("organization", "join_token"));
            }
        }
        if let Some(domain) = org.domain.as_deref() {
            if self.domain_taken(domain, org.id) {
                return Err(unique("organization", "domain"));
            }
        }
        if let Some(tenant_id) = org.tenant_id {
            if !self.tenants.contains_key(&tenant_id) {
                return Err(foreign_key("organization", "tenant_id"));
            }
        }
        Ok(())
    }

    fn check_user(&self, user: &User) -> StoreResult<()> {
        for other in self.users.values().filter(|u| u.id != user.id) {
            if other.email == user.email {
                return Err(unique("user", "email"));
            }
            if other.username == user.username {
                return Err(unique("user", "username"));
            }
        }
        if let Some(org_id) = user.organization_id {
            if !self.organizations.contains_key(&org_id) {
                return Err(foreign_key("user", "organization_id"));
            }
        }
        if let Some(tenant_id) = user.tenant_id {
            if !self.tenants.contains_key(&tenant_id) {
                return Err(foreign_key("user", "tenant_id"));
            }
        }
        Ok(())
    }

    fn check_whitelist_entry(&self, entry: &WhitelistEntry) -> StoreResult<()> {
        if self.whitelist.values().any(|w| {
            w.id != entry.id
                && w.organization_id == entry.organization_id
                && w.email == entry.email
        }) {
            return Err(unique("whitelist_entry", "email"));
        }
        if !self.organizations.contains_key(&entry.organization_id) {
            return Err(foreign_key("whitelist_entry", "organization_id"));
        }
        Ok(())
    }
}

fn unique(entity: &'static str, field: &'static str) -> StoreError {
    StoreError::UniqueViolation { entity, field }
}

fn foreign_key(entity: &'static str, field: &'static str) -> StoreError {
    StoreError::ForeignKeyViolation { entity, field }
}

fn sorted<T, K: Ord>(mut rows: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    rows.sort_by_key(key);
    rows
}

/// Credential store held in process memory.
///
/// Cloning shares the underlying state.
///
/// # Example
///
/// ```rust
/// use tenantry_service::store::{CredentialStore, MemoryStore, TenantLookup};
/// use tenantry_org::Tenant;
/// use uuid::Uuid;
///
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemoryStore::new();
/// let tenant = Tenant::new("Acme", "acme", Uuid::now_v7());
///
/// let mut tx = store.begin().await.unwrap();
/// tx.insert_tenant(&tenant).await.unwrap();
/// tx.commit().await.unwrap();
///
/// let mut tx = store.begin().await.unwrap();
/// assert!(tx.find_tenant(TenantLookup::Slug("acme")).await.unwrap().is_some());
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<State>,
    working: State,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn find_tenant(&mut self, lookup: TenantLookup<'_>) -> StoreResult<Option<Tenant>> {
        let tenants = &self.working.tenants;
        Ok(match lookup {
            TenantLookup::Id(id) => tenants.get(&id).cloned(),
            TenantLookup::Slug(slug) => tenants.values().find(|t| t.slug == slug).cloned(),
            TenantLookup::Domain(domain) => tenants
                .values()
                .find(|t| t.domain.as_deref() == Some(domain))
                .cloned(),
        })
    }

    async fn list_tenants(&mut self) -> StoreResult<Vec<Tenant>> {
        let rows = self.working.tenants.values().cloned().collect();
        Ok(sorted(rows, |t: &Tenant| (t.created_at, t.id)))
    }

    async fn insert_tenant(&mut self, tenant: &Tenant) -> StoreResult<()> {
        if self.working.tenants.contains_key(&tenant.id) {
            return Err(unique("tenant", "id"));
        }
        self.working.check_tenant(tenant)?;
        self.working.tenants.insert(tenant.id, tenant.clone());
        Ok(())
    }

    async fn update_tenant(&mut self, tenant: &Tenant) -> StoreResult<()> {
        if !self.working.tenants.contains_key(&tenant.id) {
            return Err(StoreError::NotFound {
                entity: "tenant",
                id: tenant.id,
            });
        }
        self.working.check_tenant(tenant)?;
        self.working.tenants.insert(tenant.id, tenant.clone());
        Ok(())
    }

    async fn delete_tenant(&mut self, id: Uuid) -> StoreResult<()> {
        if self
            .working
            .organizations
            .values()
            .any(|o| o.tenant_id == Some(id))
        {
            return Err(foreign_key("organization", "tenant_id"));
        }
        if self.working.users.values().any(|u| u.tenant_id == Some(id)) {
            return Err(foreign_key("user", "tenant_id"));
        }
        self.working
            .tenants
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound {
                entity: "tenant",
                id,
            })
    }

    async fn find_organization(
        &mut self,
        lookup: OrganizationLookup<'_>,
    ) -> StoreResult<Option<Organization>> {
        let orgs = &self.working.organizations;
        Ok(match lookup {
            OrganizationLookup::Id(id) => orgs.get(&id).cloned(),
            OrganizationLookup::Slug(slug) => orgs.values().find(|o| o.slug == slug).cloned(),
            OrganizationLookup::Domain(domain) => orgs
                .values()
                .find(|o| o.domain.as_deref() == Some(domain))
                .cloned(),
            OrganizationLookup::JoinToken(token) => {
                orgs.values().find(|o| o.join_token == token).cloned()
            }
        })
    }

    async fn list_organizations(
        &mut self,
        filter: OrganizationFilter,
    ) -> StoreResult<Vec<Organization>> {
        let rows = self
            .working
            .organizations
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        Ok(sorted(rows, |o: &Organization| (o.created_at, o.id)))
    }

    async fn count_organizations(&mut self, filter: OrganizationFilter) -> StoreResult<u64> {
        Ok(self
            .working
            .organizations
            .values()
            .filter(|o| filter.matches(o))
            .count() as u64)
    }

    async fn insert_organization(&mut self, org: &Organization) -> StoreResult<()> {
        if self.working.organizations.contains_key(&org.id) {
            return Err(unique("organization", "id"));
        }
        self.working.check_organization(org)?;
        self.working.organizations.insert(org.id, org.clone());
        Ok(())
    }

    async fn update_organization(&mut self, org: &Organization) -> StoreResult<()> {
        if !self.working.organizations.contains_key(&org.id) {
            return Err(StoreError::NotFound {
                entity: "organization",
                id: org.id,
            });
        }
        self.working.check_organization(org)?;
        self.working.organizations.insert(org.id, org.clone());
        Ok(())
    }

    async fn delete_organization(&mut self, id: Uuid) -> StoreResult<()> {
        if self
            .working
            .users
            .values()
            .any(|u| u.organization_id == Some(id))
        {
            return Err(foreign_key("user", "organization_id"));
        }
        if self
            .working
            .whitelist
            .values()
            .any(|w| w.organization_id == id)
        {
            return Err(foreign_key("whitelist_entry", "organization_id"));
        }
        self.working
            .organizations
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound {
                entity: "organization",
                id,
            })
    }

    async fn find_user(&mut self, lookup: UserLookup<'_>) -> StoreResult<Option<User>> {
        let users = &self.working.users;
        Ok(match lookup {
            UserLookup::Id(id) => users.get(&id).cloned(),
            UserLookup::Email(email) => users.values().find(|u| u.email == email).cloned(),
            UserLookup::Username(username) => {
                users.values().find(|u| u.username == username).cloned()
            }
        })
    }

    async fn list_users(&mut self, filter: UserFilter) -> StoreResult<Vec<User>> {
        let rows = self
            .working
            .users
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();
        Ok(sorted(rows, |u: &User| (u.created_at, u.id)))
    }

    async fn count_users(&mut self, filter: UserFilter) -> StoreResult<u64> {
        Ok(self
            .working
            .users
            .values()
            .filter(|u| filter.matches(u))
            .count() as u64)
    }

    async fn insert_user(&mut self, user: &User) -> StoreResult<()> {
        if self.working.users.contains_key(&user.id) {
            return Err(unique("user", "id"));
        }
        self.working.check_user(user)?;
        self.working.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&mut self, user: &User) -> StoreResult<()> {
        if !self.working.users.contains_key(&user.id) {
            return Err(StoreError::NotFound {
                entity: "user",
                id: user.id,
            });
        }
        self.working.check_user(user)?;
        self.working.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn delete_user(&mut self, id: Uuid) -> StoreResult<()> {
        self.working
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound { entity: "user", id })
    }

    async fn find_whitelist_entry(
        &mut self,
        organization_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<WhitelistEntry>> {
        Ok(self
            .working
            .whitelist
            .values()
            .find(|w| w.organization_id == organization_id && w.email == email)
            .cloned())
    }

    async fn list_whitelist(&mut self, organization_id: Uuid) -> StoreResult<Vec<WhitelistEntry>> {
        let rows = self
            .working
            .whitelist
            .values()
            .filter(|w| w.organization_id == organization_id)
            .cloned()
            .collect();
        Ok(sorted(rows, |w: &WhitelistEntry| (w.added_at, w.id)))
    }

    async fn insert_whitelist_entry(&mut self, entry: &WhitelistEntry) -> StoreResult<()> {
        if self.working.whitelist.contains_key(&entry.id) {
            return Err(unique("whitelist_entry", "id"));
        }
        self.working.check_whitelist_entry(entry)?;
        self.working.whitelist.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn update_whitelist_entry(&mut self, entry: &WhitelistEntry) -> StoreResult<()> {
        if !self.working.whitelist.contains_key(&entry.id) {
            return Err(StoreError::NotFound {
                entity: "whitelist_entry",
                id: entry.id,
            });
        }
        self.working.check_whitelist_entry(entry)?;
        self.working.whitelist.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn delete_whitelist(&mut self, organization_id: Uuid) -> StoreResult<u64> {
        let before = self.working.whitelist.len();
        self.working
            .whitelist
            .retain(|_, w| w.organization_id != organization_id);
        Ok((before - self.working.whitelist.len()) as u64)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTransaction {
            mut guard,
            working,
        } = *self;
        *guard = working;
        trace!("memory store transaction committed");
        Ok(())
    }
}
