//! Shared fixtures for the service integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tenantry_auth::{
    AdminCreateUserRequest, PasswordHasher, RegistrationRequest, TenancyResult, TenantryConfig,
};
use tenantry_events::{
    Event, EventBus, EventBusError, EventBusResult, EventBusStats, EventHandler, MemoryEventBus,
    Subscription,
};
use tenantry_org::{Organization, Role, Tenant, User, WhitelistEntry};
use tenantry_rbac::Actor;
use tenantry_service::store::{
    CredentialStore, MemoryStore, OrganizationFilter, OrganizationLookup, StoreError,
    StoreResult, StoreTransaction, TenantLookup, UserFilter, UserLookup,
};
use tenantry_service::{CreateOrganizationRequest, CreateTenantRequest, TenantryServices};
use uuid::Uuid;

pub const PASSWORD: &str = "correct-horse-battery";
pub const ROOT_EMAIL: &str = "root@platform.io";
const JWT_SECRET: &str = "integration-secret-0123456789-abcdef";

pub fn config() -> TenantryConfig {
    TenantryConfig::default().with_jwt_secret(JWT_SECRET)
}

/// Reversible stand-in for Argon2 so tests stay fast.
pub struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, secret: &str) -> TenancyResult<String> {
        Ok(format!("plain${secret}"))
    }

    fn verify(&self, secret: &str, digest: &str) -> TenancyResult<bool> {
        Ok(digest == format!("plain${secret}"))
    }
}

pub struct Fixture {
    pub services: TenantryServices,
    pub store: MemoryStore,
    pub bus: Arc<MemoryEventBus>,
    pub root: Actor,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_config(config()).await
    }

    pub async fn with_config(config: TenantryConfig) -> Self {
        let store = MemoryStore::new();
        Self::over(config, store.clone(), Arc::new(store)).await
    }

    /// Build over an arbitrary store; `store` is the memory store underneath it.
    pub async fn over(
        config: TenantryConfig,
        store: MemoryStore,
        backend: Arc<dyn CredentialStore>,
    ) -> Self {
        let bus = Arc::new(MemoryEventBus::new());
        let services = TenantryServices::new(config, backend)
            .unwrap()
            .with_hasher(Arc::new(PlainHasher))
            .with_event_bus(bus.clone());

        services
            .bootstrap_super_admin(RegistrationRequest::new(ROOT_EMAIL, PASSWORD))
            .await
            .unwrap();

        let mut fixture = Self {
            services,
            store,
            bus,
            root: Actor::new(Uuid::nil(), Role::User),
        };
        fixture.root = fixture.login(ROOT_EMAIL).await;
        fixture
    }

    /// Log in and resolve the actor for the stored account.
    pub async fn login(&self, email: &str) -> Actor {
        let session = self.services.authenticate(email, PASSWORD).await.unwrap();
        self.services
            .resolve_actor(&format!("Bearer {}", session.token.access_token))
            .await
            .unwrap()
    }

    pub async fn tenant(&self, name: &str) -> Tenant {
        self.services
            .create_tenant(&self.root, CreateTenantRequest::new(name))
            .await
            .unwrap()
    }

    pub async fn org(&self, tenant_id: Option<Uuid>, name: &str, max_users: u32) -> Organization {
        let mut request = CreateOrganizationRequest::new(name).with_max_users(max_users);
        request.tenant_id = tenant_id;
        self.services
            .create_organization(&self.root, request)
            .await
            .unwrap()
    }

    /// Self-register and log in.
    pub async fn register(&self, email: &str) -> Actor {
        self.services
            .self_register(RegistrationRequest::new(email, PASSWORD))
            .await
            .unwrap();
        self.login(email).await
    }

    /// Provision through `admin` and log in.
    pub async fn provision(
        &self,
        admin: &Actor,
        email: &str,
        role: Role,
        organization_id: Option<Uuid>,
        tenant_id: Option<Uuid>,
    ) -> Actor {
        let mut request = AdminCreateUserRequest::new(email, PASSWORD).with_role(role);
        request.organization_id = organization_id;
        request.tenant_id = tenant_id;
        self.services
            .admin_create_user(admin, request)
            .await
            .unwrap();
        self.login(email).await
    }

    /// Register, whitelist and join; returns the refreshed actor.
    pub async fn member_of(&self, org: &Organization, email: &str) -> Actor {
        let actor = self.register(email).await;
        self.services
            .add_to_whitelist(&self.root, org.id, email)
            .await
            .unwrap();
        self.services
            .join_organization(&actor, &org.join_token)
            .await
            .unwrap();
        self.login(email).await
    }

    pub async fn user(&self, id: Uuid) -> Option<User> {
        let mut tx = self.store.begin().await.unwrap();
        tx.find_user(UserLookup::Id(id)).await.unwrap()
    }

    pub async fn organization(&self, id: Uuid) -> Option<Organization> {
        let mut tx = self.store.begin().await.unwrap();
        tx.find_organization(OrganizationLookup::Id(id)).await.unwrap()
    }

    pub async fn users_in(&self, organization_id: Uuid) -> Vec<User> {
        let mut tx = self.store.begin().await.unwrap();
        tx.list_users(UserFilter::Organization(organization_id))
            .await
            .unwrap()
    }

    pub async fn whitelist_of(&self, organization_id: Uuid) -> Vec<WhitelistEntry> {
        let mut tx = self.store.begin().await.unwrap();
        tx.list_whitelist(organization_id).await.unwrap()
    }

    pub async fn subscribe_all(&self) -> Subscription {
        self.bus.subscribe("tenantry.#").await.unwrap()
    }
}

/// Event types received so far, in order.
pub fn drain(subscription: &mut Subscription) -> Vec<String> {
    let mut types = Vec::new();
    while let Ok(event) = subscription.receiver.try_recv() {
        types.push(event.event_type);
    }
    types
}

/// Event bus whose every operation fails.
pub struct BrokenBus;

#[async_trait]
impl EventBus for BrokenBus {
    async fn publish(&self, _event: Event) -> EventBusResult<()> {
        Err(EventBusError::PublishError("broker unreachable".to_string()))
    }

    async fn subscribe(&self, _topic: &str) -> EventBusResult<Subscription> {
        Err(EventBusError::SubscribeError("broker unreachable".to_string()))
    }

    async fn register_handler(&self, _handler: Arc<dyn EventHandler>) -> EventBusResult<()> {
        Err(EventBusError::ChannelClosed)
    }

    async fn unsubscribe(&self, _subscription_id: &str) -> EventBusResult<()> {
        Err(EventBusError::ChannelClosed)
    }

    async fn stats(&self) -> EventBusStats {
        EventBusStats::default()
    }
}

/// Faults a [`FaultyStore`] can inject.
#[derive(Debug, Default)]
pub struct Faults {
    /// Fail the next organization insert with a slug violation
    pub organization_slug_race: AtomicBool,
    /// Fail the next username insert with a username violation
    pub username_race: AtomicBool,
    /// Fail the next commit with a backend error
    pub commit_failure: AtomicBool,
}

impl Faults {
    fn take(flag: &AtomicBool) -> bool {
        flag.swap(false, Ordering::SeqCst)
    }
}

/// Memory store that injects one-shot faults.
pub struct FaultyStore {
    pub inner: MemoryStore,
    pub faults: Arc<Faults>,
}

#[async_trait]
impl CredentialStore for FaultyStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(FaultyTransaction {
            inner: self.inner.begin().await?,
            faults: self.faults.clone(),
        }))
    }
}

struct FaultyTransaction {
    inner: Box<dyn StoreTransaction>,
    faults: Arc<Faults>,
}

#[async_trait]
impl StoreTransaction for FaultyTransaction {
    async fn find_tenant(&mut self, lookup: TenantLookup<'_>) -> StoreResult<Option<Tenant>> {
        self.inner.find_tenant(lookup).await
    }

    async fn list_tenants(&mut self) -> StoreResult<Vec<Tenant>> {
        self.inner.list_tenants().await
    }

    async fn insert_tenant(&mut self, tenant: &Tenant) -> StoreResult<()> {
        self.inner.insert_tenant(tenant).await
    }

    async fn update_tenant(&mut self, tenant: &Tenant) -> StoreResult<()> {
        self.inner.update_tenant(tenant).await
    }

    async fn delete_tenant(&mut self, id: Uuid) -> StoreResult<()> {
        self.inner.delete_tenant(id).await
    }

    async fn find_organization(
        &mut self,
        lookup: OrganizationLookup<'_>,
    ) -> StoreResult<Option<Organization>> {
        self.inner.find_organization(lookup).await
    }

    async fn list_organizations(
        &mut self,
        filter: OrganizationFilter,
    ) -> StoreResult<Vec<Organization>> {
        self.inner.list_organizations(filter).await
    }

    async fn count_organizations(&mut self, filter: OrganizationFilter) -> StoreResult<u64> {
        self.inner.count_organizations(filter).await
    }

    async fn insert_organization(&mut self, org: &Organization) -> StoreResult<()> {
        if Faults::take(&self.faults.organization_slug_race) {
            return Err(StoreError::UniqueViolation {
                entity: "organization",
                field: "slug",
            });
        }
        self.inner.insert_organization(org).await
    }

    async fn update_organization(&mut self, org: &Organization) -> StoreResult<()> {
        self.inner.update_organization(org).await
    }

    async fn delete_organization(&mut self, id: Uuid) -> StoreResult<()> {
        self.inner.delete_organization(id).await
    }

    async fn find_user(&mut self, lookup: UserLookup<'_>) -> StoreResult<Option<User>> {
        self.inner.find_user(lookup).await
    }

    async fn list_users(&mut self, filter: UserFilter) -> StoreResult<Vec<User>> {
        self.inner.list_users(filter).await
    }

    async fn count_users(&mut self, filter: UserFilter) -> StoreResult<u64> {
        self.inner.count_users(filter).await
    }

    async fn insert_user(&mut self, user: &User) -> StoreResult<()> {
        if Faults::take(&self.faults.username_race) {
            return Err(StoreError::UniqueViolation {
                entity: "user",
                field: "username",
            });
        }
        self.inner.insert_user(user).await
    }

    async fn update_user(&mut self, user: &User) -> StoreResult<()> {
        self.inner.update_user(user).await
    }

    async fn delete_user(&mut self, id: Uuid) -> StoreResult<()> {
        self.inner.delete_user(id).await
    }

    async fn find_whitelist_entry(
        &mut self,
        organization_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<WhitelistEntry>> {
        self.inner.find_whitelist_entry(organization_id, email).await
    }

    async fn list_whitelist(&mut self, organization_id: Uuid) -> StoreResult<Vec<WhitelistEntry>> {
        self.inner.list_whitelist(organization_id).await
    }

    async fn insert_whitelist_entry(&mut self, entry: &WhitelistEntry) -> StoreResult<()> {
        self.inner.insert_whitelist_entry(entry).await
    }

    async fn update_whitelist_entry(&mut self, entry: &WhitelistEntry) -> StoreResult<()> {
        self.inner.update_whitelist_entry(entry).await
    }

    async fn delete_whitelist(&mut self, organization_id: Uuid) -> StoreResult<u64> {
        self.inner.delete_whitelist(organization_id).await
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        if Faults::take(&self.faults.commit_failure) {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        self.inner.commit().await
    }
}

/// Fixture over a [`FaultyStore`].
pub async fn faulty_fixture() -> (Fixture, Arc<Faults>) {
    let inner = MemoryStore::new();
    let faults = Arc::new(Faults::default());
    let store = FaultyStore {
        inner: inner.clone(),
        faults: faults.clone(),
    };
    let fixture = Fixture::over(config(), inner, Arc::new(store)).await;
    (fixture, faults)
}
