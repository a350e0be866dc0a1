//! Service context
//!
//! [`TenantryServices`] bundles the collaborators every operation needs:
//! the credential store, the password hasher, the event bus, the JWT service
//! and the configuration. It is built once at startup and shared; the
//! operations themselves live in the sibling modules as `impl` blocks.

use std::sync::Arc;

use tenantry_auth::{
    Argon2PasswordHasher, JwtService, PasswordHasher, TenancyError, TenancyResult,
    TenantryConfig,
};
use tenantry_events::{publish_tenancy_event, EventBus, MemoryEventBus, TenancyEvent};
use tenantry_org::naming::{is_valid_domain, normalize_domain};
use tenantry_rbac::{authorize, AccessError, Action, Actor, Target};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::store::{
    CredentialStore, OrganizationLookup, StoreTransaction, TenantLookup, UserFilter,
};

/// Tenancy services over one credential store.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use tenantry_auth::TenantryConfig;
/// use tenantry_service::{store::MemoryStore, TenantryServices};
///
/// let config = TenantryConfig::default()
///     .with_jwt_secret("an-example-secret-that-is-32-bytes!");
/// let services = TenantryServices::new(config, Arc::new(MemoryStore::new())).unwrap();
/// assert_eq!(services.config().slug_attempts, 5);
/// ```
#[derive(Clone)]
pub struct TenantryServices {
    pub(crate) store: Arc<dyn CredentialStore>,
    pub(crate) hasher: Arc<dyn PasswordHasher>,
    pub(crate) events: Arc<dyn EventBus>,
    pub(crate) jwt: Arc<JwtService>,
    pub(crate) config: Arc<TenantryConfig>,
}

impl std::fmt::Debug for TenantryServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantryServices")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TenantryServices {
    /// Build the services with the default Argon2 hasher and an in-memory
    /// event bus.
    ///
    /// # Errors
    ///
    /// `Configuration` if the configuration does not validate.
    pub fn new(config: TenantryConfig, store: Arc<dyn CredentialStore>) -> TenancyResult<Self> {
        config.validate()?;
        let jwt = JwtService::new(&config)?;
        let hasher = Argon2PasswordHasher::with_pepper(config.password_pepper.clone());

        Ok(Self {
            store,
            hasher: Arc::new(hasher),
            events: Arc::new(MemoryEventBus::new()),
            jwt: Arc::new(jwt),
            config: Arc::new(config),
        })
    }

    /// Replace the password hasher.
    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Replace the event bus.
    pub fn with_event_bus(mut self, events: Arc<dyn EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &TenantryConfig {
        &self.config
    }

    /// Event bus the services publish to.
    pub fn events(&self) -> &Arc<dyn EventBus> {
        &self.events
    }

    /// Token service used for sessions.
    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    pub(crate) async fn begin(&self) -> TenancyResult<Box<dyn StoreTransaction>> {
        Ok(self.store.begin().await?)
    }

    pub(crate) async fn commit(&self, tx: Box<dyn StoreTransaction>) -> TenancyResult<()> {
        Ok(tx.commit().await?)
    }

    /// Publish after commit. Failures are logged and swallowed.
    pub(crate) async fn notify(
        &self,
        event: TenancyEvent,
        actor: Option<Uuid>,
        tenant_id: Option<Uuid>,
    ) {
        if let Err(e) = publish_tenancy_event(self.events.as_ref(), &event, actor, tenant_id).await
        {
            warn!(
                event_type = event.event_type(),
                error = %e,
                "failed to publish tenancy event"
            );
        }
    }

    pub(crate) fn hash_password(&self, password: &str) -> TenancyResult<String> {
        self.hasher.hash(password)
    }
}

/// Authorize, reporting scope failures as `NotFound`.
///
/// A role failure stays `Forbidden`; a target the actor could act on but does
/// not own is indistinguishable from a missing one.
pub(crate) fn authorize_masked(
    actor: &Actor,
    action: Action,
    target: &Target,
    entity: &str,
) -> TenancyResult<()> {
    match authorize(actor, action, target) {
        Ok(()) => Ok(()),
        Err(AccessError::Forbidden { reason })
            if action.guard().map_or(true, |g| g.allows(actor.role)) =>
        {
            debug!(reason = %reason, "masking out-of-scope {entity}");
            Err(not_found(entity))
        }
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn not_found(entity: &str) -> TenancyError {
    TenancyError::NotFound(format!("{entity} not found"))
}

/// Trim a required name.
pub(crate) fn required_name(name: &str, entity: &str) -> TenancyResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TenancyError::Validation(format!("{entity} name is required")));
    }
    Ok(name.to_string())
}

/// Trim an optional text field, treating blank as absent.
pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Normalize and validate a domain.
pub(crate) fn validated_domain(raw: &str) -> TenancyResult<String> {
    let domain = normalize_domain(raw);
    if !is_valid_domain(&domain) {
        return Err(TenancyError::Validation(format!("invalid domain: {raw}")));
    }
    Ok(domain)
}

/// Fail with `Conflict` if another tenant or organization holds `domain`.
///
/// `owner` is the record being updated, which may keep its own domain.
pub(crate) async fn ensure_domain_available(
    tx: &mut dyn StoreTransaction,
    domain: &str,
    owner: Option<Uuid>,
) -> TenancyResult<()> {
    let tenant = tx.find_tenant(TenantLookup::Domain(domain)).await?;
    let org = tx.find_organization(OrganizationLookup::Domain(domain)).await?;
    let holder = tenant.map(|t| t.id).or(org.map(|o| o.id));

    match holder {
        Some(id) if Some(id) != owner => Err(TenancyError::Conflict(format!(
            "domain {domain} is already registered"
        ))),
        _ => Ok(()),
    }
}

/// Seats taken in an organization: users holding `org_member` there.
pub(crate) async fn seats_taken(
    tx: &mut dyn StoreTransaction,
    organization_id: Uuid,
) -> TenancyResult<u64> {
    Ok(tx
        .count_users(UserFilter::OrganizationRole {
            organization_id,
            role: tenantry_org::Role::OrgMember,
        })
        .await?)
}
