//! Tenant lifecycle
//!
//! Tenants are created and deleted by super admins only. A tenant admin may
//! read and update their own tenant.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tenantry_auth::{TenancyError, TenancyResult};
use tenantry_events::TenancyEvent;
use tenantry_org::naming::{slug_with_random_suffix, slugify};
use tenantry_org::{Tenant, TenantPatch};
use tenantry_rbac::{authorize, Action, Actor, Guard, Target, Visibility};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::context::{
    authorize_masked, ensure_domain_available, not_found, optional_text, required_name,
    validated_domain, TenantryServices,
};
use crate::store::{OrganizationFilter, StoreError, StoreTransaction, TenantLookup, UserFilter};

/// Request to create a tenant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTenantRequest {
    /// Display name; the slug is derived from it
    pub name: String,
    /// Registered domain
    #[serde(default)]
    pub domain: Option<String>,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Logo URL
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl CreateTenantRequest {
    /// Create a request with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// What a tenant deletion removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantDeletion {
    /// Deleted tenant
    pub tenant_id: Uuid,
    /// Organizations deleted with it
    pub deleted_organizations: Vec<Uuid>,
    /// Users whose organization or tenant reference was cleared
    pub detached_users: u64,
}

impl TenantryServices {
    /// Create a tenant. Super admin only.
    #[instrument(skip(self, actor, request), fields(actor_id = %actor.user_id, name = %request.name))]
    pub async fn create_tenant(
        &self,
        actor: &Actor,
        request: CreateTenantRequest,
    ) -> TenancyResult<Tenant> {
        authorize(actor, Action::CreateTenant, &Target::platform())?;

        let name = required_name(&request.name, "tenant")?;
        let domain = request.domain.as_deref().map(validated_domain).transpose()?;

        let mut tx = self.begin().await?;
        if let Some(domain) = domain.as_deref() {
            ensure_domain_available(tx.as_mut(), domain, None).await?;
        }

        let base = slugify(&name, "tenant");
        let slug = self.free_tenant_slug(tx.as_mut(), &base).await?;

        let mut tenant = Tenant::new(name, slug, actor.user_id);
        tenant.domain = domain;
        tenant.description = optional_text(request.description.as_deref());
        tenant.logo_url = optional_text(request.logo_url.as_deref());

        let mut attempt = 1;
        loop {
            match tx.insert_tenant(&tenant).await {
                Ok(()) => break,
                Err(StoreError::UniqueViolation { field: "slug", .. })
                    if attempt < self.config.slug_attempts =>
                {
                    attempt += 1;
                    tenant.slug = slug_with_random_suffix(&base);
                    debug!(slug = %tenant.slug, attempt, "tenant slug taken at insert; retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        self.commit(tx).await?;

        info!(tenant_id = %tenant.id, slug = %tenant.slug, "tenant created");
        self.notify(
            TenancyEvent::TenantCreated {
                tenant_id: tenant.id,
                slug: tenant.slug.clone(),
            },
            Some(actor.user_id),
            Some(tenant.id),
        )
        .await;
        Ok(tenant)
    }

    /// Apply a partial update to a tenant.
    ///
    /// Tenant admins may update their own tenant but not (de)activate it.
    #[instrument(skip(self, actor, patch), fields(actor_id = %actor.user_id))]
    pub async fn update_tenant(
        &self,
        actor: &Actor,
        tenant_id: Uuid,
        patch: TenantPatch,
    ) -> TenancyResult<Tenant> {
        Guard::TenantAdmin.check(actor.role)?;
        if patch.is_active.is_some() && !actor.is_super_admin() {
            return Err(TenancyError::forbidden("is_active requires super_admin"));
        }

        let mut tx = self.begin().await?;
        let mut tenant = tx
            .find_tenant(TenantLookup::Id(tenant_id))
            .await?
            .ok_or_else(|| not_found("tenant"))?;
        authorize_masked(actor, Action::UpdateTenant, &Target::of_tenant(&tenant), "tenant")?;

        if patch.is_empty() {
            return Ok(tenant);
        }

        let mut fields = Vec::new();
        if let Some(name) = patch.name.as_deref() {
            tenant.name = required_name(name, "tenant")?;
            fields.push("name");
        }
        if let Some(raw) = patch.domain.as_deref() {
            tenant.domain = match raw.trim() {
                "" => None,
                raw => {
                    let domain = validated_domain(raw)?;
                    ensure_domain_available(tx.as_mut(), &domain, Some(tenant.id)).await?;
                    Some(domain)
                }
            };
            fields.push("domain");
        }
        if let Some(description) = patch.description.as_deref() {
            tenant.description = optional_text(Some(description));
            fields.push("description");
        }
        if let Some(logo_url) = patch.logo_url.as_deref() {
            tenant.logo_url = optional_text(Some(logo_url));
            fields.push("logo_url");
        }
        if let Some(is_active) = patch.is_active {
            tenant.is_active = is_active;
            fields.push("is_active");
        }

        tenant.touch();
        tx.update_tenant(&tenant).await?;
        self.commit(tx).await?;

        info!(tenant_id = %tenant.id, fields = ?fields, "tenant updated");
        self.notify(
            TenancyEvent::TenantUpdated {
                tenant_id: tenant.id,
                fields: fields.into_iter().map(str::to_string).collect(),
            },
            Some(actor.user_id),
            Some(tenant.id),
        )
        .await;
        Ok(tenant)
    }

    /// Delete a tenant. Super admin only.
    ///
    /// A tenant that still owns organizations is only deleted with `force`,
    /// in which case each organization is deleted with its members detached
    /// and its whitelist removed. Users referencing the tenant directly are
    /// detached from it, tenant admins falling back to `user`.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn delete_tenant(
        &self,
        actor: &Actor,
        tenant_id: Uuid,
        force: bool,
    ) -> TenancyResult<TenantDeletion> {
        authorize(actor, Action::DeleteTenant, &Target::tenant(tenant_id))?;

        let mut tx = self.begin().await?;
        let tenant = tx
            .find_tenant(TenantLookup::Id(tenant_id))
            .await?
            .ok_or_else(|| not_found("tenant"))?;

        let orgs = tx
            .list_organizations(OrganizationFilter::Tenant(tenant.id))
            .await?;
        if !orgs.is_empty() && !force {
            return Err(TenancyError::Conflict(format!(
                "tenant has {} organizations; delete them first or pass force",
                orgs.len()
            )));
        }

        let mut detached = HashSet::new();
        let mut org_reports = Vec::with_capacity(orgs.len());
        for org in &orgs {
            let members = detach_members(tx.as_mut(), org.id).await?;
            tx.delete_whitelist(org.id).await?;
            tx.delete_organization(org.id).await?;
            org_reports.push((org.id, members.len() as u64));
            detached.extend(members);
        }

        for mut user in tx.list_users(UserFilter::Tenant(tenant.id)).await? {
            if user.detach_from_tenant() {
                tx.update_user(&user).await?;
                detached.insert(user.id);
            }
        }

        tx.delete_tenant(tenant.id).await?;
        self.commit(tx).await?;

        let deletion = TenantDeletion {
            tenant_id: tenant.id,
            deleted_organizations: org_reports.iter().map(|(id, _)| *id).collect(),
            detached_users: detached.len() as u64,
        };
        info!(
            tenant_id = %tenant.id,
            organizations = deletion.deleted_organizations.len(),
            detached_users = deletion.detached_users,
            "tenant deleted"
        );

        for (organization_id, detached_members) in org_reports {
            self.notify(
                TenancyEvent::OrganizationDeleted {
                    organization_id,
                    tenant_id: Some(tenant.id),
                    detached_members,
                },
                Some(actor.user_id),
                Some(tenant.id),
            )
            .await;
        }
        self.notify(
            TenancyEvent::TenantDeleted {
                tenant_id: tenant.id,
                deleted_organizations: deletion.deleted_organizations.len() as u64,
                detached_users: deletion.detached_users,
            },
            Some(actor.user_id),
            Some(tenant.id),
        )
        .await;
        Ok(deletion)
    }

    /// Fetch a tenant the actor can see.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn get_tenant(&self, actor: &Actor, tenant_id: Uuid) -> TenancyResult<Tenant> {
        Guard::TenantAdmin.check(actor.role)?;

        let mut tx = self.begin().await?;
        let tenant = tx
            .find_tenant(TenantLookup::Id(tenant_id))
            .await?
            .ok_or_else(|| not_found("tenant"))?;
        authorize_masked(actor, Action::ViewTenant, &Target::of_tenant(&tenant), "tenant")?;
        Ok(tenant)
    }

    /// List the tenants the actor can see.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn list_tenants(&self, actor: &Actor) -> TenancyResult<Vec<Tenant>> {
        Guard::TenantAdmin.check(actor.role)?;
        let visibility = Visibility::for_actor(actor)?;

        let mut tx = self.begin().await?;
        let tenants = tx.list_tenants().await?;
        Ok(visibility.filter(tenants, Target::of_tenant))
    }

    async fn free_tenant_slug(
        &self,
        tx: &mut dyn StoreTransaction,
        base: &str,
    ) -> TenancyResult<String> {
        if tx.find_tenant(TenantLookup::Slug(base)).await?.is_none() {
            return Ok(base.to_string());
        }
        for _ in 0..self.config.slug_attempts {
            let candidate = slug_with_random_suffix(base);
            if tx.find_tenant(TenantLookup::Slug(&candidate)).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(TenancyError::Conflict(format!(
            "could not derive a free tenant slug from {base}"
        )))
    }
}

/// Detach every member of an organization, returning their ids.
pub(crate) async fn detach_members(
    tx: &mut dyn StoreTransaction,
    organization_id: Uuid,
) -> TenancyResult<Vec<Uuid>> {
    let mut detached = Vec::new();
    for mut user in tx.list_users(UserFilter::Organization(organization_id)).await? {
        if user.detach_from_organization() {
            tx.update_user(&user).await?;
            detached.push(user.id);
        }
    }
    Ok(detached)
}
