//! Organization lifecycle
//!
//! Creation, partial updates, deletion, join-token rotation and member
//! management. Tenant-level settings (`tenant_id`, `is_active`,
//! `allow_global_data_access`) are reserved for tenant admins and above.

use serde::{Deserialize, Serialize};
use tenantry_auth::{generate_join_token, token_fingerprint, TenancyError, TenancyResult};
use tenantry_events::TenancyEvent;
use tenantry_org::naming::{slug_with_random_suffix, slugify};
use tenantry_org::{Organization, OrganizationPatch, Role, UserView};
use tenantry_rbac::{authorize, AccessError, Action, Actor, Target, Visibility};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::context::{
    authorize_masked, ensure_domain_available, not_found, optional_text, required_name,
    validated_domain, TenantryServices,
};
use crate::store::{
    OrganizationFilter, OrganizationLookup, StoreError, StoreTransaction, TenantLookup,
    UserFilter, UserLookup,
};
use crate::tenants::detach_members;

/// Join tokens drawn before giving up on finding an unused one.
const JOIN_TOKEN_ATTEMPTS: u32 = 5;

/// Request to create an organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateOrganizationRequest {
    /// Display name; the slug is derived from it
    pub name: String,
    /// Owning tenant; tenant admins default to their own
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    /// Registered domain
    #[serde(default)]
    pub domain: Option<String>,
    /// Capacity; defaults to the configured value
    #[serde(default)]
    pub max_users: Option<u32>,
    /// Role configured for joiners
    #[serde(default)]
    pub default_role: Option<Role>,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Logo URL
    #[serde(default)]
    pub logo_url: Option<String>,
    /// Allow members to read globally visible data
    #[serde(default)]
    pub allow_global_data_access: bool,
}

impl CreateOrganizationRequest {
    /// Create a request with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Place the organization in a tenant.
    pub fn in_tenant(mut self, tenant_id: Uuid) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Set the domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the capacity.
    pub fn with_max_users(mut self, max_users: u32) -> Self {
        self.max_users = Some(max_users);
        self
    }

    /// Set the configured joiner role.
    pub fn with_default_role(mut self, role: Role) -> Self {
        self.default_role = Some(role);
        self
    }

    /// Allow global data access.
    pub fn with_global_data_access(mut self, allowed: bool) -> Self {
        self.allow_global_data_access = allowed;
        self
    }
}

/// What an organization deletion removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationDeletion {
    /// Deleted organization
    pub organization_id: Uuid,
    /// Members detached from it
    pub detached_members: Vec<Uuid>,
    /// Whitelist entries removed with it
    pub removed_whitelist_entries: u64,
}

fn validated_capacity(max_users: u32) -> TenancyResult<u32> {
    if max_users == 0 {
        return Err(TenancyError::Validation(
            "max_users must be at least 1".to_string(),
        ));
    }
    Ok(max_users)
}

fn validated_default_role(role: Role) -> TenancyResult<Role> {
    if !role.is_organization_scoped() {
        return Err(TenancyError::Validation(format!(
            "default_role must be org_member or org_admin, got {role}"
        )));
    }
    Ok(role)
}

impl TenantryServices {
    /// Create an organization.
    ///
    /// Super admins may place it in any tenant or none; tenant admins only in
    /// their own tenant, which is also the default when none is given.
    #[instrument(skip(self, actor, request), fields(actor_id = %actor.user_id, name = %request.name))]
    pub async fn create_organization(
        &self,
        actor: &Actor,
        request: CreateOrganizationRequest,
    ) -> TenancyResult<Organization> {
        let tenant_id = match request.tenant_id {
            Some(id) => Some(id),
            None if actor.role == Role::TenantAdmin => actor.tenant_id,
            None => None,
        };
        let target = tenant_id.map_or_else(Target::platform, Target::tenant);
        authorize(actor, Action::CreateOrganization, &target)?;

        let name = required_name(&request.name, "organization")?;
        let max_users =
            validated_capacity(request.max_users.unwrap_or(self.config.default_max_users))?;
        let default_role = validated_default_role(request.default_role.unwrap_or(Role::OrgMember))?;
        let domain = request.domain.as_deref().map(validated_domain).transpose()?;

        let mut tx = self.begin().await?;
        if let Some(tenant_id) = tenant_id {
            ensure_active_tenant(tx.as_mut(), tenant_id).await?;
        }
        if let Some(domain) = domain.as_deref() {
            ensure_domain_available(tx.as_mut(), domain, None).await?;
        }

        let base = slugify(&name, "org");
        let slug = self.free_organization_slug(tx.as_mut(), &base).await?;
        let token = unused_join_token(tx.as_mut()).await?;

        let mut org = Organization::new(name, slug, token, actor.user_id);
        org.tenant_id = tenant_id;
        org.domain = domain;
        org.description = optional_text(request.description.as_deref());
        org.logo_url = optional_text(request.logo_url.as_deref());
        org.max_users = max_users;
        org.default_role = default_role;
        org.allow_global_data_access = request.allow_global_data_access;

        let mut attempt = 1;
        loop {
            match tx.insert_organization(&org).await {
                Ok(()) => break,
                Err(StoreError::UniqueViolation { field, .. })
                    if matches!(field, "slug" | "join_token")
                        && attempt < self.config.slug_attempts =>
                {
                    attempt += 1;
                    if field == "slug" {
                        org.slug = slug_with_random_suffix(&base);
                    } else {
                        org.join_token = generate_join_token();
                    }
                    debug!(field, attempt, "organization {field} taken at insert; retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        self.commit(tx).await?;

        info!(
            organization_id = %org.id,
            tenant_id = ?org.tenant_id,
            slug = %org.slug,
            token = %token_fingerprint(&org.join_token),
            "organization created"
        );
        self.notify(
            TenancyEvent::OrganizationCreated {
                organization_id: org.id,
                tenant_id: org.tenant_id,
                slug: org.slug.clone(),
            },
            Some(actor.user_id),
            org.tenant_id,
        )
        .await;
        Ok(org)
    }

    /// Apply a partial update to an organization.
    #[instrument(skip(self, actor, patch), fields(actor_id = %actor.user_id))]
    pub async fn update_organization(
        &self,
        actor: &Actor,
        organization_id: Uuid,
        patch: OrganizationPatch,
    ) -> TenancyResult<Organization> {
        let mut tx = self.begin().await?;
        let mut org = load_organization(tx.as_mut(), organization_id).await?;
        let scope = Target::of_organization(&org);
        authorize(actor, Action::UpdateOrganization, &scope)?;

        let restricted = patch.tenant_level_fields();
        if !restricted.is_empty() {
            match authorize(actor, Action::ManageOrganizationSettings, &scope) {
                Err(AccessError::Forbidden { .. }) => {
                    return Err(TenancyError::forbidden(format!(
                        "{} requires tenant_admin or above",
                        restricted.join(", ")
                    )));
                }
                other => other?,
            }
        }

        let mut fields = Vec::new();
        if let Some(name) = patch.name.as_deref() {
            org.name = required_name(name, "organization")?;
            fields.push("name");
        }
        if let Some(raw) = patch.domain.as_deref() {
            org.domain = match raw.trim() {
                "" => None,
                raw => {
                    let domain = validated_domain(raw)?;
                    ensure_domain_available(tx.as_mut(), &domain, Some(org.id)).await?;
                    Some(domain)
                }
            };
            fields.push("domain");
        }
        if let Some(description) = patch.description.as_deref() {
            org.description = optional_text(Some(description));
            fields.push("description");
        }
        if let Some(logo_url) = patch.logo_url.as_deref() {
            org.logo_url = optional_text(Some(logo_url));
            fields.push("logo_url");
        }
        if let Some(join_enabled) = patch.join_enabled {
            org.join_enabled = join_enabled;
            fields.push("join_enabled");
        }
        if let Some(role) = patch.default_role {
            org.default_role = validated_default_role(role)?;
            fields.push("default_role");
        }
        if let Some(max_users) = patch.max_users {
            org.max_users = validated_capacity(max_users)?;
            fields.push("max_users");
        }
        if let Some(new_tenant) = patch.tenant_id {
            if org.tenant_id != Some(new_tenant) {
                authorize(actor, Action::CreateOrganization, &Target::tenant(new_tenant))?;
                ensure_active_tenant(tx.as_mut(), new_tenant).await?;
                move_members(tx.as_mut(), org.id, org.tenant_id, new_tenant).await?;
                org.tenant_id = Some(new_tenant);
                fields.push("tenant_id");
            }
        }
        if let Some(is_active) = patch.is_active {
            org.is_active = is_active;
            fields.push("is_active");
        }
        if let Some(allowed) = patch.allow_global_data_access {
            org.allow_global_data_access = allowed;
            fields.push("allow_global_data_access");
        }

        if fields.is_empty() {
            return Ok(org);
        }

        org.touch();
        tx.update_organization(&org).await?;
        self.commit(tx).await?;

        info!(organization_id = %org.id, fields = ?fields, "organization updated");
        self.notify(
            TenancyEvent::OrganizationUpdated {
                organization_id: org.id,
                fields: fields.into_iter().map(str::to_string).collect(),
            },
            Some(actor.user_id),
            org.tenant_id,
        )
        .await;
        Ok(org)
    }

    /// Open or close self-service joining.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn set_join_enabled(
        &self,
        actor: &Actor,
        organization_id: Uuid,
        enabled: bool,
    ) -> TenancyResult<Organization> {
        self.update_organization(
            actor,
            organization_id,
            OrganizationPatch {
                join_enabled: Some(enabled),
                ..OrganizationPatch::default()
            },
        )
        .await
    }

    /// Delete an organization.
    ///
    /// An organization with members is only deleted with `force`; members
    /// are detached (organization-scoped roles fall back to `user`) and the
    /// whitelist is removed before the row.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn delete_organization(
        &self,
        actor: &Actor,
        organization_id: Uuid,
        force: bool,
    ) -> TenancyResult<OrganizationDeletion> {
        let mut tx = self.begin().await?;
        let org = load_organization(tx.as_mut(), organization_id).await?;
        authorize(actor, Action::DeleteOrganization, &Target::of_organization(&org))?;

        let members = tx
            .count_users(UserFilter::Organization(org.id))
            .await?;
        if members > 0 && !force {
            return Err(TenancyError::Conflict(format!(
                "organization has {members} members; remove them first or pass force"
            )));
        }

        let detached_members = detach_members(tx.as_mut(), org.id).await?;
        let removed_whitelist_entries = tx.delete_whitelist(org.id).await?;
        tx.delete_organization(org.id).await?;
        self.commit(tx).await?;

        info!(
            organization_id = %org.id,
            detached = detached_members.len(),
            whitelist = removed_whitelist_entries,
            "organization deleted"
        );
        self.notify(
            TenancyEvent::OrganizationDeleted {
                organization_id: org.id,
                tenant_id: org.tenant_id,
                detached_members: detached_members.len() as u64,
            },
            Some(actor.user_id),
            org.tenant_id,
        )
        .await;

        Ok(OrganizationDeletion {
            organization_id: org.id,
            detached_members,
            removed_whitelist_entries,
        })
    }

    /// Replace the join token. The previous token stops resolving at once.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn regenerate_join_token(
        &self,
        actor: &Actor,
        organization_id: Uuid,
    ) -> TenancyResult<Organization> {
        let mut tx = self.begin().await?;
        let mut org = load_organization(tx.as_mut(), organization_id).await?;
        authorize(actor, Action::RegenerateJoinToken, &Target::of_organization(&org))?;

        let previous = token_fingerprint(&org.join_token);
        org.rotate_join_token(unused_join_token(tx.as_mut()).await?);
        tx.update_organization(&org).await?;
        self.commit(tx).await?;

        let fingerprint = token_fingerprint(&org.join_token);
        info!(
            organization_id = %org.id,
            previous = %previous,
            token = %fingerprint,
            "join token regenerated"
        );
        self.notify(
            TenancyEvent::JoinTokenRegenerated {
                organization_id: org.id,
                fingerprint,
            },
            Some(actor.user_id),
            org.tenant_id,
        )
        .await;
        Ok(org)
    }

    /// Fetch an organization in the actor's scope.
    ///
    /// Organizations outside the scope are reported as not found.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn get_organization(
        &self,
        actor: &Actor,
        organization_id: Uuid,
    ) -> TenancyResult<Organization> {
        let mut tx = self.begin().await?;
        let org = load_organization(tx.as_mut(), organization_id).await?;
        authorize_masked(
            actor,
            Action::ViewOrganization,
            &Target::of_organization(&org),
            "organization",
        )?;
        Ok(org)
    }

    /// List the organizations the actor can see.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn list_organizations(&self, actor: &Actor) -> TenancyResult<Vec<Organization>> {
        let visibility = Visibility::for_actor(actor)?;
        let filter = match visibility {
            Visibility::Tenant { tenant_id } => OrganizationFilter::Tenant(tenant_id),
            _ => OrganizationFilter::All,
        };

        let mut tx = self.begin().await?;
        let orgs = tx.list_organizations(filter).await?;
        Ok(visibility.filter(orgs, Target::of_organization))
    }

    /// List an organization's members.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn list_members(
        &self,
        actor: &Actor,
        organization_id: Uuid,
    ) -> TenancyResult<Vec<UserView>> {
        let mut tx = self.begin().await?;
        let org = load_organization(tx.as_mut(), organization_id).await?;
        authorize_masked(
            actor,
            Action::ListMembers,
            &Target::of_organization(&org),
            "organization",
        )?;

        let members = tx.list_users(UserFilter::Organization(org.id)).await?;
        Ok(members.iter().map(|u| u.view()).collect())
    }

    /// Detach a member from an organization.
    ///
    /// Only a super admin may remove an administrator of equal or higher
    /// rank than themselves.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn remove_member(
        &self,
        actor: &Actor,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> TenancyResult<UserView> {
        let mut tx = self.begin().await?;
        let org = load_organization(tx.as_mut(), organization_id).await?;
        authorize(actor, Action::RemoveMember, &Target::of_organization(&org))?;

        let mut user = tx
            .find_user(UserLookup::Id(user_id))
            .await?
            .filter(|u| u.organization_id == Some(org.id))
            .ok_or_else(|| not_found("member"))?;

        if !actor.is_super_admin() && user.role.rank() >= actor.role.rank() {
            return Err(TenancyError::forbidden(format!(
                "removing a {} requires a role above {}",
                user.role, actor.role
            )));
        }

        user.detach_from_organization();
        tx.update_user(&user).await?;
        self.commit(tx).await?;

        info!(organization_id = %org.id, user_id = %user.id, "member removed");
        self.notify(
            TenancyEvent::MemberRemoved {
                organization_id: org.id,
                user_id: user.id,
            },
            Some(actor.user_id),
            org.tenant_id,
        )
        .await;
        Ok(user.view())
    }

    async fn free_organization_slug(
        &self,
        tx: &mut dyn StoreTransaction,
        base: &str,
    ) -> TenancyResult<String> {
        if tx
            .find_organization(OrganizationLookup::Slug(base))
            .await?
            .is_none()
        {
            return Ok(base.to_string());
        }
        for _ in 0..self.config.slug_attempts {
            let candidate = slug_with_random_suffix(base);
            if tx
                .find_organization(OrganizationLookup::Slug(&candidate))
                .await?
                .is_none()
            {
                return Ok(candidate);
            }
        }
        Err(TenancyError::Conflict(format!(
            "could not derive a free organization slug from {base}"
        )))
    }
}

pub(crate) async fn load_organization(
    tx: &mut dyn StoreTransaction,
    organization_id: Uuid,
) -> TenancyResult<Organization> {
    tx.find_organization(OrganizationLookup::Id(organization_id))
        .await?
        .ok_or_else(|| not_found("organization"))
}

async fn ensure_active_tenant(tx: &mut dyn StoreTransaction, tenant_id: Uuid) -> TenancyResult<()> {
    let tenant = tx
        .find_tenant(TenantLookup::Id(tenant_id))
        .await?
        .ok_or_else(|| not_found("tenant"))?;
    if !tenant.is_active {
        return Err(TenancyError::Conflict(format!(
            "tenant {} is not active",
            tenant.slug
        )));
    }
    Ok(())
}

async fn unused_join_token(tx: &mut dyn StoreTransaction) -> TenancyResult<String> {
    for _ in 0..JOIN_TOKEN_ATTEMPTS {
        let token = generate_join_token();
        if tx
            .find_organization(OrganizationLookup::JoinToken(&token))
            .await?
            .is_none()
        {
            return Ok(token);
        }
    }
    Err(TenancyError::Internal(
        "could not issue an unused join token".to_string(),
    ))
}

/// Carry members that followed the old tenant over to the new one.
async fn move_members(
    tx: &mut dyn StoreTransaction,
    organization_id: Uuid,
    from: Option<Uuid>,
    to: Uuid,
) -> TenancyResult<()> {
    for mut user in tx.list_users(UserFilter::Organization(organization_id)).await? {
        if user.tenant_id == from {
            user.tenant_id = Some(to);
            user.touch();
            tx.update_user(&user).await?;
        }
    }
    Ok(())
}
