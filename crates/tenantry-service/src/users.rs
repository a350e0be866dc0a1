//! User provisioning and role changes
//!
//! Self-registration always produces a plain `user` with no tenant or
//! organization. Administrators provision accounts and change roles within
//! the assignment matrix of [`tenantry_rbac::assignable_roles`].

use std::collections::HashMap;

use tenantry_auth::{
    AdminCreateUserRequest, Credentials, RegistrationRequest, TenancyError, TenancyResult,
};
use tenantry_events::TenancyEvent;
use tenantry_org::naming::{username_base, username_candidate};
use tenantry_org::{Organization, Role, User, UserView};
use tenantry_rbac::{
    authorize, check_assignment, check_manageable, Action, Actor, Guard, Target, Visibility,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::context::{authorize_masked, not_found, seats_taken, TenantryServices};
use crate::organizations::load_organization;
use crate::store::{
    OrganizationFilter, OrganizationLookup, StoreError, StoreTransaction, TenantLookup,
    UserFilter, UserLookup,
};

impl TenantryServices {
    /// Register a new account from a closed payload.
    ///
    /// The account is an active `user` with no tenant or organization.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn self_register(&self, request: RegistrationRequest) -> TenancyResult<UserView> {
        let credentials = request.credentials(self.config.min_password_length)?;
        let digest = self.hash_password(&credentials.password)?;

        let mut tx = self.begin().await?;
        ensure_email_free(tx.as_mut(), &credentials.email).await?;

        let user = new_user(&credentials, digest);
        let user = self
            .insert_new_user(tx.as_mut(), user, credentials.username)
            .await?;
        self.commit(tx).await?;

        info!(user_id = %user.id, "user registered");
        self.notify(
            TenancyEvent::UserRegistered {
                user_id: user.id,
                email: user.email.clone(),
            },
            Some(user.id),
            None,
        )
        .await;
        Ok(user.view())
    }

    /// Register from a raw JSON payload.
    ///
    /// Any field outside the registration set, `role` and the scope ids
    /// included, fails with `Validation` before anything else runs.
    pub async fn self_register_json(&self, payload: &str) -> TenancyResult<UserView> {
        let request = RegistrationRequest::from_json(payload).inspect_err(|e| {
            warn!(error = %e, "rejected self-registration payload");
        })?;
        self.self_register(request).await
    }

    /// Create the first super admin.
    ///
    /// Only succeeds while no super admin exists.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn bootstrap_super_admin(
        &self,
        request: RegistrationRequest,
    ) -> TenancyResult<UserView> {
        let credentials = request.credentials(self.config.min_password_length)?;
        let digest = self.hash_password(&credentials.password)?;

        let mut tx = self.begin().await?;
        if tx.count_users(UserFilter::Role(Role::SuperAdmin)).await? > 0 {
            return Err(TenancyError::Conflict(
                "a super_admin already exists".to_string(),
            ));
        }
        ensure_email_free(tx.as_mut(), &credentials.email).await?;

        let mut user = new_user(&credentials, digest);
        user.role = Role::SuperAdmin;
        let user = self
            .insert_new_user(tx.as_mut(), user, credentials.username)
            .await?;
        self.commit(tx).await?;

        info!(user_id = %user.id, "super_admin bootstrapped");
        self.notify(
            TenancyEvent::UserProvisioned {
                user_id: user.id,
                role: user.role,
                organization_id: None,
                tenant_id: None,
            },
            None,
            None,
        )
        .await;
        Ok(user.view())
    }

    /// Create an account on behalf of an administrator.
    ///
    /// Organization admins provision into their own organization, tenant
    /// admins into their own tenant. The role defaults to `org_member` when
    /// an organization is resolved and `user` otherwise.
    #[instrument(skip(self, actor, request), fields(actor_id = %actor.user_id, email = %request.email))]
    pub async fn admin_create_user(
        &self,
        actor: &Actor,
        request: AdminCreateUserRequest,
    ) -> TenancyResult<UserView> {
        Guard::AnyAdmin.check(actor.role)?;
        if let Some(role) = request.role {
            check_assignment(actor, role)?;
        }
        let credentials = request.credentials(self.config.min_password_length)?;
        let digest = self.hash_password(&credentials.password)?;

        let mut tx = self.begin().await?;
        let (organization, tenant_id) =
            resolve_placement(tx.as_mut(), actor, request.organization_id, request.tenant_id)
                .await?;

        let role = request.role.unwrap_or(if organization.is_some() {
            Role::OrgMember
        } else {
            Role::User
        });
        check_assignment(actor, role)?;
        if role.is_organization_scoped() && organization.is_none() {
            return Err(TenancyError::Validation(format!(
                "role {role} requires an organization"
            )));
        }
        if role == Role::TenantAdmin && tenant_id.is_none() {
            return Err(TenancyError::Validation(
                "role tenant_admin requires a tenant".to_string(),
            ));
        }

        let organization_id = organization.as_ref().map(|o| o.id);
        let target = Target {
            tenant_id,
            organization_id,
            ..Target::default()
        };
        authorize(actor, Action::CreateUser, &target)?;

        if let (Some(org), Role::OrgMember) = (organization.as_ref(), role) {
            if !org.has_capacity(seats_taken(tx.as_mut(), org.id).await?) {
                return Err(TenancyError::Conflict(format!(
                    "organization is at capacity ({} members)",
                    org.max_users
                )));
            }
        }

        ensure_email_free(tx.as_mut(), &credentials.email).await?;
        let mut user = new_user(&credentials, digest);
        user.role = role;
        user.organization_id = organization_id;
        user.tenant_id = tenant_id;
        let user = self
            .insert_new_user(tx.as_mut(), user, credentials.username)
            .await?;
        self.commit(tx).await?;

        info!(user_id = %user.id, role = %user.role, "user provisioned");
        self.notify(
            TenancyEvent::UserProvisioned {
                user_id: user.id,
                role: user.role,
                organization_id: user.organization_id,
                tenant_id: user.tenant_id,
            },
            Some(actor.user_id),
            user.tenant_id,
        )
        .await;
        Ok(user.view())
    }

    /// Change a user's role.
    ///
    /// The actor may not change their own role, may only grant roles in the
    /// assignment matrix, and may only touch accounts whose current role is
    /// itself assignable by them.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn update_user_role(
        &self,
        actor: &Actor,
        user_id: Uuid,
        role: Role,
    ) -> TenancyResult<UserView> {
        Guard::AnyAdmin.check(actor.role)?;
        if actor.user_id == user_id {
            return Err(TenancyError::forbidden(
                "an actor may not change their own role",
            ));
        }
        check_assignment(actor, role)?;

        let mut tx = self.begin().await?;
        let (mut user, org) = load_managed_user(tx.as_mut(), actor, Action::ManageUser, user_id).await?;
        check_manageable(actor, user.role)?;

        let previous = user.role;
        if previous == role {
            return Ok(user.view());
        }

        if role.is_organization_scoped() {
            let Some(org) = org.as_ref() else {
                return Err(TenancyError::Conflict(
                    "user must belong to an organization first".to_string(),
                ));
            };
            if role == Role::OrgMember && !org.has_capacity(seats_taken(tx.as_mut(), org.id).await?)
            {
                return Err(TenancyError::Conflict(format!(
                    "organization is at capacity ({} members)",
                    org.max_users
                )));
            }
        }
        if role == Role::TenantAdmin {
            user.tenant_id = user
                .tenant_id
                .or_else(|| org.as_ref().and_then(|o| o.tenant_id));
            if user.tenant_id.is_none() {
                return Err(TenancyError::Conflict(
                    "user must belong to a tenant first".to_string(),
                ));
            }
        }

        user.role = role;
        user.touch();
        tx.update_user(&user).await?;
        self.commit(tx).await?;

        info!(user_id = %user.id, from = %previous, to = %role, "role changed");
        self.notify(
            TenancyEvent::RoleChanged {
                user_id: user.id,
                from: previous,
                to: role,
            },
            Some(actor.user_id),
            user.tenant_id,
        )
        .await;
        Ok(user.view())
    }

    /// Fetch an account. Every actor may read their own.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn get_user(&self, actor: &Actor, user_id: Uuid) -> TenancyResult<UserView> {
        let mut tx = self.begin().await?;
        if actor.user_id == user_id {
            return tx
                .find_user(UserLookup::Id(user_id))
                .await?
                .map(|u| u.view())
                .ok_or_else(|| not_found("user"));
        }

        let (user, _) = load_managed_user(tx.as_mut(), actor, Action::ViewUser, user_id).await?;
        Ok(user.view())
    }

    /// List the accounts the actor can see.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn list_users(&self, actor: &Actor) -> TenancyResult<Vec<UserView>> {
        Guard::AnyAdmin.check(actor.role)?;
        let visibility = Visibility::for_actor(actor)?;
        let filter = match visibility {
            Visibility::Organization {
                organization_id, ..
            } => UserFilter::Organization(organization_id),
            _ => UserFilter::All,
        };

        let mut tx = self.begin().await?;
        let org_tenants: HashMap<Uuid, Option<Uuid>> = tx
            .list_organizations(OrganizationFilter::All)
            .await?
            .into_iter()
            .map(|o| (o.id, o.tenant_id))
            .collect();
        let users = tx.list_users(filter).await?;

        Ok(visibility
            .filter(users, |u| user_scope(u, &org_tenants))
            .iter()
            .map(User::view)
            .collect())
    }

    /// Activate or deactivate an account.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn set_user_active(
        &self,
        actor: &Actor,
        user_id: Uuid,
        is_active: bool,
    ) -> TenancyResult<UserView> {
        Guard::AnyAdmin.check(actor.role)?;
        if actor.user_id == user_id {
            return Err(TenancyError::forbidden(
                "an actor may not change their own activation",
            ));
        }

        let mut tx = self.begin().await?;
        let (mut user, _) = load_managed_user(tx.as_mut(), actor, Action::ManageUser, user_id).await?;
        check_manageable(actor, user.role)?;
        if user.is_active == is_active {
            return Ok(user.view());
        }

        user.is_active = is_active;
        user.touch();
        tx.update_user(&user).await?;
        self.commit(tx).await?;

        info!(user_id = %user.id, is_active, "user activation changed");
        self.notify(
            TenancyEvent::UserActivationChanged {
                user_id: user.id,
                is_active,
            },
            Some(actor.user_id),
            user.tenant_id,
        )
        .await;
        Ok(user.view())
    }

    /// Delete an account. Tenant admin or above; never oneself.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn delete_user(&self, actor: &Actor, user_id: Uuid) -> TenancyResult<()> {
        Guard::TenantAdmin.check(actor.role)?;
        if actor.user_id == user_id {
            return Err(TenancyError::forbidden("an actor may not delete themselves"));
        }

        let mut tx = self.begin().await?;
        let (user, _) = load_managed_user(tx.as_mut(), actor, Action::DeleteUser, user_id).await?;
        check_manageable(actor, user.role)?;

        tx.delete_user(user.id).await?;
        self.commit(tx).await?;

        info!(user_id = %user.id, "user deleted");
        self.notify(
            TenancyEvent::UserDeleted { user_id: user.id },
            Some(actor.user_id),
            user.tenant_id,
        )
        .await;
        Ok(())
    }

    /// Insert a new account, deriving a free username when none was requested.
    async fn insert_new_user(
        &self,
        tx: &mut dyn StoreTransaction,
        mut user: User,
        requested: Option<String>,
    ) -> TenancyResult<User> {
        if let Some(username) = requested {
            if tx
                .find_user(UserLookup::Username(&username))
                .await?
                .is_some()
            {
                return Err(TenancyError::Conflict(
                    "username is already taken".to_string(),
                ));
            }
            user.username = username;
            tx.insert_user(&user).await?;
            return Ok(user);
        }

        let base = username_base(&user.email);
        for attempt in 0..self.config.username_attempts {
            let candidate = username_candidate(&base, attempt);
            if tx
                .find_user(UserLookup::Username(&candidate))
                .await?
                .is_some()
            {
                continue;
            }
            user.username = candidate;
            match tx.insert_user(&user).await {
                Ok(()) => return Ok(user),
                Err(StoreError::UniqueViolation {
                    field: "username", ..
                }) => {
                    debug!(attempt, "username taken at insert; trying next suffix");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(TenancyError::Conflict(format!(
            "no free username derived from {base} after {} attempts",
            self.config.username_attempts
        )))
    }
}

fn new_user(credentials: &Credentials, digest: String) -> User {
    let mut user = User::new(credentials.email.clone(), String::new(), digest);
    user.full_name = credentials.full_name.clone();
    user
}

async fn ensure_email_free(tx: &mut dyn StoreTransaction, email: &str) -> TenancyResult<()> {
    if tx.find_user(UserLookup::Email(email)).await?.is_some() {
        return Err(TenancyError::Conflict(
            "email is already registered".to_string(),
        ));
    }
    Ok(())
}

fn user_scope(user: &User, org_tenants: &HashMap<Uuid, Option<Uuid>>) -> Target {
    let org_tenant = user
        .organization_id
        .and_then(|id| org_tenants.get(&id).copied().flatten());
    Target::of_user(user, org_tenant)
}

/// Load a user the actor may act on, masking out-of-scope accounts.
async fn load_managed_user(
    tx: &mut dyn StoreTransaction,
    actor: &Actor,
    action: Action,
    user_id: Uuid,
) -> TenancyResult<(User, Option<Organization>)> {
    let user = tx
        .find_user(UserLookup::Id(user_id))
        .await?
        .ok_or_else(|| not_found("user"))?;
    let org = match user.organization_id {
        Some(org_id) => tx.find_organization(OrganizationLookup::Id(org_id)).await?,
        None => None,
    };

    let target = Target::of_user(&user, org.as_ref().and_then(|o| o.tenant_id));
    authorize_masked(actor, action, &target, "user")?;
    Ok((user, org))
}

/// Resolve where an admin-provisioned account lands.
///
/// Returns the organization (if any) and the tenant (if any).
async fn resolve_placement(
    tx: &mut dyn StoreTransaction,
    actor: &Actor,
    organization_id: Option<Uuid>,
    tenant_id: Option<Uuid>,
) -> TenancyResult<(Option<Organization>, Option<Uuid>)> {
    let organization_id = match actor.role {
        Role::OrgAdmin => {
            let own = actor.organization_id.ok_or_else(|| {
                TenancyError::Configuration("org_admin has no organization assigned".to_string())
            })?;
            if organization_id.is_some_and(|id| id != own) {
                return Err(TenancyError::forbidden(
                    "organization scope required: org_admin may only provision into their own organization",
                ));
            }
            Some(own)
        }
        _ => organization_id,
    };

    let organization = match organization_id {
        Some(id) => {
            let org = load_organization(tx, id).await?;
            if !org.is_active {
                return Err(TenancyError::Conflict(format!(
                    "organization {} is not active",
                    org.slug
                )));
            }
            Some(org)
        }
        None => None,
    };

    // With an organization the tenant comes from the organization alone, so a
    // tenant-less organization stays outside every tenant admin's scope.
    let tenant_id = match (organization.as_ref(), tenant_id) {
        (Some(org), Some(requested)) if org.tenant_id != Some(requested) => {
            return Err(TenancyError::Validation(
                "organization does not belong to the requested tenant".to_string(),
            ));
        }
        (Some(org), _) => org.tenant_id,
        (None, requested) => requested.or(match actor.role {
            Role::TenantAdmin => actor.tenant_id,
            _ => None,
        }),
    };

    if let Some(id) = tenant_id {
        let tenant = tx
            .find_tenant(TenantLookup::Id(id))
            .await?
            .ok_or_else(|| not_found("tenant"))?;
        if !tenant.is_active {
            return Err(TenancyError::Conflict(format!(
                "tenant {} is not active",
                tenant.slug
            )));
        }
    }

    Ok((organization, tenant_id))
}
