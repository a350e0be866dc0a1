//! Self-service join workflow
//!
//! A user without an organization presents an organization's join token.
//! The checks run in a fixed order and the first failure wins:
//!
//! 1. the user already belongs to an organization: `Conflict`
//! 2. the token does not resolve to an active organization: `NotFound`
//! 3. joining is disabled: `Conflict`
//! 4. the user's email has no active whitelist entry: `Forbidden`
//! 5. every `org_member` seat is taken: `Conflict`
//!
//! On success the user becomes an `org_member` of the organization and of
//! its tenant. The organization's `default_role` is not consulted, and the
//! token stays valid for further joins.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tenantry_auth::{is_well_formed_join_token, token_fingerprint, TenancyError, TenancyResult};
use tenantry_events::TenancyEvent;
use tenantry_org::{Organization, OrganizationSummary, Role, UserView};
use tenantry_rbac::Actor;
use tracing::{debug, info, instrument};

use crate::context::{seats_taken, TenantryServices};
use crate::store::{OrganizationLookup, StoreTransaction, UserLookup};

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinOutcome {
    /// The updated account
    pub user: UserView,
    /// The organization joined
    pub organization: OrganizationSummary,
}

impl TenantryServices {
    /// Join the organization holding `join_token`.
    #[instrument(skip(self, actor, join_token), fields(actor_id = %actor.user_id, token = %token_fingerprint(join_token)))]
    pub async fn join_organization(
        &self,
        actor: &Actor,
        join_token: &str,
    ) -> TenancyResult<JoinOutcome> {
        let join_token = join_token.trim();

        let mut tx = self.begin().await?;
        let mut user = tx
            .find_user(UserLookup::Id(actor.user_id))
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| TenancyError::Unauthenticated("account is not active".to_string()))?;

        if user.organization_id.is_some() {
            return Err(TenancyError::Conflict(
                "user already belongs to an organization".to_string(),
            ));
        }

        let org = resolve_join_token(tx.as_mut(), join_token).await?;

        if !org.join_enabled {
            return Err(TenancyError::Conflict(
                "joining is disabled for this organization".to_string(),
            ));
        }

        let entry = tx
            .find_whitelist_entry(org.id, &user.email)
            .await?
            .filter(|e| e.is_active())
            .ok_or_else(|| {
                TenancyError::forbidden(
                    "organization whitelist required: email is not whitelisted for this organization",
                )
            })?;

        let taken = seats_taken(tx.as_mut(), org.id).await?;
        if !org.has_capacity(taken) {
            debug!(organization_id = %org.id, taken, max_users = org.max_users, "join rejected at capacity");
            return Err(TenancyError::Conflict(format!(
                "organization is at capacity ({} members)",
                org.max_users
            )));
        }

        let now = Utc::now();
        user.organization_id = Some(org.id);
        user.tenant_id = org.tenant_id;
        user.role = Role::OrgMember;
        user.joined_via_token = Some(token_fingerprint(join_token));
        user.whitelist_email = Some(entry.email);
        user.joined_at = Some(now);
        user.updated_at = now;
        tx.update_user(&user).await?;
        self.commit(tx).await?;

        info!(organization_id = %org.id, user_id = %user.id, "member joined");
        self.notify(
            TenancyEvent::MemberJoined {
                organization_id: org.id,
                user_id: user.id,
                email: user.email.clone(),
            },
            Some(user.id),
            org.tenant_id,
        )
        .await;

        Ok(JoinOutcome {
            user: user.view(),
            organization: org.summary(),
        })
    }

    /// Show the public summary of the organization holding `join_token`.
    #[instrument(skip(self, join_token), fields(token = %token_fingerprint(join_token)))]
    pub async fn preview_join(&self, join_token: &str) -> TenancyResult<OrganizationSummary> {
        let mut tx = self.begin().await?;
        let org = resolve_join_token(tx.as_mut(), join_token.trim()).await?;
        Ok(org.summary())
    }
}

async fn resolve_join_token(
    tx: &mut dyn StoreTransaction,
    join_token: &str,
) -> TenancyResult<Organization> {
    let unknown = || TenancyError::NotFound("no active organization for this join token".to_string());

    if !is_well_formed_join_token(join_token) {
        return Err(unknown());
    }
    tx.find_organization(OrganizationLookup::JoinToken(join_token))
        .await?
        .filter(|o| o.is_active)
        .ok_or_else(unknown)
}
