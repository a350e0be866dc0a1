//! Organization whitelists
//!
//! An email must hold an active entry on an organization's whitelist before
//! its owner may join through the join token. Removal is soft: the entry is
//! marked inactive and adding the email again reactivates it.

use tenantry_auth::{TenancyError, TenancyResult};
use tenantry_events::TenancyEvent;
use tenantry_org::naming::{is_valid_email, normalize_email};
use tenantry_org::WhitelistEntry;
use tenantry_rbac::{authorize, Action, Actor, Target};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::context::TenantryServices;
use crate::organizations::load_organization;

fn validated_email(raw: &str) -> TenancyResult<String> {
    let email = normalize_email(raw);
    if !is_valid_email(&email) {
        return Err(TenancyError::Validation(format!(
            "invalid email address: {}",
            raw.trim()
        )));
    }
    Ok(email)
}

impl TenantryServices {
    /// Whitelist an email for an organization.
    ///
    /// An inactive entry for the same email is reactivated; an active one is
    /// a conflict.
    #[instrument(skip(self, actor, email), fields(actor_id = %actor.user_id))]
    pub async fn add_to_whitelist(
        &self,
        actor: &Actor,
        organization_id: Uuid,
        email: &str,
    ) -> TenancyResult<WhitelistEntry> {
        let email = validated_email(email)?;

        let mut tx = self.begin().await?;
        let org = load_organization(tx.as_mut(), organization_id).await?;
        authorize(actor, Action::ManageWhitelist, &Target::of_organization(&org))?;

        let (entry, reactivated) = match tx.find_whitelist_entry(org.id, &email).await? {
            Some(entry) if entry.is_active() => {
                return Err(TenancyError::Conflict(format!(
                    "{email} is already whitelisted"
                )));
            }
            Some(mut entry) => {
                entry.reactivate(actor.user_id);
                tx.update_whitelist_entry(&entry).await?;
                (entry, true)
            }
            None => {
                let entry = WhitelistEntry::new(org.id, email, actor.user_id);
                tx.insert_whitelist_entry(&entry).await?;
                (entry, false)
            }
        };
        self.commit(tx).await?;

        info!(organization_id = %org.id, reactivated, "whitelist entry added");
        self.notify(
            TenancyEvent::WhitelistEntryAdded {
                organization_id: org.id,
                email: entry.email.clone(),
                reactivated,
            },
            Some(actor.user_id),
            org.tenant_id,
        )
        .await;
        Ok(entry)
    }

    /// Deactivate a whitelist entry.
    ///
    /// Members who already joined through the entry keep their membership.
    #[instrument(skip(self, actor, email), fields(actor_id = %actor.user_id))]
    pub async fn remove_from_whitelist(
        &self,
        actor: &Actor,
        organization_id: Uuid,
        email: &str,
    ) -> TenancyResult<WhitelistEntry> {
        let email = validated_email(email)?;

        let mut tx = self.begin().await?;
        let org = load_organization(tx.as_mut(), organization_id).await?;
        authorize(actor, Action::ManageWhitelist, &Target::of_organization(&org))?;

        let mut entry = tx
            .find_whitelist_entry(org.id, &email)
            .await?
            .filter(WhitelistEntry::is_active)
            .ok_or_else(|| TenancyError::NotFound(format!("{email} is not on the whitelist")))?;
        entry.deactivate();
        tx.update_whitelist_entry(&entry).await?;
        self.commit(tx).await?;

        info!(organization_id = %org.id, "whitelist entry removed");
        self.notify(
            TenancyEvent::WhitelistEntryRemoved {
                organization_id: org.id,
                email: entry.email.clone(),
            },
            Some(actor.user_id),
            org.tenant_id,
        )
        .await;
        Ok(entry)
    }

    /// List every whitelist entry of an organization, active or not.
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn list_whitelist(
        &self,
        actor: &Actor,
        organization_id: Uuid,
    ) -> TenancyResult<Vec<WhitelistEntry>> {
        let mut tx = self.begin().await?;
        let org = load_organization(tx.as_mut(), organization_id).await?;
        authorize(actor, Action::ManageWhitelist, &Target::of_organization(&org))?;

        Ok(tx.list_whitelist(org.id).await?)
    }
}
