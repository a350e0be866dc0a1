//! Login and per-request actor resolution.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tenantry_auth::{AccessToken, TenancyError, TenancyResult};
use tenantry_org::naming::normalize_email;
use tenantry_org::UserView;
use tenantry_rbac::Actor;
use tracing::{debug, error, info, instrument};

use crate::context::TenantryServices;
use crate::store::{OrganizationLookup, UserLookup};

const INVALID_CREDENTIALS: &str = "invalid email or password";

/// A successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for subsequent requests
    pub token: AccessToken,
    /// The signed-in account
    pub user: UserView,
}

impl TenantryServices {
    /// Verify credentials and issue an access token.
    ///
    /// Unknown email, wrong password and inactive account all fail with the
    /// same `Unauthenticated` message.
    #[instrument(skip(self, email, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> TenancyResult<Session> {
        let email = normalize_email(email);
        let rejected = || TenancyError::Unauthenticated(INVALID_CREDENTIALS.to_string());

        // Hash verification runs outside any transaction.
        let user = {
            let mut tx = self.begin().await?;
            tx.find_user(UserLookup::Email(&email)).await?
        };
        let Some(mut user) = user.filter(|u| u.is_active) else {
            debug!("login rejected: unknown or inactive account");
            return Err(rejected());
        };

        match self.hasher.verify(password, &user.hashed_password) {
            Ok(true) => {}
            Ok(false) => {
                debug!(user_id = %user.id, "login rejected: wrong password");
                return Err(rejected());
            }
            Err(e) => {
                error!(user_id = %user.id, error = %e, "stored password digest is unusable");
                return Err(rejected());
            }
        }

        let mut tx = self.begin().await?;
        let now = Utc::now();
        user.last_login = Some(now);
        user.updated_at = now;
        tx.update_user(&user).await?;
        self.commit(tx).await?;

        let token = self.jwt.generate_access_token(&user)?;
        info!(user_id = %user.id, "user authenticated");
        Ok(Session {
            token,
            user: user.view(),
        })
    }

    /// Resolve a bearer token into the acting principal.
    ///
    /// The role and scope come from the stored account, not the token, so a
    /// role change or deactivation takes effect on the next request.
    #[instrument(skip(self, bearer))]
    pub async fn resolve_actor(&self, bearer: &str) -> TenancyResult<Actor> {
        let token = bearer
            .trim()
            .strip_prefix("Bearer ")
            .unwrap_or(bearer.trim());
        let claims = self.jwt.validate_token(token)?;
        let user_id = claims
            .user_id()
            .ok_or_else(|| TenancyError::Unauthenticated("Invalid token".to_string()))?;

        let mut tx = self.begin().await?;
        let user = tx
            .find_user(UserLookup::Id(user_id))
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| TenancyError::Unauthenticated("account is not active".to_string()))?;

        let global_data_access = match user.organization_id {
            Some(org_id) => tx
                .find_organization(OrganizationLookup::Id(org_id))
                .await?
                .is_some_and(|o| o.is_active && o.allow_global_data_access),
            None => false,
        };

        Ok(Actor::from_user(&user, global_data_access))
    }
}
