//! Access token claims
//!
//! The claims carried by a tenantry bearer token. Role and scope are a
//! snapshot for clients; the actor for a request is always rebuilt from the
//! stored user, so a role change takes effect on the next request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tenantry_org::{Role, User};
use uuid::Uuid;

/// Standard JWT claims with tenancy extensions.
///
/// # Example
///
/// ```rust
/// use tenantry_auth::claims::AccessClaims;
/// use tenantry_org::User;
///
/// let user = User::new("jane@acme.com", "jane", "digest");
/// let claims = AccessClaims::for_user(&user, "tenantry", chrono::Duration::hours(1));
/// assert_eq!(claims.user_id(), Some(user.id));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    // Standard JWT claims (RFC 7519)
    /// Subject (user ID)
    pub sub: String,

    /// Issuer
    pub iss: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,

    // Tenancy claims
    /// User email
    pub email: String,

    /// Role at issuance
    pub role: Role,

    /// Tenant at issuance
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,

    /// Organization at issuance
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<Uuid>,

    /// Token type
    #[serde(default)]
    pub token_type: TokenType,
}

impl AccessClaims {
    /// Create claims for a stored user.
    ///
    /// # Arguments
    ///
    /// * `user` - The authenticated user
    /// * `issuer` - Issuer claim
    /// * `duration` - Token validity duration
    pub fn for_user(user: &User, issuer: impl Into<String>, duration: chrono::Duration) -> Self {
        let now = Utc::now();
        let exp = now + duration;

        Self {
            sub: user.id.to_string(),
            iss: issuer.into(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::now_v7().to_string(),
            email: user.email.clone(),
            role: user.role,
            tenant_id: user.tenant_id,
            org_id: user.organization_id,
            token_type: TokenType::Access,
        }
    }

    /// Get the user ID as UUID.
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    /// Check if the token is expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Get expiration as DateTime.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }
}

/// Token type enumeration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Access token (short-lived)
    #[default]
    Access,
}
