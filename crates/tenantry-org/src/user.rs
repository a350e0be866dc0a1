//! User domain model
//!
//! A user carries exactly one [`Role`] and at most one tenant and one
//! organization. Organization-scoped roles require an organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::roles::Role;

/// A platform account.
///
/// `hashed_password` is never serialized; use [`User::view`] for outward
/// representations.
///
/// # Examples
///
/// ```
/// use tenantry_org::{Role, User};
///
/// let user = User::new("jane@acme.com", "jane", "$argon2id$...");
/// assert_eq!(user.role, Role::User);
/// assert!(user.organization_id.is_none());
/// assert!(user.role_is_consistent());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: Uuid,

    /// Email address (unique, lower-case)
    pub email: String,

    /// Username (unique)
    pub username: String,

    /// Password digest produced by the hashing collaborator
    #[serde(skip_serializing, default)]
    pub hashed_password: String,

    /// Display name
    pub full_name: Option<String>,

    /// Platform role
    pub role: Role,

    /// Tenant the user belongs to
    pub tenant_id: Option<Uuid>,

    /// Organization the user belongs to
    pub organization_id: Option<Uuid>,

    /// Whether the account may sign in
    pub is_active: bool,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,

    /// Last successful sign-in
    pub last_login: Option<DateTime<Utc>>,

    /// Fingerprint of the join token used to join, never the token itself
    pub joined_via_token: Option<String>,

    /// Whitelist email matched when the user joined
    pub whitelist_email: Option<String>,

    /// When the user joined their organization through self-service
    pub joined_at: Option<DateTime<Utc>>,
}

impl User {
    /// Creates an active, unaffiliated user with role `user`.
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        hashed_password: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            email: email.into(),
            username: username.into(),
            hashed_password: hashed_password.into(),
            full_name: None,
            role: Role::User,
            tenant_id: None,
            organization_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login: None,
            joined_via_token: None,
            whitelist_email: None,
            joined_at: None,
        }
    }

    /// Set the display name.
    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    /// Whether the role agrees with the membership fields.
    pub fn role_is_consistent(&self) -> bool {
        !self.role.is_organization_scoped() || self.organization_id.is_some()
    }

    /// Remove the user from their organization.
    ///
    /// Organization-scoped roles fall back to `user`; join bookkeeping is
    /// cleared. Returns `true` if the user was a member.
    pub fn detach_from_organization(&mut self) -> bool {
        if self.organization_id.is_none() {
            return false;
        }
        self.organization_id = None;
        if self.role.is_organization_scoped() {
            self.role = Role::User;
        }
        self.joined_via_token = None;
        self.whitelist_email = None;
        self.joined_at = None;
        self.touch();
        true
    }

    /// Remove the user from their tenant, demoting a tenant admin to `user`.
    pub fn detach_from_tenant(&mut self) -> bool {
        if self.tenant_id.is_none() {
            return false;
        }
        self.tenant_id = None;
        if self.role == Role::TenantAdmin {
            self.role = Role::User;
        }
        self.touch();
        true
    }

    /// Mark the record as modified now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Outward representation without credentials or join secrets.
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            full_name: self.full_name.clone(),
            role: self.role,
            tenant_id: self.tenant_id,
            organization_id: self.organization_id,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_login: self.last_login,
        }
    }
}

/// User fields that are safe to return to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    /// Unique identifier
    pub id: Uuid,
    /// Email address
    pub email: String,
    /// Username
    pub username: String,
    /// Display name
    pub full_name: Option<String>,
    /// Platform role
    pub role: Role,
    /// Tenant
    pub tenant_id: Option<Uuid>,
    /// Organization
    pub organization_id: Option<Uuid>,
    /// Whether the account may sign in
    pub is_active: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update
    pub updated_at: DateTime<Utc>,
    /// Last sign-in
    pub last_login: Option<DateTime<Utc>>,
}
