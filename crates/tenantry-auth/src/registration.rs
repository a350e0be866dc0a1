//! Account creation payloads
//!
//! The boundary types for self-registration and admin provisioning. The
//! self-registration field set is closed: a payload carrying `role`,
//! `organization_id`, `tenant_id` or any other unknown field is rejected
//! during deserialization, before any business logic runs.

use serde::{Deserialize, Serialize};
use tenantry_org::naming::{is_valid_email, is_valid_username, normalize_email};
use tenantry_org::Role;
use uuid::Uuid;

use crate::error::{TenancyError, TenancyResult};

/// Self-registration payload.
///
/// # Example
///
/// ```rust
/// use tenantry_auth::RegistrationRequest;
///
/// let ok = RegistrationRequest::from_json(r#"{"email":"a@b.co","password":"longenough"}"#);
/// assert!(ok.is_ok());
///
/// let smuggled = RegistrationRequest::from_json(
///     r#"{"email":"a@b.co","password":"longenough","role":"super_admin"}"#,
/// );
/// assert!(smuggled.is_err());
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrationRequest {
    /// Login email
    pub email: String,

    /// Plaintext password
    pub password: String,

    /// Display name
    #[serde(default)]
    pub full_name: Option<String>,

    /// Requested username; derived from the email when absent
    #[serde(default)]
    pub username: Option<String>,
}

impl std::fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("full_name", &self.full_name)
            .field("username", &self.username)
            .finish()
    }
}

impl RegistrationRequest {
    /// Create a request.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            full_name: None,
            username: None,
        }
    }

    /// Set the display name.
    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    /// Set the username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Parse a JSON payload, rejecting unknown fields with `Validation`.
    pub fn from_json(payload: &str) -> TenancyResult<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Parse an already-decoded JSON value, rejecting unknown fields.
    pub fn from_value(payload: serde_json::Value) -> TenancyResult<Self> {
        Ok(serde_json::from_value(payload)?)
    }

    /// Normalize and validate the credential fields.
    pub fn credentials(&self, min_password_length: usize) -> TenancyResult<Credentials> {
        Credentials::validate(
            &self.email,
            &self.password,
            self.username.as_deref(),
            self.full_name.as_deref(),
            min_password_length,
        )
    }
}

/// Admin provisioning payload.
///
/// Role and scope are optional; the service resolves defaults from the
/// acting administrator.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminCreateUserRequest {
    /// Login email
    pub email: String,

    /// Plaintext password
    pub password: String,

    /// Display name
    #[serde(default)]
    pub full_name: Option<String>,

    /// Requested username; derived from the email when absent
    #[serde(default)]
    pub username: Option<String>,

    /// Role to grant
    #[serde(default)]
    pub role: Option<Role>,

    /// Organization to place the user in
    #[serde(default)]
    pub organization_id: Option<Uuid>,

    /// Tenant to place the user in
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
}

impl std::fmt::Debug for AdminCreateUserRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCreateUserRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("full_name", &self.full_name)
            .field("username", &self.username)
            .field("role", &self.role)
            .field("organization_id", &self.organization_id)
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

impl AdminCreateUserRequest {
    /// Create a request.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// Set the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Set the organization.
    pub fn with_organization(mut self, organization_id: Uuid) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    /// Set the tenant.
    pub fn with_tenant(mut self, tenant_id: Uuid) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Set the username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the display name.
    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    /// Parse a JSON payload, rejecting unknown fields and unknown roles with `Validation`.
    pub fn from_json(payload: &str) -> TenancyResult<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Normalize and validate the credential fields.
    pub fn credentials(&self, min_password_length: usize) -> TenancyResult<Credentials> {
        Credentials::validate(
            &self.email,
            &self.password,
            self.username.as_deref(),
            self.full_name.as_deref(),
            min_password_length,
        )
    }
}

/// Validated, normalized account fields.
#[derive(Clone)]
pub struct Credentials {
    /// Lower-cased email
    pub email: String,
    /// Plaintext password (hashed before storage)
    pub password: String,
    /// Explicit username, if one was requested
    pub username: Option<String>,
    /// Trimmed display name
    pub full_name: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("username", &self.username)
            .field("full_name", &self.full_name)
            .finish()
    }
}

impl Credentials {
    fn validate(
        email: &str,
        password: &str,
        username: Option<&str>,
        full_name: Option<&str>,
        min_password_length: usize,
    ) -> TenancyResult<Self> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(TenancyError::Validation(format!(
                "invalid email address: {email}"
            )));
        }

        if password.chars().count() < min_password_length {
            return Err(TenancyError::Validation(format!(
                "password must be at least {min_password_length} characters"
            )));
        }

        let username = match username.map(str::trim).filter(|u| !u.is_empty()) {
            Some(requested) if !is_valid_username(requested) => {
                return Err(TenancyError::Validation(format!(
                    "invalid username: {requested}"
                )));
            }
            requested => requested.map(str::to_string),
        };

        let full_name = full_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        Ok(Self {
            email,
            password: password.to_string(),
            username,
            full_name,
        })
    }
}
