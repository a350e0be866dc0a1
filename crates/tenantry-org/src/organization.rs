//! Organization domain models
//!
//! This module provides the Organization entity. Organizations optionally
//! belong to a tenant, own a bearer join token, and cap their membership
//! with `max_users`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::roles::Role;

/// Default membership capacity of a new organization.
pub const DEFAULT_MAX_USERS: u32 = 500;

/// Length of a generated join token.
pub const JOIN_TOKEN_LENGTH: usize = 32;

/// An organization groups users and the data they share.
///
/// Users belong to at most one organization. Organizations may exist
/// without a tenant; when `tenant_id` is set it references an active tenant.
///
/// # Architecture
///
/// ```text
/// Organization
///   ├─ Tenant (optional, tenant_id)
///   ├─ Members (User.organization_id)
///   ├─ Whitelist entries
///   └─ Join token (bearer secret)
/// ```
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use tenantry_org::{Organization, Role};
///
/// let creator = Uuid::now_v7();
/// let org = Organization::new("Acme Risk", "acme-risk", "token", creator);
/// assert_eq!(org.max_users, 500);
/// assert_eq!(org.default_role, Role::OrgMember);
/// assert!(org.join_enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Unique identifier for the organization
    pub id: Uuid,

    /// Owning tenant, if any
    pub tenant_id: Option<Uuid>,

    /// Human-readable name
    pub name: String,

    /// URL-friendly slug (unique across platform)
    pub slug: String,

    /// Registered domain (unique across tenants and organizations)
    pub domain: Option<String>,

    /// Optional description
    pub description: Option<String>,

    /// Logo URL for branding
    pub logo_url: Option<String>,

    /// Bearer secret that lets whitelisted users join
    pub join_token: String,

    /// Whether self-service joining is open
    pub join_enabled: bool,

    /// Role configured for self-service joiners
    pub default_role: Role,

    /// Membership capacity
    pub max_users: u32,

    /// Whether the organization is active
    pub is_active: bool,

    /// Whether members may see platform-wide (globally visible) data
    pub allow_global_data_access: bool,

    /// User who created the organization
    pub created_by: Uuid,

    /// When the organization was created
    pub created_at: DateTime<Utc>,

    /// When the organization was last updated
    pub updated_at: DateTime<Utc>,

    /// When the current join token was issued
    pub join_created_at: DateTime<Utc>,
}

impl Organization {
    /// Creates a new organization with default join settings.
    ///
    /// The organization is created with:
    /// - A newly generated UUID v7 ID
    /// - No tenant
    /// - Joining enabled, default role `org_member`, capacity 500
    /// - Global data access disabled
    pub fn new(
        name: impl Into<String>,
        slug: impl Into<String>,
        join_token: impl Into<String>,
        created_by: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            tenant_id: None,
            name: name.into(),
            slug: slug.into(),
            domain: None,
            description: None,
            logo_url: None,
            join_token: join_token.into(),
            join_enabled: true,
            default_role: Role::OrgMember,
            max_users: DEFAULT_MAX_USERS,
            is_active: true,
            allow_global_data_access: false,
            created_by,
            created_at: now,
            updated_at: now,
            join_created_at: now,
        }
    }

    /// Place the organization inside a tenant.
    pub fn with_tenant(mut self, tenant_id: Uuid) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Replace the join token and restart its issuance clock.
    pub fn rotate_join_token(&mut self, token: impl Into<String>) {
        let now = Utc::now();
        self.join_token = token.into();
        self.join_created_at = now;
        self.updated_at = now;
    }

    /// Check whether another member seat is available.
    pub fn has_capacity(&self, seats_taken: u64) -> bool {
        seats_taken < u64::from(self.max_users)
    }

    /// Mark the record as modified now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Public summary used when previewing a join token.
    pub fn summary(&self) -> OrganizationSummary {
        OrganizationSummary {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
            logo_url: self.logo_url.clone(),
            join_enabled: self.join_enabled,
        }
    }
}

/// Summary of an organization, safe to show to prospective joiners.
///
/// Excludes the join token and every administrative field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationSummary {
    /// Organization ID
    pub id: Uuid,

    /// Organization name
    pub name: String,

    /// Slug
    pub slug: String,

    /// Logo URL
    pub logo_url: Option<String>,

    /// Whether joining is currently open
    pub join_enabled: bool,
}

/// Partial update for an organization. Only `Some` fields are applied.
///
/// `allow_global_data_access`, `tenant_id` and `is_active` are tenant-level
/// fields; organization admins may not set them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrganizationPatch {
    /// New name (the slug is kept)
    pub name: Option<String>,
    /// New domain
    pub domain: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New logo URL
    pub logo_url: Option<String>,
    /// Open or close self-service joining
    pub join_enabled: Option<bool>,
    /// Role configured for joiners
    pub default_role: Option<Role>,
    /// New capacity
    pub max_users: Option<u32>,
    /// Move to another tenant
    pub tenant_id: Option<Uuid>,
    /// Activate or deactivate
    pub is_active: Option<bool>,
    /// Toggle visibility of platform-wide data
    pub allow_global_data_access: Option<bool>,
}

impl OrganizationPatch {
    /// Names of tenant-level fields present in this patch.
    pub fn tenant_level_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.tenant_id.is_some() {
            fields.push("tenant_id");
        }
        if self.is_active.is_some() {
            fields.push("is_active");
        }
        if self.allow_global_data_access.is_some() {
            fields.push("allow_global_data_access");
        }
        fields
    }
}
