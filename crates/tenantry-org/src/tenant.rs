//! Tenant domain model
//!
//! A tenant is the outermost container of the platform. It groups
//! organizations and is administered by `tenant_admin` users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant groups organizations under one administrative boundary.
///
/// # Architecture
///
/// ```text
/// Tenant
///   ├─ Organizations (tenant_id → Tenant)
///   └─ Users (tenant_id → Tenant)
/// ```
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use tenantry_org::Tenant;
///
/// let creator = Uuid::now_v7();
/// let tenant = Tenant::new("Acme", "acme", creator);
/// assert!(tenant.is_active);
/// assert!(tenant.domain.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Unique identifier for the tenant
    pub id: Uuid,

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

    /// Whether the tenant is active
    pub is_active: bool,

    /// User who created the tenant
    pub created_by: Uuid,

    /// When the tenant was created
    pub created_at: DateTime<Utc>,

    /// When the tenant was last updated
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// Creates a new active tenant stamped to `created_by`.
    pub fn new(name: impl Into<String>, slug: impl Into<String>, created_by: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            slug: slug.into(),
            domain: None,
            description: None,
            logo_url: None,
            is_active: true,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the registered domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the logo URL.
    pub fn with_logo_url(mut self, logo_url: impl Into<String>) -> Self {
        self.logo_url = Some(logo_url.into());
        self
    }

    /// Mark the record as modified now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Partial update for a tenant. Only `Some` fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TenantPatch {
    /// New name (the slug is kept)
    pub name: Option<String>,
    /// New domain
    pub domain: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New logo URL
    pub logo_url: Option<String>,
    /// Activate or deactivate
    pub is_active: Option<bool>,
}

impl TenantPatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.domain.is_none()
            && self.description.is_none()
            && self.logo_url.is_none()
            && self.is_active.is_none()
    }
}
