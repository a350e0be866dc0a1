//! Event types for tenancy notifications
//!
//! This module defines the envelope and the typed events the tenantry
//! services publish after a lifecycle change commits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tenantry_org::Role;
use uuid::Uuid;

use crate::bus::{EventBusError, EventBusResult};

/// Source segment of every tenancy topic.
pub const EVENT_SOURCE: &str = "tenantry";

/// Event envelope.
///
/// All events are wrapped in this envelope which provides metadata
/// for routing, tracing, and processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID
    pub id: Uuid,

    /// Event type (e.g., "organization.created", "member.joined")
    pub event_type: String,

    /// Timestamp when event was created
    pub timestamp: DateTime<Utc>,

    /// Tenant context
    pub tenant_id: Option<Uuid>,

    /// Organization context
    pub org_id: Option<Uuid>,

    /// User who triggered the event
    pub user_id: Option<Uuid>,

    /// Correlation ID for tracing
    pub correlation_id: Option<String>,

    /// Event version for schema evolution
    pub version: u32,

    /// Event payload
    pub payload: serde_json::Value,

    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Event {
    /// Create a new event.
    ///
    /// # Arguments
    ///
    /// * `event_type` - The event type string
    /// * `payload` - The event payload
    pub fn new(event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            tenant_id: None,
            org_id: None,
            user_id: None,
            correlation_id: None,
            version: 1,
            payload,
            metadata: HashMap::new(),
        }
    }

    /// Set tenant context.
    pub fn with_tenant(mut self, tenant_id: Option<Uuid>) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    /// Set organization context.
    pub fn with_org(mut self, org_id: Uuid) -> Self {
        self.org_id = Some(org_id);
        self
    }

    /// Set user context.
    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set correlation ID.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Add metadata.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Get the topic for this event.
    ///
    /// Topics are structured as: `tenantry.{event_type}`
    pub fn topic(&self) -> String {
        format!("{}.{}", EVENT_SOURCE, self.event_type)
    }

    /// Parse the payload into a specific type.
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Event categories for filtering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Tenant lifecycle
    Tenant,
    /// Organization lifecycle and join tokens
    Organization,
    /// Whitelist changes
    Whitelist,
    /// Joins and removals
    Membership,
    /// Account lifecycle and role changes
    User,
}

impl EventCategory {
    /// Parse from event type string.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        let prefix = event_type.split('.').next()?;
        match prefix {
            "tenant" => Some(EventCategory::Tenant),
            "organization" => Some(EventCategory::Organization),
            "whitelist" => Some(EventCategory::Whitelist),
            "member" => Some(EventCategory::Membership),
            "user" => Some(EventCategory::User),
            _ => None,
        }
    }
}

/// Tenancy lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TenancyEvent {
    /// Tenant was created
    TenantCreated { tenant_id: Uuid, slug: String },
    /// Tenant fields were changed
    TenantUpdated { tenant_id: Uuid, fields: Vec<String> },
    /// Tenant was deleted
    TenantDeleted {
        tenant_id: Uuid,
        deleted_organizations: u64,
        detached_users: u64,
    },

    /// Organization was created
    OrganizationCreated {
        organization_id: Uuid,
        tenant_id: Option<Uuid>,
        slug: String,
    },
    /// Organization fields were changed
    OrganizationUpdated {
        organization_id: Uuid,
        fields: Vec<String>,
    },
    /// Organization was deleted
    OrganizationDeleted {
        organization_id: Uuid,
        tenant_id: Option<Uuid>,
        detached_members: u64,
    },
    /// Join token was replaced
    JoinTokenRegenerated {
        organization_id: Uuid,
        fingerprint: String,
    },

    /// Email was added to (or reactivated on) a whitelist
    WhitelistEntryAdded {
        organization_id: Uuid,
        email: String,
        reactivated: bool,
    },
    /// Email was deactivated on a whitelist
    WhitelistEntryRemoved { organization_id: Uuid, email: String },

    /// User joined through a join token
    MemberJoined {
        organization_id: Uuid,
        user_id: Uuid,
        email: String,
    },
    /// User was detached from an organization
    MemberRemoved { organization_id: Uuid, user_id: Uuid },

    /// User self-registered
    UserRegistered { user_id: Uuid, email: String },
    /// User was created by an administrator
    UserProvisioned {
        user_id: Uuid,
        role: Role,
        organization_id: Option<Uuid>,
        tenant_id: Option<Uuid>,
    },
    /// User's role changed
    RoleChanged { user_id: Uuid, from: Role, to: Role },
    /// User was activated or deactivated
    UserActivationChanged { user_id: Uuid, is_active: bool },
    /// User was deleted
    UserDeleted { user_id: Uuid },
}

impl TenancyEvent {
    /// Event type string used in the topic.
    pub fn event_type(&self) -> &'static str {
        match self {
            TenancyEvent::TenantCreated { .. } => "tenant.created",
            TenancyEvent::TenantUpdated { .. } => "tenant.updated",
            TenancyEvent::TenantDeleted { .. } => "tenant.deleted",
            TenancyEvent::OrganizationCreated { .. } => "organization.created",
            TenancyEvent::OrganizationUpdated { .. } => "organization.updated",
            TenancyEvent::OrganizationDeleted { .. } => "organization.deleted",
            TenancyEvent::JoinTokenRegenerated { .. } => "organization.join_token_regenerated",
            TenancyEvent::WhitelistEntryAdded { .. } => "whitelist.entry_added",
            TenancyEvent::WhitelistEntryRemoved { .. } => "whitelist.entry_removed",
            TenancyEvent::MemberJoined { .. } => "member.joined",
            TenancyEvent::MemberRemoved { .. } => "member.removed",
            TenancyEvent::UserRegistered { .. } => "user.registered",
            TenancyEvent::UserProvisioned { .. } => "user.provisioned",
            TenancyEvent::RoleChanged { .. } => "user.role_changed",
            TenancyEvent::UserActivationChanged { .. } => "user.activation_changed",
            TenancyEvent::UserDeleted { .. } => "user.deleted",
        }
    }

    /// Organization the event concerns, if any.
    pub fn organization_id(&self) -> Option<Uuid> {
        match self {
            TenancyEvent::OrganizationCreated { organization_id, .. }
            | TenancyEvent::OrganizationUpdated { organization_id, .. }
            | TenancyEvent::OrganizationDeleted { organization_id, .. }
            | TenancyEvent::JoinTokenRegenerated { organization_id, .. }
            | TenancyEvent::WhitelistEntryAdded { organization_id, .. }
            | TenancyEvent::WhitelistEntryRemoved { organization_id, .. }
            | TenancyEvent::MemberJoined { organization_id, .. }
            | TenancyEvent::MemberRemoved { organization_id, .. } => Some(*organization_id),
            TenancyEvent::UserProvisioned { organization_id, .. } => *organization_id,
            _ => None,
        }
    }

    /// Convert to generic event.
    pub fn to_event(&self) -> EventBusResult<Event> {
        let payload = serde_json::to_value(self)
            .map_err(|e| EventBusError::SerializationError(e.to_string()))?;
        let mut event = Event::new(self.event_type(), payload);
        if let Some(org_id) = self.organization_id() {
            event = event.with_org(org_id);
        }
        Ok(event)
    }
}
