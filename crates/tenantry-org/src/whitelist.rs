//! Organization member whitelist
//!
//! Whitelist entries gate which email addresses may consume an
//! organization's join token. Entries are never duplicated: removal marks
//! an entry inactive and re-adding reactivates it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a whitelist entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WhitelistStatus {
    /// The email may join
    Active,
    /// The email was removed and may not join
    Inactive,
}

impl WhitelistStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// An email allowed to join one organization.
///
/// Unique per `(organization_id, email)`; `email` is always lower-case.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use tenantry_org::{WhitelistEntry, WhitelistStatus};
///
/// let org_id = Uuid::now_v7();
/// let admin_id = Uuid::now_v7();
/// let entry = WhitelistEntry::new(org_id, "jane@acme.com", admin_id);
/// assert_eq!(entry.status, WhitelistStatus::Active);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    /// Unique entry ID
    pub id: Uuid,

    /// Organization ID
    pub organization_id: Uuid,

    /// Normalized email address
    pub email: String,

    /// Admin who added (or last reactivated) the entry
    pub added_by: Uuid,

    /// When the entry was added (or last reactivated)
    pub added_at: DateTime<Utc>,

    /// Whether the entry currently grants access
    pub status: WhitelistStatus,
}

impl WhitelistEntry {
    /// Creates a new active entry. `email` must already be normalized.
    pub fn new(organization_id: Uuid, email: impl Into<String>, added_by: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            organization_id,
            email: email.into(),
            added_by,
            added_at: Utc::now(),
            status: WhitelistStatus::Active,
        }
    }

    /// Whether the entry currently grants access.
    pub fn is_active(&self) -> bool {
        self.status == WhitelistStatus::Active
    }

    /// Reactivate an inactive entry on behalf of `added_by`.
    pub fn reactivate(&mut self, added_by: Uuid) {
        self.status = WhitelistStatus::Active;
        self.added_by = added_by;
        self.added_at = Utc::now();
    }

    /// Revoke the entry.
    pub fn deactivate(&mut self) {
        self.status = WhitelistStatus::Inactive;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitelist_entry_creation() {
        let org_id = Uuid::now_v7();
        let admin_id = Uuid::now_v7();
        let entry = WhitelistEntry::new(org_id, "jane@acme.com", admin_id);

        assert_eq!(entry.organization_id, org_id);
        assert_eq!(entry.added_by, admin_id);
        assert!(entry.is_active());
    }

    #[test]
    fn test_deactivate_then_reactivate_keeps_identity() {
        let mut entry = WhitelistEntry::new(Uuid::now_v7(), "jane@acme.com", Uuid::now_v7());
        let id = entry.id;

        entry.deactivate();
        assert!(!entry.is_active());

        let other_admin = Uuid::now_v7();
        entry.reactivate(other_admin);
        assert!(entry.is_active());
        assert_eq!(entry.id, id);
        assert_eq!(entry.added_by, other_admin);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(WhitelistStatus::Active.as_str(), "active");
        assert_eq!(
            serde_json::to_string(&WhitelistStatus::Inactive).unwrap(),
            "\"inactive\""
        );
    }
}
