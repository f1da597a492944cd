//! Typed views over backend rows.
//!
//! The data API returns JSON; every query deserializes into one of these
//! structs and any shape mismatch is treated as a query failure rather than
//! being indexed into optimistically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated end user as reported by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
}

/// Role within an organization, ordered by capability.
///
/// Higher roles are a superset of lower ones, so `>=` answers "has at least".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Recruiter,
    Admin,
    Owner,
}

/// Row returned by the membership lookup for one (organization, user) pair.
#[derive(Debug, Clone, Deserialize)]
pub struct MembershipRow {
    pub id: Uuid,
    pub role: Role,
}

/// Membership flagged as the user's default organization.
#[derive(Debug, Clone, Deserialize)]
pub struct DefaultMembershipRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub role: Role,
}

/// Organization record.
#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationRow {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Membership row with the embedded organization, for the switcher listing.
#[derive(Debug, Clone, Deserialize)]
pub struct MembershipListRow {
    pub organization_id: Uuid,
    pub role: Role,
    pub organizations: Option<OrganizationName>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationName {
    pub id: Uuid,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ordering_matches_capability() {
        assert!(Role::Owner > Role::Admin);
        assert!(Role::Admin > Role::Recruiter);
        assert!(Role::Recruiter > Role::Viewer);
    }

    #[test]
    fn unknown_role_fails_deserialization() {
        let err = serde_json::from_str::<Role>("\"superuser\"");
        assert!(err.is_err());
    }

    #[test]
    fn membership_row_rejects_missing_role() {
        let err = serde_json::from_str::<MembershipRow>(
            r#"{"id": "7f3c2a9e-4f1d-4a6b-9be1-24c08a9a2f11"}"#,
        );
        assert!(err.is_err());
    }
}
