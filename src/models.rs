use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::UnknownRole;

// --- Roles ---

/// Role
///
/// The staff roles recognised by the CRM. Stored as snake_case text in the `users.role`
/// column and serialized the same way on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Role {
    SuperAdmin,
    Admin,
    Telecaller,
    Counselor,
    Auditor,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::SuperAdmin,
        Role::Admin,
        Role::Telecaller,
        Role::Counselor,
        Role::Auditor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Telecaller => "telecaller",
            Role::Counselor => "counselor",
            Role::Auditor => "auditor",
        }
    }

    /// Roles allowed to use the user management API.
    pub fn manages_users(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

// --- Directory ---

/// DirectoryRecord
///
/// A staff profile from the `public.users` table. The gate only ever reads these;
/// mutations go through the admin API so the role cache can be invalidated.
///
/// `role` is kept as the raw column value. Anything that does not parse into a [`Role`]
/// (including NULL) behaves as an unset role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DirectoryRecord {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Option<String>,
    pub is_approved: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl DirectoryRecord {
    /// The parsed role, or `None` when the column is NULL or holds an unknown value.
    pub fn parsed_role(&self) -> Option<Role> {
        self.role.as_deref().and_then(|r| r.parse().ok())
    }
}

/// Session
///
/// Per-request proof of authentication produced by a `SessionResolver`. Never stored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Session {
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
}

/// StaffIdentity
///
/// The identity the gate attaches to a forwarded request as an extension.
/// Page handlers behind the gate read it instead of resolving the session again.
#[derive(Debug, Clone, PartialEq, Serialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StaffIdentity {
    pub user_id: Uuid,
    pub email: String,
    pub role: Option<Role>,
    pub is_approved: bool,
}

impl From<&DirectoryRecord> for StaffIdentity {
    fn from(record: &DirectoryRecord) -> Self {
        Self {
            user_id: record.id,
            email: record.email.clone(),
            role: record.parsed_role(),
            is_approved: record.is_approved,
        }
    }
}

// --- Request Payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateApprovalRequest {
    pub is_approved: bool,
}

/// UpdateRoleRequest
///
/// `role: null` clears the role, which parks the user on `/dashboard`. The field itself is
/// required: `{}` is rejected rather than read as a clear.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateRoleRequest {
    #[serde(deserialize_with = "present_or_null")]
    #[schema(required = true)]
    pub role: Option<Role>,
}

// With `deserialize_with` serde no longer defaults a missing `Option` field to `None`.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Role>::deserialize(deserializer)
}

// --- Response Payloads ---

/// PageView
///
/// Stand-in body for the protected areas. Rendering is the frontend's job; the backend only
/// confirms which area was reached and by whom.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PageView {
    pub area: String,
    pub email: String,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginPrompt {
    /// Path to return to after signing in, if the gate supplied one.
    pub redirect: Option<String>,
}
