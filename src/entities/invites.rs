use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role an invite grants on acceptance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum InviteRole {
    Student,
    Teacher,
}

/// Lifecycle status; `accepted`, `cancelled`, and `expired` are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Cancelled,
    Expired,
}

/// A persisted invite. The token is an opaque random string embedded in the
/// emailed URL; token signing lives outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    pub id: Uuid,
    pub email: String,
    pub role: InviteRole,
    pub invited_by: Uuid,
    pub status: InviteStatus,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvite {
    pub email: String,
    pub role: InviteRole,
    pub invited_by: Uuid,
    /// Defaults to seven days from creation when absent
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteFilter {
    pub email: Option<String>,
    pub role: Option<InviteRole>,
    pub status: Option<InviteStatus>,
    pub invited_by: Option<Uuid>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
