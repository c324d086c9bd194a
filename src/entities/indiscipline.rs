use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity of an indiscipline incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum IndisciplineSeverity {
    Minor,
    Moderate,
    Severe,
}

impl IndisciplineSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
        }
    }
}

/// Lifecycle status; `deleted` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum IndisciplineStatus {
    Active,
    Resolved,
    Deleted,
}

impl IndisciplineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Resolved => "resolved",
            Self::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct IndisciplineRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    /// Teacher who reported the incident
    pub reported_by: Uuid,
    pub incident_date: NaiveDate,
    pub description: String,
    pub severity: IndisciplineSeverity,
    pub status: IndisciplineStatus,
    /// Optional remediation note added while resolving
    pub remediation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIndiscipline {
    pub student_id: Uuid,
    pub reported_by: Uuid,
    pub incident_date: NaiveDate,
    pub description: String,
    pub severity: IndisciplineSeverity,
}

/// Partial-update payload; at least one field must be present
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIndiscipline {
    pub incident_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub severity: Option<IndisciplineSeverity>,
    pub status: Option<IndisciplineStatus>,
    pub remediation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndisciplineFilter {
    pub student_id: Option<Uuid>,
    pub reported_by: Option<Uuid>,
    pub severity: Option<IndisciplineSeverity>,
    /// Defaults to non-deleted rows when absent
    pub status: Option<IndisciplineStatus>,
    pub incident_after: Option<NaiveDate>,
    pub incident_before: Option<NaiveDate>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
