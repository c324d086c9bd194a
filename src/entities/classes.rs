use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted class. Uniqueness is enforced on (name, academic_year).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: Uuid,
    pub name: String,
    /// School grade, 1 through 12
    pub grade_level: i64,
    /// Optional stream label, e.g. "A" or "East"
    pub stream: Option<String>,
    pub academic_year: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClass {
    pub name: String,
    pub grade_level: i64,
    pub stream: Option<String>,
    pub academic_year: i64,
}

/// Partial-update payload; at least one field must be present
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClass {
    pub name: Option<String>,
    pub grade_level: Option<i64>,
    pub stream: Option<String>,
    pub academic_year: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassFilter {
    pub grade_level: Option<i64>,
    pub academic_year: Option<i64>,
    pub is_active: Option<bool>,
    /// Case-insensitive partial match on name
    pub search_term: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
