use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recorded exam score. Referential validity of the student, class, and
/// subject references is enforced by foreign keys, not by the application.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: Uuid,
    pub student_id: Uuid,
    pub class_id: Uuid,
    pub subject_id: Uuid,
    /// Percentage score, 0 through 100
    pub score: f64,
    /// Term within the academic year, 1 through 3
    pub term: i64,
    pub year: i64,
    pub exam_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGrade {
    pub student_id: Uuid,
    pub class_id: Uuid,
    pub subject_id: Uuid,
    pub score: f64,
    pub term: i64,
    pub year: i64,
    pub exam_name: String,
}

/// Partial-update payload; at least one field must be present
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGrade {
    pub score: Option<f64>,
    pub term: Option<i64>,
    pub year: Option<i64>,
    pub exam_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeFilter {
    pub student_id: Option<Uuid>,
    pub class_id: Option<Uuid>,
    pub subject_id: Option<Uuid>,
    pub term: Option<i64>,
    pub year: Option<i64>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
