use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a student
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum StudentStatus {
    Active,
    Inactive,
}

impl StudentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// A persisted student. Store columns are snake_case; JSON output is
/// camelCase at the repository boundary.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub admission_no: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
    pub guardian_phone: String,
    pub status: StudentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creation payload; every field is required except the optional initial
/// class membership, which is linked in the same transaction as the insert
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudent {
    pub admission_no: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
    pub guardian_phone: String,
    pub class_id: Option<Uuid>,
}

/// Partial-update payload; at least one field must be present
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudent {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub guardian_phone: Option<String>,
    pub status: Option<StudentStatus>,
}

/// Alternative natural keys for looking up a student. When more than one
/// field is supplied, resolution follows a fixed precedence order:
/// id, then admission_no, then email. Exactly one lookup is issued.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentIdentifier {
    pub id: Option<Uuid>,
    pub admission_no: Option<String>,
    pub email: Option<String>,
}

/// Optional conjunctive filters for listing students
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFilter {
    pub status: Option<StudentStatus>,
    pub class_id: Option<Uuid>,
    /// Case-insensitive partial match on name, email, or admission number
    pub search_term: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
