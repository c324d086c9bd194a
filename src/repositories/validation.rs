//! Validation layer
//!
//! Per-entity validators reject malformed payloads before they reach the
//! store, reporting every violated field at once. For partial updates the
//! validator — not the repository — assembles an ordered changeset of
//! (column, value) pairs; repositories consume the changeset mechanically
//! and never inspect payload shape themselves.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

use crate::entities::{
    CreateClass, CreateGrade, CreateIndiscipline, CreateInvite, CreateNotification, CreateStudent,
    CreateSubject, CreateTeacher, UpdateClass, UpdateGrade, UpdateIndiscipline, UpdateNotification,
    UpdateStudent, UpdateTeacher,
};
use crate::error::{AppError, FieldViolation, Result};

/// A value destined for one bound SQL parameter
#[derive(Debug, Clone)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
    Uuid(Uuid),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Null,
}

/// Ordered (column, value) pairs for a sparse UPDATE. Built once by a
/// validator from whichever payload fields are present.
#[derive(Debug, Clone, Default)]
pub struct Changeset {
    pairs: Vec<(&'static str, SqlValue)>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: &'static str, value: SqlValue) {
        self.pairs.push((column, value));
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Columns touched by this changeset, in payload order
    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.pairs.iter().map(|(column, _)| *column)
    }

    /// Append `col = ?, col = ?, ...` assignments with bound values
    pub fn apply(self, qb: &mut QueryBuilder<'_, Sqlite>) {
        let mut separated = qb.separated(", ");
        for (column, value) in self.pairs {
            separated.push(format!("{column} = "));
            match value {
                SqlValue::Text(v) => separated.push_bind_unseparated(v),
                SqlValue::Integer(v) => separated.push_bind_unseparated(v),
                SqlValue::Real(v) => separated.push_bind_unseparated(v),
                SqlValue::Bool(v) => separated.push_bind_unseparated(v),
                SqlValue::Uuid(v) => separated.push_bind_unseparated(v),
                SqlValue::Date(v) => separated.push_bind_unseparated(v),
                SqlValue::DateTime(v) => separated.push_bind_unseparated(v),
                SqlValue::Null => separated.push_unseparated("NULL"),
            };
        }
    }
}

/// Field-level rules shared by the entity validators. Each returns the
/// violation rather than failing, so callers can report every problem in
/// one pass.
pub mod rules {
    use super::*;

    pub fn required_text(field: &str, value: &str) -> Option<FieldViolation> {
        if value.trim().is_empty() {
            Some(FieldViolation::new(field, "is required"))
        } else {
            None
        }
    }

    pub fn max_length(field: &str, value: &str, max: usize) -> Option<FieldViolation> {
        if value.len() > max {
            Some(FieldViolation::new(
                field,
                format!("must be at most {max} characters"),
            ))
        } else {
            None
        }
    }

    pub fn email(field: &str, value: &str) -> Option<FieldViolation> {
        let valid = value.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }) && !value.contains(char::is_whitespace);
        if valid {
            None
        } else {
            Some(FieldViolation::new(field, "must be a valid email"))
        }
    }

    pub fn phone(field: &str, value: &str) -> Option<FieldViolation> {
        let digits = value.chars().filter(char::is_ascii_digit).count();
        let valid = (7..=15).contains(&digits)
            && value
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'));
        if valid {
            None
        } else {
            Some(FieldViolation::new(field, "must be a valid phone number"))
        }
    }

    /// Admission numbers look like `ADM` followed by 4 to 6 digits
    pub fn admission_no(field: &str, value: &str) -> Option<FieldViolation> {
        let valid = value
            .strip_prefix("ADM")
            .is_some_and(|rest| (4..=6).contains(&rest.len()) && rest.bytes().all(|b| b.is_ascii_digit()));
        if valid {
            None
        } else {
            Some(FieldViolation::new(
                field,
                "must match ADM followed by 4-6 digits",
            ))
        }
    }

    pub fn range_i64(field: &str, value: i64, min: i64, max: i64) -> Option<FieldViolation> {
        if (min..=max).contains(&value) {
            None
        } else {
            Some(FieldViolation::new(
                field,
                format!("must be between {min} and {max}"),
            ))
        }
    }

    pub fn range_f64(field: &str, value: f64, min: f64, max: f64) -> Option<FieldViolation> {
        if value >= min && value <= max {
            None
        } else {
            Some(FieldViolation::new(
                field,
                format!("must be between {min} and {max}"),
            ))
        }
    }

    pub fn past_date(field: &str, value: NaiveDate) -> Option<FieldViolation> {
        if value < Utc::now().date_naive() {
            None
        } else {
            Some(FieldViolation::new(field, "must be in the past"))
        }
    }

    pub fn not_future_date(field: &str, value: NaiveDate) -> Option<FieldViolation> {
        if value <= Utc::now().date_naive() {
            None
        } else {
            Some(FieldViolation::new(field, "must not be in the future"))
        }
    }
}

fn finish(violations: Vec<FieldViolation>) -> Result<()> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(violations))
    }
}

fn finish_changeset(changeset: Changeset, violations: Vec<FieldViolation>) -> Result<Changeset> {
    if !violations.is_empty() {
        return Err(AppError::validation(violations));
    }
    if changeset.is_empty() {
        return Err(AppError::invalid_field(
            "payload",
            "at least one field is required",
        ));
    }
    Ok(changeset)
}

/// Student validator
pub struct StudentValidator;

impl StudentValidator {
    pub fn create(data: &CreateStudent) -> Result<()> {
        let mut violations = Vec::new();
        violations.extend(rules::admission_no("admissionNo", &data.admission_no));
        violations.extend(rules::required_text("firstName", &data.first_name));
        violations.extend(rules::required_text("lastName", &data.last_name));
        violations.extend(rules::email("email", &data.email));
        violations.extend(rules::past_date("dateOfBirth", data.date_of_birth));
        violations.extend(rules::phone("guardianPhone", &data.guardian_phone));
        finish(violations)
    }

    pub fn update(data: &UpdateStudent) -> Result<Changeset> {
        let mut violations = Vec::new();
        let mut changeset = Changeset::new();

        if let Some(first_name) = &data.first_name {
            violations.extend(rules::required_text("firstName", first_name));
            changeset.push("first_name", SqlValue::Text(first_name.clone()));
        }
        if let Some(last_name) = &data.last_name {
            violations.extend(rules::required_text("lastName", last_name));
            changeset.push("last_name", SqlValue::Text(last_name.clone()));
        }
        if let Some(email) = &data.email {
            violations.extend(rules::email("email", email));
            changeset.push("email", SqlValue::Text(email.clone()));
        }
        if let Some(date_of_birth) = data.date_of_birth {
            violations.extend(rules::past_date("dateOfBirth", date_of_birth));
            changeset.push("date_of_birth", SqlValue::Date(date_of_birth));
        }
        if let Some(guardian_phone) = &data.guardian_phone {
            violations.extend(rules::phone("guardianPhone", guardian_phone));
            changeset.push("guardian_phone", SqlValue::Text(guardian_phone.clone()));
        }
        if let Some(status) = data.status {
            changeset.push("status", SqlValue::Text(status.as_str().to_string()));
        }

        finish_changeset(changeset, violations)
    }
}

/// Teacher validator
pub struct TeacherValidator;

impl TeacherValidator {
    pub fn create(data: &CreateTeacher) -> Result<()> {
        let mut violations = Vec::new();
        violations.extend(rules::required_text("employeeNo", &data.employee_no));
        violations.extend(rules::required_text("firstName", &data.first_name));
        violations.extend(rules::required_text("lastName", &data.last_name));
        violations.extend(rules::email("email", &data.email));
        violations.extend(rules::phone("phone", &data.phone));
        finish(violations)
    }

    pub fn update(data: &UpdateTeacher) -> Result<Changeset> {
        let mut violations = Vec::new();
        let mut changeset = Changeset::new();

        if let Some(first_name) = &data.first_name {
            violations.extend(rules::required_text("firstName", first_name));
            changeset.push("first_name", SqlValue::Text(first_name.clone()));
        }
        if let Some(last_name) = &data.last_name {
            violations.extend(rules::required_text("lastName", last_name));
            changeset.push("last_name", SqlValue::Text(last_name.clone()));
        }
        if let Some(email) = &data.email {
            violations.extend(rules::email("email", email));
            changeset.push("email", SqlValue::Text(email.clone()));
        }
        if let Some(phone) = &data.phone {
            violations.extend(rules::phone("phone", phone));
            changeset.push("phone", SqlValue::Text(phone.clone()));
        }
        if let Some(status) = data.status {
            changeset.push("status", SqlValue::Text(status.as_str().to_string()));
        }

        finish_changeset(changeset, violations)
    }
}

/// Subject validator
pub struct SubjectValidator;

impl SubjectValidator {
    pub fn create(data: &CreateSubject) -> Result<()> {
        let mut violations = Vec::new();
        violations.extend(rules::required_text("name", &data.name));
        violations.extend(rules::required_text("code", &data.code));
        violations.extend(rules::max_length("code", &data.code, 16));
        finish(violations)
    }
}

/// Class validator
pub struct ClassValidator;

impl ClassValidator {
    pub fn create(data: &CreateClass) -> Result<()> {
        let mut violations = Vec::new();
        violations.extend(rules::required_text("name", &data.name));
        violations.extend(rules::range_i64("grade", data.grade_level, 1, 12));
        violations.extend(rules::range_i64("academicYear", data.academic_year, 2000, 2100));
        if let Some(stream) = &data.stream {
            violations.extend(rules::required_text("stream", stream));
        }
        finish(violations)
    }

    pub fn update(data: &UpdateClass) -> Result<Changeset> {
        let mut violations = Vec::new();
        let mut changeset = Changeset::new();

        if let Some(name) = &data.name {
            violations.extend(rules::required_text("name", name));
            changeset.push("name", SqlValue::Text(name.clone()));
        }
        if let Some(grade_level) = data.grade_level {
            violations.extend(rules::range_i64("grade", grade_level, 1, 12));
            changeset.push("grade_level", SqlValue::Integer(grade_level));
        }
        if let Some(stream) = &data.stream {
            violations.extend(rules::required_text("stream", stream));
            changeset.push("stream", SqlValue::Text(stream.clone()));
        }
        if let Some(academic_year) = data.academic_year {
            violations.extend(rules::range_i64("academicYear", academic_year, 2000, 2100));
            changeset.push("academic_year", SqlValue::Integer(academic_year));
        }
        if let Some(is_active) = data.is_active {
            changeset.push("is_active", SqlValue::Bool(is_active));
        }

        finish_changeset(changeset, violations)
    }
}

/// Grade-record validator. Referential validity of the student, class, and
/// subject ids is left to foreign keys.
pub struct GradeValidator;

impl GradeValidator {
    pub fn create(data: &CreateGrade) -> Result<()> {
        let mut violations = Vec::new();
        violations.extend(rules::range_f64("score", data.score, 0.0, 100.0));
        violations.extend(rules::range_i64("term", data.term, 1, 3));
        violations.extend(rules::range_i64("year", data.year, 2000, 2100));
        violations.extend(rules::required_text("examName", &data.exam_name));
        finish(violations)
    }

    pub fn update(data: &UpdateGrade) -> Result<Changeset> {
        let mut violations = Vec::new();
        let mut changeset = Changeset::new();

        if let Some(score) = data.score {
            violations.extend(rules::range_f64("score", score, 0.0, 100.0));
            changeset.push("score", SqlValue::Real(score));
        }
        if let Some(term) = data.term {
            violations.extend(rules::range_i64("term", term, 1, 3));
            changeset.push("term", SqlValue::Integer(term));
        }
        if let Some(year) = data.year {
            violations.extend(rules::range_i64("year", year, 2000, 2100));
            changeset.push("year", SqlValue::Integer(year));
        }
        if let Some(exam_name) = &data.exam_name {
            violations.extend(rules::required_text("examName", exam_name));
            changeset.push("exam_name", SqlValue::Text(exam_name.clone()));
        }

        finish_changeset(changeset, violations)
    }
}

/// Notification validator
pub struct NotificationValidator;

impl NotificationValidator {
    pub fn create(data: &CreateNotification) -> Result<()> {
        let mut violations = Vec::new();
        violations.extend(rules::required_text("title", &data.title));
        violations.extend(rules::max_length("title", &data.title, 200));
        violations.extend(rules::required_text("message", &data.message));
        if data.target_audience.is_empty() {
            violations.push(FieldViolation::new("targetAudience", "cannot be empty"));
        }
        // Cross-field refinement, evaluated after per-field checks
        if let (Some(scheduled_at), Some(expires_at)) = (data.scheduled_at, data.expires_at) {
            if expires_at < scheduled_at {
                violations.push(FieldViolation::new(
                    "expiresAt",
                    "must not precede scheduledAt",
                ));
            }
        }
        finish(violations)
    }

    pub fn update(data: &UpdateNotification) -> Result<Changeset> {
        let mut violations = Vec::new();
        let mut changeset = Changeset::new();

        if let Some(title) = &data.title {
            violations.extend(rules::required_text("title", title));
            violations.extend(rules::max_length("title", title, 200));
            changeset.push("title", SqlValue::Text(title.clone()));
        }
        if let Some(message) = &data.message {
            violations.extend(rules::required_text("message", message));
            changeset.push("message", SqlValue::Text(message.clone()));
        }
        if let Some(priority) = data.priority {
            changeset.push("priority", SqlValue::Text(priority.as_str().to_string()));
        }
        if let Some(target_audience) = &data.target_audience {
            if target_audience.is_empty() {
                violations.push(FieldViolation::new("targetAudience", "cannot be empty"));
            }
            match serde_json::to_string(target_audience) {
                Ok(json) => changeset.push("target_audience", SqlValue::Text(json)),
                Err(_) => violations.push(FieldViolation::new("targetAudience", "is not serializable")),
            }
        }
        if let Some(scheduled_at) = data.scheduled_at {
            changeset.push("scheduled_at", SqlValue::DateTime(scheduled_at));
        }
        if let Some(expires_at) = data.expires_at {
            changeset.push("expires_at", SqlValue::DateTime(expires_at));
        }
        if let (Some(scheduled_at), Some(expires_at)) = (data.scheduled_at, data.expires_at) {
            if expires_at < scheduled_at {
                violations.push(FieldViolation::new(
                    "expiresAt",
                    "must not precede scheduledAt",
                ));
            }
        }

        finish_changeset(changeset, violations)
    }
}

/// Indiscipline-record validator
pub struct IndisciplineValidator;

impl IndisciplineValidator {
    pub fn create(data: &CreateIndiscipline) -> Result<()> {
        let mut violations = Vec::new();
        violations.extend(rules::not_future_date("incidentDate", data.incident_date));
        violations.extend(rules::required_text("description", &data.description));
        violations.extend(rules::max_length("description", &data.description, 1000));
        finish(violations)
    }

    pub fn update(data: &UpdateIndiscipline) -> Result<Changeset> {
        let mut violations = Vec::new();
        let mut changeset = Changeset::new();

        if let Some(incident_date) = data.incident_date {
            violations.extend(rules::not_future_date("incidentDate", incident_date));
            changeset.push("incident_date", SqlValue::Date(incident_date));
        }
        if let Some(description) = &data.description {
            violations.extend(rules::required_text("description", description));
            violations.extend(rules::max_length("description", description, 1000));
            changeset.push("description", SqlValue::Text(description.clone()));
        }
        if let Some(severity) = data.severity {
            changeset.push("severity", SqlValue::Text(severity.as_str().to_string()));
        }
        if let Some(status) = data.status {
            changeset.push("status", SqlValue::Text(status.as_str().to_string()));
        }
        if let Some(remediation) = &data.remediation {
            changeset.push("remediation", SqlValue::Text(remediation.clone()));
        }

        finish_changeset(changeset, violations)
    }
}

/// Invite validator
pub struct InviteValidator;

impl InviteValidator {
    pub fn create(data: &CreateInvite) -> Result<()> {
        let mut violations = Vec::new();
        violations.extend(rules::email("email", &data.email));
        if let Some(expires_at) = data.expires_at {
            if expires_at <= Utc::now() {
                violations.push(FieldViolation::new("expiresAt", "must be in the future"));
            }
        }
        finish(violations)
    }
}
