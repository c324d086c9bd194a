//! Application error taxonomy
//!
//! Every failure a repository or service can produce is classified here.
//! Repositories fail fast with the most specific kind; only the cache
//! decorator is allowed to swallow errors (it degrades to a miss).

use std::fmt::Display;

use thiserror::Error;

/// A single violated field from schema or cross-field validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Field name as it appears in the request payload
    pub field: String,
    /// Human-readable rule description
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Standardized application error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Payload failed schema or cross-field rule checks; always
    /// client-correctable. Carries every violated field, not just the first.
    #[error("Validation failed: {}", format_violations(violations))]
    Validation { violations: Vec<FieldViolation> },

    /// The requested identity does not resolve to an existing,
    /// non-terminal-status row
    #[error("{entity} with identifier {identifier} not found")]
    NotFound {
        entity: &'static str,
        identifier: String,
    },

    /// A store uniqueness constraint was violated
    #[error("{entity} already exists ({})", fields.join(", "))]
    Duplicate {
        entity: &'static str,
        fields: Vec<String>,
    },

    /// A delete was refused because disallowed dependent rows exist
    #[error("Cannot delete {entity}: {details}")]
    Dependency {
        entity: &'static str,
        details: String,
    },

    /// A conditional status transition lost the race: the row exists but is
    /// no longer in the state the operation requires
    #[error("{entity} with identifier {identifier} was already processed")]
    AlreadyProcessed {
        entity: &'static str,
        identifier: String,
    },

    // System-level errors
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("External service error: {0}")]
    ExternalService(String),
}

impl AppError {
    /// Create a validation error from a list of violated fields
    pub fn validation(violations: Vec<FieldViolation>) -> Self {
        Self::Validation { violations }
    }

    /// Create a validation error for a single violated field
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            violations: vec![FieldViolation::new(field, message)],
        }
    }

    /// Create a new not found error
    pub fn not_found(entity: &'static str, identifier: impl Display) -> Self {
        Self::NotFound {
            entity,
            identifier: identifier.to_string(),
        }
    }

    /// Create a new duplicate error naming the conflicting field(s)
    pub fn duplicate(
        entity: &'static str,
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::Duplicate {
            entity,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a new dependency error
    pub fn dependency(entity: &'static str, details: impl Into<String>) -> Self {
        Self::Dependency {
            entity,
            details: details.into(),
        }
    }

    /// Create a new already-processed error
    pub fn already_processed(entity: &'static str, identifier: impl Display) -> Self {
        Self::AlreadyProcessed {
            entity,
            identifier: identifier.to_string(),
        }
    }

    /// Create a new configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a new external service error
    pub fn external_service(message: impl Into<String>) -> Self {
        Self::ExternalService(message.into())
    }

    /// Stable machine-readable code for this error, e.g. `CLASS_NOT_FOUND`
    /// or `DUPLICATE_CLASS`. The HTTP layer maps these to status codes.
    pub fn code(&self) -> String {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR".to_string(),
            Self::NotFound { entity, .. } => format!("{}_NOT_FOUND", upper_snake(entity)),
            Self::Duplicate { entity, .. } => format!("DUPLICATE_{}", upper_snake(entity)),
            Self::Dependency { entity, .. } => format!("{}_HAS_DEPENDENTS", upper_snake(entity)),
            Self::AlreadyProcessed { entity, .. } => {
                format!("{}_ALREADY_PROCESSED", upper_snake(entity))
            }
            Self::Configuration(_) => "CONFIGURATION_ERROR".to_string(),
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR".to_string(),
            _ => "STORAGE_ERROR".to_string(),
        }
    }

    /// Whether a caller may reasonably retry the failed operation.
    /// The repository itself never retries.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Io(_) | Self::ExternalService(_)
        )
    }

    /// The violated fields, when this is a validation error
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            Self::Validation { violations } => violations,
            _ => &[],
        }
    }
}

fn format_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn upper_snake(entity: &str) -> String {
    entity.replace(' ', "_").to_uppercase()
}

/// Translate a store-level error into a `Duplicate` error when it is a
/// uniqueness violation, naming the conflicting column(s) parsed out of the
/// SQLite constraint message ("UNIQUE constraint failed: classes.name,
/// classes.academic_year"). Anything else passes through as `Storage`.
pub fn map_unique_violation(err: sqlx::Error, entity: &'static str) -> AppError {
    if let sqlx::Error::Database(ref db_err) = err {
        let message = db_err.message();
        if let Some(columns) = message.strip_prefix("UNIQUE constraint failed: ") {
            let fields: Vec<String> = columns
                .split(',')
                .map(|c| c.trim().rsplit('.').next().unwrap_or(c).to_string())
                .collect();
            return AppError::duplicate(entity, fields);
        }
    }
    AppError::Storage(err)
}

pub type Result<T, E = AppError> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_per_entity() {
        assert_eq!(AppError::not_found("class", "x").code(), "CLASS_NOT_FOUND");
        assert_eq!(
            AppError::duplicate("class", ["name"]).code(),
            "DUPLICATE_CLASS"
        );
        assert_eq!(
            AppError::already_processed("invite", "x").code(),
            "INVITE_ALREADY_PROCESSED"
        );
    }

    #[test]
    fn validation_error_lists_every_field() {
        let err = AppError::validation(vec![
            FieldViolation::new("email", "must be a valid email"),
            FieldViolation::new("dateOfBirth", "must be in the past"),
        ]);
        assert_eq!(err.violations().len(), 2);
        let text = err.to_string();
        assert!(text.contains("email"));
        assert!(text.contains("dateOfBirth"));
    }

    #[test]
    fn storage_errors_are_retriable_and_domain_errors_are_not() {
        assert!(AppError::Storage(sqlx::Error::PoolTimedOut).is_retriable());
        assert!(!AppError::not_found("student", "x").is_retriable());
        assert!(!AppError::duplicate("student", ["email"]).is_retriable());
    }
}
