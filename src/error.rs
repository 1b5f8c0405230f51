//! Error types for u-timetable.
//!
//! Only malformed input and bad configuration are errors. Infeasible
//! sessions, exhausted budgets and cancellation are reported inside the
//! returned [`Candidate`](crate::models::Candidate) instead.

use thiserror::Error;

use crate::config::ConfigError;
use crate::validation::ValidationError;

/// Main error type.
#[derive(Debug, Error)]
pub enum TimetableError {
    /// Input failed validation; generation was not attempted.
    #[error("invalid timetable input: {}", summarize(.0))]
    Validation(Vec<ValidationError>),

    /// An assignment refers to an entity the problem does not define.
    #[error("assignment {index} references unknown {entity} '{id}'")]
    UnknownReference {
        index: usize,
        entity: &'static str,
        id: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl TimetableError {
    /// Validation errors, if this is a validation failure.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            TimetableError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

impl From<Vec<ValidationError>> for TimetableError {
    fn from(errors: Vec<ValidationError>) -> Self {
        TimetableError::Validation(errors)
    }
}

fn summarize(errors: &[ValidationError]) -> String {
    match errors {
        [] => "no details".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, TimetableError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrorKind;

    #[test]
    fn test_validation_error_message() {
        let err = TimetableError::from(vec![
            ValidationError::new(ValidationErrorKind::DuplicateId, "Duplicate classroom ID: R1"),
            ValidationError::new(ValidationErrorKind::InvalidReference, "x"),
        ]);
        assert_eq!(
            err.to_string(),
            "invalid timetable input: Duplicate classroom ID: R1 (and 1 more)"
        );
        assert_eq!(err.validation_errors().len(), 2);
    }

    #[test]
    fn test_unknown_reference_message() {
        let err = TimetableError::UnknownReference {
            index: 3,
            entity: "classroom",
            id: "R9".into(),
        };
        assert_eq!(err.to_string(), "assignment 3 references unknown classroom 'R9'");
        assert!(err.validation_errors().is_empty());
    }
}
