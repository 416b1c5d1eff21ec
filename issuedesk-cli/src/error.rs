//! Error handling for the issuedesk CLI
//!
//! Library errors keep their source chain and are mapped onto the exit code
//! that matches their kind, so scripts can tell a bad payload from a missing
//! issue without parsing messages.

use crate::exit_codes::{EXIT_CONFLICT, EXIT_ERROR, EXIT_MISSING, EXIT_VALIDATION};
use issuedesk::IssueDeskError;
use std::error::Error;
use std::fmt;

/// CLI-specific result type that preserves error information
pub type CliResult<T> = Result<T, CliError>;

/// CLI error type that includes both error information and suggested exit code
#[derive(Debug)]
pub struct CliError {
    /// Message shown to the user
    pub message: String,
    /// Process exit code
    pub exit_code: i32,
    /// Underlying error, if any
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl CliError {
    /// Create a new CLI error with a message and exit code
    pub fn new(message: impl Into<String>, exit_code: i32) -> Self {
        Self {
            message: message.into(),
            exit_code,
            source: None,
        }
    }

    /// Create a CLI error from another error with a specific exit code
    pub fn from_error<E: Error + Send + Sync + 'static>(error: E, exit_code: i32) -> Self {
        let message = error.to_string();
        Self {
            message,
            exit_code,
            source: Some(Box::new(error)),
        }
    }

    /// Create a CLI error with exit code 1 (general error)
    pub fn general<E: Error + Send + Sync + 'static>(error: E) -> Self {
        Self::from_error(error, EXIT_ERROR)
    }

    /// Create a CLI error with exit code 2 (validation error)
    pub fn validation<E: Error + Send + Sync + 'static>(error: E) -> Self {
        Self::from_error(error, EXIT_VALIDATION)
    }

    /// A usage problem detected by the CLI itself
    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(message, EXIT_VALIDATION)
    }

    /// Get the full error chain as a formatted string
    pub fn full_chain(&self) -> String {
        let mut result = self.message.clone();

        // The first source is the error the message was taken from
        let mut current_source = self.source().and_then(|e| e.source());
        while let Some(err) = current_source {
            result.push_str(&format!("\n  Caused by: {}", err));
            current_source = err.source();
        }

        result
    }
}

/// Exit code for a library error
pub fn exit_code_for(error: &IssueDeskError) -> i32 {
    if error.is_validation() || matches!(error, IssueDeskError::Config(_)) {
        EXIT_VALIDATION
    } else if error.is_not_found() {
        EXIT_MISSING
    } else if error.is_conflict() {
        EXIT_CONFLICT
    } else {
        EXIT_ERROR
    }
}

impl From<IssueDeskError> for CliError {
    fn from(error: IssueDeskError) -> Self {
        let exit_code = exit_code_for(&error);
        Self::from_error(error, exit_code)
    }
}

impl From<anyhow::Error> for CliError {
    fn from(error: anyhow::Error) -> Self {
        let exit_code = error
            .downcast_ref::<IssueDeskError>()
            .map(exit_code_for)
            .unwrap_or(EXIT_ERROR);
        Self {
            message: format!("{error:#}"),
            exit_code,
            source: None,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

/// Extension trait for converting results to CLI results
pub trait IntoCliResult<T> {
    /// Map the error with an explicit exit code
    fn cli_error(self, exit_code: i32) -> CliResult<T>;
    /// Map the error to a general failure
    fn cli_general_error(self) -> CliResult<T>;
    /// Map the error to a validation failure
    fn cli_validation_error(self) -> CliResult<T>;
}

impl<T, E: Error + Send + Sync + 'static> IntoCliResult<T> for Result<T, E> {
    fn cli_error(self, exit_code: i32) -> CliResult<T> {
        self.map_err(|e| CliError::from_error(e, exit_code))
    }

    fn cli_general_error(self) -> CliResult<T> {
        self.map_err(CliError::general)
    }

    fn cli_validation_error(self) -> CliResult<T> {
        self.map_err(CliError::validation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use issuedesk::{Constraint, FieldViolation};

    #[test]
    fn test_exit_codes_follow_error_kind() {
        let validation: IssueDeskError =
            FieldViolation::new("priority", Some("9".into()), Constraint::Required).into();
        assert_eq!(CliError::from(validation).exit_code, EXIT_VALIDATION);
        assert_eq!(
            CliError::from(IssueDeskError::issue_not_found("DWB-0009")).exit_code,
            EXIT_MISSING
        );
        assert_eq!(
            CliError::from(IssueDeskError::conflict("busy")).exit_code,
            EXIT_CONFLICT
        );
        assert_eq!(
            CliError::from(IssueDeskError::storage("disk")).exit_code,
            EXIT_ERROR
        );
    }

    #[test]
    fn test_full_chain_includes_nested_causes() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let error = CliError::from(IssueDeskError::from(io));
        assert_eq!(error.exit_code, EXIT_ERROR);
        assert!(error.full_chain().starts_with("IO error: disk on fire"));
    }
}
