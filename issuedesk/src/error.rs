//! Unified error handling for the issuedesk library
//!
//! Every public operation reports failures through [`IssueDeskError`]. The
//! variants map onto the outcomes a caller can act on: fix the payload
//! (`Validation`), report a missing record (`NotFound`), retry (`Conflict`),
//! or treat it as an operational failure (`Storage`, `Io`, ...).

use crate::common::validation::{FieldViolation, ValidationErrors};
use crate::config::ConfigError;
use thiserror::Error;

/// The main error type for the issuedesk library
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IssueDeskError {
    /// One or more payload fields failed validation
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// A lookup matched no record
    #[error("{entity} not found: {lookup_key}")]
    NotFound {
        /// Kind of record that was looked up ("issue", "activity")
        entity: &'static str,
        /// The key used for the lookup
        lookup_key: String,
    },

    /// The operation conflicts with the current state of the store
    #[error("Conflict: {reason}")]
    Conflict {
        /// Why the operation could not be applied
        reason: String,
    },

    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl IssueDeskError {
    /// Missing issue, keyed by whatever the caller looked it up with
    pub fn issue_not_found(lookup_key: impl ToString) -> Self {
        Self::NotFound {
            entity: "issue",
            lookup_key: lookup_key.to_string(),
        }
    }

    /// Conflict with a reason
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    /// Storage failure with a message
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Whether this is a validation failure
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether this is a missing-record failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this is a conflict the caller may retry
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// The validation details, if this is a validation failure
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for IssueDeskError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<FieldViolation> for IssueDeskError {
    fn from(violation: FieldViolation) -> Self {
        Self::Validation(ValidationErrors::single(violation))
    }
}

/// Result type alias for issuedesk operations
pub type Result<T> = std::result::Result<T, IssueDeskError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::validation::Constraint;

    #[test]
    fn test_not_found_display() {
        let error = IssueDeskError::issue_not_found("DWB-0042");
        assert_eq!(error.to_string(), "issue not found: DWB-0042");
        assert!(error.is_not_found());
        assert!(!error.is_conflict());
    }

    #[test]
    fn test_violation_converts_to_validation_error() {
        let violation = FieldViolation::new(
            "issue_priority",
            Some("6".to_string()),
            Constraint::Range { min: 1, max: Some(5) },
        );
        let error: IssueDeskError = violation.into();
        assert!(error.is_validation());
        let errors = error.validation_errors().unwrap();
        assert!(errors.contains_field("issue_priority"));
        assert!(error.to_string().contains("1..5"));
    }

    #[test]
    fn test_conflict_display() {
        let error = IssueDeskError::conflict("issue name DWB-0001 is already taken");
        assert_eq!(
            error.to_string(),
            "Conflict: issue name DWB-0001 is already taken"
        );
    }
}
