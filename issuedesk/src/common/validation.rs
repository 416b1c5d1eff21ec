//! Field-level validation errors and collection helpers
//!
//! Every validator in the crate reports problems as [`FieldViolation`]s. A
//! [`ViolationCollector`] gathers them while a payload is checked so callers
//! see every violated constraint at once instead of only the first one.

use std::fmt;

/// The constraint a field value failed to satisfy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Value must be one of a closed set of names
    OneOf(Vec<&'static str>),
    /// Integer value must lie inside an inclusive range (open-ended when `max` is `None`)
    Range {
        /// Smallest accepted value
        min: i64,
        /// Largest accepted value
        max: Option<i64>,
    },
    /// String value must contain at least one non-whitespace character
    NonEmpty,
    /// Field must be present and not null
    Required,
    /// Value is reserved for internal use and cannot be submitted directly
    Reserved,
    /// Value must match a textual pattern
    Pattern(&'static str),
    /// Value has the wrong shape (not a string, not an integer, not an object)
    Malformed(String),
    /// The same field was given under more than one key
    Duplicate(String),
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::OneOf(allowed) => write!(f, "must be one of [{}]", allowed.join(", ")),
            Constraint::Range { min, max: Some(max) } => {
                write!(f, "must be in range {}..{}", min, max)
            }
            Constraint::Range { min, max: None } => write!(f, "must be at least {}", min),
            Constraint::NonEmpty => write!(f, "must not be empty"),
            Constraint::Required => write!(f, "is required"),
            Constraint::Reserved => write!(f, "is reserved and cannot be submitted directly"),
            Constraint::Pattern(pattern) => write!(f, "must match {}", pattern),
            Constraint::Malformed(expected) => write!(f, "is malformed: {}", expected),
            Constraint::Duplicate(other) => write!(f, "is also given as '{}'", other),
        }
    }
}

/// A single violated constraint on a named field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Name of the offending field
    pub field: String,
    /// The rejected value, rendered as text (`None` when the value was absent)
    pub value: Option<String>,
    /// The constraint that was not met
    pub constraint: Constraint,
}

impl FieldViolation {
    /// Create a violation for `field` with the rejected `value`
    pub fn new(field: impl Into<String>, value: Option<String>, constraint: Constraint) -> Self {
        Self {
            field: field.into(),
            value,
            constraint,
        }
    }

    /// A required field was missing or null
    pub fn required(field: impl Into<String>) -> Self {
        Self::new(field, None, Constraint::Required)
    }

    /// An integer fell outside its inclusive range
    pub fn out_of_range(field: impl Into<String>, value: i64, min: i64, max: Option<i64>) -> Self {
        Self::new(field, Some(value.to_string()), Constraint::Range { min, max })
    }

    /// A value had the wrong JSON shape
    pub fn malformed(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::new(
            field,
            Some(value.into()),
            Constraint::Malformed(expected.into()),
        )
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(
                f,
                "invalid value '{}' for field '{}': {}",
                value, self.field, self.constraint
            ),
            None => write!(f, "field '{}' {}", self.field, self.constraint),
        }
    }
}

/// One or more violations reported together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors {
    violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    /// Wrap a single violation
    pub fn single(violation: FieldViolation) -> Self {
        Self {
            violations: vec![violation],
        }
    }

    /// All violations in the order they were found
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    /// The first violation found
    pub fn first(&self) -> Option<&FieldViolation> {
        self.violations.first()
    }

    /// Look up the violation reported for `field`
    pub fn field(&self, field: &str) -> Option<&FieldViolation> {
        self.violations.iter().find(|v| v.field == field)
    }

    /// Whether `field` has a reported violation
    pub fn contains_field(&self, field: &str) -> bool {
        self.field(field).is_some()
    }

    /// Number of violations
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Always false for a constructed value, provided for symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }
}

impl From<FieldViolation> for ValidationErrors {
    fn from(violation: FieldViolation) -> Self {
        Self::single(violation)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.violations.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Collects violations across several field checks
#[derive(Debug, Default)]
pub struct ViolationCollector {
    violations: Vec<FieldViolation>,
}

impl ViolationCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation
    pub fn push(&mut self, violation: FieldViolation) {
        self.violations.push(violation);
    }

    /// Keep the value of a successful check, record the violation of a failed one
    pub fn check<T>(&mut self, result: Result<T, FieldViolation>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(violation) => {
                self.violations.push(violation);
                None
            }
        }
    }

    /// Whether anything has been recorded so far
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Finish collecting, producing `value` only when nothing was recorded
    pub fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, ValidationErrors> {
        if self.violations.is_empty() {
            Ok(value())
        } else {
            Err(ValidationErrors {
                violations: self.violations,
            })
        }
    }
}

/// Check an integer against an inclusive range
pub fn check_range(
    field: &str,
    value: i64,
    min: i64,
    max: Option<i64>,
) -> Result<i64, FieldViolation> {
    let above_max = max.map(|max| value > max).unwrap_or(false);
    if value < min || above_max {
        Err(FieldViolation::out_of_range(field, value, min, max))
    } else {
        Ok(value)
    }
}

/// Check that a string has non-whitespace content
pub fn check_non_empty(field: &str, value: &str) -> Result<String, FieldViolation> {
    if value.trim().is_empty() {
        Err(FieldViolation::new(
            field,
            Some(value.to_string()),
            Constraint::NonEmpty,
        ))
    } else {
        Ok(value.to_string())
    }
}
