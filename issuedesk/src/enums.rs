//! Closed enumerations for issue type, status, resolution and activity type
//!
//! Values travel as upper-case names (`IN_PROGRESS`) at the persistence and
//! payload edges and as Rust enums everywhere else. Parsing is
//! case-insensitive so seed data written as `in_progress` is accepted; the
//! stored form is always the canonical upper-case name.

use crate::common::validation::{Constraint, FieldViolation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Behaviour shared by every closed enumeration
pub trait ClosedEnum: Sized + Copy + 'static {
    /// Every member, in declaration order
    fn variants() -> &'static [Self];

    /// Canonical upper-case name
    fn as_str(&self) -> &'static str;

    /// Canonical names of every member
    fn names() -> Vec<&'static str> {
        Self::variants().iter().map(|v| v.as_str()).collect()
    }

    /// Look a member up by name, ignoring ASCII case and surrounding whitespace
    fn lookup(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::variants()
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(name))
    }

    /// Parse `value` for `field`, naming every legal value on failure
    fn parse_field(field: &str, value: &str) -> Result<Self, FieldViolation> {
        Self::lookup(value).ok_or_else(|| {
            FieldViolation::new(
                field,
                Some(value.to_string()),
                Constraint::OneOf(Self::names()),
            )
        })
    }
}

macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:tt ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl ClosedEnum for $name {
            fn variants() -> &'static [Self] {
                &[$( $name::$variant ),+]
            }

            fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

closed_enum! {
    /// Classification of an issue
    pub enum IssueType {
        /// Not classified
        Unknown => "UNKNOWN",
        /// Defect to fix
        Bug => "BUG",
        /// Standard unit of work
        Task => "TASK",
        /// New capability
        Feature => "FEATURE",
        /// Requirement to satisfy
        Requirement => "REQUIREMENT",
        /// Support request
        Support => "SUPPORT",
        /// Large initiative spanning several issues
        Epic => "EPIC",
    }
}

closed_enum! {
    /// Workflow position of an issue
    pub enum IssueStatus {
        /// Not recorded
        Unknown => "UNKNOWN",
        /// Newly filed; the default for created issues
        Open => "OPEN",
        /// Someone has been assigned
        Assigned => "ASSIGNED",
        /// Being worked on
        InProgress => "IN_PROGRESS",
        /// Paused
        OnHold => "ON_HOLD",
        /// Awaiting review
        UnderReview => "UNDER_REVIEW",
        /// Work finished
        Done => "DONE",
        /// Shipped
        Released => "RELEASED",
    }
}

closed_enum! {
    /// Outcome recorded for an issue
    pub enum IssueResolution {
        /// Not recorded
        Unknown => "UNKNOWN",
        /// No outcome yet; the default for created issues
        Unresolved => "UNRESOLVED",
        /// Not a valid issue
        Invalid => "INVALID",
        /// Deliberately not addressed
        WontFix => "WONT_FIX",
        /// Made irrelevant by later events
        OvercomeByEvents => "OVERCOME_BY_EVENTS",
        /// Could not be reproduced
        UnableToReplicate => "UNABLE_TO_REPLICATE",
        /// Duplicate of another issue
        Duplicate => "DUPLICATE",
        /// Done
        Complete => "COMPLETE",
    }
}

closed_enum! {
    /// Kind of an activity entry
    pub enum ActivityType {
        /// Not recorded
        Unknown => "UNKNOWN",
        /// Free-form comment
        Comment => "COMMENT",
        /// Field changes recorded by the update engine
        Update => "UPDATE",
        /// Assignment change (extended set)
        Assignment => "ASSIGNMENT",
        /// Status change (extended set)
        Status => "STATUS",
        /// Resolution change (extended set)
        Resolution => "RESOLUTION",
    }
}

impl IssueStatus {
    /// Status given to newly created issues
    pub const DEFAULT: IssueStatus = IssueStatus::Open;
}

impl IssueResolution {
    /// Resolution given to newly created issues
    pub const DEFAULT: IssueResolution = IssueResolution::Unresolved;
}

impl ActivityType {
    /// The canonical activity kinds
    pub const CANONICAL: [ActivityType; 3] = [
        ActivityType::Unknown,
        ActivityType::Comment,
        ActivityType::Update,
    ];

    /// Whether this kind belongs to the extended set that must be enabled in configuration
    pub fn is_extended(&self) -> bool {
        !Self::CANONICAL.contains(self)
    }

    /// Whether only the update engine may create entries of this kind
    pub fn is_reserved(&self) -> bool {
        matches!(self, ActivityType::Update)
    }
}

/// Validates enumerated payload fields against the closed sets
///
/// The only configurable aspect is whether the extended activity kinds are
/// accepted; the issue enumerations are fixed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Registry {
    extended_activity_types: bool,
}

impl Registry {
    /// Create a registry; `extended_activity_types` admits ASSIGNMENT/STATUS/RESOLUTION
    pub fn new(extended_activity_types: bool) -> Self {
        Self {
            extended_activity_types,
        }
    }

    /// Validate an issue type
    pub fn issue_type(&self, field: &str, value: &str) -> Result<IssueType, FieldViolation> {
        IssueType::parse_field(field, value)
    }

    /// Validate an issue status
    pub fn status(&self, field: &str, value: &str) -> Result<IssueStatus, FieldViolation> {
        IssueStatus::parse_field(field, value)
    }

    /// Validate an issue resolution
    pub fn resolution(&self, field: &str, value: &str) -> Result<IssueResolution, FieldViolation> {
        IssueResolution::parse_field(field, value)
    }

    /// Activity kinds accepted by this registry
    pub fn activity_types(&self) -> Vec<ActivityType> {
        ActivityType::variants()
            .iter()
            .copied()
            .filter(|t| self.extended_activity_types || !t.is_extended())
            .collect()
    }

    /// Validate an activity type
    pub fn activity_type(&self, field: &str, value: &str) -> Result<ActivityType, FieldViolation> {
        let allowed = self.activity_types();
        ActivityType::lookup(value)
            .filter(|t| allowed.contains(t))
            .ok_or_else(|| {
                FieldViolation::new(
                    field,
                    Some(value.to_string()),
                    Constraint::OneOf(allowed.iter().map(|t| t.as_str()).collect()),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_in_declaration_order() {
        assert_eq!(
            IssueType::names(),
            vec!["UNKNOWN", "BUG", "TASK", "FEATURE", "REQUIREMENT", "SUPPORT", "EPIC"]
        );
        assert_eq!(IssueStatus::variants().len(), 8);
        assert_eq!(IssueResolution::variants().len(), 8);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(IssueStatus::lookup("in_progress"), Some(IssueStatus::InProgress));
        assert_eq!(IssueResolution::lookup(" Wont_Fix "), Some(IssueResolution::WontFix));
        assert_eq!(IssueType::lookup("closed"), None);
    }

    #[test]
    fn test_parse_field_lists_allowed_values() {
        let violation = IssueStatus::parse_field("issue_status", "CLOSED").unwrap_err();
        assert_eq!(violation.field, "issue_status");
        assert_eq!(violation.value.as_deref(), Some("CLOSED"));
        match violation.constraint {
            Constraint::OneOf(allowed) => {
                assert_eq!(allowed, IssueStatus::names());
            }
            other => panic!("unexpected constraint {:?}", other),
        }
    }

    #[test]
    fn test_serde_uses_canonical_names() {
        let json = serde_json::to_string(&IssueResolution::OvercomeByEvents).unwrap();
        assert_eq!(json, "\"OVERCOME_BY_EVENTS\"");
        let status: IssueStatus = serde_json::from_str("\"UNDER_REVIEW\"").unwrap();
        assert_eq!(status, IssueStatus::UnderReview);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(IssueStatus::DEFAULT, IssueStatus::Open);
        assert_eq!(IssueResolution::DEFAULT, IssueResolution::Unresolved);
    }

    #[test]
    fn test_registry_rejects_extended_activity_by_default() {
        let registry = Registry::default();
        assert_eq!(
            registry.activity_type("activity_type", "comment").unwrap(),
            ActivityType::Comment
        );

        let violation = registry
            .activity_type("activity_type", "ASSIGNMENT")
            .unwrap_err();
        assert_eq!(
            violation.constraint,
            Constraint::OneOf(vec!["UNKNOWN", "COMMENT", "UPDATE"])
        );
    }

    #[test]
    fn test_registry_accepts_extended_activity_when_enabled() {
        let registry = Registry::new(true);
        assert_eq!(
            registry.activity_type("activity_type", "status").unwrap(),
            ActivityType::Status
        );
        assert_eq!(registry.activity_types().len(), 6);
    }

    #[test]
    fn test_reserved_and_extended_kinds() {
        assert!(ActivityType::Update.is_reserved());
        assert!(!ActivityType::Comment.is_reserved());
        assert!(ActivityType::Resolution.is_extended());
        assert!(!ActivityType::Update.is_extended());
    }
}
