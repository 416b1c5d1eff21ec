//! Issue and activity records
//!
//! The structs here are the persisted shape other layers depend on; their
//! serde names match the stored JSON keys (`issue_project`, `activity_type`,
//! ...). Requests and validation live in [`schema`], name allocation in
//! [`naming`].

/// Issue name formatting and sequential allocation
pub mod naming;
/// Request payloads and their validators
pub mod schema;

use crate::common::validation::{Constraint, FieldViolation};
use crate::enums::{ActivityType, IssueResolution, IssueStatus, IssueType};
use crate::error::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use naming::{IssueName, NameAllocator};
pub use schema::{
    AddActivityRequest, CreateIssueRequest, EditableField, IssueChanges, IssuePatch,
    ValidatedActivity, ValidatedIssue,
};

/// Epoch-millisecond timestamp
pub type Timestamp = i64;

/// Current time as epoch milliseconds
pub fn now_millis() -> Timestamp {
    Utc::now().timestamp_millis()
}

/// Store-assigned identity of an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueId(i64);

impl IssueId {
    /// Wrap a raw id
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw value
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for IssueId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Store-assigned identity of an activity entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(i64);

impl ActivityId {
    /// Wrap a raw id
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw value
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An already-verified identity acting on the tracker
///
/// Authentication happens elsewhere; this only guarantees the identity is
/// non-blank so attribution fields are never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Actor(String);

impl Actor {
    /// Wrap an identity string
    pub fn new(identity: impl Into<String>) -> Result<Self> {
        let identity = identity.into();
        let trimmed = identity.trim();
        if trimmed.is_empty() {
            return Err(
                FieldViolation::new("created_by", Some(identity.clone()), Constraint::NonEmpty)
                    .into(),
            );
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The identity string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tracked unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Store-assigned identity
    pub id: IssueId,
    /// Project key the issue belongs to
    #[serde(rename = "issue_project")]
    pub project: String,
    /// Unique `{project}-{sequence}` name
    #[serde(rename = "issue_name")]
    pub name: IssueName,
    /// Classification
    pub issue_type: IssueType,
    /// Priority, 1 (highest) to 5
    #[serde(rename = "issue_priority")]
    pub priority: u8,
    /// Estimate, at least 1
    #[serde(rename = "issue_story_points")]
    pub story_points: u32,
    /// One-line summary
    #[serde(rename = "issue_summary")]
    pub summary: String,
    /// Longer description
    #[serde(rename = "issue_description")]
    pub description: Option<String>,
    /// Workflow status
    #[serde(rename = "issue_status")]
    pub status: IssueStatus,
    /// Resolution
    #[serde(rename = "issue_resolution")]
    pub resolution: IssueResolution,
    /// Version the problem was seen in
    #[serde(rename = "issue_affected_version")]
    pub affected_version: Option<String>,
    /// Version the fix shipped in
    #[serde(rename = "issue_fixed_version")]
    pub fixed_version: Option<String>,
    /// Assignee
    #[serde(rename = "issue_assigned_to")]
    pub assigned_to: Option<String>,
    /// Identity that filed the issue
    pub created_by: String,
    /// Creation time
    pub created_at: Timestamp,
    /// Time of the last update, if any
    pub updated_at: Option<Timestamp>,
}

impl Issue {
    /// Current value of an editable field rendered as text (`None` when unset)
    pub fn field_value(&self, field: EditableField) -> Option<String> {
        match field {
            EditableField::AffectedVersion => self.affected_version.clone(),
            EditableField::AssignedTo => self.assigned_to.clone(),
            EditableField::Description => self.description.clone(),
            EditableField::FixedVersion => self.fixed_version.clone(),
            EditableField::Priority => Some(self.priority.to_string()),
            EditableField::Resolution => Some(self.resolution.to_string()),
            EditableField::Status => Some(self.status.to_string()),
            EditableField::StoryPoints => Some(self.story_points.to_string()),
            EditableField::Summary => Some(self.summary.clone()),
            EditableField::Type => Some(self.issue_type.to_string()),
        }
    }

    /// Apply a set of validated changes, leaving absent fields untouched
    pub fn apply(&mut self, changes: &IssueChanges) {
        if let Some(ref value) = changes.affected_version {
            self.affected_version = value.clone();
        }
        if let Some(ref value) = changes.assigned_to {
            self.assigned_to = value.clone();
        }
        if let Some(ref value) = changes.description {
            self.description = value.clone();
        }
        if let Some(ref value) = changes.fixed_version {
            self.fixed_version = value.clone();
        }
        if let Some(value) = changes.priority {
            self.priority = value;
        }
        if let Some(value) = changes.resolution {
            self.resolution = value;
        }
        if let Some(value) = changes.status {
            self.status = value;
        }
        if let Some(value) = changes.story_points {
            self.story_points = value;
        }
        if let Some(ref value) = changes.summary {
            self.summary = value.clone();
        }
        if let Some(value) = changes.issue_type {
            self.issue_type = value;
        }
    }
}

/// An immutable history entry attached to an issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Store-assigned identity
    pub id: ActivityId,
    /// The issue this entry belongs to
    pub issue_id: IssueId,
    /// Name of the issue when the entry was written
    pub issue_name: IssueName,
    /// Kind of entry
    pub activity_type: ActivityType,
    /// Comment text or rendered change table
    #[serde(rename = "activity_text")]
    pub text: Option<String>,
    /// Identity that wrote the entry
    pub created_by: String,
    /// Creation time
    pub created_at: Timestamp,
}

/// A validated issue ready for insertion; the store assigns id and timestamps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    /// Allocated name
    pub name: IssueName,
    /// Validated fields
    pub fields: ValidatedIssue,
    /// Identity filing the issue
    pub created_by: String,
}

/// An activity entry ready for insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActivity {
    /// Parent issue
    pub issue_id: IssueId,
    /// Parent issue's name at write time
    pub issue_name: IssueName,
    /// Kind of entry
    pub activity_type: ActivityType,
    /// Entry text
    pub text: Option<String>,
    /// Identity writing the entry
    pub created_by: String,
}
