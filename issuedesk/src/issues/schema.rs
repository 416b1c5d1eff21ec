use super::naming::validate_project_key;
use super::IssueId;
use crate::common::validation::{
    check_non_empty, check_range, Constraint, FieldViolation, ValidationErrors, ViolationCollector,
};
use crate::enums::{ActivityType, IssueResolution, IssueStatus, IssueType, Registry};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Lowest accepted priority
pub const MIN_PRIORITY: i64 = 1;
/// Highest accepted priority
pub const MAX_PRIORITY: i64 = 5;
/// Lowest accepted story point estimate
pub const MIN_STORY_POINTS: i64 = 1;
/// Highest accepted story point estimate
pub const MAX_STORY_POINTS: i64 = u32::MAX as i64;

/// The fields an update may change, in the order diffs are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EditableField {
    /// `affected_version`
    AffectedVersion,
    /// `assigned_to`
    AssignedTo,
    /// `description`
    Description,
    /// `fixed_version`
    FixedVersion,
    /// `priority`
    Priority,
    /// `resolution`
    Resolution,
    /// `status`
    Status,
    /// `story_points`
    StoryPoints,
    /// `summary`
    Summary,
    /// `type`
    Type,
}

impl EditableField {
    /// The allow-list in rendering order
    pub const ALL: [EditableField; 10] = [
        EditableField::AffectedVersion,
        EditableField::AssignedTo,
        EditableField::Description,
        EditableField::FixedVersion,
        EditableField::Priority,
        EditableField::Resolution,
        EditableField::Status,
        EditableField::StoryPoints,
        EditableField::Summary,
        EditableField::Type,
    ];

    /// Short field name used in diffs
    pub fn name(&self) -> &'static str {
        match self {
            EditableField::AffectedVersion => "affected_version",
            EditableField::AssignedTo => "assigned_to",
            EditableField::Description => "description",
            EditableField::FixedVersion => "fixed_version",
            EditableField::Priority => "priority",
            EditableField::Resolution => "resolution",
            EditableField::Status => "status",
            EditableField::StoryPoints => "story_points",
            EditableField::Summary => "summary",
            EditableField::Type => "type",
        }
    }

    /// Resolve a payload key; both `priority` and `issue_priority` name the same field
    pub fn from_key(key: &str) -> Option<Self> {
        let short = key.strip_prefix("issue_").unwrap_or(key);
        Self::ALL.iter().copied().find(|field| field.name() == short)
    }

    /// Whether the field may be cleared with `null`
    pub fn is_nullable(&self) -> bool {
        matches!(
            self,
            EditableField::AffectedVersion
                | EditableField::AssignedTo
                | EditableField::Description
                | EditableField::FixedVersion
        )
    }
}

impl fmt::Display for EditableField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Blank optional strings are stored as absent
fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// Callers range-check first, so the saturating fallbacks are unreachable
fn narrow_priority(value: i64) -> u8 {
    u8::try_from(value).unwrap_or(u8::MAX)
}

fn narrow_story_points(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Payload for creating an issue
///
/// Keys follow the persisted names (`issue_project`, `issue_type`, ...); the
/// short forms are accepted as aliases. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateIssueRequest {
    /// Project key
    #[serde(rename = "issue_project", alias = "project", default)]
    pub project: Option<String>,
    /// Issue type name
    #[serde(alias = "type", default)]
    pub issue_type: Option<String>,
    /// Priority, 1..5
    #[serde(rename = "issue_priority", alias = "priority", default)]
    pub priority: Option<i64>,
    /// Story points, at least 1
    #[serde(rename = "issue_story_points", alias = "story_points", default)]
    pub story_points: Option<i64>,
    /// Summary
    #[serde(rename = "issue_summary", alias = "summary", default)]
    pub summary: Option<String>,
    /// Description
    #[serde(rename = "issue_description", alias = "description", default)]
    pub description: Option<String>,
    /// Initial status; OPEN when absent
    #[serde(rename = "issue_status", alias = "status", default)]
    pub status: Option<String>,
    /// Initial resolution; UNRESOLVED when absent
    #[serde(rename = "issue_resolution", alias = "resolution", default)]
    pub resolution: Option<String>,
    /// Affected version
    #[serde(rename = "issue_affected_version", alias = "affected_version", default)]
    pub affected_version: Option<String>,
    /// Fixed version
    #[serde(rename = "issue_fixed_version", alias = "fixed_version", default)]
    pub fixed_version: Option<String>,
    /// Assignee
    #[serde(rename = "issue_assigned_to", alias = "assigned_to", default)]
    pub assigned_to: Option<String>,
}

impl CreateIssueRequest {
    /// A request carrying the required fields
    pub fn new(
        project: impl Into<String>,
        issue_type: impl Into<String>,
        priority: i64,
        story_points: i64,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            project: Some(project.into()),
            issue_type: Some(issue_type.into()),
            priority: Some(priority),
            story_points: Some(story_points),
            summary: Some(summary.into()),
            ..Self::default()
        }
    }

    /// Parse a JSON payload; shape errors become a single `payload` violation
    pub fn from_json(json: &str) -> Result<Self, ValidationErrors> {
        serde_json::from_str(json).map_err(|e| {
            ValidationErrors::single(FieldViolation::malformed("payload", json, e.to_string()))
        })
    }

    /// Parse an already-decoded JSON value
    pub fn from_value(value: Value) -> Result<Self, ValidationErrors> {
        let rendered = value.to_string();
        serde_json::from_value(value).map_err(|e| {
            ValidationErrors::single(FieldViolation::malformed("payload", rendered, e.to_string()))
        })
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the assignee
    pub fn with_assigned_to(mut self, assigned_to: impl Into<String>) -> Self {
        self.assigned_to = Some(assigned_to.into());
        self
    }

    /// Set the affected version
    pub fn with_affected_version(mut self, version: impl Into<String>) -> Self {
        self.affected_version = Some(version.into());
        self
    }

    /// Set the initial status
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Check every field, reporting all violations together
    pub fn validate(&self, registry: &Registry) -> Result<ValidatedIssue, ValidationErrors> {
        let mut collector = ViolationCollector::new();

        let project = required(&mut collector, "issue_project", self.project.as_deref())
            .map(str::trim)
            .and_then(|project| {
                collector
                    .check(validate_project_key("issue_project", project))
                    .map(|_| project.to_string())
            })
            .unwrap_or_default();

        let issue_type = required(&mut collector, "issue_type", self.issue_type.as_deref())
            .and_then(|value| collector.check(registry.issue_type("issue_type", value)))
            .unwrap_or(IssueType::Unknown);

        let priority = required(&mut collector, "issue_priority", self.priority)
            .and_then(|value| {
                collector.check(check_range(
                    "issue_priority",
                    value,
                    MIN_PRIORITY,
                    Some(MAX_PRIORITY),
                ))
            })
            .map(narrow_priority)
            .unwrap_or_default();

        let story_points = required(&mut collector, "issue_story_points", self.story_points)
            .and_then(|value| {
                collector.check(check_range(
                    "issue_story_points",
                    value,
                    MIN_STORY_POINTS,
                    Some(MAX_STORY_POINTS),
                ))
            })
            .map(narrow_story_points)
            .unwrap_or_default();

        let summary = required(&mut collector, "issue_summary", self.summary.as_deref())
            .and_then(|value| collector.check(check_non_empty("issue_summary", value)))
            .unwrap_or_default();

        let status = match self.status.as_deref() {
            Some(value) => collector
                .check(registry.status("issue_status", value))
                .unwrap_or(IssueStatus::DEFAULT),
            None => IssueStatus::DEFAULT,
        };

        let resolution = match self.resolution.as_deref() {
            Some(value) => collector
                .check(registry.resolution("issue_resolution", value))
                .unwrap_or(IssueResolution::DEFAULT),
            None => IssueResolution::DEFAULT,
        };

        collector.finish(|| ValidatedIssue {
            project,
            issue_type,
            priority,
            story_points,
            summary,
            description: normalize_optional(self.description.as_deref()),
            status,
            resolution,
            affected_version: normalize_optional(self.affected_version.as_deref()),
            fixed_version: normalize_optional(self.fixed_version.as_deref()),
            assigned_to: normalize_optional(self.assigned_to.as_deref()),
        })
    }
}

/// Record a `Required` violation when `value` is absent
fn required<T>(collector: &mut ViolationCollector, field: &str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        collector.push(FieldViolation::required(field));
    }
    value
}

/// A create payload that passed validation, with defaults applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedIssue {
    /// Project key
    pub project: String,
    /// Classification
    pub issue_type: IssueType,
    /// Priority, 1..5
    pub priority: u8,
    /// Story points
    pub story_points: u32,
    /// Summary
    pub summary: String,
    /// Description
    pub description: Option<String>,
    /// Status
    pub status: IssueStatus,
    /// Resolution
    pub resolution: IssueResolution,
    /// Affected version
    pub affected_version: Option<String>,
    /// Fixed version
    pub fixed_version: Option<String>,
    /// Assignee
    pub assigned_to: Option<String>,
}

/// Validated changes for an update; `None` means the field is untouched
///
/// Nullable fields use `Some(None)` to clear the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueChanges {
    /// Affected version
    pub affected_version: Option<Option<String>>,
    /// Assignee
    pub assigned_to: Option<Option<String>>,
    /// Description
    pub description: Option<Option<String>>,
    /// Fixed version
    pub fixed_version: Option<Option<String>>,
    /// Priority
    pub priority: Option<u8>,
    /// Resolution
    pub resolution: Option<IssueResolution>,
    /// Status
    pub status: Option<IssueStatus>,
    /// Story points
    pub story_points: Option<u32>,
    /// Summary
    pub summary: Option<String>,
    /// Issue type
    pub issue_type: Option<IssueType>,
}

impl IssueChanges {
    /// The incoming value for `field` rendered as text
    ///
    /// Returns `None` when the field is not part of the changes and
    /// `Some(None)` when the field is being cleared.
    pub fn value(&self, field: EditableField) -> Option<Option<String>> {
        match field {
            EditableField::AffectedVersion => self.affected_version.clone(),
            EditableField::AssignedTo => self.assigned_to.clone(),
            EditableField::Description => self.description.clone(),
            EditableField::FixedVersion => self.fixed_version.clone(),
            EditableField::Priority => self.priority.map(|v| Some(v.to_string())),
            EditableField::Resolution => self.resolution.map(|v| Some(v.to_string())),
            EditableField::Status => self.status.map(|v| Some(v.to_string())),
            EditableField::StoryPoints => self.story_points.map(|v| Some(v.to_string())),
            EditableField::Summary => self.summary.clone().map(Some),
            EditableField::Type => self.issue_type.map(|v| Some(v.to_string())),
        }
    }

    /// Fields present in the changes, in allow-list order
    pub fn fields(&self) -> Vec<EditableField> {
        EditableField::ALL
            .iter()
            .copied()
            .filter(|field| self.value(*field).is_some())
            .collect()
    }

    /// Whether no field is touched
    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Drop every field not listed in `keep`
    pub fn retain(&mut self, keep: &[EditableField]) {
        for field in EditableField::ALL {
            if keep.contains(&field) {
                continue;
            }
            match field {
                EditableField::AffectedVersion => self.affected_version = None,
                EditableField::AssignedTo => self.assigned_to = None,
                EditableField::Description => self.description = None,
                EditableField::FixedVersion => self.fixed_version = None,
                EditableField::Priority => self.priority = None,
                EditableField::Resolution => self.resolution = None,
                EditableField::Status => self.status = None,
                EditableField::StoryPoints => self.story_points = None,
                EditableField::Summary => self.summary = None,
                EditableField::Type => self.issue_type = None,
            }
        }
    }
}

/// A partial update payload
///
/// Holds the raw JSON object so that absent keys, `null` and values of the
/// wrong shape can be told apart during validation. Keys outside the editable
/// allow-list are dropped with a warning rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssuePatch {
    values: Map<String, Value>,
}

impl IssuePatch {
    /// An empty patch
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object
    pub fn from_json(json: &str) -> Result<Self, ValidationErrors> {
        let value: Value = serde_json::from_str(json).map_err(|e| {
            ValidationErrors::single(FieldViolation::malformed("payload", json, e.to_string()))
        })?;
        Self::from_value(value)
    }

    /// Wrap a decoded JSON value, which must be an object
    pub fn from_value(value: Value) -> Result<Self, ValidationErrors> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            other => Err(ValidationErrors::single(FieldViolation::malformed(
                "payload",
                other.to_string(),
                "expected a JSON object",
            ))),
        }
    }

    /// Builder form of [`set`](Self::set)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a raw key
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Raw keys in the payload
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Whether the payload has no keys at all
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Validate the editable keys into typed changes
    pub fn validate(&self, registry: &Registry) -> Result<IssueChanges, ValidationErrors> {
        let mut collector = ViolationCollector::new();
        let mut changes = IssueChanges::default();
        let mut seen: BTreeMap<EditableField, &str> = BTreeMap::new();

        for (key, value) in &self.values {
            let field = match EditableField::from_key(key) {
                Some(field) => field,
                None => {
                    warn!("Ignoring non-editable field '{}' in update payload", key);
                    continue;
                }
            };
            if let Some(first) = seen.insert(field, key) {
                collector.push(FieldViolation::new(
                    key.clone(),
                    Some(value.to_string()),
                    Constraint::Duplicate(first.to_string()),
                ));
                continue;
            }

            match field {
                EditableField::AffectedVersion => {
                    changes.affected_version = collector.check(nullable_text(key, value));
                }
                EditableField::AssignedTo => {
                    changes.assigned_to = collector.check(nullable_text(key, value));
                }
                EditableField::Description => {
                    changes.description = collector.check(nullable_text(key, value));
                }
                EditableField::FixedVersion => {
                    changes.fixed_version = collector.check(nullable_text(key, value));
                }
                EditableField::Priority => {
                    changes.priority = collector
                        .check(
                            integer(key, value)
                                .and_then(|v| check_range(key, v, MIN_PRIORITY, Some(MAX_PRIORITY))),
                        )
                        .map(narrow_priority);
                }
                EditableField::StoryPoints => {
                    changes.story_points = collector
                        .check(
                            integer(key, value).and_then(|v| {
                                check_range(key, v, MIN_STORY_POINTS, Some(MAX_STORY_POINTS))
                            }),
                        )
                        .map(narrow_story_points);
                }
                EditableField::Summary => {
                    changes.summary = collector
                        .check(text(key, value).and_then(|v| check_non_empty(key, &v)));
                }
                EditableField::Resolution => {
                    changes.resolution = collector
                        .check(text(key, value).and_then(|v| registry.resolution(key, &v)));
                }
                EditableField::Status => {
                    changes.status = collector
                        .check(text(key, value).and_then(|v| registry.status(key, &v)));
                }
                EditableField::Type => {
                    changes.issue_type = collector
                        .check(text(key, value).and_then(|v| registry.issue_type(key, &v)));
                }
            }
        }

        collector.finish(|| changes)
    }
}

/// A required string value
fn text(key: &str, value: &Value) -> Result<String, FieldViolation> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Err(FieldViolation::required(key)),
        other => Err(FieldViolation::malformed(
            key,
            other.to_string(),
            "expected a string",
        )),
    }
}

/// An optional string value; `null` or a blank string clears the field
fn nullable_text(key: &str, value: &Value) -> Result<Option<String>, FieldViolation> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(normalize_optional(Some(s))),
        other => Err(FieldViolation::malformed(
            key,
            other.to_string(),
            "expected a string or null",
        )),
    }
}

/// A required integer; numeric strings are accepted for form and CLI input
fn integer(key: &str, value: &Value) -> Result<i64, FieldViolation> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| FieldViolation::malformed(key, n.to_string(), "expected an integer")),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| FieldViolation::malformed(key, s.clone(), "expected an integer")),
        Value::Null => Err(FieldViolation::required(key)),
        other => Err(FieldViolation::malformed(
            key,
            other.to_string(),
            "expected an integer",
        )),
    }
}

/// Payload for adding an activity entry directly
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddActivityRequest {
    /// The issue the entry belongs to
    #[serde(default)]
    pub issue_id: Option<i64>,
    /// Kind of entry
    #[serde(default)]
    pub activity_type: Option<String>,
    /// Comment text
    #[serde(rename = "activity_text", alias = "text", default)]
    pub text: Option<String>,
}

impl AddActivityRequest {
    /// A comment on an issue
    pub fn comment(issue_id: IssueId, text: impl Into<String>) -> Self {
        Self {
            issue_id: Some(issue_id.value()),
            activity_type: Some(ActivityType::Comment.to_string()),
            text: Some(text.into()),
        }
    }

    /// Parse a JSON payload
    pub fn from_json(json: &str) -> Result<Self, ValidationErrors> {
        serde_json::from_str(json).map_err(|e| {
            ValidationErrors::single(FieldViolation::malformed("payload", json, e.to_string()))
        })
    }

    /// Check the payload; `UPDATE` entries are written only by the update engine
    pub fn validate(&self, registry: &Registry) -> Result<ValidatedActivity, ValidationErrors> {
        let mut collector = ViolationCollector::new();

        let issue_id = required(&mut collector, "issue_id", self.issue_id)
            .map(IssueId::new)
            .unwrap_or(IssueId::new(0));

        let activity_type =
            required(&mut collector, "activity_type", self.activity_type.as_deref())
                .and_then(|value| collector.check(registry.activity_type("activity_type", value)))
                .unwrap_or(ActivityType::Unknown);

        if activity_type.is_reserved() {
            collector.push(FieldViolation::new(
                "activity_type",
                Some(activity_type.to_string()),
                Constraint::Reserved,
            ));
        }

        collector.finish(|| ValidatedActivity {
            issue_id,
            activity_type,
            text: normalize_optional(self.text.as_deref()),
        })
    }
}

/// An activity payload that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedActivity {
    /// Parent issue id, not yet checked for existence
    pub issue_id: IssueId,
    /// Kind of entry
    pub activity_type: ActivityType,
    /// Entry text
    pub text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> Registry {
        Registry::default()
    }

    #[test]
    fn test_editable_field_keys() {
        assert_eq!(EditableField::from_key("priority"), Some(EditableField::Priority));
        assert_eq!(
            EditableField::from_key("issue_priority"),
            Some(EditableField::Priority)
        );
        assert_eq!(EditableField::from_key("issue_type"), Some(EditableField::Type));
        assert_eq!(EditableField::from_key("issue_project"), None);
        assert_eq!(EditableField::from_key("issue_name"), None);
        assert_eq!(EditableField::from_key("created_by"), None);
        assert_eq!(EditableField::from_key("created_at"), None);
    }

    #[test]
    fn test_allow_list_order_is_alphabetical_by_name() {
        let names: Vec<&str> = EditableField::ALL.iter().map(|f| f.name()).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_create_applies_defaults() {
        let request = CreateIssueRequest::new("DWB", "bug", 2, 3, "Login fails");
        let issue = request.validate(&registry()).unwrap();
        assert_eq!(issue.issue_type, IssueType::Bug);
        assert_eq!(issue.status, IssueStatus::Open);
        assert_eq!(issue.resolution, IssueResolution::Unresolved);
        assert_eq!(issue.description, None);
    }

    #[test]
    fn test_create_reports_every_violation() {
        let request = CreateIssueRequest {
            project: Some("DW B".to_string()),
            issue_type: Some("STORY".to_string()),
            priority: Some(6),
            story_points: Some(0),
            summary: Some("  ".to_string()),
            ..CreateIssueRequest::default()
        };
        let errors = request.validate(&registry()).unwrap_err();
        assert_eq!(errors.len(), 5);
        for field in [
            "issue_project",
            "issue_type",
            "issue_priority",
            "issue_story_points",
            "issue_summary",
        ] {
            assert!(errors.contains_field(field), "missing violation for {}", field);
        }

        let priority = errors.field("issue_priority").unwrap();
        assert_eq!(
            priority.constraint,
            Constraint::Range {
                min: 1,
                max: Some(5)
            }
        );
        assert!(priority.to_string().contains("1..5"));
    }

    #[test]
    fn test_story_points_above_u32_are_rejected() {
        let request = CreateIssueRequest::new("DWB", "BUG", 2, 5_000_000_000, "Huge");
        let errors = request.validate(&registry()).unwrap_err();
        let violation = errors.field("issue_story_points").unwrap();
        assert_eq!(
            violation.constraint,
            Constraint::Range {
                min: MIN_STORY_POINTS,
                max: Some(MAX_STORY_POINTS)
            }
        );

        let largest = CreateIssueRequest::new("DWB", "BUG", 2, MAX_STORY_POINTS, "Largest");
        assert_eq!(largest.validate(&registry()).unwrap().story_points, u32::MAX);
    }

    #[test]
    fn test_create_missing_fields_are_required() {
        let errors = CreateIssueRequest::default()
            .validate(&registry())
            .unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors
            .violations()
            .iter()
            .all(|v| v.constraint == Constraint::Required));
    }

    #[test]
    fn test_create_from_json_accepts_persisted_and_short_keys() {
        let request = CreateIssueRequest::from_json(
            r#"{"issue_project":"DWB","issue_type":"TASK","priority":1,
                "issue_story_points":5,"summary":"Write docs","id":12}"#,
        )
        .unwrap();
        assert_eq!(request.project.as_deref(), Some("DWB"));
        assert_eq!(request.priority, Some(1));
        assert_eq!(request.summary.as_deref(), Some("Write docs"));
    }

    #[test]
    fn test_create_from_json_shape_error() {
        let errors = CreateIssueRequest::from_json(r#"{"issue_priority":"high"}"#).unwrap_err();
        assert!(errors.contains_field("payload"));
    }

    #[test]
    fn test_patch_ignores_non_editable_keys() {
        let patch = IssuePatch::new()
            .with("issue_project", "OPS")
            .with("issue_name", "OPS-0001")
            .with("priority", 4);
        let changes = patch.validate(&registry()).unwrap();
        assert_eq!(changes.fields(), vec![EditableField::Priority]);
        assert_eq!(changes.priority, Some(4));
    }

    #[test]
    fn test_patch_story_points_above_u32_are_rejected() {
        let errors = IssuePatch::new()
            .with("story_points", 5_000_000_000_i64)
            .validate(&registry())
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors.first().unwrap().constraint,
            Constraint::Range { max: Some(MAX_STORY_POINTS), .. }
        ));
    }

    #[test]
    fn test_patch_rejects_field_given_twice() {
        let patch = IssuePatch::from_value(json!({
            "priority": 2,
            "issue_priority": 4,
        }))
        .unwrap();
        let errors = patch.validate(&registry()).unwrap_err();
        assert_eq!(errors.len(), 1);
        let violation = errors.first().unwrap();
        let other = if violation.field == "priority" { "issue_priority" } else { "priority" };
        assert_eq!(violation.constraint, Constraint::Duplicate(other.to_string()));
    }

    #[test]
    fn test_patch_null_clears_nullable_and_rejects_required() {
        let patch = IssuePatch::from_value(json!({
            "assigned_to": null,
            "summary": null,
        }))
        .unwrap();
        let errors = patch.validate(&registry()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first().unwrap().constraint, Constraint::Required);

        let patch = IssuePatch::new().with("assigned_to", Value::Null);
        let changes = patch.validate(&registry()).unwrap();
        assert_eq!(changes.assigned_to, Some(None));
        assert_eq!(changes.value(EditableField::AssignedTo), Some(None));
    }

    #[test]
    fn test_patch_numeric_strings_and_enum_case() {
        let patch = IssuePatch::new()
            .with("story_points", "8")
            .with("status", "in_progress")
            .with("type", "feature");
        let changes = patch.validate(&registry()).unwrap();
        assert_eq!(changes.story_points, Some(8));
        assert_eq!(changes.status, Some(IssueStatus::InProgress));
        assert_eq!(changes.issue_type, Some(IssueType::Feature));
    }

    #[test]
    fn test_patch_rejects_bad_values() {
        let patch = IssuePatch::from_value(json!({
            "priority": 0,
            "resolution": "FIXED",
            "description": 42,
        }))
        .unwrap();
        let errors = patch.validate(&registry()).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains_field("priority"));
        assert!(errors.contains_field("resolution"));
        assert!(errors.contains_field("description"));
    }

    #[test]
    fn test_patch_must_be_object() {
        assert!(IssuePatch::from_json("[1, 2]").is_err());
        assert!(IssuePatch::from_json("not json").is_err());
    }

    #[test]
    fn test_changes_retain() {
        let mut changes = IssueChanges {
            priority: Some(4),
            status: Some(IssueStatus::Done),
            summary: Some("Same".to_string()),
            ..IssueChanges::default()
        };
        changes.retain(&[EditableField::Priority]);
        assert_eq!(changes.fields(), vec![EditableField::Priority]);
        changes.retain(&[]);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_activity_update_is_reserved() {
        let request = AddActivityRequest {
            issue_id: Some(1),
            activity_type: Some("UPDATE".to_string()),
            text: None,
        };
        let errors = request.validate(&registry()).unwrap_err();
        assert_eq!(errors.first().unwrap().constraint, Constraint::Reserved);
    }

    #[test]
    fn test_activity_comment_validates() {
        let request = AddActivityRequest::comment(IssueId::new(3), "  Seen on staging  ");
        let activity = request.validate(&registry()).unwrap();
        assert_eq!(activity.issue_id, IssueId::new(3));
        assert_eq!(activity.activity_type, ActivityType::Comment);
        assert_eq!(activity.text.as_deref(), Some("Seen on staging"));
    }

    #[test]
    fn test_activity_missing_fields() {
        let errors = AddActivityRequest::default()
            .validate(&registry())
            .unwrap_err();
        assert!(errors.contains_field("issue_id"));
        assert!(errors.contains_field("activity_type"));
    }
}
