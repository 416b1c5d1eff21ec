//! Field-level diffs and the activity entries that record them
//!
//! An update is reduced to an [`IssueDiff`]: the editable fields whose
//! incoming value differs from the stored one, in allow-list order. The
//! [`ActivityRecorder`] renders the diff as a markdown table of
//! `field | old | new` rows and appends it as an `UPDATE` entry.

use crate::enums::ActivityType;
use crate::error::Result;
use crate::issues::{
    Activity, Actor, EditableField, Issue, IssueChanges, NewActivity, ValidatedActivity,
};
use crate::store::StoreTransaction;
use tabled::{settings::Style, Table, Tabled};
use tracing::debug;

/// One changed field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    /// The field
    pub field: EditableField,
    /// Stored value before the update (`None` when unset)
    pub old: Option<String>,
    /// Value after the update (`None` when cleared)
    pub new: Option<String>,
}

#[derive(Tabled)]
struct DiffRow {
    field: &'static str,
    old: String,
    new: String,
}

/// The changed fields of an update, in allow-list order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueDiff {
    changes: Vec<FieldChange>,
}

impl IssueDiff {
    /// Compare the incoming changes against the stored issue
    ///
    /// Fields absent from `changes` are not compared. Values are compared in
    /// their rendered form, so `Some(None)` against an unset field is no change.
    pub fn between(issue: &Issue, changes: &IssueChanges) -> Self {
        let changed = EditableField::ALL
            .iter()
            .filter_map(|&field| {
                let new = changes.value(field)?;
                let old = issue.field_value(field);
                (old != new).then_some(FieldChange { field, old, new })
            })
            .collect();
        Self { changes: changed }
    }

    /// Whether nothing changed
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changed fields
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// The changes
    pub fn changes(&self) -> &[FieldChange] {
        &self.changes
    }

    /// The changed fields
    pub fn fields(&self) -> Vec<EditableField> {
        self.changes.iter().map(|c| c.field).collect()
    }

    /// The change recorded for `field`
    pub fn get(&self, field: EditableField) -> Option<&FieldChange> {
        self.changes.iter().find(|c| c.field == field)
    }

    /// Render as a markdown table with `field`, `old` and `new` columns
    pub fn render(&self) -> String {
        let rows = self.changes.iter().map(|change| DiffRow {
            field: change.field.name(),
            old: change.old.clone().unwrap_or_default(),
            new: change.new.clone().unwrap_or_default(),
        });
        let mut table = Table::new(rows);
        table.with(Style::markdown());
        table.to_string()
    }
}

/// Writes activity entries inside the caller's transaction
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityRecorder;

impl ActivityRecorder {
    /// Append the `UPDATE` entry describing `diff`
    pub async fn record_update(
        &self,
        tx: &mut dyn StoreTransaction,
        issue: &Issue,
        diff: &IssueDiff,
        actor: &Actor,
    ) -> Result<Activity> {
        debug!("Recording {} changed fields on {}", diff.len(), issue.name);
        tx.insert_activity(NewActivity {
            issue_id: issue.id,
            issue_name: issue.name.clone(),
            activity_type: ActivityType::Update,
            text: Some(diff.render()),
            created_by: actor.as_str().to_string(),
        })
        .await
    }

    /// Append a directly submitted entry, copying the issue's current name
    pub async fn record_entry(
        &self,
        tx: &mut dyn StoreTransaction,
        issue: &Issue,
        entry: ValidatedActivity,
        actor: &Actor,
    ) -> Result<Activity> {
        tx.insert_activity(NewActivity {
            issue_id: issue.id,
            issue_name: issue.name.clone(),
            activity_type: entry.activity_type,
            text: entry.text,
            created_by: actor.as_str().to_string(),
        })
        .await
    }
}

/// Split a rendered diff table back into `(field, old, new)` rows
///
/// Header and separator lines are skipped and cells are trimmed. Values that
/// span several lines are not reassembled.
pub fn parse_rendered_diff(text: &str) -> Vec<(String, String, String)> {
    text.lines()
        .skip(2)
        .filter_map(|line| {
            let cells: Vec<&str> = line
                .trim()
                .trim_start_matches('|')
                .trim_end_matches('|')
                .split('|')
                .map(str::trim)
                .collect();
            match cells.as_slice() {
                [field, old, new] => Some((field.to_string(), old.to_string(), new.to_string())),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{IssueResolution, IssueStatus, IssueType};
    use crate::issues::{IssueId, IssueName};

    fn issue() -> Issue {
        Issue {
            id: IssueId::new(1),
            project: "DWB".to_string(),
            name: IssueName::format("DWB", 1, 4),
            issue_type: IssueType::Bug,
            priority: 2,
            story_points: 3,
            summary: "Login fails".to_string(),
            description: None,
            status: IssueStatus::Open,
            resolution: IssueResolution::Unresolved,
            affected_version: None,
            fixed_version: None,
            assigned_to: Some("greg@example.com".to_string()),
            created_by: "adam@example.com".to_string(),
            created_at: 0,
            updated_at: None,
        }
    }

    #[test]
    fn test_single_field_change() {
        let changes = IssueChanges {
            priority: Some(4),
            ..IssueChanges::default()
        };
        let diff = IssueDiff::between(&issue(), &changes);
        assert_eq!(diff.len(), 1);
        assert_eq!(
            diff.get(EditableField::Priority),
            Some(&FieldChange {
                field: EditableField::Priority,
                old: Some("2".to_string()),
                new: Some("4".to_string()),
            })
        );
    }

    #[test]
    fn test_identical_values_are_not_changes() {
        let changes = IssueChanges {
            priority: Some(2),
            status: Some(IssueStatus::Open),
            description: Some(None),
            ..IssueChanges::default()
        };
        assert!(IssueDiff::between(&issue(), &changes).is_empty());
    }

    #[test]
    fn test_diff_follows_allow_list_order() {
        let changes = IssueChanges {
            issue_type: Some(IssueType::Task),
            assigned_to: Some(None),
            status: Some(IssueStatus::Assigned),
            ..IssueChanges::default()
        };
        let diff = IssueDiff::between(&issue(), &changes);
        assert_eq!(
            diff.fields(),
            vec![
                EditableField::AssignedTo,
                EditableField::Status,
                EditableField::Type
            ]
        );
    }

    #[test]
    fn test_render_table_rows() {
        let changes = IssueChanges {
            priority: Some(4),
            assigned_to: Some(None),
            ..IssueChanges::default()
        };
        let text = IssueDiff::between(&issue(), &changes).render();
        let header = text.lines().next().unwrap();
        assert!(header.contains("field"));
        assert!(header.contains("old"));
        assert!(header.contains("new"));

        assert_eq!(
            parse_rendered_diff(&text),
            vec![
                (
                    "assigned_to".to_string(),
                    "greg@example.com".to_string(),
                    String::new()
                ),
                ("priority".to_string(), "2".to_string(), "4".to_string()),
            ]
        );
    }
}
