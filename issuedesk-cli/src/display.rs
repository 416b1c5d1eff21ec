use crate::cli::Cli;
use chrono::{DateTime, Local};
use issuedesk::{Activity, Issue};
use tabled::{
    settings::{object::Rows, Alignment, Color, Style},
    Table, Tabled,
};

#[derive(Tabled)]
struct IssueRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    issue_type: String,
    #[tabled(rename = "Pri")]
    priority: u8,
    #[tabled(rename = "Pts")]
    story_points: u32,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Resolution")]
    resolution: String,
    #[tabled(rename = "Assigned")]
    assigned_to: String,
    #[tabled(rename = "Summary")]
    summary: String,
}

#[derive(Tabled)]
struct ActivityRow {
    #[tabled(rename = "Id")]
    id: i64,
    #[tabled(rename = "Issue")]
    issue: String,
    #[tabled(rename = "Type")]
    activity_type: String,
    #[tabled(rename = "By")]
    created_by: String,
    #[tabled(rename = "When")]
    created_at: String,
    #[tabled(rename = "Text")]
    text: String,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Render rows with the shared table style
pub fn table<R: Tabled>(rows: Vec<R>) -> String {
    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.modify(Rows::new(1..), Alignment::left());
    if Cli::should_use_color() {
        table.modify(Rows::first(), Color::FG_BRIGHT_CYAN);
    }
    table.to_string()
}

/// Local time for a millisecond timestamp
pub fn timestamp(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|utc| {
            utc.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| millis.to_string())
}

fn truncate(text: &str, max: usize) -> String {
    let single_line = text.lines().next().unwrap_or("");
    if single_line.chars().count() > max || text.lines().nth(1).is_some() {
        let head: String = single_line.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        single_line.to_string()
    }
}

pub fn issues_table(issues: &[Issue]) -> String {
    if issues.is_empty() {
        return "No issues found.".to_string();
    }
    let rows = issues
        .iter()
        .map(|issue| IssueRow {
            name: issue.name.to_string(),
            issue_type: issue.issue_type.to_string(),
            priority: issue.priority,
            story_points: issue.story_points,
            status: issue.status.to_string(),
            resolution: issue.resolution.to_string(),
            assigned_to: issue.assigned_to.clone().unwrap_or_default(),
            summary: truncate(&issue.summary, 50),
        })
        .collect();
    format!("{}\nTotal: {} issues", table(rows), issues.len())
}

pub fn issue_details(issue: &Issue) -> String {
    let optional = |value: &Option<String>| value.clone().unwrap_or_default();
    let rows = vec![
        FieldRow { field: "name", value: issue.name.to_string() },
        FieldRow { field: "project", value: issue.project.clone() },
        FieldRow { field: "type", value: issue.issue_type.to_string() },
        FieldRow { field: "priority", value: issue.priority.to_string() },
        FieldRow { field: "story_points", value: issue.story_points.to_string() },
        FieldRow { field: "summary", value: issue.summary.clone() },
        FieldRow { field: "description", value: optional(&issue.description) },
        FieldRow { field: "status", value: issue.status.to_string() },
        FieldRow { field: "resolution", value: issue.resolution.to_string() },
        FieldRow { field: "affected_version", value: optional(&issue.affected_version) },
        FieldRow { field: "fixed_version", value: optional(&issue.fixed_version) },
        FieldRow { field: "assigned_to", value: optional(&issue.assigned_to) },
        FieldRow { field: "created_by", value: issue.created_by.clone() },
        FieldRow { field: "created_at", value: timestamp(issue.created_at) },
        FieldRow {
            field: "updated_at",
            value: issue.updated_at.map(timestamp).unwrap_or_default(),
        },
    ];
    table(rows)
}

pub fn activity_table(entries: &[Activity]) -> String {
    if entries.is_empty() {
        return "No activity found.".to_string();
    }
    let rows = entries
        .iter()
        .map(|entry| ActivityRow {
            id: entry.id.value(),
            issue: entry.issue_name.to_string(),
            activity_type: entry.activity_type.to_string(),
            created_by: entry.created_by.clone(),
            created_at: timestamp(entry.created_at),
            text: truncate(entry.text.as_deref().unwrap_or(""), 60),
        })
        .collect();
    table(rows)
}

/// Full entries, one block each; UPDATE entries keep their diff table
pub fn activity_log(entries: &[Activity]) -> String {
    if entries.is_empty() {
        return "No activity found.".to_string();
    }
    entries
        .iter()
        .map(|entry| {
            format!(
                "#{} {} by {} at {}\n{}",
                entry.id.value(),
                entry.activity_type,
                entry.created_by,
                timestamp(entry.created_at),
                entry.text.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn settings_table(entries: Vec<(&'static str, String)>) -> String {
    let rows = entries
        .into_iter()
        .map(|(field, value)| FieldRow { field, value })
        .collect();
    table(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_long_and_multiline_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 10), "abcdefg...");
        assert_eq!(truncate("first\nsecond", 20), "first...");
    }

    #[test]
    fn test_timestamp_falls_back_to_raw_value() {
        assert_eq!(timestamp(i64::MAX), i64::MAX.to_string());
        assert_eq!(timestamp(0).len(), "1970-01-01 00:00:00".len());
    }

    #[test]
    fn test_settings_table_lists_values() {
        let rendered = settings_table(vec![("issue_number_padding", "4".to_string())]);
        assert!(rendered.contains("issue_number_padding"));
        assert!(rendered.contains("Field"));
    }
}
