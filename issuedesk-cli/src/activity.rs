use crate::cli::ActivityCommands;
use crate::context::CommandContext;
use crate::display;
use crate::error::CliResult;
use colored::*;
use issuedesk::{
    ActivityFilter, ActivityOrder, ActivityType, AddActivityRequest, ClosedEnum, IssueDeskError,
    IssueId, IssueTracker,
};

pub async fn handle_activity_command(
    command: ActivityCommands,
    context: &CommandContext,
) -> CliResult<()> {
    match command {
        ActivityCommands::Add {
            issue,
            activity_type,
            text,
        } => add_activity(context, &issue, activity_type, text).await,
        ActivityCommands::List {
            issue,
            activity_type,
            created_by,
            newest_first,
        } => {
            let activity_type = activity_type
                .map(|value| ActivityType::parse_field("activity_type", &value))
                .transpose()
                .map_err(IssueDeskError::from)?;
            let filter = ActivityFilter {
                issue_name: issue,
                activity_type,
                created_by,
                order: if newest_first {
                    ActivityOrder::NewestFirst
                } else {
                    ActivityOrder::Chronological
                },
                ..ActivityFilter::default()
            };
            list_activity(context, &filter).await
        }
    }
}

/// An issue given either by numeric id or by name
async fn resolve_issue_id(tracker: &IssueTracker, issue: &str) -> CliResult<IssueId> {
    match issue.trim().parse::<i64>() {
        Ok(id) => Ok(IssueId::new(id)),
        Err(_) => Ok(tracker.get_issue(issue).await?.id),
    }
}

async fn add_activity(
    context: &CommandContext,
    issue: &str,
    activity_type: String,
    text: Option<String>,
) -> CliResult<()> {
    let actor = context.actor()?;
    let tracker = context.tracker().await?;
    let issue_id = resolve_issue_id(&tracker, issue).await?;

    let request = AddActivityRequest {
        issue_id: Some(issue_id.value()),
        activity_type: Some(activity_type),
        text,
    };
    let activity = tracker.add_activity(&actor, request).await?;

    let message = format!(
        "Added {} #{} to {}",
        activity.activity_type,
        activity.id.value(),
        activity.issue_name
    );
    context.emit(activity, message.clone(), |_| {
        format!("{} {}", "✓".green(), message)
    });
    Ok(())
}

async fn list_activity(context: &CommandContext, filter: &ActivityFilter) -> CliResult<()> {
    let tracker = context.tracker().await?;
    let entries = tracker.list_activity(filter).await?;
    let message = format!("{} entries", entries.len());
    context.emit(entries, message, |entries| display::activity_table(entries));
    Ok(())
}
