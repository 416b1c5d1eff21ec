use crate::cli::IssueCommands;
use crate::context::CommandContext;
use crate::display;
use crate::error::CliResult;
use colored::*;
use issuedesk::{CreateIssueRequest, IssueFilter, IssuePatch, UpdateOutcome};
use serde_json::Value;

pub async fn handle_issue_command(command: IssueCommands, context: &CommandContext) -> CliResult<()> {
    match command {
        IssueCommands::Create {
            project,
            issue_type,
            priority,
            story_points,
            summary,
            description,
            assigned_to,
            affected_version,
            status,
            payload,
        } => {
            let mut request = match payload {
                Some(json) => CreateIssueRequest::from_json(&json)
                    .map_err(issuedesk::IssueDeskError::from)?,
                None => CreateIssueRequest::default(),
            };
            overlay(&mut request.project, project);
            overlay(&mut request.issue_type, issue_type);
            overlay(&mut request.priority, priority);
            overlay(&mut request.story_points, story_points);
            overlay(&mut request.summary, summary);
            overlay(&mut request.description, description);
            overlay(&mut request.assigned_to, assigned_to);
            overlay(&mut request.affected_version, affected_version);
            overlay(&mut request.status, status);
            create_issue(context, request).await
        }
        IssueCommands::Show { name } => show_issue(context, &name).await,
        IssueCommands::List {
            project,
            issue_type,
            status,
            resolution,
            assigned_to,
            created_by,
        } => {
            let params = [
                ("project", project),
                ("issue_type", issue_type),
                ("status", status),
                ("resolution", resolution),
                ("assigned_to", assigned_to),
                ("created_by", created_by),
            ];
            let filter = IssueFilter::from_params(
                params
                    .iter()
                    .filter_map(|(key, value)| value.as_deref().map(|value| (*key, value))),
            )
            .map_err(issuedesk::IssueDeskError::from)?;
            list_issues(context, &filter).await
        }
        IssueCommands::Update {
            name,
            assignments,
            payload,
        } => {
            let patch = build_patch(payload.as_deref(), assignments)?;
            update_issue(context, &name, &patch).await
        }
        IssueCommands::Delete { name } => delete_issue(context, &name).await,
        IssueCommands::History { name } => show_history(context, &name).await,
    }
}

fn overlay<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

/// Merge `--payload` and `--set` into one patch; `--set` wins on shared keys
fn build_patch(payload: Option<&str>, assignments: Vec<(String, String)>) -> CliResult<IssuePatch> {
    let mut patch = match payload {
        Some(json) => IssuePatch::from_json(json).map_err(issuedesk::IssueDeskError::from)?,
        None => IssuePatch::new(),
    };
    for (field, value) in assignments {
        let value = if value == "null" {
            Value::Null
        } else {
            Value::String(value)
        };
        patch.set(field, value);
    }
    if patch.is_empty() {
        return Err(crate::error::CliError::usage(
            "Nothing to update: pass --set FIELD=VALUE or --payload",
        ));
    }
    Ok(patch)
}

async fn create_issue(context: &CommandContext, request: CreateIssueRequest) -> CliResult<()> {
    let actor = context.actor()?;
    let tracker = context.tracker().await?;
    let issue = tracker.create_issue(&actor, request).await?;

    let message = format!("Created {}", issue.name);
    context.emit(issue, message.clone(), |issue| {
        format!("{} {} - {}", "✓".green(), message.bold(), issue.summary)
    });
    Ok(())
}

async fn show_issue(context: &CommandContext, name: &str) -> CliResult<()> {
    let tracker = context.tracker().await?;
    let issue = tracker.get_issue(name).await?;
    let message = format!("Found {}", issue.name);
    context.emit(issue, message, display::issue_details);
    Ok(())
}

async fn list_issues(context: &CommandContext, filter: &IssueFilter) -> CliResult<()> {
    let tracker = context.tracker().await?;
    let issues = tracker.list_issues(filter).await?;
    let message = format!("{} issues", issues.len());
    context.emit(issues, message, |issues| display::issues_table(issues));
    Ok(())
}

async fn update_issue(context: &CommandContext, name: &str, patch: &IssuePatch) -> CliResult<()> {
    let actor = context.actor()?;
    let tracker = context.tracker().await?;
    let outcome = tracker.update_issue(name, &actor, patch).await?;

    let message = outcome.message();
    let diff = match &outcome {
        UpdateOutcome::Updated { activity, .. } => activity.text.clone(),
        UpdateOutcome::Unchanged { .. } => None,
    };
    let issue = match outcome {
        UpdateOutcome::Updated { issue, .. } | UpdateOutcome::Unchanged { issue } => issue,
    };
    context.emit(issue, message.clone(), |_| match &diff {
        Some(diff) => format!("{} {}\n\n{}", "✓".green(), message.bold(), diff),
        None => format!("{} {}", "•".yellow(), message),
    });
    Ok(())
}

async fn delete_issue(context: &CommandContext, name: &str) -> CliResult<()> {
    let tracker = context.tracker().await?;
    let issue = tracker.delete_issue(name).await?;
    let message = format!("Deleted {}", issue.name);
    context.emit(issue, message.clone(), |_| {
        format!("{} {}", "✓".green(), message)
    });
    Ok(())
}

async fn show_history(context: &CommandContext, name: &str) -> CliResult<()> {
    let tracker = context.tracker().await?;
    let history = tracker.issue_history(name).await?;
    let message = format!("{} entries for {}", history.len(), name);
    context.emit(history, message, |entries| display::activity_log(entries));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_overrides_payload_and_null_clears() {
        let patch = build_patch(
            Some(r#"{"priority": 2, "summary": "From payload"}"#),
            vec![
                ("priority".to_string(), "4".to_string()),
                ("assigned_to".to_string(), "null".to_string()),
            ],
        )
        .unwrap();

        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json["priority"], "4");
        assert_eq!(json["summary"], "From payload");
        assert_eq!(json["assigned_to"], Value::Null);
    }

    #[test]
    fn test_empty_patch_is_rejected() {
        let error = build_patch(None, Vec::new()).unwrap_err();
        assert_eq!(error.exit_code, crate::exit_codes::EXIT_VALIDATION);
    }

    #[test]
    fn test_overlay_keeps_existing_value_when_flag_absent() {
        let mut target = Some("DWB".to_string());
        overlay(&mut target, None);
        assert_eq!(target.as_deref(), Some("DWB"));
        overlay(&mut target, Some("OPS".to_string()));
        assert_eq!(target.as_deref(), Some("OPS"));
    }
}
