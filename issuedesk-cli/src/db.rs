use crate::cli::DbCommands;
use crate::context::CommandContext;
use crate::error::{CliError, CliResult};
use anyhow::Context;
use colored::*;
use issuedesk::{
    Actor, AddActivityRequest, CreateIssueRequest, FieldViolation, FileRecordStore, IssueTracker,
    IssueType,
};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

const FAKE_VERBS: [&str; 8] = [
    "Fix", "Refactor", "Document", "Investigate", "Speed up", "Remove", "Add", "Test",
];
const FAKE_SUBJECTS: [&str; 8] = [
    "login form",
    "export job",
    "search index",
    "billing report",
    "session timeout",
    "audit trail",
    "password reset",
    "dashboard chart",
];
const FAKE_ASSIGNEES: [&str; 7] = ["adam", "bill", "cary", "diane", "evan", "fred", "greg"];
const FAKE_TYPES: [IssueType; 5] = [
    IssueType::Bug,
    IssueType::Feature,
    IssueType::Requirement,
    IssueType::Support,
    IssueType::Epic,
];
const FAKE_STORY_POINTS: [i64; 7] = [1, 2, 3, 5, 6, 7, 8];

/// Counts reported by `db seed`
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct SeedSummary {
    pub issues_created: usize,
    pub issues_rejected: usize,
    pub activity_created: usize,
    pub activity_rejected: usize,
}

pub async fn handle_db_command(command: DbCommands, context: &CommandContext) -> CliResult<()> {
    match command {
        DbCommands::Create => create_store(context).await,
        DbCommands::Drop => drop_store(context).await,
        DbCommands::Seed { issues, activity } => {
            seed_store(context, &issues, activity.as_deref()).await
        }
        DbCommands::Fake { count, project } => fake_issues(context, count, &project).await,
    }
}

/// The store file of this invocation; in-memory profiles have none
fn store_path(context: &CommandContext) -> CliResult<&Path> {
    if context.config.environment.is_in_memory() {
        return Err(CliError::usage(format!(
            "The {} profile keeps records in memory and has no store file",
            context.config.environment
        )));
    }
    Ok(&context.config.database_path)
}

async fn create_store(context: &CommandContext) -> CliResult<()> {
    let path = store_path(context)?;
    FileRecordStore::create(path).await?;

    let message = format!("Created record store {}", path.display());
    context.emit(path.display().to_string(), message.clone(), |_| {
        format!("{} {}", "✓".green(), message)
    });
    Ok(())
}

async fn drop_store(context: &CommandContext) -> CliResult<()> {
    let path = store_path(context)?;
    let store = FileRecordStore::open(path).await?;
    let snapshot = store.snapshot().await?;
    store.reset().await?;
    warn!(
        "Removed {} issues and {} activity entries from {}",
        snapshot.issues().len(),
        snapshot.activity().len(),
        path.display()
    );

    let message = format!("Emptied record store {}", path.display());
    context.emit(path.display().to_string(), message.clone(), |_| {
        format!("{} {}", "✓".green(), message)
    });
    Ok(())
}

fn read_records(path: &Path) -> anyhow::Result<Vec<Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON array of objects", path.display()))
}

/// The author of a seeded record: its own `created_by`, else the invocation actor
fn record_actor(record: &Value, fallback: Option<&Actor>) -> CliResult<Actor> {
    match record.get("created_by").and_then(Value::as_str) {
        Some(identity) => Ok(Actor::new(identity)?),
        None => fallback.cloned().ok_or_else(|| {
            CliError::usage(
                "Seed record has no created_by: pass --actor or set ISSUEDESK_ACTOR",
            )
        }),
    }
}

async fn seed_store(
    context: &CommandContext,
    issues_path: &Path,
    activity_path: Option<&Path>,
) -> CliResult<()> {
    let issue_records = read_records(issues_path)?;
    let activity_records = match activity_path {
        Some(path) => read_records(path)?,
        None => Vec::new(),
    };
    let fallback = context.actor().ok();
    let tracker = context.tracker().await?;
    let mut summary = SeedSummary::default();

    for record in issue_records {
        let actor = record_actor(&record, fallback.as_ref())?;
        let created = match CreateIssueRequest::from_value(record) {
            Ok(request) => tracker.create_issue(&actor, request).await,
            Err(errors) => Err(errors.into()),
        };
        match created {
            Ok(_) => summary.issues_created += 1,
            Err(e) if e.is_validation() => {
                warn!("Skipping seed issue: {}", e);
                summary.issues_rejected += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    for record in activity_records {
        let actor = record_actor(&record, fallback.as_ref())?;
        let added = match seed_request(&tracker, &record).await {
            Ok(request) => tracker.add_activity(&actor, request).await,
            Err(e) => Err(e),
        };
        match added {
            Ok(_) => summary.activity_created += 1,
            Err(e) if e.is_validation() || e.is_not_found() => {
                warn!("Skipping seed activity: {}", e);
                summary.activity_rejected += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let message = format!(
        "Seeded {} issues and {} activity entries ({} rejected)",
        summary.issues_created,
        summary.activity_created,
        summary.issues_rejected + summary.activity_rejected
    );
    info!("{}", message);
    context.emit(summary, message.clone(), |_| {
        format!("{} {}", "✓".green(), message)
    });
    Ok(())
}

/// Activity payload of a seed record, which may name its issue instead of giving an id
async fn seed_request(
    tracker: &IssueTracker,
    record: &Value,
) -> issuedesk::Result<AddActivityRequest> {
    let mut request: AddActivityRequest = serde_json::from_value(record.clone())
        .map_err(|e| FieldViolation::malformed("payload", record.to_string(), e.to_string()))?;
    if request.issue_id.is_none() {
        if let Some(name) = record.get("issue_name").and_then(Value::as_str) {
            let issue = tracker.get_issue(name).await?;
            request.issue_id = Some(issue.id.value());
        }
    }
    Ok(request)
}

fn fake_request<R: Rng>(rng: &mut R, project: &str) -> CreateIssueRequest {
    let issue_type = FAKE_TYPES.choose(rng).copied().unwrap_or(IssueType::Task);
    let verb = FAKE_VERBS.choose(rng).copied().unwrap_or("Fix");
    let subject = FAKE_SUBJECTS.choose(rng).copied().unwrap_or("login form");
    let story_points = FAKE_STORY_POINTS.choose(rng).copied().unwrap_or(1);

    let mut request = CreateIssueRequest::new(
        project,
        issue_type.to_string(),
        rng.gen_range(1..=5),
        story_points,
        format!("{} {}", verb, subject),
    );
    if rng.gen_bool(0.75) {
        if let Some(assignee) = FAKE_ASSIGNEES.choose(rng) {
            request = request.with_assigned_to(*assignee);
        }
    }
    request
}

async fn fake_issues(context: &CommandContext, count: usize, project: &str) -> CliResult<()> {
    let actor = context.actor()?;
    let tracker = context.tracker().await?;

    let mut created = Vec::with_capacity(count);
    for _ in 0..count {
        // ThreadRng is not Send, so it must not live across the await
        let request = fake_request(&mut rand::thread_rng(), project);
        created.push(tracker.create_issue(&actor, request).await?);
    }
    let message = format!("Generated {} issues in {}", created.len(), project);
    info!("{}", message);
    context.emit(created, message.clone(), |issues| {
        format!(
            "{} {}\n{}",
            "✓".green(),
            message,
            crate::display::issues_table(issues)
        )
    });
    Ok(())
}
