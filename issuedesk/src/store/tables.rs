use super::file::SnapshotFile;
use super::memory::StoreFaults;
use super::{ActivityFilter, IssueFilter, StoreTransaction};
use crate::error::{IssueDeskError, Result};
use crate::issues::{
    now_millis, Activity, ActivityId, Issue, IssueChanges, IssueId, NewActivity, NewIssue,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};

/// The full contents of a store
///
/// This is also the on-disk snapshot format of the file backend. Ids are
/// handed out from the `last_*_id` counters and never reused, even after a
/// delete. `sequences` does the same for issue names: it keeps the highest
/// suffix each project has issued.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tables {
    #[serde(default)]
    issues: Vec<Issue>,
    #[serde(default)]
    activity: Vec<Activity>,
    #[serde(default)]
    last_issue_id: i64,
    #[serde(default)]
    last_activity_id: i64,
    #[serde(default)]
    sequences: BTreeMap<String, u64>,
}

impl Tables {
    /// Every issue, ordered by id
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Every activity entry, in insertion order
    pub fn activity(&self) -> &[Activity] {
        &self.activity
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty() && self.activity.is_empty()
    }

    fn insert_issue(&mut self, new: NewIssue) -> Result<Issue> {
        if self.issues.iter().any(|i| i.name == new.name) {
            return Err(IssueDeskError::conflict(format!(
                "issue name {} is already taken",
                new.name
            )));
        }

        self.last_issue_id += 1;
        let issued = self
            .sequences
            .entry(new.name.project().to_string())
            .or_insert(0);
        *issued = (*issued).max(new.name.sequence());
        let fields = new.fields;
        let issue = Issue {
            id: IssueId::new(self.last_issue_id),
            project: fields.project,
            name: new.name,
            issue_type: fields.issue_type,
            priority: fields.priority,
            story_points: fields.story_points,
            summary: fields.summary,
            description: fields.description,
            status: fields.status,
            resolution: fields.resolution,
            affected_version: fields.affected_version,
            fixed_version: fields.fixed_version,
            assigned_to: fields.assigned_to,
            created_by: new.created_by,
            created_at: now_millis(),
            updated_at: None,
        };
        self.issues.push(issue.clone());
        Ok(issue)
    }

    /// Snapshots written before `sequences` existed fall back to the live names
    fn last_sequence(&self, project: &str) -> u64 {
        let live = self
            .issues
            .iter()
            .filter(|i| i.name.project() == project)
            .map(|i| i.name.sequence())
            .max()
            .unwrap_or(0);
        self.sequences.get(project).copied().unwrap_or(0).max(live)
    }

    fn issue_by_id(&self, id: IssueId) -> Result<&Issue> {
        self.issues
            .iter()
            .find(|i| i.id == id)
            .ok_or_else(|| IssueDeskError::issue_not_found(id))
    }

    fn issue_by_name(&self, name: &str) -> Result<&Issue> {
        self.issues
            .iter()
            .find(|i| i.name.as_str() == name)
            .ok_or_else(|| IssueDeskError::issue_not_found(name))
    }

    fn update_issue(&mut self, id: IssueId, changes: &IssueChanges) -> Result<Issue> {
        let issue = self
            .issues
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| IssueDeskError::issue_not_found(id))?;
        issue.apply(changes);
        issue.updated_at = Some(now_millis());
        Ok(issue.clone())
    }

    fn delete_issue(&mut self, id: IssueId) -> Result<()> {
        let position = self
            .issues
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| IssueDeskError::issue_not_found(id))?;

        let entries = self.activity.iter().filter(|a| a.issue_id == id).count();
        if entries > 0 {
            return Err(IssueDeskError::conflict(format!(
                "issue {} has {} activity entries and cannot be deleted",
                self.issues[position].name, entries
            )));
        }

        self.issues.remove(position);
        Ok(())
    }

    fn insert_activity(&mut self, new: NewActivity) -> Result<Activity> {
        if !self.issues.iter().any(|i| i.id == new.issue_id) {
            return Err(IssueDeskError::issue_not_found(new.issue_id));
        }

        self.last_activity_id += 1;
        let activity = Activity {
            id: ActivityId::new(self.last_activity_id),
            issue_id: new.issue_id,
            issue_name: new.issue_name,
            activity_type: new.activity_type,
            text: new.text,
            created_by: new.created_by,
            created_at: now_millis(),
        };
        self.activity.push(activity.clone());
        Ok(activity)
    }

    fn query_issues(&self, filter: &IssueFilter) -> Vec<Issue> {
        self.issues
            .iter()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect()
    }

    fn query_activity(&self, filter: &ActivityFilter) -> Vec<Activity> {
        let mut entries: Vec<Activity> = self
            .activity
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        filter.sort(&mut entries);
        entries
    }
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// `path` with `.suffix` appended to its file name
pub(crate) fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Write a snapshot atomically: temp file then rename
///
/// The temp file name is unique to this writer.
pub(crate) async fn write_snapshot(path: &Path, tables: &Tables) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let content = serde_json::to_vec_pretty(tables)?;
    let temp_path = sidecar_path(
        path,
        &format!(
            "{}-{}.tmp",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ),
    );
    tokio::fs::write(&temp_path, &content).await?;
    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e.into());
    }
    Ok(())
}

/// Read a snapshot; a missing file is an empty store
pub(crate) async fn read_snapshot(path: &Path) -> Result<Tables> {
    match tokio::fs::read(path).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Tables::default()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Tables::default()),
        Err(e) => Err(e.into()),
    }
}

/// A transaction over lock-guarded tables
///
/// Holds the store lock for its whole life and works on a private copy of the
/// tables. Commit writes the snapshot (for file-backed stores) and then swaps
/// the copy in; any earlier exit leaves the guarded tables untouched. A
/// file-backed transaction also owns the cross-process lock until it ends.
pub(crate) struct LockedTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    faults: StoreFaults,
    snapshot: Option<SnapshotFile>,
    writes: usize,
    committed: bool,
}

impl LockedTransaction {
    pub(crate) fn new(
        guard: OwnedMutexGuard<Tables>,
        faults: StoreFaults,
        snapshot: Option<SnapshotFile>,
    ) -> Self {
        let working = Tables::clone(&guard);
        Self {
            guard,
            working,
            faults,
            snapshot,
            writes: 0,
            committed: false,
        }
    }
}

#[async_trait]
impl StoreTransaction for LockedTransaction {
    async fn insert_issue(&mut self, issue: NewIssue) -> Result<Issue> {
        if self.faults.fail_issue_insert {
            return Err(IssueDeskError::storage("simulated issue insert failure"));
        }
        let issue = self.working.insert_issue(issue)?;
        self.writes += 1;
        Ok(issue)
    }

    async fn issue_by_id(&mut self, id: IssueId) -> Result<Issue> {
        self.working.issue_by_id(id).cloned()
    }

    async fn issue_by_name(&mut self, name: &str) -> Result<Issue> {
        self.working.issue_by_name(name).cloned()
    }

    async fn last_sequence(&mut self, project: &str) -> Result<u64> {
        Ok(self.working.last_sequence(project))
    }

    async fn query_issues(&mut self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        Ok(self.working.query_issues(filter))
    }

    async fn update_issue(&mut self, id: IssueId, changes: &IssueChanges) -> Result<Issue> {
        let issue = self.working.update_issue(id, changes)?;
        self.writes += 1;
        Ok(issue)
    }

    async fn delete_issue(&mut self, id: IssueId) -> Result<()> {
        self.working.delete_issue(id)?;
        self.writes += 1;
        Ok(())
    }

    async fn insert_activity(&mut self, activity: NewActivity) -> Result<Activity> {
        if self.faults.fail_activity_insert {
            return Err(IssueDeskError::storage("simulated activity insert failure"));
        }
        let activity = self.working.insert_activity(activity)?;
        self.writes += 1;
        Ok(activity)
    }

    async fn query_activity(&mut self, filter: &ActivityFilter) -> Result<Vec<Activity>> {
        Ok(self.working.query_activity(filter))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut tx = self;
        if tx.faults.fail_commit {
            return Err(IssueDeskError::storage("simulated commit failure"));
        }
        if tx.writes > 0 {
            if let Some(file) = &tx.snapshot {
                write_snapshot(&file.path, &tx.working).await?;
            }
        }
        *tx.guard = std::mem::take(&mut tx.working);
        tx.committed = true;
        debug!("Committed transaction with {} writes", tx.writes);
        Ok(())
    }
}

impl Drop for LockedTransaction {
    fn drop(&mut self) {
        if !self.committed && self.writes > 0 {
            warn!("Rolling back transaction with {} uncommitted writes", self.writes);
        }
    }
}
