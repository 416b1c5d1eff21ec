//! Transactional record store for issues and activity
//!
//! The lifecycle engine talks to storage only through [`RecordStore`] and the
//! [`StoreTransaction`] it hands out. A transaction is the unit of atomicity:
//! everything written through it becomes visible together on
//! [`commit`](StoreTransaction::commit), and dropping it without committing
//! discards every write.
//!
//! Both backends serialize transactions. A transaction holds the store lock
//! from `begin` until it is committed or dropped, so read-then-write
//! sequences such as name allocation cannot interleave. The file backend
//! extends that lock across processes sharing one snapshot.

use crate::common::validation::{Constraint, FieldViolation, ValidationErrors, ViolationCollector};
use crate::config::Config;
use crate::enums::{ActivityType, ClosedEnum, IssueResolution, IssueStatus, IssueType};
use crate::error::Result;
use crate::issues::{Activity, Issue, IssueChanges, IssueId, NewActivity, NewIssue};
use async_trait::async_trait;
use std::sync::Arc;

/// JSON snapshot file backend
pub mod file;
/// In-memory backend with fault injection
pub mod memory;
mod tables;

pub use file::FileRecordStore;
pub use memory::{InMemoryRecordStore, StoreFaults};
pub use tables::Tables;

/// A handle that opens transactions
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Start a transaction; waits while another transaction is open
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;
}

/// Reads and writes scoped to one atomic unit of work
#[async_trait]
pub trait StoreTransaction: Send {
    /// Insert an issue, assigning id and `created_at`; a duplicate name is a conflict
    async fn insert_issue(&mut self, issue: NewIssue) -> Result<Issue>;

    /// Get an issue by id
    async fn issue_by_id(&mut self, id: IssueId) -> Result<Issue>;

    /// Get an issue by its unique name
    async fn issue_by_name(&mut self, name: &str) -> Result<Issue>;

    /// Highest sequence ever issued for `project`, counting deleted issues
    async fn last_sequence(&mut self, project: &str) -> Result<u64>;

    /// Issues matching a filter, ordered by id
    async fn query_issues(&mut self, filter: &IssueFilter) -> Result<Vec<Issue>>;

    /// Apply changes to an issue and stamp `updated_at`
    async fn update_issue(&mut self, id: IssueId, changes: &IssueChanges) -> Result<Issue>;

    /// Remove an issue; refused while activity references it
    async fn delete_issue(&mut self, id: IssueId) -> Result<()>;

    /// Append an activity entry; the parent issue must exist
    async fn insert_activity(&mut self, activity: NewActivity) -> Result<Activity>;

    /// Activity matching a filter, in the filter's order
    async fn query_activity(&mut self, filter: &ActivityFilter) -> Result<Vec<Activity>>;

    /// Make every write of this transaction visible
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Open the store the configuration points at
///
/// The testing environment gets a fresh in-memory store; every other
/// environment uses the JSON snapshot at `database_path`.
pub async fn open(config: &Config) -> Result<Arc<dyn RecordStore>> {
    if config.environment.is_in_memory() {
        Ok(Arc::new(InMemoryRecordStore::new()))
    } else {
        Ok(Arc::new(FileRecordStore::open(&config.database_path).await?))
    }
}

/// Equality filters over issues; `None` matches anything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFilter {
    /// Project key
    pub project: Option<String>,
    /// Issue type
    pub issue_type: Option<IssueType>,
    /// Status
    pub status: Option<IssueStatus>,
    /// Resolution
    pub resolution: Option<IssueResolution>,
    /// Assignee
    pub assigned_to: Option<String>,
    /// Reporter
    pub created_by: Option<String>,
}

impl IssueFilter {
    /// Keys accepted by [`from_params`](Self::from_params)
    pub const KEYS: [&'static str; 6] = [
        "project",
        "type",
        "status",
        "resolution",
        "assigned_to",
        "created_by",
    ];

    /// All issues in one project
    pub fn project(project: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            ..Self::default()
        }
    }

    /// Build a filter from string key/value pairs such as query parameters
    ///
    /// Keys may carry the `issue_` prefix. Unknown keys and invalid enum
    /// values are rejected.
    pub fn from_params<'a, I>(params: I) -> std::result::Result<Self, ValidationErrors>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut collector = ViolationCollector::new();
        let mut filter = Self::default();

        for (key, value) in params {
            let short = key.strip_prefix("issue_").unwrap_or(key);
            match short {
                "project" => filter.project = Some(value.to_string()),
                "type" => filter.issue_type = collector.check(IssueType::parse_field(key, value)),
                "status" => filter.status = collector.check(IssueStatus::parse_field(key, value)),
                "resolution" => {
                    filter.resolution = collector.check(IssueResolution::parse_field(key, value))
                }
                "assigned_to" => filter.assigned_to = Some(value.to_string()),
                "created_by" => filter.created_by = Some(value.to_string()),
                _ => collector.push(FieldViolation::new(
                    key,
                    Some(value.to_string()),
                    Constraint::OneOf(Self::KEYS.to_vec()),
                )),
            }
        }

        collector.finish(|| filter)
    }

    /// Whether an issue passes every set filter
    pub fn matches(&self, issue: &Issue) -> bool {
        self.project.as_ref().map_or(true, |p| &issue.project == p)
            && self.issue_type.map_or(true, |t| issue.issue_type == t)
            && self.status.map_or(true, |s| issue.status == s)
            && self.resolution.map_or(true, |r| issue.resolution == r)
            && self
                .assigned_to
                .as_ref()
                .map_or(true, |a| issue.assigned_to.as_ref() == Some(a))
            && self
                .created_by
                .as_ref()
                .map_or(true, |c| &issue.created_by == c)
    }
}

/// Order in which activity is returned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActivityOrder {
    /// Oldest first, by `created_at` then id
    #[default]
    Chronological,
    /// Most recent first
    NewestFirst,
}

/// Filters over activity entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityFilter {
    /// Parent issue id
    pub issue_id: Option<IssueId>,
    /// Parent issue name
    pub issue_name: Option<String>,
    /// Kind of entry
    pub activity_type: Option<ActivityType>,
    /// Author
    pub created_by: Option<String>,
    /// Result order
    pub order: ActivityOrder,
}

impl ActivityFilter {
    /// History of one issue, newest first
    pub fn history(issue_id: IssueId) -> Self {
        Self {
            issue_id: Some(issue_id),
            order: ActivityOrder::NewestFirst,
            ..Self::default()
        }
    }

    /// Whether an entry passes every set filter
    pub fn matches(&self, activity: &Activity) -> bool {
        self.issue_id.map_or(true, |id| activity.issue_id == id)
            && self
                .issue_name
                .as_ref()
                .map_or(true, |n| activity.issue_name.as_str() == n)
            && self
                .activity_type
                .map_or(true, |t| activity.activity_type == t)
            && self
                .created_by
                .as_ref()
                .map_or(true, |c| &activity.created_by == c)
    }

    /// Sort entries into the requested order
    pub fn sort(&self, entries: &mut [Activity]) {
        entries.sort_by_key(|a| (a.created_at, a.id));
        if self.order == ActivityOrder::NewestFirst {
            entries.reverse();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_from_params() {
        let filter = IssueFilter::from_params([
            ("issue_project", "DWB"),
            ("status", "in_progress"),
            ("assigned_to", "greg@example.com"),
        ])
        .unwrap();
        assert_eq!(filter.project.as_deref(), Some("DWB"));
        assert_eq!(filter.status, Some(IssueStatus::InProgress));
        assert_eq!(filter.assigned_to.as_deref(), Some("greg@example.com"));
        assert_eq!(filter.issue_type, None);
    }

    #[test]
    fn test_filter_from_params_rejects_unknown_keys_and_values() {
        let errors =
            IssueFilter::from_params([("colour", "red"), ("resolution", "FIXED")]).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.contains_field("colour"));
        assert!(errors.contains_field("resolution"));
    }
}
