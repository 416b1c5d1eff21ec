//! Issue lifecycle engine
//!
//! [`IssueTracker`] is the entry point for every operation on issues and
//! activity. Each operation runs in exactly one store transaction:
//!
//! - create: validate, allocate the name, insert the issue
//! - update: fetch, validate, diff, then update the issue and append the
//!   `UPDATE` entry together
//! - add activity: validate, resolve the parent issue, append the entry
//!
//! Any failure before commit drops the transaction, which discards every
//! write made in it.

use crate::activity::{ActivityRecorder, IssueDiff};
use crate::config::Config;
use crate::enums::Registry;
use crate::error::Result;
use crate::issues::{
    Activity, Actor, AddActivityRequest, CreateIssueRequest, Issue, IssueId, IssuePatch,
    NameAllocator, NewIssue,
};
use crate::store::{self, ActivityFilter, IssueFilter, RecordStore};
use std::sync::Arc;
use tracing::{debug, info};

/// The parts of the configuration the engine uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerSettings {
    /// Digits the name sequence is padded to
    pub issue_number_padding: usize,
    /// Largest sequence number per project
    pub max_issue_number: u64,
    /// Accept ASSIGNMENT, STATUS and RESOLUTION activity
    pub extended_activity_types: bool,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for TrackerSettings {
    fn from(config: &Config) -> Self {
        Self {
            issue_number_padding: config.issue_number_padding,
            max_issue_number: config.max_issue_number,
            extended_activity_types: config.extended_activity_types,
        }
    }
}

/// Result of an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Every submitted value matched the stored one; nothing was written
    Unchanged {
        /// The issue as stored
        issue: Issue,
    },
    /// At least one field changed
    Updated {
        /// The issue after the update
        issue: Issue,
        /// The `UPDATE` entry recording the change
        activity: Activity,
        /// The changed fields
        diff: IssueDiff,
    },
}

impl UpdateOutcome {
    /// Whether nothing was written
    pub fn is_unchanged(&self) -> bool {
        matches!(self, UpdateOutcome::Unchanged { .. })
    }

    /// The issue after the operation
    pub fn issue(&self) -> &Issue {
        match self {
            UpdateOutcome::Unchanged { issue } | UpdateOutcome::Updated { issue, .. } => issue,
        }
    }

    /// The recorded entry, when something changed
    pub fn activity(&self) -> Option<&Activity> {
        match self {
            UpdateOutcome::Unchanged { .. } => None,
            UpdateOutcome::Updated { activity, .. } => Some(activity),
        }
    }

    /// Human-readable summary
    pub fn message(&self) -> String {
        match self {
            UpdateOutcome::Unchanged { issue } => format!("No changes to {}", issue.name),
            UpdateOutcome::Updated { issue, diff, .. } => {
                let fields: Vec<&str> = diff.fields().iter().map(|f| f.name()).collect();
                format!("Updated {}: {}", issue.name, fields.join(", "))
            }
        }
    }
}

/// Creates, updates and annotates issues against a record store
#[derive(Clone)]
pub struct IssueTracker {
    store: Arc<dyn RecordStore>,
    registry: Registry,
    allocator: NameAllocator,
    recorder: ActivityRecorder,
}

impl std::fmt::Debug for IssueTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssueTracker")
            .field("registry", &self.registry)
            .field("allocator", &self.allocator)
            .finish_non_exhaustive()
    }
}

impl IssueTracker {
    /// Create an engine over `store`
    pub fn new(store: Arc<dyn RecordStore>, settings: TrackerSettings) -> Self {
        Self {
            store,
            registry: Registry::new(settings.extended_activity_types),
            allocator: NameAllocator::new(
                settings.issue_number_padding,
                settings.max_issue_number,
            ),
            recorder: ActivityRecorder,
        }
    }

    /// Open the configured store and build an engine over it
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let store = store::open(config).await?;
        Ok(Self::new(store, TrackerSettings::from(config)))
    }

    /// The enumeration registry used for validation
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The name allocator
    pub fn allocator(&self) -> &NameAllocator {
        &self.allocator
    }

    /// Validate and file a new issue
    ///
    /// The name is allocated and the issue inserted in one transaction.
    /// Missing status and resolution default to OPEN and UNRESOLVED. No
    /// activity is written.
    pub async fn create_issue(&self, actor: &Actor, request: CreateIssueRequest) -> Result<Issue> {
        let fields = request.validate(&self.registry)?;

        let mut tx = self.store.begin().await?;
        let name = self.allocator.allocate(&mut *tx, &fields.project).await?;
        let issue = tx
            .insert_issue(NewIssue {
                name,
                fields,
                created_by: actor.as_str().to_string(),
            })
            .await?;
        tx.commit().await?;

        info!("Created issue {} ({})", issue.name, issue.issue_type);
        Ok(issue)
    }

    /// Apply a partial update to the issue called `name`
    ///
    /// Keys outside the editable allow-list are ignored. When no submitted
    /// value differs from the stored one nothing is written and
    /// [`UpdateOutcome::Unchanged`] is returned.
    pub async fn update_issue(
        &self,
        name: &str,
        actor: &Actor,
        patch: &IssuePatch,
    ) -> Result<UpdateOutcome> {
        let mut tx = self.store.begin().await?;
        let existing = tx.issue_by_name(name).await?;

        let mut changes = patch.validate(&self.registry)?;
        let diff = IssueDiff::between(&existing, &changes);
        if diff.is_empty() {
            debug!("Update of {} changed nothing", existing.name);
            return Ok(UpdateOutcome::Unchanged { issue: existing });
        }

        changes.retain(&diff.fields());
        let issue = tx.update_issue(existing.id, &changes).await?;
        let activity = self
            .recorder
            .record_update(&mut *tx, &issue, &diff, actor)
            .await?;
        tx.commit().await?;

        info!(
            "Updated issue {} ({} fields) by {}",
            issue.name,
            diff.len(),
            actor
        );
        Ok(UpdateOutcome::Updated {
            issue,
            activity,
            diff,
        })
    }

    /// Append a directly submitted entry such as a comment
    ///
    /// `UPDATE` entries are rejected; they are only written by
    /// [`update_issue`](Self::update_issue).
    pub async fn add_activity(&self, actor: &Actor, request: AddActivityRequest) -> Result<Activity> {
        let entry = request.validate(&self.registry)?;

        let mut tx = self.store.begin().await?;
        let issue = tx.issue_by_id(entry.issue_id).await?;
        let activity = self
            .recorder
            .record_entry(&mut *tx, &issue, entry, actor)
            .await?;
        tx.commit().await?;

        info!(
            "Added {} activity to {} by {}",
            activity.activity_type, issue.name, actor
        );
        Ok(activity)
    }

    /// Look an issue up by name
    pub async fn get_issue(&self, name: &str) -> Result<Issue> {
        let mut tx = self.store.begin().await?;
        tx.issue_by_name(name).await
    }

    /// Look an issue up by id
    pub async fn get_issue_by_id(&self, id: IssueId) -> Result<Issue> {
        let mut tx = self.store.begin().await?;
        tx.issue_by_id(id).await
    }

    /// Issues matching `filter`, ordered by id
    pub async fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        let mut tx = self.store.begin().await?;
        tx.query_issues(filter).await
    }

    /// Activity matching `filter`
    pub async fn list_activity(&self, filter: &ActivityFilter) -> Result<Vec<Activity>> {
        let mut tx = self.store.begin().await?;
        tx.query_activity(filter).await
    }

    /// Activity of one issue, most recent first
    pub async fn issue_history(&self, name: &str) -> Result<Vec<Activity>> {
        let mut tx = self.store.begin().await?;
        let issue = tx.issue_by_name(name).await?;
        tx.query_activity(&ActivityFilter::history(issue.id)).await
    }

    /// Delete an issue that has no activity
    ///
    /// Activity is append-only, so an issue with history cannot be removed;
    /// that case is reported as a conflict.
    pub async fn delete_issue(&self, name: &str) -> Result<Issue> {
        let mut tx = self.store.begin().await?;
        let issue = tx.issue_by_name(name).await?;
        tx.delete_issue(issue.id).await?;
        tx.commit().await?;

        info!("Deleted issue {}", issue.name);
        Ok(issue)
    }
}
