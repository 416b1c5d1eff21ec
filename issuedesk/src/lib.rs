//! # issuedesk
//!
//! The core of a small issue tracker: issues with unique sequential names,
//! partial updates recorded as field-level diffs, and an append-only
//! activity history per issue.
//!
//! ## Features
//!
//! - **Name allocation**: `{project}-{sequence}` names, zero padded, dense per project
//! - **Validated payloads**: closed enumerations and numeric ranges, all violations reported together
//! - **Update diffing**: only changed fields are written, alongside one `UPDATE` activity entry
//! - **Transactional storage**: in-memory and JSON-file record stores with rollback on failure
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use issuedesk::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> issuedesk::Result<()> {
//! let store = Arc::new(InMemoryRecordStore::new());
//! let tracker = IssueTracker::new(store, TrackerSettings::default());
//! let actor = Actor::new("adam@example.com")?;
//!
//! let issue = tracker
//!     .create_issue(&actor, CreateIssueRequest::new("DWB", "BUG", 2, 3, "Login fails"))
//!     .await?;
//! assert_eq!(issue.name.as_str(), "DWB-0001");
//!
//! let outcome = tracker
//!     .update_issue(issue.name.as_str(), &actor, &IssuePatch::new().with("priority", 4))
//!     .await?;
//! println!("{}", outcome.message());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

/// Diffs and activity recording
pub mod activity;

/// Shared helpers: validation and environment loading
pub mod common;

/// Configuration loading
pub mod config;

/// Closed enumerations and the registry that validates them
pub mod enums;

/// Error types
pub mod error;

/// Issue and activity records, requests and naming
pub mod issues;

/// Transactional record store
pub mod store;

/// Issue lifecycle engine
pub mod tracker;

pub use activity::{ActivityRecorder, FieldChange, IssueDiff};
pub use common::validation::{Constraint, FieldViolation, ValidationErrors};
pub use config::{Config, ConfigError, Environment};
pub use enums::{ActivityType, ClosedEnum, IssueResolution, IssueStatus, IssueType, Registry};
pub use error::{IssueDeskError, Result};
pub use issues::{
    Activity, ActivityId, Actor, AddActivityRequest, CreateIssueRequest, EditableField, Issue,
    IssueId, IssueName, IssuePatch, NameAllocator,
};
pub use store::{
    ActivityFilter, ActivityOrder, FileRecordStore, InMemoryRecordStore, IssueFilter,
    RecordStore, StoreTransaction,
};
pub use tracker::{IssueTracker, TrackerSettings, UpdateOutcome};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Activity, ActivityFilter, ActivityType, Actor, AddActivityRequest, Config,
        CreateIssueRequest, InMemoryRecordStore, Issue, IssueDeskError, IssueFilter, IssuePatch,
        IssueResolution, IssueStatus, IssueTracker, IssueType, RecordStore, Result,
        TrackerSettings, UpdateOutcome,
    };
}
