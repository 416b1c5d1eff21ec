//! In-memory record store
//!
//! Holds every record in process memory. Used for the testing environment
//! and by tests that need to observe or provoke storage failures: the
//! [`StoreFaults`] switches make individual steps of a transaction fail so
//! rollback behaviour can be checked.

use super::tables::{LockedTransaction, Tables};
use super::{RecordStore, StoreTransaction};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Failures to simulate in subsequent transactions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreFaults {
    /// Fail every commit
    pub fail_commit: bool,
    /// Fail every issue insert
    pub fail_issue_insert: bool,
    /// Fail every activity insert
    pub fail_activity_insert: bool,
}

/// Record store kept entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<RwLock<StoreFaults>>,
}

impl InMemoryRecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store preloaded with records
    pub fn with_tables(tables: Tables) -> Self {
        Self {
            tables: Arc::new(Mutex::new(tables)),
            faults: Arc::new(RwLock::new(StoreFaults::default())),
        }
    }

    /// Change the simulated failures; transactions already open keep their faults
    pub async fn set_faults(&self, faults: StoreFaults) {
        *self.faults.write().await = faults;
    }

    /// A copy of the committed records
    pub async fn snapshot(&self) -> Tables {
        self.tables.lock().await.clone()
    }

    /// Number of committed issues
    pub async fn issue_count(&self) -> usize {
        self.tables.lock().await.issues().len()
    }

    /// Number of committed activity entries
    pub async fn activity_count(&self) -> usize {
        self.tables.lock().await.activity().len()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let faults = *self.faults.read().await;
        let guard = self.tables.clone().lock_owned().await;
        Ok(Box::new(LockedTransaction::new(guard, faults, None)))
    }
}
