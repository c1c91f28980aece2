//! Per-key commit bookkeeping for [`super::ConfigStore`].

use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::ConfigRecord;
use crate::error::CommitError;

/// Which mutation a pending commit belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncOp {
    Create,
    Update,
    Toggle,
}

impl SyncOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOp::Create => "create",
            SyncOp::Update => "update",
            SyncOp::Toggle => "toggle",
        }
    }
}

impl fmt::Display for SyncOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a key stands relative to the server.
///
/// ```text
/// Absent ──create──▶ Pending(Create) ──ack──▶ Committed
///                          │
///                          └──fail──▶ Failed (record reverted)
/// Committed ──update/toggle──▶ Pending(op) ──ack──▶ Committed
///                                    └──fail──▶ Failed (last committed value restored)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Absent,
    Pending(SyncOp),
    Committed,
    Failed(CommitError),
}

impl SyncState {
    pub fn label(&self) -> String {
        match self {
            SyncState::Absent => "absent".to_string(),
            SyncState::Pending(op) => format!("pending {}", op),
            SyncState::Committed => "committed".to_string(),
            SyncState::Failed(_) => "failed".to_string(),
        }
    }
}

/// A commit that has been applied optimistically but not yet acknowledged
#[derive(Debug, Clone)]
pub(crate) struct PendingCommit {
    pub op: SyncOp,
    /// Last server-confirmed value, restored if the commit fails.
    /// `None` means the key did not exist before.
    pub rollback: Option<ConfigRecord>,
}

/// Mutable view behind the store's lock
#[derive(Debug, Default)]
pub(crate) struct Ledger {
    pub records: HashMap<String, ConfigRecord>,
    pub pending: HashMap<String, PendingCommit>,
    pub failures: HashMap<String, CommitError>,
    pub loaded: bool,
    /// Bumped on every local begin / confirm / revert
    revision: u64,
    /// Revision of the last local change per key
    touched: HashMap<String, u64>,
}

impl Ledger {
    pub fn state_of(&self, key: &str) -> SyncState {
        if let Some(pending) = self.pending.get(key) {
            return SyncState::Pending(pending.op);
        }
        if let Some(err) = self.failures.get(key) {
            return SyncState::Failed(err.clone());
        }
        if self.records.contains_key(key) {
            SyncState::Committed
        } else {
            SyncState::Absent
        }
    }

    /// Read before a load starts and handed back to [`Ledger::replace_snapshot`]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self, key: &str) {
        self.revision += 1;
        self.touched.insert(key.to_string(), self.revision);
    }

    /// Install the optimistic value and remember what to fall back to
    pub fn begin(&mut self, op: SyncOp, record: ConfigRecord) {
        let key = record.key.clone();
        self.touch(&key);
        let rollback = self.records.insert(key.clone(), record);
        self.failures.remove(&key);
        self.pending.insert(key, PendingCommit { op, rollback });
    }

    /// Replace the optimistic value with the server's canonical one
    pub fn confirm(&mut self, record: ConfigRecord) {
        self.touch(&record.key);
        self.pending.remove(&record.key);
        self.failures.remove(&record.key);
        self.records.insert(record.key.clone(), record);
    }

    /// Restore the last committed value (or drop a never-committed key)
    pub fn revert(&mut self, key: &str, err: CommitError) -> Option<ConfigRecord> {
        self.touch(key);
        let restored = match self.pending.remove(key).and_then(|p| p.rollback) {
            Some(prior) => {
                self.records.insert(key.to_string(), prior.clone());
                Some(prior)
            }
            None => {
                self.records.remove(key);
                None
            }
        };
        self.failures.insert(key.to_string(), err);
        restored
    }

    /// Adopt a freshly loaded snapshot taken at ledger revision `since`.
    ///
    /// Keys with a commit in flight keep their optimistic value. Keys changed
    /// locally after `since` keep their current state, since the snapshot
    /// predates that change. Everything else takes the loaded value.
    pub fn replace_snapshot(&mut self, mut snapshot: HashMap<String, ConfigRecord>, since: u64) {
        let newer: HashSet<String> = self
            .touched
            .iter()
            .filter(|(_, rev)| **rev > since)
            .map(|(key, _)| key.clone())
            .collect();

        for (key, pending) in self.pending.iter_mut() {
            let loaded = snapshot.remove(key);
            if !newer.contains(key) {
                pending.rollback = loaded;
            }
            if let Some(optimistic) = self.records.get(key) {
                snapshot.insert(key.clone(), optimistic.clone());
            }
        }
        for key in newer.iter().filter(|key| !self.pending.contains_key(*key)) {
            if let Some(current) = self.records.get(key) {
                snapshot.insert(key.clone(), current.clone());
            } else {
                snapshot.remove(key);
            }
        }

        self.failures.retain(|key, _| {
            snapshot.contains_key(key) || self.pending.contains_key(key) || newer.contains(key)
        });
        self.records = snapshot;
        self.loaded = true;
    }
}

/// One async mutex per key; commits on the same key run one at a time
#[derive(Default)]
pub(crate) struct KeyLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyLocks {
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}
