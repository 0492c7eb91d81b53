//! In-process per-store operation lock.
//!
//! Advisory and non-persistent: after a crash the map is empty and the
//! reconciler re-establishes correctness. Re-execution is safe because the
//! chart deployer checks release existence and namespace = release = id.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::fmt;

/// Kind of lifecycle operation currently executing for a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Provisioning,
    Deleting,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Provisioning => f.write_str("provisioning"),
            OperationKind::Deleting => f.write_str("deleting"),
        }
    }
}

/// Process-wide map from store id to its active operation
#[derive(Default)]
pub struct OperationLock {
    ops: DashMap<String, OperationKind>,
}

impl OperationLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the lock for `store_id`. Returns false when any operation is
    /// already active for that id.
    pub fn try_claim(&self, store_id: &str, kind: OperationKind) -> bool {
        match self.ops.entry(store_id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(kind);
                true
            }
        }
    }

    /// The operation currently held for `store_id`, if any
    pub fn current(&self, store_id: &str) -> Option<OperationKind> {
        self.ops.get(store_id).map(|entry| *entry.value())
    }

    pub fn release(&self, store_id: &str) {
        self.ops.remove(store_id);
    }

    /// Number of active operations across all stores
    pub fn active_operations(&self) -> usize {
        self.ops.len()
    }
}
