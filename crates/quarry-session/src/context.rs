//! The persistence context: per-session identity map and load bookkeeping.
//!
//! One context per session. Records register under their [`EntityKey`];
//! an already-managed record wins over a freshly materialized one, so every
//! load of the same identifier observes the same managed state. Load depth
//! tracks nested materialization: eager attachment roles queue while any
//! load is in flight and drain when the outermost load finishes.

use quarry_core::{EntityKey, EntityRecord, EntityStatus};
use std::collections::HashMap;

/// One managed entry: the record plus its lifecycle status.
#[derive(Debug, Clone)]
struct ManagedEntry {
    record: EntityRecord,
    status: EntityStatus,
}

/// Identity map and load-scope state for one session.
#[derive(Debug, Default)]
pub struct PersistenceContext {
    entries: HashMap<EntityKey, ManagedEntry>,
    load_depth: usize,
    pending_eager: Vec<(EntityKey, String)>,
}

impl PersistenceContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a materialized record, returning its identity-map key.
    ///
    /// When the key is already managed the existing entry wins and the new
    /// record is discarded. New registrations queue their pending eager
    /// attachment roles for initialization at the end of the outermost load.
    pub fn register(&mut self, record: EntityRecord) -> EntityKey {
        let key = record.key();
        if self.entries.contains_key(&key) {
            tracing::trace!(entity = record.entity(), "identity map hit, existing record wins");
            return key;
        }
        for role in record.pending_eager_roles() {
            self.pending_eager.push((key.clone(), role));
        }
        self.entries.insert(
            key.clone(),
            ManagedEntry {
                record,
                status: EntityStatus::Managed,
            },
        );
        key
    }

    /// The managed record for a key, if any.
    pub fn get(&self, key: &EntityKey) -> Option<&EntityRecord> {
        self.entries.get(key).map(|e| &e.record)
    }

    /// The managed record and its status for a key, if any.
    pub fn lookup(&self, key: &EntityKey) -> Option<(&EntityRecord, EntityStatus)> {
        self.entries.get(key).map(|e| (&e.record, e.status))
    }

    /// Lifecycle status of a managed key, if any.
    pub fn status(&self, key: &EntityKey) -> Option<EntityStatus> {
        self.entries.get(key).map(|e| e.status)
    }

    /// Is this key managed?
    pub fn contains(&self, key: &EntityKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Mark a managed record deleted; false when the key is not managed.
    pub fn mark_deleted(&mut self, key: &EntityKey) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.status = EntityStatus::Deleted;
                true
            }
            None => false,
        }
    }

    /// Number of managed entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Is the identity map empty?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Enter one load scope.
    pub fn begin_load(&mut self) {
        self.load_depth += 1;
        tracing::trace!(depth = self.load_depth, "begin load scope");
    }

    /// Leave one load scope.
    ///
    /// When the outermost scope ends, queued eager attachment roles are
    /// drained: each is marked initialized on its managed record. Runs on
    /// failure paths too; callers pair it with `begin_load` around the
    /// whole materialization attempt.
    pub fn finish_load(&mut self) {
        self.load_depth = self.load_depth.saturating_sub(1);
        tracing::trace!(depth = self.load_depth, "finish load scope");
        if self.load_depth > 0 {
            return;
        }
        for (key, role) in self.pending_eager.drain(..) {
            if let Some(entry) = self.entries.get_mut(&key) {
                if let Some(attachment) = entry.record.attachment_mut(&role) {
                    attachment.mark_initialized();
                    tracing::trace!(entity = key.entity(), role = role.as_str(), "initialized eager attachment");
                }
            }
        }
    }

    /// Current load-scope depth.
    pub const fn load_depth(&self) -> usize {
        self.load_depth
    }

    /// Drop all managed entries, the load depth, and the pending queue.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.load_depth = 0;
        self.pending_eager.clear();
    }
}
