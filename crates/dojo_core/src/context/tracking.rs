//! Identity map and snapshot-based change tracking.
//!
//! # Responsibility
//! - Keep one shared in-memory instance per persisted primary key.
//! - Detect field-level mutations by comparing current values against the
//!   last-committed snapshot.
//!
//! # Invariants
//! - A key is in at most one of `tracked` or `deleted`.
//! - `snapshots` holds exactly the last-committed value for every tracked key.
//! - Read-through attach never overwrites in-memory state: the tracked
//!   instance wins over a freshly queried row.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Lifecycle state of one tracked record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Matches the last-committed snapshot.
    Unchanged,
    /// Queued for insert; no identifier yet.
    Added,
    /// Differs from the last-committed snapshot.
    Modified,
    /// Queued for delete.
    Deleted,
}

/// Record category of a tracked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Samurai,
    Quote,
    SecretIdentity,
}

/// One row of the tracked-entries report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityEntry {
    pub kind: EntityKind,
    /// `None` for records that have never been committed.
    pub id: Option<i64>,
    pub state: EntityState,
}

/// Identity map plus snapshots for one record type.
pub(crate) struct TrackedSet<E> {
    tracked: HashMap<i64, Rc<RefCell<E>>>,
    snapshots: HashMap<i64, E>,
    deleted: HashMap<i64, Rc<RefCell<E>>>,
}

impl<E: Clone + PartialEq> TrackedSet<E> {
    pub fn new() -> Self {
        Self {
            tracked: HashMap::new(),
            snapshots: HashMap::new(),
            deleted: HashMap::new(),
        }
    }

    /// Returns the tracked handle for `id`, if any (delete-marked included).
    pub fn get(&self, id: i64) -> Option<Rc<RefCell<E>>> {
        self.tracked
            .get(&id)
            .or_else(|| self.deleted.get(&id))
            .cloned()
    }

    /// Read-through attach of a freshly queried row.
    ///
    /// Returns the existing handle when `id` is already tracked, otherwise
    /// starts tracking `row` as Unchanged and returns the new handle.
    pub fn attach(&mut self, id: i64, row: E) -> Rc<RefCell<E>> {
        if let Some(existing) = self.get(id) {
            return existing;
        }

        let handle = Rc::new(RefCell::new(row.clone()));
        self.tracked.insert(id, Rc::clone(&handle));
        self.snapshots.insert(id, row);
        handle
    }

    /// Starts tracking a freshly inserted record as Unchanged.
    pub fn adopt(&mut self, id: i64, handle: Rc<RefCell<E>>) {
        self.snapshots.insert(id, handle.borrow().clone());
        self.tracked.insert(id, handle);
    }

    /// Marks a tracked record for deletion. Returns false when untracked.
    pub fn mark_deleted(&mut self, id: i64) -> bool {
        match self.tracked.remove(&id) {
            Some(handle) => {
                self.deleted.insert(id, handle);
                true
            }
            None => false,
        }
    }

    /// Marks every tracked record matching `pred` for deletion.
    pub fn mark_deleted_where(&mut self, pred: impl Fn(&E) -> bool) {
        let ids: Vec<i64> = self
            .tracked
            .iter()
            .filter(|(_, handle)| pred(&handle.borrow()))
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            self.mark_deleted(id);
        }
    }

    /// Current values of records that differ from their snapshot.
    pub fn modified_values(&self) -> Vec<E> {
        let mut values: Vec<(i64, E)> = self
            .tracked
            .iter()
            .filter(|(id, handle)| {
                self.snapshots
                    .get(id)
                    .is_some_and(|snapshot| *snapshot != *handle.borrow())
            })
            .map(|(id, handle)| (*id, handle.borrow().clone()))
            .collect();
        values.sort_by_key(|(id, _)| *id);
        values.into_iter().map(|(_, value)| value).collect()
    }

    /// Keys currently marked for deletion, in ascending order.
    pub fn deleted_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.deleted.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Accepts a successful commit: snapshots refresh to current values and
    /// delete marks are dropped.
    pub fn accept_commit(&mut self) {
        for (id, _) in self.deleted.drain() {
            self.snapshots.remove(&id);
        }
        for (id, handle) in &self.tracked {
            self.snapshots.insert(*id, handle.borrow().clone());
        }
    }

    /// Reports every tracked and delete-marked record.
    pub fn entries(&self, kind: EntityKind) -> Vec<EntityEntry> {
        let mut entries: Vec<EntityEntry> = self
            .tracked
            .iter()
            .map(|(id, handle)| {
                let state = match self.snapshots.get(id) {
                    Some(snapshot) if *snapshot != *handle.borrow() => EntityState::Modified,
                    _ => EntityState::Unchanged,
                };
                EntityEntry {
                    kind,
                    id: Some(*id),
                    state,
                }
            })
            .collect();

        entries.extend(self.deleted.keys().map(|id| EntityEntry {
            kind,
            id: Some(*id),
            state: EntityState::Deleted,
        }));

        entries.sort_by_key(|entry| entry.id);
        entries
    }
}
