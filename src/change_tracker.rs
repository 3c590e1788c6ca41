//! Per-entity state machine and the tracker that enforces it.
//!
//! Entities here are owned values, not reference types, so identity can't
//! be borrowed-pointer equality: each tracked entity gets an opaque
//! [`TrackingHandle`] when it's first staged or loaded, and every
//! subsequent `track_*` call against that same handle applies the
//! transition table below.

use std::collections::HashMap;

/// An opaque per-session identity for one tracked entity. Allocated by
/// [`ChangeTracker::allocate_handle`]; never reused within a tracker's
/// lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackingHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Unchanged,
    Added,
    Modified,
    Deleted,
}

/// Tracks one entity type's staged mutations. [`crate::Session`] owns one
/// tracker per [`crate::EntitySet`].
#[derive(Default)]
pub struct ChangeTracker<T> {
    next_handle: u64,
    entries: HashMap<TrackingHandle, (T, EntityState)>,
}

impl<T: Clone> ChangeTracker<T> {
    pub fn new() -> Self {
        Self { next_handle: 0, entries: HashMap::new() }
    }

    pub fn allocate_handle(&mut self) -> TrackingHandle {
        let handle = TrackingHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    pub fn state_of(&self, handle: TrackingHandle) -> Option<EntityState> {
        self.entries.get(&handle).map(|(_, state)| *state)
    }

    pub fn entity_of(&self, handle: TrackingHandle) -> Option<&T> {
        self.entries.get(&handle).map(|(entity, _)| entity)
    }

    pub fn track_add(&mut self, handle: TrackingHandle, entity: T) {
        self.entries.insert(handle, (entity, EntityState::Added));
    }

    pub fn track_modify(&mut self, handle: TrackingHandle, entity: T) {
        match self.entries.get(&handle) {
            None => {
                self.entries.insert(handle, (entity, EntityState::Modified));
            }
            Some((_, EntityState::Added)) => {
                // Added cannot transition to Modified; it stays Added.
                self.entries.insert(handle, (entity, EntityState::Added));
            }
            Some((_, EntityState::Deleted)) => {
                // Already staged for deletion: the mutation is moot.
            }
            Some((_, EntityState::Modified | EntityState::Unchanged)) => {
                self.entries.insert(handle, (entity, EntityState::Modified));
            }
        }
    }

    pub fn track_delete(&mut self, handle: TrackingHandle, entity: T) {
        match self.entries.get(&handle) {
            Some((_, EntityState::Added)) => {
                // Added→Deleted collapses to absence: never existed as far
                // as the database is concerned.
                self.entries.remove(&handle);
            }
            Some((_, _)) => {
                self.entries.insert(handle, (entity, EntityState::Deleted));
            }
            None => {
                self.entries.insert(handle, (entity, EntityState::Deleted));
            }
        }
    }

    pub fn track_unchanged(&mut self, handle: TrackingHandle, entity: T) {
        match self.entries.get(&handle) {
            Some((_, state @ (EntityState::Added | EntityState::Modified | EntityState::Deleted))) => {
                let state = *state;
                self.entries.insert(handle, (entity, state));
            }
            _ => {
                self.entries.insert(handle, (entity, EntityState::Unchanged));
            }
        }
    }

    /// Overwrites a tracked entity's data without touching its state.
    /// `Session::save_changes` uses this to assign an auto-increment
    /// primary key back onto an Added entity once the transaction that
    /// inserted it has actually committed.
    pub fn replace_entity(&mut self, handle: TrackingHandle, entity: T) {
        if let Some((_, state)) = self.entries.get(&handle) {
            let state = *state;
            self.entries.insert(handle, (entity, state));
        }
    }

    pub fn has_changes(&self) -> bool {
        self.entries.values().any(|(_, state)| *state != EntityState::Unchanged)
    }

    /// Every tracked entity, in allocation order, regardless of state.
    pub fn iter(&self) -> impl Iterator<Item = (TrackingHandle, &T, EntityState)> {
        let mut all: Vec<_> = self.entries.iter().map(|(handle, (entity, state))| (*handle, entity, *state)).collect();
        all.sort_by_key(|(handle, _, _)| handle.0);
        all.into_iter()
    }

    /// Every handle with a pending Add/Modify/Delete, in allocation order.
    pub fn pending_changes(&self) -> Vec<(TrackingHandle, &T, EntityState)> {
        let mut pending: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, (_, state))| *state != EntityState::Unchanged)
            .map(|(handle, (entity, state))| (*handle, entity, *state))
            .collect();
        pending.sort_by_key(|(handle, _, _)| handle.0);
        pending
    }

    /// Drops Deleted entries and resets everything else to Unchanged,
    /// after a successful `SaveChanges`.
    pub fn accept_all_changes(&mut self) {
        self.entries.retain(|_, (_, state)| *state != EntityState::Deleted);
        for (_, state) in self.entries.values_mut() {
            *state = EntityState::Unchanged;
        }
    }

    /// Clears every tracked entity, as `Dispose` does for the session.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn added_then_deleted_collapses_to_absence() {
        let mut tracker: ChangeTracker<&str> = ChangeTracker::new();
        let handle = tracker.allocate_handle();
        tracker.track_add(handle, "a");
        tracker.track_delete(handle, "a");
        assert_eq!(tracker.state_of(handle), None);
    }

    #[test]
    fn delete_of_a_never_tracked_handle_inserts_a_fresh_deleted_entry() {
        let mut tracker: ChangeTracker<&str> = ChangeTracker::new();
        let handle = tracker.allocate_handle();
        tracker.track_delete(handle, "a");
        assert_eq!(tracker.state_of(handle), Some(EntityState::Deleted));
    }

    #[test]
    fn added_cannot_become_modified() {
        let mut tracker: ChangeTracker<&str> = ChangeTracker::new();
        let handle = tracker.allocate_handle();
        tracker.track_add(handle, "a");
        tracker.track_modify(handle, "b");
        assert_eq!(tracker.state_of(handle), Some(EntityState::Added));
    }

    #[test]
    fn modify_after_delete_leaves_it_deleted() {
        let mut tracker: ChangeTracker<&str> = ChangeTracker::new();
        let handle = tracker.allocate_handle();
        tracker.track_unchanged(handle, "a");
        tracker.track_delete(handle, "a");
        tracker.track_modify(handle, "b");
        assert_eq!(tracker.state_of(handle), Some(EntityState::Deleted));
    }

    #[test]
    fn accept_all_changes_drops_deleted_and_resets_the_rest() {
        let mut tracker: ChangeTracker<&str> = ChangeTracker::new();
        let added = tracker.allocate_handle();
        tracker.track_add(added, "a");
        let deleted = tracker.allocate_handle();
        tracker.track_unchanged(deleted, "b");
        tracker.track_delete(deleted, "b");

        tracker.accept_all_changes();

        assert_eq!(tracker.state_of(added), Some(EntityState::Unchanged));
        assert_eq!(tracker.state_of(deleted), None);
        assert!(!tracker.has_changes());
    }

    #[test]
    fn unchanged_is_overridden_by_a_prior_pending_state() {
        let mut tracker: ChangeTracker<&str> = ChangeTracker::new();
        let handle = tracker.allocate_handle();
        tracker.track_add(handle, "a");
        tracker.track_unchanged(handle, "a-reloaded");
        assert_eq!(tracker.state_of(handle), Some(EntityState::Added));
    }
}
