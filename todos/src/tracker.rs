//! In-flight operation tracking.
//!
//! Items with a pending update or delete render with a loading indicator.
//! A create has no id yet, so it is tracked through a single placeholder
//! slot instead.

use crate::types::{Todo, TodoId};
use std::collections::HashMap;

/// Ids with requests in flight, plus the create placeholder
///
/// Pending ids are counted, so two overlapping requests for the same item
/// (a toggle racing a rename, say) keep it loading until both settle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationTracker {
    pending: HashMap<TodoId, usize>,
    placeholder: Option<Todo>,
}

impl OperationTracker {
    /// Creates an empty tracker
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request issued for `id`
    pub fn mark_pending(&mut self, id: TodoId) {
        *self.pending.entry(id).or_insert(0) += 1;
    }

    /// Records that a request for `id` settled
    ///
    /// Clearing an id with nothing in flight is a no-op.
    pub fn clear_pending(&mut self, id: TodoId) {
        if let Some(count) = self.pending.get_mut(&id) {
            *count -= 1;
            if *count == 0 {
                self.pending.remove(&id);
            }
        }
    }

    /// Whether `id` has a request in flight
    #[must_use]
    pub fn is_pending(&self, id: TodoId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Ids with requests in flight, ascending
    #[must_use]
    pub fn pending_ids(&self) -> Vec<TodoId> {
        let mut ids: Vec<TodoId> = self.pending.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Whether nothing is in flight
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.placeholder.is_none()
    }

    /// Installs or clears the placeholder, returning the previous one
    pub fn set_placeholder(&mut self, placeholder: Option<Todo>) -> Option<Todo> {
        std::mem::replace(&mut self.placeholder, placeholder)
    }

    /// The placeholder of the create in flight
    #[must_use]
    pub const fn placeholder(&self) -> Option<&Todo> {
        self.placeholder.as_ref()
    }

    /// Forgets everything in flight; returns how many requests were dropped
    pub fn abandon_all(&mut self) -> usize {
        let requests = self.pending.drain().map(|(_, count)| count).sum::<usize>();
        requests + usize::from(self.placeholder.take().is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_and_clear() {
        let mut tracker = OperationTracker::new();
        tracker.mark_pending(TodoId::new(3));
        tracker.mark_pending(TodoId::new(1));

        assert!(tracker.is_pending(TodoId::new(3)));
        assert_eq!(tracker.pending_ids(), vec![TodoId::new(1), TodoId::new(3)]);

        tracker.clear_pending(TodoId::new(3));
        assert!(!tracker.is_pending(TodoId::new(3)));
    }

    #[test]
    fn clear_is_idempotent() {
        let mut tracker = OperationTracker::new();
        tracker.clear_pending(TodoId::new(7));
        tracker.mark_pending(TodoId::new(7));
        tracker.clear_pending(TodoId::new(7));
        tracker.clear_pending(TodoId::new(7));

        assert!(tracker.is_idle());
    }

    #[test]
    fn overlapping_requests_keep_item_pending() {
        let mut tracker = OperationTracker::new();
        tracker.mark_pending(TodoId::new(2));
        tracker.mark_pending(TodoId::new(2));

        tracker.clear_pending(TodoId::new(2));
        assert!(tracker.is_pending(TodoId::new(2)));

        tracker.clear_pending(TodoId::new(2));
        assert!(!tracker.is_pending(TodoId::new(2)));
    }

    #[test]
    fn abandon_all_clears_pending_and_placeholder() {
        let mut tracker = OperationTracker::new();
        tracker.mark_pending(TodoId::new(2));
        tracker.mark_pending(TodoId::new(2));
        tracker.mark_pending(TodoId::new(5));
        tracker.set_placeholder(Some(Todo::placeholder(1, "New")));

        assert_eq!(tracker.abandon_all(), 4);
        assert!(tracker.is_idle());
        assert_eq!(tracker.abandon_all(), 0);
    }

    #[test]
    fn placeholder_slot() {
        let mut tracker = OperationTracker::new();
        assert!(tracker.set_placeholder(Some(Todo::placeholder(1, "New"))).is_none());
        assert!(!tracker.is_idle());
        assert_eq!(tracker.placeholder().map(|todo| todo.title.as_str()), Some("New"));

        let previous = tracker.set_placeholder(None);
        assert_eq!(previous.map(|todo| todo.title), Some("New".to_string()));
        assert!(tracker.is_idle());
    }
}
