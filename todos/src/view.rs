//! Derived view of the to-do list.
//!
//! Everything here is a pure function of [`TodoState`]: nothing is cached,
//! the view is recomputed whenever it is asked for.

use crate::types::{EditSession, ErrorKind, Filter, Focus, Todo, TodoState};
use chrono::{DateTime, Utc};

/// Items of `todos` matching `filter`, in collection order
#[must_use]
pub fn filtered(todos: &[Todo], filter: Filter) -> Vec<&Todo> {
    todos.iter().filter(|todo| filter.matches(todo)).collect()
}

/// Number of completed items
#[must_use]
pub fn completed_count(todos: &[Todo]) -> usize {
    todos.iter().filter(|todo| todo.completed).count()
}

/// Number of items not yet completed
#[must_use]
pub fn active_count(todos: &[Todo]) -> usize {
    todos.len() - completed_count(todos)
}

/// Whether every item is completed
///
/// An empty list counts as all completed.
#[must_use]
pub fn all_completed(todos: &[Todo]) -> bool {
    todos.iter().all(|todo| todo.completed)
}

/// Footer counter text
#[must_use]
pub fn items_left_label(active: usize) -> String {
    format!("{active} items left")
}

/// One rendered item
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TodoRow {
    /// The item
    pub todo: Todo,
    /// A request for this item is in flight
    pub is_loading: bool,
    /// The inline edit field is open for this item
    pub is_editing: bool,
}

/// Snapshot of everything the UI renders
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TodoView {
    /// Items matching the filter
    pub rows: Vec<TodoRow>,
    /// Optimistic row of the create in flight, always loading
    pub placeholder: Option<TodoRow>,
    /// Current filter
    pub filter: Filter,
    /// Items not yet completed
    pub active_count: usize,
    /// Completed items
    pub completed_count: usize,
    /// Every item is completed (true for an empty list)
    pub all_completed: bool,
    /// Footer counter text
    pub items_left_label: String,
    /// The list section is shown
    pub show_main: bool,
    /// The new-todo input is disabled while a create is in flight
    pub input_disabled: bool,
    /// The toggle-all control is shown
    pub toggle_all_visible: bool,
    /// The clear-completed button is enabled
    pub clear_completed_enabled: bool,
    /// Current error
    pub error: ErrorKind,
    /// Message of the current error
    pub error_message: Option<&'static str>,
    /// When the current error was raised, for rendering how long it has left
    pub error_raised_at: Option<DateTime<Utc>>,
    /// Contents of the new-todo input
    pub draft: String,
    /// Open inline edit
    pub editing: Option<EditSession>,
    /// Input that should hold focus
    pub focus: Option<Focus>,
}

impl TodoView {
    /// Derives the view of `state`
    #[must_use]
    pub fn of(state: &TodoState) -> Self {
        let editing_id = state.editing.as_ref().map(|session| session.id);
        let rows = filtered(&state.todos, state.filter)
            .into_iter()
            .map(|todo| TodoRow {
                todo: todo.clone(),
                is_loading: state.tracker.is_pending(todo.id),
                is_editing: editing_id == Some(todo.id),
            })
            .collect();

        let placeholder = state.tracker.placeholder().map(|todo| TodoRow {
            todo: todo.clone(),
            is_loading: true,
            is_editing: false,
        });

        let completed = completed_count(&state.todos);
        let active = state.todos.len() - completed;

        Self {
            rows,
            show_main: !state.todos.is_empty() || placeholder.is_some(),
            input_disabled: placeholder.is_some(),
            placeholder,
            filter: state.filter,
            active_count: active,
            completed_count: completed,
            all_completed: all_completed(&state.todos),
            items_left_label: items_left_label(active),
            toggle_all_visible: !state.todos.is_empty(),
            clear_completed_enabled: completed > 0,
            error: state.error.kind(),
            error_message: state.error.message(),
            error_raised_at: state.error.raised_at(),
            draft: state.draft.clone(),
            editing: state.editing.clone(),
            focus: state.focus,
        }
    }

    /// Whether any row or the placeholder is loading
    #[must_use]
    pub fn any_loading(&self) -> bool {
        self.placeholder.is_some() || self.rows.iter().any(|row| row.is_loading)
    }
}

impl TodoState {
    /// Derives the view of this state
    #[must_use]
    pub fn view(&self) -> TodoView {
        TodoView::of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TodoId;
    use proptest::prelude::*;
    use todosync_core::environment::Clock;
    use todosync_testing::test_clock;

    fn sample() -> Vec<Todo> {
        vec![
            Todo::new(1, 1, "Write report", false),
            Todo::new(2, 1, "Buy milk", true),
            Todo::new(3, 1, "Call mom", false),
        ]
    }

    #[test]
    fn filters_preserve_order() {
        let todos = sample();
        let active: Vec<u64> = filtered(&todos, Filter::Active).iter().map(|t| t.id.get()).collect();
        let completed: Vec<u64> = filtered(&todos, Filter::Completed).iter().map(|t| t.id.get()).collect();

        assert_eq!(active, vec![1, 3]);
        assert_eq!(completed, vec![2]);
        assert_eq!(filtered(&todos, Filter::All).len(), 3);
    }

    #[test]
    fn all_completed_edge_cases() {
        assert!(all_completed(&[]));
        assert!(!all_completed(&[Todo::new(1, 1, "a", false)]));
        assert!(all_completed(&[Todo::new(1, 1, "a", true)]));
    }

    #[test]
    fn empty_state_view() {
        let view = TodoState::new().view();

        assert!(!view.show_main);
        assert!(!view.toggle_all_visible);
        assert!(!view.input_disabled);
        assert!(view.all_completed);
        assert_eq!(view.items_left_label, "0 items left");
        assert_eq!(view.error_message, None);
        assert_eq!(view.error_raised_at, None);
    }

    #[test]
    fn view_carries_error_timestamp() {
        let raised_at = test_clock().now();
        let mut state = TodoState::new();
        state.error.raise(ErrorKind::AddTodo, raised_at);

        let view = state.view();
        assert_eq!(view.error_message, Some("Unable to add a todo"));
        assert_eq!(view.error_raised_at, Some(raised_at));

        state.error.dismiss();
        assert_eq!(state.view().error_raised_at, None);
    }

    #[test]
    fn view_marks_pending_rows_and_placeholder() {
        let mut state = TodoState::with_todos(sample());
        state.tracker.mark_pending(TodoId::new(3));
        state.tracker.set_placeholder(Some(Todo::placeholder(1, "New")));
        state.filter = Filter::Active;

        let view = state.view();

        assert_eq!(view.rows.len(), 2);
        assert!(!view.rows[0].is_loading);
        assert!(view.rows[1].is_loading);
        assert!(view.placeholder.as_ref().is_some_and(|row| row.is_loading));
        assert!(view.input_disabled);
        assert!(view.any_loading());
        assert_eq!(view.items_left_label, "2 items left");
        assert!(view.clear_completed_enabled);
    }

    #[test]
    fn placeholder_alone_shows_main() {
        let mut state = TodoState::new();
        state.tracker.set_placeholder(Some(Todo::placeholder(1, "First")));

        let view = state.view();
        assert!(view.show_main);
        assert!(!view.toggle_all_visible);
    }

    fn arb_todos() -> impl Strategy<Value = Vec<Todo>> {
        prop::collection::vec(any::<bool>(), 0..40).prop_map(|flags| {
            flags
                .into_iter()
                .enumerate()
                .map(|(index, completed)| Todo::new(index as u64 + 1, 1, format!("todo {index}"), completed))
                .collect()
        })
    }

    fn arb_filter() -> impl Strategy<Value = Filter> {
        prop::sample::select(Filter::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn filtered_is_ordered_subset(todos in arb_todos(), filter in arb_filter()) {
            let subset = filtered(&todos, filter);
            let mut source = todos.iter();
            for item in &subset {
                prop_assert!(filter.matches(item));
                prop_assert!(source.any(|candidate| candidate == *item));
            }
        }

        #[test]
        fn all_filter_keeps_everything(todos in arb_todos()) {
            prop_assert_eq!(filtered(&todos, Filter::All).len(), todos.len());
        }

        #[test]
        fn counts_partition_the_list(todos in arb_todos()) {
            prop_assert_eq!(active_count(&todos) + completed_count(&todos), todos.len());
            prop_assert_eq!(filtered(&todos, Filter::Active).len(), active_count(&todos));
            prop_assert_eq!(all_completed(&todos), active_count(&todos) == 0);
        }
    }
}
