//! Reducer logic for the to-do list.
//!
//! Every mutation follows the same shape: mark the work as in flight, return
//! an effect that calls the remote resource, and apply the outcome action
//! that effect feeds back. Nothing is changed locally until the server
//! confirms it, so a failure only has to undo the in-flight markers and
//! surface an error.

use crate::api::TodosApi;
use crate::batch::{fan_out, BatchSummary, ItemOutcome};
use crate::config::{AppConfig, USER_ID};
use crate::types::{EditSession, ErrorKind, Focus, NewTodo, Todo, TodoAction, TodoId, TodoState};
use crate::view;
use std::sync::Arc;
use std::time::Duration;
use todosync_core::{
    cancellable, delay, effect::Effect, environment::Clock, reducer::Reducer, smallvec, SmallVec,
};

/// How long an error stays visible unless configured otherwise
pub const DEFAULT_ERROR_DISPLAY: Duration = Duration::from_secs(3);

/// Cancellation ids of the effects this reducer returns
pub mod effect_ids {
    use crate::types::TodoId;

    /// Initial fetch
    pub const LOAD: &str = "load";
    /// Create request
    pub const CREATE: &str = "create";
    /// Toggle-all batch
    pub const TOGGLE_ALL: &str = "toggle-all";
    /// Clear-completed batch
    pub const CLEAR_COMPLETED: &str = "clear-completed";
    /// Error display timer
    pub const ERROR_NOTICE: &str = "error-notice";

    /// Update or delete of a single item
    #[must_use]
    pub fn item(id: TodoId) -> String {
        format!("todo:{id}")
    }
}

type Effects = SmallVec<[Effect<TodoAction>; 4]>;

/// Environment dependencies for the to-do reducer
#[derive(Clone)]
pub struct TodoEnvironment {
    /// Remote todos resource
    pub api: Arc<dyn TodosApi>,
    /// Clock for error timestamps
    pub clock: Arc<dyn Clock>,
    /// Owner of created items and scope of the initial fetch
    pub user_id: u64,
    /// How long an error stays visible
    pub error_display: Duration,
}

impl TodoEnvironment {
    /// Creates a `TodoEnvironment` with the default owner and display time
    #[must_use]
    pub fn new(api: Arc<dyn TodosApi>, clock: Arc<dyn Clock>) -> Self {
        Self {
            api,
            clock,
            user_id: USER_ID,
            error_display: DEFAULT_ERROR_DISPLAY,
        }
    }

    /// Creates a `TodoEnvironment` using configured timings
    #[must_use]
    pub fn from_config(api: Arc<dyn TodosApi>, clock: Arc<dyn Clock>, config: &AppConfig) -> Self {
        Self::new(api, clock).with_error_display(config.error_display())
    }

    /// Overrides how long an error stays visible
    #[must_use]
    pub const fn with_error_display(mut self, error_display: Duration) -> Self {
        self.error_display = error_display;
        self
    }
}

/// What submitting an edit should do
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenamePlan {
    /// The trimmed input equals the current title; nothing to send
    Unchanged,
    /// The trimmed input is empty; the item is deleted
    Delete,
    /// Update the item with this trimmed title
    Update(String),
}

/// Decides what submitting `input` as the new title of an item titled `current` does
#[must_use]
pub fn plan_rename(current: &str, input: &str) -> RenamePlan {
    let title = input.trim();
    if title == current {
        RenamePlan::Unchanged
    } else if title.is_empty() {
        RenamePlan::Delete
    } else {
        RenamePlan::Update(title.to_string())
    }
}

/// Reducer for the to-do list
#[derive(Clone, Debug, Default)]
pub struct TodoReducer;

impl TodoReducer {
    /// Creates a new `TodoReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Shows `kind` and schedules its expiry
    fn surface(state: &mut TodoState, kind: ErrorKind, env: &TodoEnvironment) -> Effect<TodoAction> {
        let generation = state.error.raise(kind, env.clock.now());
        let expiry = delay! {
            duration: env.error_display,
            action: TodoAction::ErrorExpired { generation }
        };
        expiry.cancellable(effect_ids::ERROR_NOTICE)
    }

    fn load(env: &TodoEnvironment) -> Effects {
        let api = Arc::clone(&env.api);
        let user_id = env.user_id;
        tracing::info!(user_id, "Loading todos");

        smallvec![cancellable! {
            id: effect_ids::LOAD,
            async {
                match api.list_todos(user_id).await {
                    Ok(todos) => Some(TodoAction::TodosLoaded { todos }),
                    Err(error) => Some(TodoAction::LoadFailed { error }),
                }
            }
        }]
    }

    fn add(state: &mut TodoState, title: &str, env: &TodoEnvironment) -> Effects {
        if state.is_creating() {
            tracing::debug!("Create already in flight, submission ignored");
            return SmallVec::new();
        }

        let title = title.trim();
        if title.is_empty() {
            return smallvec![Self::surface(state, ErrorKind::EmptyTitle, env)];
        }

        state
            .tracker
            .set_placeholder(Some(Todo::placeholder(env.user_id, title)));
        tracing::info!(title, "Creating todo");

        let api = Arc::clone(&env.api);
        let new_todo = NewTodo::new(title, env.user_id);
        smallvec![cancellable! {
            id: effect_ids::CREATE,
            async {
                match api.create_todo(new_todo).await {
                    Ok(todo) => Some(TodoAction::TodoAdded { todo }),
                    Err(error) => Some(TodoAction::AddFailed { error }),
                }
            }
        }]
    }

    fn delete(state: &mut TodoState, id: TodoId, env: &TodoEnvironment) -> Effects {
        if !state.exists(id) {
            tracing::debug!(%id, "Delete of unknown todo ignored");
            return SmallVec::new();
        }

        state.tracker.mark_pending(id);
        tracing::info!(%id, "Deleting todo");

        let api = Arc::clone(&env.api);
        smallvec![cancellable! {
            id: effect_ids::item(id),
            async {
                match api.delete_todo(id).await {
                    Ok(()) => Some(TodoAction::TodoDeleted { id }),
                    Err(error) => Some(TodoAction::DeleteFailed { id, error }),
                }
            }
        }]
    }

    fn update(state: &mut TodoState, todo: Todo, env: &TodoEnvironment) -> Effects {
        let id = todo.id;
        if !state.exists(id) {
            tracing::debug!(%id, "Update of unknown todo ignored");
            return SmallVec::new();
        }

        state.tracker.mark_pending(id);
        tracing::info!(%id, completed = todo.completed, "Updating todo");

        let api = Arc::clone(&env.api);
        smallvec![cancellable! {
            id: effect_ids::item(id),
            async {
                match api.update_todo(todo).await {
                    Ok(todo) => Some(TodoAction::TodoUpdated { todo }),
                    Err(error) => Some(TodoAction::UpdateFailed { id, error }),
                }
            }
        }]
    }

    /// Completes every active item, or reopens every item when none is active
    ///
    /// The completing branch sends only the active items; already completed
    /// ones are left alone.
    fn toggle_all(state: &mut TodoState, env: &TodoEnvironment) -> Effects {
        let complete = view::active_count(&state.todos) > 0;
        let requests: Vec<(TodoId, Todo)> = state
            .todos
            .iter()
            .filter(|todo| !complete || !todo.completed)
            .map(|todo| (todo.id, todo.with_completed(complete)))
            .collect();

        if requests.is_empty() {
            return SmallVec::new();
        }

        for (id, _) in &requests {
            state.tracker.mark_pending(*id);
        }
        tracing::info!(count = requests.len(), completed = complete, "Toggling all todos");

        let api = Arc::clone(&env.api);
        smallvec![cancellable! {
            id: effect_ids::TOGGLE_ALL,
            async {
                let outcomes = fan_out(requests, |todo| api.update_todo(todo)).await;
                Some(TodoAction::ToggleAllFinished { outcomes })
            }
        }]
    }

    fn clear_completed(state: &mut TodoState, env: &TodoEnvironment) -> Effects {
        let requests: Vec<(TodoId, TodoId)> = state
            .todos
            .iter()
            .filter(|todo| todo.completed)
            .map(|todo| (todo.id, todo.id))
            .collect();

        if requests.is_empty() {
            return SmallVec::new();
        }

        for (id, _) in &requests {
            state.tracker.mark_pending(*id);
        }
        tracing::info!(count = requests.len(), "Clearing completed todos");

        let api = Arc::clone(&env.api);
        smallvec![cancellable! {
            id: effect_ids::CLEAR_COMPLETED,
            async {
                let outcomes = fan_out(requests, |id| api.delete_todo(id)).await;
                Some(TodoAction::ClearCompletedFinished { outcomes })
            }
        }]
    }

    fn rename(state: &mut TodoState, id: TodoId, input: &str, env: &TodoEnvironment) -> Effects {
        let Some(todo) = state.get(id).cloned() else {
            close_edit(state, id);
            return SmallVec::new();
        };

        match plan_rename(&todo.title, input) {
            RenamePlan::Unchanged => {
                close_edit(state, id);
                SmallVec::new()
            },
            RenamePlan::Delete => {
                mark_submitted(state, id);
                Self::delete(state, id, env)
            },
            RenamePlan::Update(title) => {
                mark_submitted(state, id);
                Self::update(state, todo.with_title(title), env)
            },
        }
    }

    fn apply_toggle_all(
        state: &mut TodoState,
        outcomes: Vec<ItemOutcome<Todo>>,
        env: &TodoEnvironment,
    ) -> Effects {
        let summary = BatchSummary::of(&outcomes);
        for outcome in outcomes {
            state.tracker.clear_pending(outcome.id);
            match outcome.result {
                Ok(todo) => {
                    state.replace(todo);
                },
                Err(error) => tracing::warn!(id = %outcome.id, %error, "Toggle-all update failed"),
            }
        }
        tracing::info!(succeeded = summary.succeeded, failed = summary.failed, "Toggle-all finished");

        if summary.failed > 0 {
            smallvec![Self::surface(state, ErrorKind::UpdateTodo, env)]
        } else {
            SmallVec::new()
        }
    }

    fn apply_clear_completed(
        state: &mut TodoState,
        outcomes: Vec<ItemOutcome<()>>,
        env: &TodoEnvironment,
    ) -> Effects {
        let summary = BatchSummary::of(&outcomes);
        for outcome in outcomes {
            state.tracker.clear_pending(outcome.id);
            match outcome.result {
                Ok(()) => {
                    state.remove(outcome.id);
                    close_edit(state, outcome.id);
                },
                Err(error) => tracing::warn!(id = %outcome.id, %error, "Clear-completed delete failed"),
            }
        }
        tracing::info!(succeeded = summary.succeeded, failed = summary.failed, "Clear-completed finished");
        if summary.succeeded > 0 {
            state.focus = Some(Focus::NewTodoInput);
        }

        if summary.failed > 0 {
            state.focus = Some(Focus::NewTodoInput);
            smallvec![Self::surface(state, ErrorKind::DeleteTodo, env)]
        } else {
            SmallVec::new()
        }
    }
}

/// Closes the edit session of `id`, if one is open
fn close_edit(state: &mut TodoState, id: TodoId) {
    if state.editing.as_ref().is_some_and(|session| session.id == id) {
        state.editing = None;
    }
}

/// Marks the edit session of `id` as waiting for the server
fn mark_submitted(state: &mut TodoState, id: TodoId) {
    if let Some(session) = state.editing.as_mut().filter(|session| session.id == id) {
        session.submitted = true;
    }
}

/// Resolves a submitted edit of `id`: closes it on success, reopens it on failure
///
/// Returns `false` when no submitted edit of `id` exists.
fn settle_edit(state: &mut TodoState, id: TodoId, succeeded: bool) -> bool {
    let Some(session) = state
        .editing
        .as_mut()
        .filter(|session| session.id == id && session.submitted)
    else {
        return false;
    };

    if succeeded {
        state.editing = None;
    } else {
        session.submitted = false;
        state.focus = Some(Focus::EditField(id));
    }
    true
}

impl Reducer for TodoReducer {
    type State = TodoState;
    type Action = TodoAction;
    type Environment = TodoEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        tracing::trace!(action = action.name(), "Reducing action");

        match action {
            // ========== Commands ==========
            TodoAction::LoadTodos => Self::load(env),

            TodoAction::EditDraft { text } => {
                state.draft = text;
                SmallVec::new()
            },

            TodoAction::SubmitDraft => {
                let draft = state.draft.clone();
                Self::add(state, &draft, env)
            },

            TodoAction::AddTodo { title } => Self::add(state, &title, env),

            TodoAction::DeleteTodo { id } => Self::delete(state, id, env),

            TodoAction::UpdateTodo { todo } => Self::update(state, todo, env),

            TodoAction::ToggleTodo { id } => {
                let Some(toggled) = state.get(id).map(|todo| todo.with_completed(!todo.completed)) else {
                    tracing::debug!(%id, "Toggle of unknown todo ignored");
                    return SmallVec::new();
                };
                Self::update(state, toggled, env)
            },

            TodoAction::ToggleAll => Self::toggle_all(state, env),

            TodoAction::ClearCompleted => Self::clear_completed(state, env),

            TodoAction::SetFilter { filter } => {
                state.filter = filter;
                SmallVec::new()
            },

            TodoAction::BeginEdit { id } => {
                if let Some(todo) = state.get(id) {
                    state.editing = Some(EditSession::open(todo));
                    state.focus = Some(Focus::EditField(id));
                }
                SmallVec::new()
            },

            TodoAction::EditTitle { text } => {
                if let Some(session) = state.editing.as_mut().filter(|session| !session.submitted) {
                    session.buffer = text;
                }
                SmallVec::new()
            },

            TodoAction::SubmitEdit => {
                let Some((id, buffer)) = state
                    .editing
                    .as_ref()
                    .filter(|session| !session.submitted)
                    .map(|session| (session.id, session.buffer.clone()))
                else {
                    return SmallVec::new();
                };
                Self::rename(state, id, &buffer, env)
            },

            TodoAction::CancelEdit => {
                state.editing = None;
                SmallVec::new()
            },

            TodoAction::RenameTodo { id, title } => {
                if state.exists(id) {
                    state.editing = Some(EditSession {
                        id,
                        buffer: title.clone(),
                        submitted: false,
                    });
                }
                Self::rename(state, id, &title, env)
            },

            TodoAction::DismissError => {
                state.error.dismiss();
                SmallVec::new()
            },

            // ========== Events ==========
            TodoAction::TodosLoaded { todos } => {
                tracing::info!(count = todos.len(), "Todos loaded");
                state.todos = todos;
                state.focus = Some(Focus::NewTodoInput);
                SmallVec::new()
            },

            TodoAction::LoadFailed { error } => {
                tracing::warn!(%error, "Loading todos failed");
                smallvec![Self::surface(state, ErrorKind::LoadTodos, env)]
            },

            TodoAction::TodoAdded { todo } => {
                tracing::info!(id = %todo.id, "Todo created");
                state.tracker.set_placeholder(None);
                if !state.replace(todo.clone()) {
                    state.todos.push(todo);
                }
                state.draft.clear();
                state.focus = Some(Focus::NewTodoInput);
                SmallVec::new()
            },

            TodoAction::AddFailed { error } => {
                tracing::warn!(%error, "Creating todo failed");
                state.tracker.set_placeholder(None);
                state.focus = Some(Focus::NewTodoInput);
                smallvec![Self::surface(state, ErrorKind::AddTodo, env)]
            },

            TodoAction::TodoDeleted { id } => {
                state.tracker.clear_pending(id);
                state.remove(id);
                close_edit(state, id);
                state.focus = Some(Focus::NewTodoInput);
                SmallVec::new()
            },

            TodoAction::DeleteFailed { id, error } => {
                tracing::warn!(%id, %error, "Deleting todo failed");
                state.tracker.clear_pending(id);
                if !settle_edit(state, id, false) {
                    state.focus = Some(Focus::NewTodoInput);
                }
                smallvec![Self::surface(state, ErrorKind::DeleteTodo, env)]
            },

            TodoAction::TodoUpdated { todo } => {
                let id = todo.id;
                state.tracker.clear_pending(id);
                state.replace(todo);
                settle_edit(state, id, true);
                SmallVec::new()
            },

            TodoAction::UpdateFailed { id, error } => {
                tracing::warn!(%id, %error, "Updating todo failed");
                state.tracker.clear_pending(id);
                settle_edit(state, id, false);
                smallvec![Self::surface(state, ErrorKind::UpdateTodo, env)]
            },

            TodoAction::ToggleAllFinished { outcomes } => Self::apply_toggle_all(state, outcomes, env),

            TodoAction::ClearCompletedFinished { outcomes } => {
                Self::apply_clear_completed(state, outcomes, env)
            },

            TodoAction::ErrorExpired { generation } => {
                if state.error.expire(generation) {
                    tracing::trace!(generation, "Error expired");
                }
                SmallVec::new()
            },

            TodoAction::RequestsAbandoned => {
                let abandoned = state.tracker.abandon_all();
                tracing::debug!(abandoned, "In-flight markers cleared");
                if let Some(session) = state.editing.as_mut() {
                    session.submitted = false;
                }
                // The display timer was cancelled with everything else
                state.error.dismiss();
                SmallVec::new()
            },
        }
    }
}
