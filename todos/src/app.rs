//! Awaitable facade over the to-do store.
//!
//! The store is fire-and-forget: an action goes in, effects run, outcome
//! actions come back later. `TodoApp` pairs each operation with the outcome
//! actions that settle it and waits for one of them, so callers get a plain
//! `Result` carrying the remote failure when there is one.

use crate::api::ApiError;
use crate::batch::ItemOutcome;
use crate::config::AppConfig;
use crate::reducer::{plan_rename, RenamePlan, TodoEnvironment, TodoReducer};
use crate::types::{Filter, Todo, TodoAction, TodoId, TodoState};
use crate::view::TodoView;
use std::time::Duration;
use thiserror::Error;
use todosync_runtime::{EffectHandle, Store, StoreError};

/// Store specialised to the to-do list
pub type TodoStore = Store<TodoState, TodoAction, TodoEnvironment, TodoReducer>;

/// How long operations wait for their outcome unless configured otherwise
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors returned by [`TodoApp`] operations
#[derive(Debug, Error)]
pub enum TodoError {
    /// The submitted title was blank
    #[error("Title should not be empty")]
    EmptyTitle,

    /// The item is not in the list
    #[error("Todo {0} not found")]
    NotFound(TodoId),

    /// A create request is already in flight
    #[error("A todo is already being created")]
    CreateInProgress,

    /// The remote resource rejected the operation
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The request was ignored or cancelled before it settled
    #[error("The operation was abandoned before it settled")]
    Abandoned,

    /// The store could not run the operation
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The operation settled with an action it does not produce
    #[error("Unexpected outcome: {0}")]
    UnexpectedOutcome(&'static str),
}

/// Result of [`TodoApp::rename`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenameOutcome {
    /// The title did not change; nothing was sent
    Unchanged,
    /// The blank title deleted the item
    Deleted,
    /// The item now carries the new title
    Renamed(Todo),
}

/// To-do list client
#[derive(Clone)]
pub struct TodoApp {
    store: TodoStore,
    operation_timeout: Duration,
}

impl TodoApp {
    /// Creates a client with an empty list
    #[must_use]
    pub fn new(env: TodoEnvironment) -> Self {
        Self {
            store: Store::new(TodoState::new(), TodoReducer::new(), env),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Creates a client using configured timings
    #[must_use]
    pub fn with_config(env: TodoEnvironment, config: &AppConfig) -> Self {
        Self {
            operation_timeout: config.operation_timeout(),
            ..Self::new(env)
        }
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &TodoStore {
        &self.store
    }

    /// Current view of the list
    pub async fn view(&self) -> TodoView {
        self.store.state(TodoState::view).await
    }

    /// Persisted items in server order
    pub async fn todos(&self) -> Vec<Todo> {
        self.store.state(|state| state.todos.clone()).await
    }

    /// Sends a UI event without waiting for its outcome
    ///
    /// # Errors
    ///
    /// Returns `TodoError::Store` if the store is shutting down
    pub async fn send(&self, action: TodoAction) -> Result<EffectHandle, TodoError> {
        Ok(self.store.send(action).await?)
    }

    /// Fetches the list, replacing whatever is held; returns the item count
    ///
    /// # Errors
    ///
    /// Returns `TodoError::Api` if the fetch fails
    pub async fn load(&self) -> Result<usize, TodoError> {
        let outcome = self
            .request(TodoAction::LoadTodos, |action| {
                matches!(action, TodoAction::TodosLoaded { .. } | TodoAction::LoadFailed { .. })
            })
            .await?;

        match outcome {
            TodoAction::TodosLoaded { todos } => Ok(todos.len()),
            TodoAction::LoadFailed { error } => Err(error.into()),
            other => Err(TodoError::UnexpectedOutcome(other.name())),
        }
    }

    /// Creates an item; returns it with its server-assigned id
    ///
    /// # Errors
    ///
    /// - `TodoError::EmptyTitle` if `title` is blank (the error is also shown)
    /// - `TodoError::CreateInProgress` if another create is in flight
    /// - `TodoError::Abandoned` if a concurrent create won the race, or on unmount
    /// - `TodoError::Api` if the server rejects the create
    pub async fn add(&self, title: &str) -> Result<Todo, TodoError> {
        if self.store.state(TodoState::is_creating).await {
            return Err(TodoError::CreateInProgress);
        }

        let action = TodoAction::AddTodo {
            title: title.to_string(),
        };
        if title.trim().is_empty() {
            self.store.send(action).await?;
            return Err(TodoError::EmptyTitle);
        }

        let outcome = self
            .request(action, |action| {
                matches!(action, TodoAction::TodoAdded { .. } | TodoAction::AddFailed { .. })
            })
            .await?;

        match outcome {
            TodoAction::TodoAdded { todo } => Ok(todo),
            TodoAction::AddFailed { error } => Err(error.into()),
            other => Err(TodoError::UnexpectedOutcome(other.name())),
        }
    }

    /// Deletes an item
    ///
    /// # Errors
    ///
    /// - `TodoError::NotFound` if the item is not in the list
    /// - `TodoError::Api` if the server rejects the delete
    pub async fn delete(&self, id: TodoId) -> Result<(), TodoError> {
        self.ensure_exists(id).await?;
        self.await_delete(TodoAction::DeleteTodo { id }, id).await
    }

    /// Persists a modified item; returns it as the server stored it
    ///
    /// # Errors
    ///
    /// - `TodoError::NotFound` if the item is not in the list
    /// - `TodoError::Api` if the server rejects the update
    pub async fn update(&self, todo: Todo) -> Result<Todo, TodoError> {
        let id = todo.id;
        self.ensure_exists(id).await?;
        self.await_update(TodoAction::UpdateTodo { todo }, id).await
    }

    /// Flips the completion flag of an item
    ///
    /// # Errors
    ///
    /// - `TodoError::NotFound` if the item is not in the list
    /// - `TodoError::Api` if the server rejects the update
    pub async fn toggle(&self, id: TodoId) -> Result<Todo, TodoError> {
        self.ensure_exists(id).await?;
        self.await_update(TodoAction::ToggleTodo { id }, id).await
    }

    /// Completes every active item, or reopens all when none is active
    ///
    /// Returns one outcome per item sent; an empty list sends nothing.
    ///
    /// # Errors
    ///
    /// Returns `TodoError::Abandoned` if the batch was cancelled before settling
    pub async fn toggle_all(&self) -> Result<Vec<ItemOutcome<Todo>>, TodoError> {
        if self.store.state(|state| state.todos.is_empty()).await {
            return Ok(Vec::new());
        }

        let outcome = self
            .request(TodoAction::ToggleAll, |action| {
                matches!(action, TodoAction::ToggleAllFinished { .. })
            })
            .await?;

        match outcome {
            TodoAction::ToggleAllFinished { outcomes } => Ok(outcomes),
            other => Err(TodoError::UnexpectedOutcome(other.name())),
        }
    }

    /// Deletes every completed item
    ///
    /// Returns one outcome per item sent; nothing is sent when no item is
    /// completed.
    ///
    /// # Errors
    ///
    /// Returns `TodoError::Abandoned` if the batch was cancelled before settling
    pub async fn clear_completed(&self) -> Result<Vec<ItemOutcome<()>>, TodoError> {
        if !self
            .store
            .state(|state| state.todos.iter().any(|todo| todo.completed))
            .await
        {
            return Ok(Vec::new());
        }

        let outcome = self
            .request(TodoAction::ClearCompleted, |action| {
                matches!(action, TodoAction::ClearCompletedFinished { .. })
            })
            .await?;

        match outcome {
            TodoAction::ClearCompletedFinished { outcomes } => Ok(outcomes),
            other => Err(TodoError::UnexpectedOutcome(other.name())),
        }
    }

    /// Renames an item as if its title had been edited inline and submitted
    ///
    /// A blank title deletes the item; an unchanged title sends nothing.
    ///
    /// # Errors
    ///
    /// - `TodoError::NotFound` if the item is not in the list
    /// - `TodoError::Api` if the server rejects the update or delete
    pub async fn rename(&self, id: TodoId, title: &str) -> Result<RenameOutcome, TodoError> {
        let current = self
            .store
            .state(|state| state.get(id).map(|todo| todo.title.clone()))
            .await
            .ok_or(TodoError::NotFound(id))?;

        let action = TodoAction::RenameTodo {
            id,
            title: title.to_string(),
        };
        match plan_rename(&current, title) {
            RenamePlan::Unchanged => {
                self.store.send(action).await?;
                Ok(RenameOutcome::Unchanged)
            },
            RenamePlan::Delete => {
                self.await_delete(action, id).await?;
                Ok(RenameOutcome::Deleted)
            },
            RenamePlan::Update(_) => Ok(RenameOutcome::Renamed(self.await_update(action, id).await?)),
        }
    }

    /// Changes the visible subset
    ///
    /// # Errors
    ///
    /// Returns `TodoError::Store` if the store is shutting down
    pub async fn set_filter(&self, filter: Filter) -> Result<(), TodoError> {
        self.store.send(TodoAction::SetFilter { filter }).await?;
        Ok(())
    }

    /// Hides the current error
    ///
    /// # Errors
    ///
    /// Returns `TodoError::Store` if the store is shutting down
    pub async fn dismiss_error(&self) -> Result<(), TodoError> {
        self.store.send(TodoAction::DismissError).await?;
        Ok(())
    }

    /// Abandons every request in flight; returns how many were aborted
    ///
    /// Abandoned requests never settle, so their loading markers and the
    /// create placeholder are cleared here instead. Callers still waiting
    /// on one get `TodoError::Abandoned`.
    ///
    /// # Errors
    ///
    /// Returns `TodoError::Store` if the store is shutting down
    pub async fn unmount(&self) -> Result<usize, TodoError> {
        let aborted = self.store.cancel_all();
        self.store.send(TodoAction::RequestsAbandoned).await?;
        tracing::info!(aborted, "Unmounted, in-flight requests abandoned");
        Ok(aborted)
    }

    /// Stops accepting actions and waits for running effects
    ///
    /// # Errors
    ///
    /// Returns `TodoError::Store` if effects are still running after `timeout`
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), TodoError> {
        Ok(self.store.shutdown(timeout).await?)
    }

    async fn ensure_exists(&self, id: TodoId) -> Result<(), TodoError> {
        if self.store.state(|state| state.exists(id)).await {
            Ok(())
        } else {
            Err(TodoError::NotFound(id))
        }
    }

    async fn request<F>(&self, action: TodoAction, settles: F) -> Result<TodoAction, TodoError>
    where
        F: Fn(&TodoAction) -> bool,
    {
        match self
            .store
            .send_and_wait_for(action, settles, self.operation_timeout)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(StoreError::NoOutcome) => Err(TodoError::Abandoned),
            Err(error) => Err(error.into()),
        }
    }

    async fn await_delete(&self, action: TodoAction, id: TodoId) -> Result<(), TodoError> {
        let outcome = self
            .request(action, move |action| match action {
                TodoAction::TodoDeleted { id: settled } | TodoAction::DeleteFailed { id: settled, .. } => {
                    *settled == id
                },
                _ => false,
            })
            .await?;

        match outcome {
            TodoAction::TodoDeleted { .. } => Ok(()),
            TodoAction::DeleteFailed { error, .. } => Err(error.into()),
            other => Err(TodoError::UnexpectedOutcome(other.name())),
        }
    }

    async fn await_update(&self, action: TodoAction, id: TodoId) -> Result<Todo, TodoError> {
        let outcome = self
            .request(action, move |action| match action {
                TodoAction::TodoUpdated { todo } => todo.id == id,
                TodoAction::UpdateFailed { id: settled, .. } => *settled == id,
                _ => false,
            })
            .await?;

        match outcome {
            TodoAction::TodoUpdated { todo } => Ok(todo),
            TodoAction::UpdateFailed { error, .. } => Err(error.into()),
            other => Err(TodoError::UnexpectedOutcome(other.name())),
        }
    }
}
