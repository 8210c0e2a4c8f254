//! Domain types for the to-do list.
//!
//! A to-do list is an ordered collection of items owned by a single user.
//! Items are created, updated and removed only after the remote resource
//! confirms the change; the state here mirrors what the server holds plus the
//! transient UI state (filter, edit session, in-flight operations, errors).

use crate::api::ApiError;
use crate::batch::ItemOutcome;
use crate::notification::ErrorChannel;
use crate::tracker::OperationTracker;
use serde::{Deserialize, Serialize};
use todosync_macros::Action;

/// Server-assigned identifier of a todo item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(u64);

impl TodoId {
    /// Id carried by the optimistic placeholder while a create is in flight
    ///
    /// The server never assigns it, so the placeholder can't collide with a
    /// persisted item.
    pub const PLACEHOLDER: Self = Self(0);

    /// Creates a `TodoId` from its raw value
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whether this is the placeholder sentinel
    #[must_use]
    pub const fn is_placeholder(self) -> bool {
        self.0 == Self::PLACEHOLDER.0
    }
}

impl std::fmt::Display for TodoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TodoId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A single todo item as the server stores it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Unique identifier
    pub id: TodoId,
    /// Owner of the item
    pub user_id: u64,
    /// Title, never empty after trimming
    pub title: String,
    /// Whether the todo is completed
    pub completed: bool,
}

impl Todo {
    /// Creates a todo item
    #[must_use]
    pub fn new(id: impl Into<TodoId>, user_id: u64, title: impl Into<String>, completed: bool) -> Self {
        Self {
            id: id.into(),
            user_id,
            title: title.into(),
            completed,
        }
    }

    /// Creates the placeholder shown while a create request is in flight
    #[must_use]
    pub fn placeholder(user_id: u64, title: impl Into<String>) -> Self {
        Self::new(TodoId::PLACEHOLDER, user_id, title, false)
    }

    /// Returns a copy with the completion flag set to `completed`
    #[must_use]
    pub fn with_completed(&self, completed: bool) -> Self {
        Self {
            completed,
            ..self.clone()
        }
    }

    /// Returns a copy with a new title
    #[must_use]
    pub fn with_title(&self, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..self.clone()
        }
    }
}

/// Payload of a create request; the server assigns the id
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    /// Title, already trimmed
    pub title: String,
    /// Initial completion flag
    pub completed: bool,
    /// Owner of the item
    pub user_id: u64,
}

impl NewTodo {
    /// Creates an uncompleted item payload
    #[must_use]
    pub fn new(title: impl Into<String>, user_id: u64) -> Self {
        Self {
            title: title.into(),
            completed: false,
            user_id,
        }
    }
}

/// Which subset of the list is shown
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Filter {
    /// Every item
    #[default]
    All,
    /// Items not yet completed
    Active,
    /// Completed items
    Completed,
}

impl Filter {
    /// Every filter, in footer order
    pub const ALL: [Self; 3] = [Self::All, Self::Active, Self::Completed];

    /// Whether `todo` belongs to this subset
    #[must_use]
    pub const fn matches(self, todo: &Todo) -> bool {
        match self {
            Self::All => true,
            Self::Active => !todo.completed,
            Self::Completed => todo.completed,
        }
    }

    /// URL fragment linking to this filter
    #[must_use]
    pub const fn fragment(self) -> &'static str {
        match self {
            Self::All => "#/",
            Self::Active => "#/active",
            Self::Completed => "#/completed",
        }
    }

    /// Parses a URL fragment; unknown fragments yield `None`
    #[must_use]
    pub fn from_fragment(fragment: &str) -> Option<Self> {
        match fragment.trim_end_matches('/') {
            "" | "#" => Some(Self::All),
            "#/active" => Some(Self::Active),
            "#/completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Footer link label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Active => "Active",
            Self::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of error currently shown in the notification area
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Nothing to show
    #[default]
    Empty,
    /// A create or rename was submitted with a blank title
    EmptyTitle,
    /// The initial fetch failed
    LoadTodos,
    /// A create request failed
    AddTodo,
    /// A delete request failed
    DeleteTodo,
    /// An update request failed
    UpdateTodo,
}

impl ErrorKind {
    /// User-facing message, `None` for [`ErrorKind::Empty`]
    #[must_use]
    pub const fn message(self) -> Option<&'static str> {
        match self {
            Self::Empty => None,
            Self::EmptyTitle => Some("Title should not be empty"),
            Self::LoadTodos => Some("Unable to load todos"),
            Self::AddTodo => Some("Unable to add a todo"),
            Self::DeleteTodo => Some("Unable to delete a todo"),
            Self::UpdateTodo => Some("Unable to update a todo"),
        }
    }

    /// Whether there is nothing to show
    #[must_use]
    pub const fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Which input should hold keyboard focus
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    /// The new-todo input in the header
    NewTodoInput,
    /// The inline edit field of an item
    EditField(TodoId),
}

/// An open inline edit of one item's title
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditSession {
    /// Item being edited
    pub id: TodoId,
    /// Current contents of the edit field
    pub buffer: String,
    /// Whether the buffer was submitted and a request is in flight
    pub submitted: bool,
}

impl EditSession {
    /// Opens an edit with the buffer preset to the item's title
    #[must_use]
    pub fn open(todo: &Todo) -> Self {
        Self {
            id: todo.id,
            buffer: todo.title.clone(),
            submitted: false,
        }
    }
}

/// State of the to-do list client
#[derive(Clone, Debug, Default)]
pub struct TodoState {
    /// Persisted items in server order
    pub todos: Vec<Todo>,
    /// Visible subset
    pub filter: Filter,
    /// In-flight operations and the create placeholder
    pub tracker: OperationTracker,
    /// Transient error notification
    pub error: ErrorChannel,
    /// Open inline edit, if any
    pub editing: Option<EditSession>,
    /// Contents of the new-todo input
    pub draft: String,
    /// Input that should hold focus
    pub focus: Option<Focus>,
}

impl TodoState {
    /// Creates an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state holding `todos`
    #[must_use]
    pub fn with_todos(todos: Vec<Todo>) -> Self {
        Self {
            todos,
            ..Self::default()
        }
    }

    /// Returns the number of persisted todos
    #[must_use]
    pub fn count(&self) -> usize {
        self.todos.len()
    }

    /// Returns a todo by id
    #[must_use]
    pub fn get(&self, id: TodoId) -> Option<&Todo> {
        self.todos.iter().find(|todo| todo.id == id)
    }

    /// Checks if a todo exists
    #[must_use]
    pub fn exists(&self, id: TodoId) -> bool {
        self.get(id).is_some()
    }

    /// Replaces the item with the same id; returns `false` if none exists
    pub fn replace(&mut self, todo: Todo) -> bool {
        match self.todos.iter_mut().find(|existing| existing.id == todo.id) {
            Some(existing) => {
                *existing = todo;
                true
            },
            None => false,
        }
    }

    /// Removes the item with `id`; returns `false` if none exists
    pub fn remove(&mut self, id: TodoId) -> bool {
        let before = self.todos.len();
        self.todos.retain(|todo| todo.id != id);
        self.todos.len() != before
    }

    /// Whether a create request is in flight
    #[must_use]
    pub fn is_creating(&self) -> bool {
        self.tracker.placeholder().is_some()
    }
}

/// Actions driving the to-do list
///
/// Commands are user intents; events are the outcomes that effects feed back
/// once a remote call settles (or a timer fires).
#[derive(Action, Clone, Debug, PartialEq)]
pub enum TodoAction {
    // ========== Commands ==========
    /// Command: Fetch the whole list from the server
    #[command]
    LoadTodos,

    /// Command: Replace the new-todo input contents
    #[command]
    EditDraft {
        /// New input contents
        text: String,
    },

    /// Command: Submit the new-todo input
    #[command]
    SubmitDraft,

    /// Command: Create an item with the given title
    #[command]
    AddTodo {
        /// Title as typed; trimmed before sending
        title: String,
    },

    /// Command: Delete an item
    #[command]
    DeleteTodo {
        /// Item to delete
        id: TodoId,
    },

    /// Command: Persist a modified item
    #[command]
    UpdateTodo {
        /// Full modified record
        todo: Todo,
    },

    /// Command: Flip the completion flag of an item
    #[command]
    ToggleTodo {
        /// Item to toggle
        id: TodoId,
    },

    /// Command: Complete every active item, or reopen all if none is active
    #[command]
    ToggleAll,

    /// Command: Delete every completed item
    #[command]
    ClearCompleted,

    /// Command: Change the visible subset
    #[command]
    SetFilter {
        /// New filter
        filter: Filter,
    },

    /// Command: Open inline editing of an item's title
    #[command]
    BeginEdit {
        /// Item to edit
        id: TodoId,
    },

    /// Command: Replace the edit field contents
    #[command]
    EditTitle {
        /// New field contents
        text: String,
    },

    /// Command: Submit the edit field (Enter or blur)
    #[command]
    SubmitEdit,

    /// Command: Close the edit without saving (Escape)
    #[command]
    CancelEdit,

    /// Command: Rename an item directly, as if edited and submitted
    #[command]
    RenameTodo {
        /// Item to rename
        id: TodoId,
        /// New title as typed
        title: String,
    },

    /// Command: Hide the current error
    #[command]
    DismissError,

    // ========== Events ==========
    /// Event: The list was fetched
    #[event]
    TodosLoaded {
        /// Items returned by the server
        todos: Vec<Todo>,
    },

    /// Event: The fetch failed
    #[event]
    LoadFailed {
        /// Failure reason
        error: ApiError,
    },

    /// Event: An item was created
    #[event]
    TodoAdded {
        /// The item with its server-assigned id
        todo: Todo,
    },

    /// Event: A create request failed
    #[event]
    AddFailed {
        /// Failure reason
        error: ApiError,
    },

    /// Event: An item was deleted
    #[event]
    TodoDeleted {
        /// Deleted item
        id: TodoId,
    },

    /// Event: A delete request failed
    #[event]
    DeleteFailed {
        /// Item that was not deleted
        id: TodoId,
        /// Failure reason
        error: ApiError,
    },

    /// Event: An item was updated
    #[event]
    TodoUpdated {
        /// The item as the server returned it
        todo: Todo,
    },

    /// Event: An update request failed
    #[event]
    UpdateFailed {
        /// Item that was not updated
        id: TodoId,
        /// Failure reason
        error: ApiError,
    },

    /// Event: Every update of a toggle-all settled
    #[event]
    ToggleAllFinished {
        /// One outcome per item, in request order
        outcomes: Vec<ItemOutcome<Todo>>,
    },

    /// Event: Every delete of a clear-completed settled
    #[event]
    ClearCompletedFinished {
        /// One outcome per item, in request order
        outcomes: Vec<ItemOutcome<()>>,
    },

    /// Event: The display timer of an error ran out
    #[event]
    ErrorExpired {
        /// Generation of the error the timer was started for
        generation: u64,
    },

    /// Event: Every request in flight was cancelled and will never settle
    #[event]
    RequestsAbandoned,
}
