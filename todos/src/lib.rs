//! To-do list client core.
//!
//! Keeps a local copy of one user's to-do list in step with a remote todos
//! resource. Every change goes to the server first and is applied locally
//! only once confirmed; while a request is in flight the affected item (or
//! the placeholder of a new one) renders as loading, and a failure surfaces
//! a short-lived error instead.
//!
//! - Domain types and actions (`#[derive(Action)]`)
//! - A reducer sequencing create, update, delete and the batched
//!   toggle-all / clear-completed operations
//! - A pure derived view (filters, counters, control states)
//! - An awaitable facade returning `Result`s
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use todos::{HttpTodosApi, TodoApp, TodoEnvironment, DEFAULT_BASE_URL};
//! use todosync_core::environment::SystemClock;
//!
//! # async fn example() -> Result<(), todos::TodoError> {
//! let api = Arc::new(HttpTodosApi::new(DEFAULT_BASE_URL));
//! let app = TodoApp::new(TodoEnvironment::new(api, Arc::new(SystemClock)));
//!
//! app.load().await?;
//! let todo = app.add("Buy milk").await?;
//! app.toggle(todo.id).await?;
//!
//! let view = app.view().await;
//! println!("{}", view.items_left_label);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod app;
pub mod batch;
pub mod config;
pub mod notification;
pub mod reducer;
pub mod tracker;
pub mod types;
pub mod view;

// Re-export commonly used types
pub use api::{ApiError, HttpTodosApi, MockTodosApi, TodosApi};
pub use app::{RenameOutcome, TodoApp, TodoError};
pub use batch::ItemOutcome;
pub use config::{Config, DEFAULT_BASE_URL, USER_ID};
pub use reducer::{TodoEnvironment, TodoReducer};
pub use types::{ErrorKind, Filter, Focus, Todo, TodoAction, TodoId, TodoState};
pub use view::TodoView;
