//! Remote todos resource.
//!
//! The server exposes one collection, scoped by owner:
//!
//! - `GET    {base}/todos?userId={id}` lists the owner's items
//! - `POST   {base}/todos` creates an item and returns it with its id
//! - `PATCH  {base}/todos/{id}` updates an item and returns it
//! - `DELETE {base}/todos/{id}` removes an item
//!
//! Requests are never retried; failures propagate unchanged.

mod http;
mod mock;

pub use http::HttpTodosApi;
pub use mock::{ApiCall, FailurePoint, MockTodosApi};

use crate::types::{NewTodo, Todo, TodoId};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Remote call result
pub type ApiResult<T> = Result<T, ApiError>;

/// Boxed future returned by [`TodosApi`] methods
pub type ApiFuture<T> = Pin<Box<dyn Future<Output = ApiResult<T>> + Send>>;

/// Errors returned by the todos resource
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never got a response (connection, DNS, timeout)
    #[error("Request failed: {0}")]
    Transport(String),

    /// The server answered with a non-success status
    #[error("Server error (status {status}): {body}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// A success response body could not be decoded
    #[error("Response parsing failed: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// HTTP status of a server error
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::Transport(_) | Self::InvalidResponse(_) => None,
        }
    }
}

/// Client for the todos resource
///
/// Implementations are shared between the reducer's effects, so every method
/// returns an owned `'static` future.
pub trait TodosApi: Send + Sync {
    /// Lists every item owned by `user_id`
    fn list_todos(&self, user_id: u64) -> ApiFuture<Vec<Todo>>;

    /// Creates an item; the server assigns its id
    fn create_todo(&self, new_todo: NewTodo) -> ApiFuture<Todo>;

    /// Replaces an item's fields with those of `todo`
    fn update_todo(&self, todo: Todo) -> ApiFuture<Todo>;

    /// Deletes an item
    fn delete_todo(&self, id: TodoId) -> ApiFuture<()>;
}
