//! In-memory todos resource for development and testing.
//!
//! Behaves like the real server (assigns ids, persists changes), records
//! every call, and fails on demand at configured points.

use super::{ApiError, ApiFuture, ApiResult, TodosApi};
use crate::types::{NewTodo, Todo, TodoId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// A call received by [`MockTodosApi`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiCall {
    /// `list_todos`
    List {
        /// Requested owner
        user_id: u64,
    },
    /// `create_todo`
    Create(NewTodo),
    /// `update_todo`
    Update(Todo),
    /// `delete_todo`
    Delete(TodoId),
}

/// Where an injected failure triggers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    /// Every `list_todos`
    List,
    /// Every `create_todo`
    Create,
    /// `update_todo` of one item
    Update(TodoId),
    /// `delete_todo` of one item
    Delete(TodoId),
}

#[derive(Debug)]
struct Inner {
    todos: Vec<Todo>,
    next_id: u64,
    calls: Vec<ApiCall>,
    failures: HashMap<FailurePoint, ApiError>,
    latency: Duration,
}

/// Mock todos resource
///
/// Clones share the same store, so a test can keep a handle while the
/// reducer's environment owns another.
#[derive(Clone, Debug)]
pub struct MockTodosApi {
    inner: Arc<Mutex<Inner>>,
}

impl Default for MockTodosApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTodosApi {
    /// Create an empty resource
    #[must_use]
    pub fn new() -> Self {
        Self::with_todos(Vec::new())
    }

    /// Create a resource already holding `todos`
    #[must_use]
    pub fn with_todos(todos: Vec<Todo>) -> Self {
        let next_id = todos.iter().map(|todo| todo.id.get()).max().unwrap_or(0) + 1;
        Self {
            inner: Arc::new(Mutex::new(Inner {
                todos,
                next_id,
                calls: Vec::new(),
                failures: HashMap::new(),
                latency: Duration::ZERO,
            })),
        }
    }

    /// Delay every response by `latency`
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.lock().latency = latency;
        self
    }

    /// Create a shared handle usable as an environment dependency
    #[must_use]
    pub fn shared(&self) -> Arc<dyn TodosApi> {
        Arc::new(self.clone())
    }

    /// Fail every call at `point` with a 500 response
    pub fn fail(&self, point: FailurePoint) {
        self.fail_with(
            point,
            ApiError::Server {
                status: 500,
                body: "Internal Server Error".to_string(),
            },
        );
    }

    /// Fail every call at `point` with `error`
    pub fn fail_with(&self, point: FailurePoint, error: ApiError) {
        self.lock().failures.insert(point, error);
    }

    /// Stop failing at `point`
    pub fn recover(&self, point: FailurePoint) {
        self.lock().failures.remove(&point);
    }

    /// Calls received so far, in arrival order
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    /// Items the resource currently holds
    #[must_use]
    pub fn stored(&self) -> Vec<Todo> {
        self.lock().todos.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records `call`, then runs `apply` unless a failure is configured
    fn respond<T, F>(&self, call: ApiCall, point: FailurePoint, apply: F) -> ApiFuture<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Inner) -> ApiResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let latency = {
            let mut guard = self.lock();
            guard.calls.push(call);
            guard.latency
        };

        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            let mut guard = inner.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(error) = guard.failures.get(&point) {
                return Err(error.clone());
            }
            apply(&mut guard)
        })
    }
}

fn not_found(id: TodoId) -> ApiError {
    ApiError::Server {
        status: 404,
        body: format!("Todo {id} not found"),
    }
}

impl TodosApi for MockTodosApi {
    fn list_todos(&self, user_id: u64) -> ApiFuture<Vec<Todo>> {
        self.respond(ApiCall::List { user_id }, FailurePoint::List, move |inner| {
            Ok(inner
                .todos
                .iter()
                .filter(|todo| todo.user_id == user_id)
                .cloned()
                .collect())
        })
    }

    fn create_todo(&self, new_todo: NewTodo) -> ApiFuture<Todo> {
        let call = ApiCall::Create(new_todo.clone());
        self.respond(call, FailurePoint::Create, move |inner| {
            let todo = Todo::new(inner.next_id, new_todo.user_id, new_todo.title, new_todo.completed);
            inner.next_id += 1;
            inner.todos.push(todo.clone());
            Ok(todo)
        })
    }

    fn update_todo(&self, todo: Todo) -> ApiFuture<Todo> {
        let id = todo.id;
        self.respond(ApiCall::Update(todo.clone()), FailurePoint::Update(id), move |inner| {
            let stored = inner
                .todos
                .iter_mut()
                .find(|stored| stored.id == id)
                .ok_or_else(|| not_found(id))?;
            *stored = todo;
            Ok(stored.clone())
        })
    }

    fn delete_todo(&self, id: TodoId) -> ApiFuture<()> {
        self.respond(ApiCall::Delete(id), FailurePoint::Delete(id), move |inner| {
            let before = inner.todos.len();
            inner.todos.retain(|todo| todo.id != id);
            if inner.todos.len() == before {
                return Err(not_found(id));
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code can use unwrap

    use super::*;

    #[tokio::test]
    async fn create_assigns_ids_after_seeded_items() {
        let api = MockTodosApi::with_todos(vec![Todo::new(4, 1, "Seeded", false)]);

        let created = api.create_todo(NewTodo::new("Buy milk", 1)).await.unwrap();

        assert_eq!(created.id, TodoId::new(5));
        assert_eq!(api.stored().len(), 2);
        assert_eq!(api.calls(), vec![ApiCall::Create(NewTodo::new("Buy milk", 1))]);
    }

    #[tokio::test]
    async fn list_is_scoped_by_owner() {
        let api = MockTodosApi::with_todos(vec![Todo::new(1, 1, "Mine", false), Todo::new(2, 2, "Theirs", false)]);

        let listed = api.list_todos(1).await.unwrap();

        assert_eq!(listed, vec![Todo::new(1, 1, "Mine", false)]);
    }

    #[tokio::test]
    async fn injected_failure_leaves_store_untouched() {
        let api = MockTodosApi::with_todos(vec![Todo::new(3, 1, "Keep", true)]);
        api.fail(FailurePoint::Delete(TodoId::new(3)));

        let result = api.delete_todo(TodoId::new(3)).await;

        assert_eq!(result.unwrap_err().status(), Some(500));
        assert_eq!(api.stored().len(), 1);

        api.recover(FailurePoint::Delete(TodoId::new(3)));
        api.delete_todo(TodoId::new(3)).await.unwrap();
        assert!(api.stored().is_empty());
    }

    #[tokio::test]
    async fn update_of_unknown_item_is_not_found() {
        let api = MockTodosApi::new();

        let result = api.update_todo(Todo::new(9, 1, "Ghost", true)).await;

        assert_eq!(result.unwrap_err().status(), Some(404));
    }
}
