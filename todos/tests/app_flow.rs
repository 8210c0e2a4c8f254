//! End-to-end flows through `TodoApp`, the store and the in-memory resource

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::sync::Arc;
use std::time::Duration;
use todos::api::{ApiCall, FailurePoint};
use todos::{
    ErrorKind, Filter, MockTodosApi, RenameOutcome, Todo, TodoAction, TodoApp, TodoEnvironment, TodoError,
    TodoId, USER_ID,
};
use todosync_testing::test_clock;

fn todo(id: u64, title: &str, completed: bool) -> Todo {
    Todo::new(id, USER_ID, title, completed)
}

fn app_with(api: &MockTodosApi) -> TodoApp {
    TodoApp::new(TodoEnvironment::new(api.shared(), Arc::new(test_clock())))
}

async fn loaded_app(api: &MockTodosApi) -> TodoApp {
    let app = app_with(api);
    app.load().await.unwrap();
    app
}

/// Calls made after the initial fetch
fn calls_after_load(api: &MockTodosApi) -> Vec<ApiCall> {
    api.calls().into_iter().skip(1).collect()
}

#[tokio::test]
async fn load_replaces_collection() {
    let api = MockTodosApi::with_todos(vec![todo(1, "Buy milk", false), todo(2, "Walk dog", true)]);
    let app = app_with(&api);

    assert_eq!(app.load().await.unwrap(), 2);

    let view = app.view().await;
    assert_eq!(view.rows.len(), 2);
    assert_eq!(view.items_left_label, "1 items left");
    assert_eq!(api.calls(), vec![ApiCall::List { user_id: USER_ID }]);
}

#[tokio::test]
async fn load_failure_surfaces_error() {
    let api = MockTodosApi::with_todos(vec![todo(1, "Buy milk", false)]);
    api.fail(FailurePoint::List);
    let app = app_with(&api);

    let result = app.load().await;

    assert!(matches!(result, Err(TodoError::Api(_))));
    let view = app.view().await;
    assert!(view.rows.is_empty());
    assert_eq!(view.error, ErrorKind::LoadTodos);
    assert_eq!(view.error_message, Some("Unable to load todos"));
}

#[tokio::test]
async fn blank_title_never_reaches_the_server() {
    let api = MockTodosApi::new();
    let app = app_with(&api);

    let result = app.add("   ").await;

    assert!(matches!(result, Err(TodoError::EmptyTitle)));
    assert!(api.calls().is_empty());
    assert_eq!(app.view().await.error, ErrorKind::EmptyTitle);
}

#[tokio::test]
async fn created_todo_is_appended_once() {
    let api = MockTodosApi::with_todos(vec![todo(4, "Seeded", false)]);
    let app = loaded_app(&api).await;

    let created = app.add("Buy milk").await.unwrap();

    assert_eq!(created, todo(5, "Buy milk", false));
    let todos = app.todos().await;
    assert_eq!(todos.iter().filter(|t| t.id == created.id).count(), 1);
    assert_eq!(todos.last(), Some(&created));

    let view = app.view().await;
    assert!(view.placeholder.is_none());
    assert!(!view.input_disabled);
}

#[tokio::test]
async fn placeholder_is_shown_while_create_is_in_flight() {
    let api = MockTodosApi::new().with_latency(Duration::from_millis(150));
    let app = app_with(&api);

    let pending = {
        let app = app.clone();
        tokio::spawn(async move { app.add("Slow todo").await })
    };
    tokio::time::sleep(Duration::from_millis(40)).await;

    let view = app.view().await;
    let placeholder = view.placeholder.expect("placeholder while creating");
    assert!(placeholder.todo.id.is_placeholder());
    assert!(placeholder.is_loading);
    assert!(view.input_disabled);
    assert!(view.show_main);
    assert!(matches!(app.add("Another").await, Err(TodoError::CreateInProgress)));

    let created = pending.await.unwrap().unwrap();
    assert_eq!(created.title, "Slow todo");
    assert!(app.view().await.placeholder.is_none());
}

#[tokio::test]
async fn add_failure_rolls_back() {
    let api = MockTodosApi::new();
    api.fail(FailurePoint::Create);
    let app = app_with(&api);

    let result = app.add("Buy milk").await;

    assert!(matches!(result, Err(TodoError::Api(_))));
    let view = app.view().await;
    assert!(view.rows.is_empty());
    assert!(view.placeholder.is_none());
    assert_eq!(view.error, ErrorKind::AddTodo);
}

#[tokio::test]
async fn delete_failure_keeps_item() {
    let api = MockTodosApi::with_todos(vec![todo(3, "Walk dog", false)]);
    api.fail(FailurePoint::Delete(TodoId::new(3)));
    let app = loaded_app(&api).await;

    let result = app.delete(TodoId::new(3)).await;

    assert!(matches!(result, Err(TodoError::Api(_))));
    let view = app.view().await;
    assert_eq!(view.rows.len(), 1);
    assert!(!view.rows[0].is_loading);
    assert_eq!(view.error, ErrorKind::DeleteTodo);
}

#[tokio::test]
async fn delete_of_unknown_item_is_rejected_locally() {
    let api = MockTodosApi::new();
    let app = loaded_app(&api).await;

    let result = app.delete(TodoId::new(99)).await;

    assert!(matches!(result, Err(TodoError::NotFound(id)) if id == TodoId::new(99)));
    assert!(calls_after_load(&api).is_empty());
}

#[tokio::test]
async fn toggle_marks_row_loading_until_settled() {
    let api = MockTodosApi::with_todos(vec![todo(1, "Read", false)]).with_latency(Duration::from_millis(100));
    let app = loaded_app(&api).await;

    let pending = {
        let app = app.clone();
        tokio::spawn(async move { app.toggle(TodoId::new(1)).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(app.view().await.rows[0].is_loading);

    let updated = pending.await.unwrap().unwrap();
    assert!(updated.completed);

    let view = app.view().await;
    assert!(!view.rows[0].is_loading);
    assert!(view.all_completed);
}

#[tokio::test]
async fn toggle_all_sends_only_active_items() {
    let api = MockTodosApi::with_todos(vec![todo(1, "a", false), todo(2, "b", true)]);
    api.fail(FailurePoint::Update(TodoId::new(1)));
    let app = loaded_app(&api).await;

    let outcomes = app.toggle_all().await.unwrap();

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].id, TodoId::new(1));
    assert!(!outcomes[0].is_ok());
    assert_eq!(calls_after_load(&api), vec![ApiCall::Update(todo(1, "a", true))]);
    assert_eq!(app.todos().await, vec![todo(1, "a", false), todo(2, "b", true)]);
    assert_eq!(app.view().await.error, ErrorKind::UpdateTodo);
}

#[tokio::test]
async fn toggle_all_reopens_when_everything_is_completed() {
    let api = MockTodosApi::with_todos(vec![todo(1, "a", true), todo(2, "b", true)]);
    let app = loaded_app(&api).await;

    let outcomes = app.toggle_all().await.unwrap();

    assert!(outcomes.iter().all(|outcome| outcome.is_ok()));
    assert_eq!(app.todos().await, vec![todo(1, "a", false), todo(2, "b", false)]);
    assert!(app.view().await.rows.iter().all(|row| !row.is_loading));
}

#[tokio::test]
async fn toggle_all_on_empty_list_sends_nothing() {
    let api = MockTodosApi::new();
    let app = loaded_app(&api).await;

    assert!(app.toggle_all().await.unwrap().is_empty());
    assert!(calls_after_load(&api).is_empty());
}

#[tokio::test]
async fn clear_completed_partial_failure() {
    let api = MockTodosApi::with_todos(vec![todo(1, "a", true), todo(2, "b", false), todo(3, "c", true)]);
    api.fail(FailurePoint::Delete(TodoId::new(3)));
    let app = loaded_app(&api).await;

    let outcomes = app.clear_completed().await.unwrap();

    assert_eq!(outcomes.len(), 2);
    assert_eq!(app.todos().await, vec![todo(2, "b", false), todo(3, "c", true)]);

    let view = app.view().await;
    assert_eq!(view.error, ErrorKind::DeleteTodo);
    assert!(view.clear_completed_enabled);
}

#[tokio::test]
async fn unchanged_rename_sends_nothing() {
    let api = MockTodosApi::with_todos(vec![todo(1, "Buy milk", false)]);
    let app = loaded_app(&api).await;
    app.send(TodoAction::BeginEdit { id: TodoId::new(1) }).await.unwrap();

    let outcome = app.rename(TodoId::new(1), "  Buy milk  ").await.unwrap();

    assert_eq!(outcome, RenameOutcome::Unchanged);
    assert!(calls_after_load(&api).is_empty());
    assert!(app.view().await.editing.is_none());
}

#[tokio::test]
async fn rename_trims_and_updates() {
    let api = MockTodosApi::with_todos(vec![todo(1, "Buy milk", false)]);
    let app = loaded_app(&api).await;

    let outcome = app.rename(TodoId::new(1), "  Buy oat milk ").await.unwrap();

    assert_eq!(outcome, RenameOutcome::Renamed(todo(1, "Buy oat milk", false)));
    assert_eq!(api.stored(), vec![todo(1, "Buy oat milk", false)]);
    assert!(app.view().await.editing.is_none());
}

#[tokio::test]
async fn rename_to_blank_deletes() {
    let api = MockTodosApi::with_todos(vec![todo(1, "Buy milk", false), todo(2, "Walk dog", false)]);
    let app = loaded_app(&api).await;

    let outcome = app.rename(TodoId::new(1), "   ").await.unwrap();

    assert_eq!(outcome, RenameOutcome::Deleted);
    assert_eq!(app.todos().await, vec![todo(2, "Walk dog", false)]);
    assert_eq!(calls_after_load(&api), vec![ApiCall::Delete(TodoId::new(1))]);
}

#[tokio::test]
async fn failed_rename_keeps_edit_open() {
    let api = MockTodosApi::with_todos(vec![todo(1, "Buy milk", false)]);
    api.fail(FailurePoint::Update(TodoId::new(1)));
    let app = loaded_app(&api).await;

    let result = app.rename(TodoId::new(1), "Buy bread").await;

    assert!(matches!(result, Err(TodoError::Api(_))));
    let view = app.view().await;
    let editing = view.editing.expect("edit stays open");
    assert_eq!(editing.buffer, "Buy bread");
    assert_eq!(view.rows[0].todo.title, "Buy milk");
    assert!(view.rows[0].is_editing);
}

#[tokio::test]
async fn edit_session_through_ui_events() {
    let api = MockTodosApi::with_todos(vec![todo(1, "Buy milk", false)]);
    let app = loaded_app(&api).await;
    let mut events = app.store().subscribe_actions();

    app.send(TodoAction::BeginEdit { id: TodoId::new(1) }).await.unwrap();
    app.send(TodoAction::EditTitle {
        text: "Buy bread".to_string(),
    })
    .await
    .unwrap();
    let mut handle = app.send(TodoAction::SubmitEdit).await.unwrap();
    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

    assert_eq!(
        events.recv().await.unwrap(),
        TodoAction::TodoUpdated {
            todo: todo(1, "Buy bread", false)
        }
    );
    assert!(app.view().await.editing.is_none());
}

#[tokio::test]
async fn filter_changes_visible_rows() {
    let api = MockTodosApi::with_todos(vec![todo(1, "a", false), todo(2, "b", true)]);
    let app = loaded_app(&api).await;

    app.set_filter(Filter::Completed).await.unwrap();
    let view = app.view().await;

    assert_eq!(view.filter, Filter::Completed);
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.rows[0].todo.id, TodoId::new(2));
    assert_eq!(view.active_count, 1);
}

#[tokio::test]
async fn error_clears_after_display_time() {
    let api = MockTodosApi::new();
    let env = TodoEnvironment::new(api.shared(), Arc::new(test_clock()))
        .with_error_display(Duration::from_millis(50));
    let app = TodoApp::new(env);

    let _ = app.add("").await;
    assert_eq!(app.view().await.error, ErrorKind::EmptyTitle);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(app.view().await.error.is_empty());
}

#[tokio::test]
async fn dismiss_clears_error_immediately() {
    let api = MockTodosApi::new();
    let app = app_with(&api);

    let _ = app.add(" ").await;
    app.dismiss_error().await.unwrap();

    assert_eq!(app.view().await.error_message, None);
}

#[tokio::test]
async fn unmount_abandons_requests_in_flight() {
    let api = MockTodosApi::with_todos(vec![todo(1, "a", false)]).with_latency(Duration::from_millis(150));
    let app = loaded_app(&api).await;

    app.send(TodoAction::AddTodo {
        title: "slow".to_string(),
    })
    .await
    .unwrap();
    app.send(TodoAction::ToggleTodo { id: TodoId::new(1) }).await.unwrap();
    assert_eq!(app.unmount().await.unwrap(), 2);

    tokio::time::sleep(Duration::from_millis(250)).await;
    let view = app.view().await;
    assert_eq!(app.todos().await, vec![todo(1, "a", false)]);
    assert!(view.placeholder.is_none());
    assert!(!view.any_loading());

    let added = app.add("after").await.unwrap();
    assert_eq!(added.title, "after");
}

#[tokio::test]
async fn unmount_releases_waiting_callers() {
    let api = MockTodosApi::with_todos(vec![todo(1, "a", false)]).with_latency(Duration::from_millis(200));
    let app = loaded_app(&api).await;

    let waiting = {
        let app = app.clone();
        tokio::spawn(async move { app.toggle(TodoId::new(1)).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    app.unmount().await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(1), waiting)
        .await
        .expect("caller still waiting after unmount")
        .unwrap();
    assert!(matches!(result, Err(TodoError::Abandoned)));
}

#[tokio::test]
async fn racing_creates_never_share_an_outcome() {
    let api = MockTodosApi::new().with_latency(Duration::from_millis(50));
    let app = app_with(&api);

    let (first, second) = tokio::join!(app.add("first"), app.add("second"));

    let results = [first, second];
    let created: Vec<&Todo> = results.iter().filter_map(|result| result.as_ref().ok()).collect();
    assert_eq!(created.len(), 1);
    assert!(results.iter().any(|result| matches!(
        result,
        Err(TodoError::CreateInProgress | TodoError::Abandoned)
    )));
    assert_eq!(app.todos().await.len(), 1);
}

#[tokio::test]
async fn overlapping_updates_of_one_item_each_get_their_own_result() {
    let api = MockTodosApi::with_todos(vec![todo(1, "a", false)]).with_latency(Duration::from_millis(30));
    let app = loaded_app(&api).await;

    let (renamed, completed) = tokio::join!(
        app.update(todo(1, "renamed", false)),
        app.update(todo(1, "a", true)),
    );

    assert_eq!(renamed.unwrap().title, "renamed");
    assert!(completed.unwrap().completed);
}
