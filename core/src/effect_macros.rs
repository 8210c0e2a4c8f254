//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when creating `Effect` variants, in
//! particular the async remote calls every mutating action produces.

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use todosync_core::async_effect;
///
/// async_effect! {
///     match api.delete_todo(id).await {
///         Ok(()) => Some(TodoAction::TodoDeleted { id }),
///         Err(error) => Some(TodoAction::DeleteFailed { id, error }),
///     }
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```rust,ignore
/// use todosync_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_secs(3),
///     action: TodoAction::ErrorExpired { generation: 1 }
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}

/// Create an `Effect::Cancellable` around an async block
///
/// # Example
///
/// ```rust,ignore
/// use todosync_core::cancellable;
///
/// cancellable! {
///     id: "load",
///     async {
///         Some(TodoAction::TodosLoaded { todos: api.list_todos(USER_ID).await? })
///     }
/// }
/// ```
#[macro_export]
macro_rules! cancellable {
    (
        id: $id:expr,
        async { $($body:tt)* }
    ) => {
        $crate::effect::Effect::Cancellable {
            id: ::std::convert::Into::into($id),
            effect: ::std::boxed::Box::new($crate::async_effect! { $($body)* }),
        }
    };
}
