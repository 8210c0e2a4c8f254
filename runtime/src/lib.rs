//! # Todosync Runtime
//!
//! Runtime implementation for the todosync reducer architecture.
//!
//! This crate provides the Store runtime that owns state, runs the reducer
//! one action at a time, and executes the effects it returns.
//!
//! ## Core Components
//!
//! - **Store**: The runtime that manages state and executes effects
//! - **Effect Executor**: Executes effect descriptions and feeds actions back to the reducer
//! - **Cancellation registry**: Aborts effects registered under an [`EffectId`]
//!
//! ## Example
//!
//! ```ignore
//! use todosync_runtime::Store;
//!
//! let store = Store::new(TodoState::default(), TodoReducer::new(), environment);
//!
//! // Send an action
//! store.send(TodoAction::LoadTodos).await?;
//!
//! // Read state
//! let count = store.state(|s| s.todos.len()).await;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use todosync_core::{
    effect::{Effect, EffectId},
    reducer::Reducer,
};
use tokio::sync::{watch, RwLock};
use tokio::task::AbortHandle;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// A task join error occurred while awaiting a spawned effect
        ///
        /// This typically means a spawned task panicked.
        #[error("Task failed during effect execution: {0}")]
        TaskJoinError(#[from] tokio::task::JoinError),

        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for terminal action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is received.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,

        /// Every effect started by the action finished without a matching action
        ///
        /// Returned by `send_and_wait_for` when the reducer ignored the action
        /// or its effects were cancelled.
        #[error("Action settled without a matching outcome")]
        NoOutcome,
    }
}

pub use error::StoreError;

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] to allow waiting for the effects spawned by
/// that action to finish. Actions fed back by those effects are tracked by
/// their own handles.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(TodoAction::ClearCompleted).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a new effect handle and the tracking context feeding it
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: tx,
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (tx, rx) = watch::channel(());
        let _ = tx.send(());

        Self {
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Number of effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                // Every tracker is gone, nothing can still be running
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires before all
    /// effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: Effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl EffectTracking {
    /// Increment the effect counter (effect started)
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the effect counter (effect completed)
    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: ties the effects of one `send_and_wait_for` call, and every
/// action they feed back, to that call
#[derive(Clone)]
struct Correlation {
    id: u64,
    tracking: EffectTracking,
}

/// Internal: RAII guard that decrements effect counter on drop
///
/// Runs on completion, on panic, and when the task is aborted before or
/// during execution.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Abort handles of running cancellable effects, grouped by id
type CancellationRegistry = Arc<Mutex<HashMap<EffectId, Vec<AbortHandle>>>>;

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::{
        AbortHandle, Arc, AtomicBool, AtomicCounterGuard, AtomicU64, AtomicUsize,
        CancellationRegistry, Correlation, DecrementGuard, Duration, Effect, EffectHandle,
        EffectId, EffectTracking, Future, HashMap, Mutex, Ordering, PoisonError, Reducer, RwLock,
        StoreError,
    };
    use tokio::sync::broadcast::error::{RecvError, TryRecvError};
    use tokio::sync::{broadcast, watch};

    /// Default capacity of the action broadcast channel
    const DEFAULT_BROADCAST_CAPACITY: usize = 16;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`; the reducer runs under the write lock, one action at a time)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        cancellations: CancellationRegistry,
        /// Action broadcast channel for observing actions produced by effects.
        ///
        /// Actions are broadcast after the reducer has applied them, so an
        /// observer reading state after receiving an action sees its result.
        action_broadcast: broadcast::Sender<A>,
        /// Fed-back actions of correlated sends, tagged with their correlation id
        outcome_broadcast: broadcast::Sender<(u64, A)>,
        next_correlation: Arc<AtomicU64>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_broadcast_capacity(
                initial_state,
                reducer,
                environment,
                DEFAULT_BROADCAST_CAPACITY,
            )
        }

        /// Create a new Store with a custom action broadcast capacity
        ///
        /// Slow observers lag (and skip actions) once `capacity` actions are
        /// buffered.
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: S,
            reducer: R,
            environment: E,
            capacity: usize,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(capacity.max(1));
            let (outcome_broadcast, _) = broadcast::channel(capacity.max(1));

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                cancellations: Arc::new(Mutex::new(HashMap::new())),
                action_broadcast,
                outcome_broadcast,
                next_correlation: Arc::new(AtomicU64::new(0)),
            }
        }

        /// Initiate graceful shutdown
        ///
        /// Stops accepting new actions and waits up to `timeout` for running
        /// effects to finish.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if effects are still
        /// running when the timeout elapses.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            // Set shutdown flag to reject new actions
            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(
                        pending_effects = pending,
                        "Shutdown timeout: {} effects still running", pending
                    );
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Send an action to the store
        ///
        /// Runs the reducer under the state write lock, then starts every
        /// returned effect. Returns once the effects are started, not when
        /// they finish; use the returned handle to wait for them.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] after shutdown started.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            let (handle, tracking) = EffectHandle::new();
            self.dispatch(action, &tracking, None).await?;
            Ok(handle)
        }

        /// Run the reducer and start its effects under `tracking`
        async fn dispatch(
            &self,
            action: A,
            tracking: &EffectTracking,
            correlation: Option<u64>,
        ) -> Result<(), StoreError> {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            metrics::counter!("store.commands.total").increment(1);

            let effects = {
                let mut state = self.state.write().await;

                let span = tracing::debug_span!("reducer_execution");
                let _enter = span.enter();

                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                tracing::trace!("Reducer completed, returned {} effects", effects.len());
                effects
            };

            for effect in effects {
                self.execute_effect_internal(effect, tracking, None, correlation);
            }

            Ok(())
        }

        /// Send an action and wait for a matching action produced by its effects
        ///
        /// Only actions fed back by effects of this call (and by the effects
        /// of those actions, transitively) are offered to `predicate`, so
        /// concurrent callers never receive each other's outcome. Subscribes
        /// before sending, so a fast effect cannot slip past.
        ///
        /// # Errors
        ///
        /// - [`StoreError::NoOutcome`] if every effect finished (or was cancelled) without a match
        /// - [`StoreError::Timeout`] if no matching action arrives in time
        /// - [`StoreError::ChannelClosed`] if the broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`] if the store is shutting down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            F: Fn(&A) -> bool,
        {
            let mut rx = self.outcome_broadcast.subscribe();
            let correlation = self.next_correlation.fetch_add(1, Ordering::Relaxed);
            let (mut handle, tracking) = EffectHandle::new();

            self.dispatch(action, &tracking, Some(correlation)).await?;
            drop(tracking);

            let matches = |(origin, action): &(u64, A)| *origin == correlation && predicate(action);

            tokio::time::timeout(timeout, async {
                loop {
                    tokio::select! {
                        biased;
                        received = rx.recv() => match received {
                            Ok(outcome) if matches(&outcome) => return Ok(outcome.1),
                            Ok(_) => {},
                            Err(RecvError::Lagged(skipped)) => {
                                tracing::warn!(skipped, "Action observer lagged, {} actions skipped", skipped);
                            },
                            Err(RecvError::Closed) => return Err(StoreError::ChannelClosed),
                        },
                        () = handle.wait() => {
                            // Feed-back happens inside the tracked tasks, so every outcome is buffered by now
                            loop {
                                match rx.try_recv() {
                                    Ok(outcome) if matches(&outcome) => return Ok(outcome.1),
                                    Ok(_) | Err(TryRecvError::Lagged(_)) => {},
                                    Err(_) => return Err(StoreError::NoOutcome),
                                }
                            }
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to actions produced by effects
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read state through a projection function
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Abort every running effect registered under `id`
        ///
        /// Aborted effects feed no action back. Returns how many running
        /// tasks were aborted.
        pub fn cancel(&self, id: &EffectId) -> usize {
            let handles = self
                .cancellations
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(id)
                .unwrap_or_default();

            let aborted = abort_all(handles);
            tracing::debug!(effect_id = %id, aborted, "Cancelled effects");
            aborted
        }

        /// Abort every running cancellable effect
        ///
        /// Aborted effects feed no action back; a reducer that tracks
        /// in-flight work needs to be told separately.
        pub fn cancel_all(&self) -> usize {
            let registry = std::mem::take(
                &mut *self
                    .cancellations
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner),
            );

            let aborted = registry.into_values().map(abort_all).sum();
            tracing::debug!(aborted, "Cancelled all effects");
            aborted
        }

        /// Ids that still have a running cancellable effect, sorted
        #[must_use]
        pub fn cancellable_ids(&self) -> Vec<EffectId> {
            let mut registry = self
                .cancellations
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            prune_finished(&mut registry);

            let mut ids: Vec<EffectId> = registry.keys().cloned().collect();
            ids.sort();
            ids
        }

        fn register_cancellable(&self, id: &EffectId, handle: AbortHandle) {
            let mut registry = self
                .cancellations
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            prune_finished(&mut registry);
            registry.entry(id.clone()).or_default().push(handle);
        }

        /// Spawn an effect task counted by `tracking` and by the shutdown counter
        fn spawn_tracked<F>(&self, tracking: &EffectTracking, scope: Option<&EffectId>, task: F)
        where
            F: Future<Output = ()> + Send + 'static,
        {
            tracking.increment();
            self.pending_effects.fetch_add(1, Ordering::SeqCst);

            // Guards move into the task so an abort before the first poll still releases them
            let guards = (
                DecrementGuard(tracking.clone()),
                AtomicCounterGuard(Arc::clone(&self.pending_effects)),
            );

            let handle = tokio::spawn(async move {
                let _guards = guards;
                task.await;
            });

            if let Some(id) = scope {
                self.register_cancellable(id, handle.abort_handle());
            }
        }

        /// Apply an action produced by an effect, then broadcast it
        ///
        /// A correlated action keeps its correlation, and its effects count
        /// toward the originating call.
        async fn feed_back(self, action: A, correlation: Option<Correlation>) {
            let observed = action.clone();
            let applied = match &correlation {
                Some(origin) => self
                    .dispatch(action, &origin.tracking, Some(origin.id))
                    .await
                    .is_ok(),
                None => self.send(action).await.is_ok(),
            };
            if !applied {
                return;
            }

            if let Some(origin) = correlation {
                let _ = self.outcome_broadcast.send((origin.id, observed.clone()));
            }
            let _ = self.action_broadcast.send(observed);
        }

        #[tracing::instrument(skip(self, effect, tracking), name = "execute_effect")]
        fn execute_effect_internal(
            &self,
            effect: Effect<A>,
            tracking: &EffectTracking,
            scope: Option<&EffectId>,
            correlation: Option<u64>,
        ) {
            let origin = correlation.map(|id| Correlation {
                id,
                tracking: tracking.clone(),
            });

            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                },
                Effect::Future(fut) => {
                    tracing::trace!("Executing Effect::Future");
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);

                    let store = self.clone();
                    self.spawn_tracked(tracking, scope, async move {
                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, sending to store");
                            store.feed_back(action, origin).await;
                        } else {
                            tracing::trace!("Effect::Future completed with no action");
                        }
                    });
                },
                Effect::Delay { duration, action } => {
                    tracing::trace!("Executing Effect::Delay (duration: {:?})", duration);
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);

                    let store = self.clone();
                    self.spawn_tracked(tracking, scope, async move {
                        tokio::time::sleep(duration).await;
                        tracing::trace!("Effect::Delay completed, sending action");
                        store.feed_back(*action, origin).await;
                    });
                },
                Effect::Parallel(effects) => {
                    tracing::trace!("Executing Effect::Parallel with {} effects", effects.len());
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);

                    for effect in effects {
                        self.execute_effect_internal(effect, tracking, scope, correlation);
                    }
                },
                Effect::Sequential(effects) => {
                    let effect_count = effects.len();
                    tracing::trace!("Executing Effect::Sequential with {} effects", effect_count);
                    metrics::counter!("store.effects.executed", "type" => "sequential").increment(1);

                    let store = self.clone();
                    let scope_owned = scope.cloned();
                    self.spawn_tracked(tracking, scope, async move {
                        for (idx, effect) in effects.into_iter().enumerate() {
                            tracing::trace!("Executing sequential effect {} of {}", idx + 1, effect_count);

                            let (sub_tx, mut sub_rx) = watch::channel(());
                            let sub_tracking = EffectTracking {
                                counter: Arc::new(AtomicUsize::new(0)),
                                notifier: sub_tx,
                            };

                            store.execute_effect_internal(
                                effect,
                                &sub_tracking,
                                scope_owned.as_ref(),
                                correlation,
                            );

                            // Wait for this effect to complete before continuing
                            while sub_tracking.counter.load(Ordering::SeqCst) > 0 {
                                if sub_rx.changed().await.is_err() {
                                    break;
                                }
                            }
                        }
                        tracing::trace!("Effect::Sequential completed");
                    });
                },
                Effect::Cancellable { id, effect } => {
                    tracing::trace!(effect_id = %id, "Executing Effect::Cancellable");
                    self.execute_effect_internal(*effect, tracking, Some(&id), correlation);
                },
            }
        }
    }

    /// Drop finished handles, and ids left with none
    fn prune_finished(registry: &mut HashMap<EffectId, Vec<AbortHandle>>) {
        registry.retain(|_, handles| {
            handles.retain(|handle| !handle.is_finished());
            !handles.is_empty()
        });
    }

    /// Abort the handles and count the ones that were still running
    fn abort_all(handles: Vec<AbortHandle>) -> usize {
        let mut aborted = 0;
        for handle in handles {
            if !handle.is_finished() {
                aborted += 1;
            }
            handle.abort();
        }
        if aborted > 0 {
            metrics::counter!("store.effects.cancelled").increment(aborted as u64);
        }
        aborted
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                cancellations: Arc::clone(&self.cancellations),
                action_broadcast: self.action_broadcast.clone(),
                outcome_broadcast: self.outcome_broadcast.clone(),
                next_correlation: Arc::clone(&self.next_correlation),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;
