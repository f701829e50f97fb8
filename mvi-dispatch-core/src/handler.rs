//! Handlers: configured processing strategies bound to one event sub-stream
//!
//! A handler couples an input stream (a type-filtered slice of the intent
//! broadcast, or an external source) with a concurrency strategy, an
//! optional transform pipeline, an optional error-recovery callback, and
//! the action callback itself. Handlers are built once during store setup
//! and run as one long-lived task each for the store's entire lifetime.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::task::{JoinHandle, JoinSet};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::{BuildError, HandlerError};
use crate::intent::{Effect, Intent, State};
use crate::store::Store;
use crate::transform::{EventStream, Transform};

/// Boxed future returned by a handler action.
pub type ActionFuture = Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send>>;

/// A handler's action callback: receives a store handle and one event.
pub type ActionFn<T, S, I, E> = Arc<dyn Fn(Store<S, I, E>, T) -> ActionFuture + Send + Sync>;

/// Error-recovery callback installed via `HandlerBuilder::catch`.
pub type CatchFn = Arc<dyn Fn(HandlerError) + Send + Sync>;

/// How a handler reacts to a new event while a prior one is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    /// Enqueue; process strictly in arrival order, one at a time.
    Serial,
    /// Cancel in-flight processing; start the new event immediately.
    Latest,
    /// Process every event in parallel; completions are unordered.
    Concurrent,
    /// Ignore new events while one is in flight.
    Dropping,
}

/// Builds a [`Handler`]: pick exactly one strategy (the last selector call
/// wins), then optionally chain transforms and an error-recovery callback.
pub struct HandlerBuilder<T, S: State, I: Intent, E: Effect> {
    strategy: Strategy,
    action: Option<ActionFn<T, S, I, E>>,
    transforms: Vec<Transform<T>>,
    catch: Option<CatchFn>,
}

impl<T, S, I, E> HandlerBuilder<T, S, I, E>
where
    T: Send + 'static,
    S: State,
    I: Intent,
    E: Effect,
{
    pub(crate) fn new() -> Self {
        Self {
            strategy: Strategy::Serial,
            action: None,
            transforms: Vec::new(),
            catch: None,
        }
    }

    /// Process events strictly in arrival order, one at a time.
    pub fn serial<F, Fut>(&mut self, action: F) -> &mut Self
    where
        F: Fn(Store<S, I, E>, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.select(Strategy::Serial, action)
    }

    /// Cancel the in-flight action when a new event arrives.
    pub fn latest<F, Fut>(&mut self, action: F) -> &mut Self
    where
        F: Fn(Store<S, I, E>, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.select(Strategy::Latest, action)
    }

    /// Process every event in parallel, with no completion ordering.
    pub fn concurrent<F, Fut>(&mut self, action: F) -> &mut Self
    where
        F: Fn(Store<S, I, E>, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.select(Strategy::Concurrent, action)
    }

    /// Ignore new events while one is in flight.
    pub fn dropping<F, Fut>(&mut self, action: F) -> &mut Self
    where
        F: Fn(Store<S, I, E>, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.select(Strategy::Dropping, action)
    }

    fn select<F, Fut>(&mut self, strategy: Strategy, action: F) -> &mut Self
    where
        F: Fn(Store<S, I, E>, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.strategy = strategy;
        self.action = Some(Arc::new(move |store, event| {
            let fut: ActionFuture = Box::pin(action(store, event));
            fut
        }));
        self
    }

    /// Chain a stream transform ahead of the strategy loop.
    ///
    /// Multiple calls compose in call order: each wraps the output of the
    /// previous transform.
    pub fn transform(&mut self, op: Transform<T>) -> &mut Self {
        self.transforms.push(op);
        self
    }

    /// Install an error-recovery callback.
    ///
    /// Action errors are caught per event and handed to the callback;
    /// processing of subsequent events continues. Without a callback, the
    /// first uncaught error terminates this handler's loop (other handlers
    /// are unaffected).
    pub fn catch<F>(&mut self, recover: F) -> &mut Self
    where
        F: Fn(HandlerError) + Send + Sync + 'static,
    {
        self.catch = Some(Arc::new(recover));
        self
    }

    /// Finalize the builder against its upstream, applying transforms in
    /// call order. Fails if no strategy selector was ever called.
    pub(crate) fn build(self, upstream: EventStream<T>) -> Result<Handler<S, I, E>, BuildError> {
        let action = self.action.ok_or(BuildError::MissingAction)?;
        let mut stream = upstream;
        for transform in self.transforms {
            stream = transform(stream);
        }

        let strategy = self.strategy;
        let catch = self.catch;
        Ok(Handler {
            runner: Box::new(move |store, token| {
                tokio::spawn(run_loop(strategy, stream, action, catch, store, token));
            }),
        })
    }
}

type HandlerRunner<S, I, E> = Box<dyn FnOnce(Store<S, I, E>, CancellationToken) + Send>;

/// An immutable, runnable handler produced by [`HandlerBuilder`].
///
/// The store runs each handler exactly once at setup; the handler's loop
/// lives until the store's processing scope is cancelled.
pub struct Handler<S: State, I: Intent, E: Effect> {
    runner: HandlerRunner<S, I, E>,
}

impl<S: State, I: Intent, E: Effect> Handler<S, I, E> {
    /// Kick off the strategy loop on the given scope. Non-blocking: the
    /// loop is spawned, not awaited.
    pub(crate) fn run(self, store: Store<S, I, E>, token: CancellationToken) {
        (self.runner)(store, token);
    }
}

async fn run_loop<T, S, I, E>(
    strategy: Strategy,
    stream: EventStream<T>,
    action: ActionFn<T, S, I, E>,
    catch: Option<CatchFn>,
    store: Store<S, I, E>,
    scope: CancellationToken,
) where
    T: Send + 'static,
    S: State,
    I: Intent,
    E: Effect,
{
    // Child token so an uncaught action error can stop this handler without
    // touching the rest of the store's scope.
    let token = scope.child_token();
    match strategy {
        Strategy::Serial => serial_loop(stream, action, catch, store, token).await,
        Strategy::Latest => latest_loop(stream, action, catch, store, token).await,
        Strategy::Concurrent => concurrent_loop(stream, action, catch, store, token).await,
        Strategy::Dropping => dropping_loop(stream, action, catch, store, token).await,
    }
}

/// Route a transform-pipeline error. Returns `true` when the loop must stop.
fn pipeline_failed(err: HandlerError, catch: &Option<CatchFn>, halt_when_caught: bool) -> bool {
    match catch {
        Some(recover) => {
            recover(err);
            halt_when_caught
        }
        None => {
            error!(error = %err, "handler pipeline failed; stopping handler");
            true
        }
    }
}

async fn serial_loop<T, S, I, E>(
    mut stream: EventStream<T>,
    action: ActionFn<T, S, I, E>,
    catch: Option<CatchFn>,
    store: Store<S, I, E>,
    token: CancellationToken,
) where
    T: Send + 'static,
    S: State,
    I: Intent,
    E: Effect,
{
    loop {
        let item = tokio::select! {
            _ = token.cancelled() => break,
            item = stream.next() => match item {
                Some(item) => item,
                None => break,
            },
        };

        match item {
            Ok(event) => {
                let result = tokio::select! {
                    _ = token.cancelled() => break,
                    result = action(store.clone(), event) => result,
                };
                if let Err(err) = result {
                    match &catch {
                        Some(recover) => recover(err),
                        None => {
                            error!(error = %err, "handler action failed; stopping handler");
                            break;
                        }
                    }
                }
            }
            // A pipeline error means the upstream is considered terminated
            // for a serial handler, even when a catch callback swallows it.
            Err(err) => {
                if pipeline_failed(err, &catch, true) {
                    break;
                }
            }
        }
    }
}

async fn latest_loop<T, S, I, E>(
    mut stream: EventStream<T>,
    action: ActionFn<T, S, I, E>,
    catch: Option<CatchFn>,
    store: Store<S, I, E>,
    token: CancellationToken,
) where
    T: Send + 'static,
    S: State,
    I: Intent,
    E: Effect,
{
    let mut in_flight: Option<JoinHandle<()>> = None;
    loop {
        let item = tokio::select! {
            _ = token.cancelled() => break,
            item = stream.next() => match item {
                Some(item) => item,
                None => break,
            },
        };

        match item {
            Ok(event) => {
                // Supersede: abort only the in-flight action, not the loop.
                if let Some(handle) = in_flight.take() {
                    handle.abort();
                }
                in_flight = Some(spawn_action(
                    action.clone(),
                    catch.clone(),
                    store.clone(),
                    event,
                    token.clone(),
                ));
            }
            Err(err) => {
                if pipeline_failed(err, &catch, false) {
                    break;
                }
            }
        }
    }
    if let Some(handle) = in_flight.take() {
        handle.abort();
    }
}

async fn concurrent_loop<T, S, I, E>(
    mut stream: EventStream<T>,
    action: ActionFn<T, S, I, E>,
    catch: Option<CatchFn>,
    store: Store<S, I, E>,
    token: CancellationToken,
) where
    T: Send + 'static,
    S: State,
    I: Intent,
    E: Effect,
{
    let mut in_flight: JoinSet<()> = JoinSet::new();
    loop {
        let item = tokio::select! {
            _ = token.cancelled() => break,
            item = stream.next() => match item {
                Some(item) => item,
                None => break,
            },
        };

        // Reap whatever already finished so the set stays small.
        while in_flight.try_join_next().is_some() {}

        match item {
            Ok(event) => {
                let action = action.clone();
                let catch = catch.clone();
                let store = store.clone();
                let token = token.clone();
                in_flight.spawn(run_action(action, catch, store, event, token));
            }
            Err(err) => {
                if pipeline_failed(err, &catch, false) {
                    break;
                }
            }
        }
    }
    // Dropping the set aborts whatever is still running; reaching this point
    // means the scope was cancelled or the upstream closed.
}

async fn dropping_loop<T, S, I, E>(
    mut stream: EventStream<T>,
    action: ActionFn<T, S, I, E>,
    catch: Option<CatchFn>,
    store: Store<S, I, E>,
    token: CancellationToken,
) where
    T: Send + 'static,
    S: State,
    I: Intent,
    E: Effect,
{
    let mut in_flight: Option<JoinHandle<()>> = None;
    loop {
        let item = tokio::select! {
            _ = token.cancelled() => break,
            item = stream.next() => match item {
                Some(item) => item,
                None => break,
            },
        };

        match item {
            Ok(event) => {
                let busy = in_flight
                    .as_ref()
                    .map(|handle| !handle.is_finished())
                    .unwrap_or(false);
                if busy {
                    debug!("handler busy; dropping event");
                    continue;
                }
                in_flight = Some(spawn_action(
                    action.clone(),
                    catch.clone(),
                    store.clone(),
                    event,
                    token.clone(),
                ));
            }
            Err(err) => {
                if pipeline_failed(err, &catch, false) {
                    break;
                }
            }
        }
    }
    if let Some(handle) = in_flight.take() {
        handle.abort();
    }
}

fn spawn_action<T, S, I, E>(
    action: ActionFn<T, S, I, E>,
    catch: Option<CatchFn>,
    store: Store<S, I, E>,
    event: T,
    token: CancellationToken,
) -> JoinHandle<()>
where
    T: Send + 'static,
    S: State,
    I: Intent,
    E: Effect,
{
    tokio::spawn(run_action(action, catch, store, event, token))
}

async fn run_action<T, S, I, E>(
    action: ActionFn<T, S, I, E>,
    catch: Option<CatchFn>,
    store: Store<S, I, E>,
    event: T,
    token: CancellationToken,
) where
    T: Send + 'static,
    S: State,
    I: Intent,
    E: Effect,
{
    let result = tokio::select! {
        _ = token.cancelled() => return,
        result = action(store, event) => result,
    };
    if let Err(err) = result {
        match catch {
            Some(recover) => recover(err),
            None => {
                error!(error = %err, "handler action failed; stopping handler");
                token.cancel();
            }
        }
    }
}
