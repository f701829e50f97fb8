//! The store engine: state storage, intent broadcast, effect queue
//!
//! A [`Store`] owns the single current state value, the intent broadcast
//! stream that handlers consume, the effect delivery queue, and the
//! installed middlewares. All of it is created lazily: the first access to
//! any store operation runs the consumer's setup routine exactly once,
//! builds the initial state, and spawns the registered handlers onto the
//! store's processing scope.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::builder::IntentBuilder;
use crate::intent::{Effect, Intent, State};
use crate::middleware::Middleware;

/// Capacity of the intent broadcast stream. A handler that falls further
/// behind than this misses the oldest intents (logged as a warning).
pub(crate) const INTENT_CHANNEL_CAPACITY: usize = 1024;

type StateFactory<S> = Box<dyn Fn() -> S + Send + Sync>;
type SetupFn<S, I, E> = Box<dyn Fn(&Store<S, I, E>, &mut IntentBuilder<S, I, E>) + Send + Sync>;

/// The two consumer-supplied factories a store is built from: the initial
/// state constructor and the one-time setup routine that registers handlers
/// and middlewares.
///
/// # Example
///
/// ```ignore
/// let store = Store::new(StoreConfig::new(
///     CounterState::default,
///     |store, intents| {
///         intents.install(LoggingMiddleware::new());
///         intents.on::<Add, _, _>(|store, Add(n)| async move {
///             store.mutate_state(|state| CounterState(state.0 + n));
///             Ok(())
///         });
///     },
/// ));
/// ```
pub struct StoreConfig<S: State, I: Intent, E: Effect> {
    initial_state: StateFactory<S>,
    setup: SetupFn<S, I, E>,
}

impl<S: State, I: Intent, E: Effect> StoreConfig<S, I, E> {
    /// Bundle the initial-state factory and the setup routine.
    ///
    /// The setup routine runs at most once per store, on whichever task
    /// touches the store first. It must only register handlers and
    /// middlewares; calling store operations from inside it is not
    /// supported (handler actions may, once events flow).
    pub fn new<FState, FSetup>(initial_state: FState, setup: FSetup) -> Self
    where
        FState: Fn() -> S + Send + Sync + 'static,
        FSetup: Fn(&Store<S, I, E>, &mut IntentBuilder<S, I, E>) + Send + Sync + 'static,
    {
        Self {
            initial_state: Box::new(initial_state),
            setup: Box::new(setup),
        }
    }
}

/// Unidirectional-data-flow store: dispatch intents, reduce state, emit
/// effects.
///
/// Cloning a store is cheap and yields a handle to the same engine; handler
/// actions receive such a handle as their first argument.
///
/// Stores schedule all asynchronous work on the current tokio runtime, so
/// they must be used from within one.
pub struct Store<S: State, I: Intent, E: Effect> {
    core: Arc<StoreCore<S, I, E>>,
}

impl<S: State, I: Intent, E: Effect> Clone for Store<S, I, E> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

struct StoreCore<S: State, I: Intent, E: Effect> {
    config: StoreConfig<S, I, E>,
    scope: CancellationToken,
    runtime: OnceLock<StoreRuntime<S, I, E>>,
}

struct StoreRuntime<S: State, I: Intent, E: Effect> {
    state_tx: watch::Sender<S>,
    intent_tx: broadcast::Sender<I>,
    effect_tx: mpsc::UnboundedSender<E>,
    /// Held here until claimed so effects buffer instead of dropping.
    effect_rx: Mutex<Option<mpsc::UnboundedReceiver<E>>>,
    middlewares: Vec<Arc<dyn Middleware<I, S, E>>>,
}

impl<S: State, I: Intent, E: Effect> Store<S, I, E> {
    /// Create a store with its own processing scope.
    pub fn new(config: StoreConfig<S, I, E>) -> Self {
        Self::with_scope(config, CancellationToken::new())
    }

    /// Create a store whose asynchronous work is tied to the given scope.
    ///
    /// The owning collaborator keeps the cancellation lifetime: cancelling
    /// the token tears down every handler loop and in-flight action.
    pub fn with_scope(config: StoreConfig<S, I, E>, scope: CancellationToken) -> Self {
        Self {
            core: Arc::new(StoreCore {
                config,
                scope,
                runtime: OnceLock::new(),
            }),
        }
    }

    /// One-time lazy setup, guarded so concurrent first accesses still run
    /// the setup routine exactly once.
    fn runtime(&self) -> &StoreRuntime<S, I, E> {
        self.core.runtime.get_or_init(|| {
            let (state_tx, _) = watch::channel((self.core.config.initial_state)());
            let (intent_tx, _) = broadcast::channel(INTENT_CHANNEL_CAPACITY);
            let (effect_tx, effect_rx) = mpsc::unbounded_channel();

            let mut builder = IntentBuilder::new(intent_tx.clone());
            (self.core.config.setup)(self, &mut builder);
            let (handlers, middlewares) = builder.finish();

            debug!(
                handlers = handlers.len(),
                middlewares = middlewares.len(),
                "store setup complete"
            );

            for handler in handlers {
                handler.run(self.clone(), self.core.scope.clone());
            }

            StoreRuntime {
                state_tx,
                intent_tx,
                effect_tx,
                effect_rx: Mutex::new(Some(effect_rx)),
                middlewares,
            }
        })
    }

    /// Get the current state, triggering setup on first access.
    pub fn get_state(&self) -> S {
        self.runtime().state_tx.borrow().clone()
    }

    /// Dispatch an intent.
    ///
    /// Middleware `on_intent` hooks run synchronously on the caller's task,
    /// in installation order; the intent is then published to every
    /// registered handler's filtered sub-stream. Never fails: an intent no
    /// handler listens to is simply dropped.
    pub fn dispatch(&self, intent: I) {
        let runtime = self.runtime();
        for middleware in &runtime.middlewares {
            middleware.on_intent(&intent);
        }
        if runtime.intent_tx.send(intent).is_err() {
            debug!("no handlers subscribed; intent dropped");
        }
    }

    /// Atomically replace the current state with `reducer(current)`.
    ///
    /// Concurrent calls are linearized; no reader ever observes a partially
    /// applied reducer. Middleware `on_state_changed` fires only when the
    /// new value differs from the old one.
    pub fn mutate_state<F>(&self, reducer: F)
    where
        F: FnOnce(S) -> S,
    {
        let runtime = self.runtime();
        let mut transition: Option<(S, S)> = None;
        runtime.state_tx.send_if_modified(|state| {
            let next = reducer(state.clone());
            if next == *state {
                return false;
            }
            transition = Some((state.clone(), next.clone()));
            *state = next;
            true
        });
        if let Some((old, new)) = transition {
            for middleware in &runtime.middlewares {
                middleware.on_state_changed(&old, &new);
            }
        }
    }

    /// Emit a one-off effect.
    ///
    /// The factory is evaluated once, middleware `on_effect` hooks run
    /// synchronously, then the effect is enqueued. Effects buffer unbounded
    /// until the receiver from [`take_effects`](Store::take_effects) is
    /// consumed; they are delivered in emission order, each at most once.
    pub fn emit_effect<F>(&self, factory: F)
    where
        F: FnOnce() -> E,
    {
        let runtime = self.runtime();
        let effect = factory();
        for middleware in &runtime.middlewares {
            middleware.on_effect(&effect);
        }
        if runtime.effect_tx.send(effect).is_err() {
            debug!("effect receiver dropped; effect discarded");
        }
    }

    /// Subscribe to state changes. The receiver always holds a value and
    /// replays the latest state to new subscribers.
    pub fn state_stream(&self) -> watch::Receiver<S> {
        self.runtime().state_tx.subscribe()
    }

    /// Claim the effect stream: the single logical consumption point.
    ///
    /// Returns `None` if it was already claimed. Effects emitted before the
    /// claim are waiting in the receiver; nothing is replayed to a second
    /// claimant.
    pub fn take_effects(&self) -> Option<mpsc::UnboundedReceiver<E>> {
        self.runtime()
            .effect_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// The store's processing scope.
    pub fn scope(&self) -> &CancellationToken {
        &self.core.scope
    }

    /// Tear down the store's background work: cancels every handler loop
    /// and in-flight action.
    pub fn shutdown(&self) {
        self.core.scope.cancel();
    }
}
