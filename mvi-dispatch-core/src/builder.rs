//! The setup DSL root: handler and middleware registration
//!
//! An [`IntentBuilder`] is handed to the consumer's setup routine exactly
//! once, during lazy store setup. Every `setup`/`listen` call produces an
//! independent handler bound to its own sub-stream; every `install` call
//! appends a middleware. Both lists are frozen when setup returns.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

use crate::handler::{Handler, HandlerBuilder};
use crate::intent::{Effect, Intent, State, SubIntent};
use crate::middleware::Middleware;
use crate::transform::EventStream;

/// Registration surface consumed inside a store's one-time setup routine.
pub struct IntentBuilder<S: State, I: Intent, E: Effect> {
    intent_tx: broadcast::Sender<I>,
    handlers: Vec<Handler<S, I, E>>,
    middlewares: Vec<Arc<dyn Middleware<I, S, E>>>,
}

impl<S: State, I: Intent, E: Effect> IntentBuilder<S, I, E> {
    pub(crate) fn new(intent_tx: broadcast::Sender<I>) -> Self {
        Self {
            intent_tx,
            handlers: Vec::new(),
            middlewares: Vec::new(),
        }
    }

    /// Install a middleware. Middlewares are notified in installation order
    /// and stay active for the store's entire lifetime.
    pub fn install<M>(&mut self, middleware: M) -> &mut Self
    where
        M: Middleware<I, S, E> + 'static,
    {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Register a handler for the sub-stream of intents matching `T`.
    ///
    /// Each call subscribes its own filtered view of the intent broadcast:
    /// two handlers registered for the same subtype each receive every
    /// matching intent independently.
    ///
    /// # Panics
    ///
    /// Panics if `configure` never selects a strategy: a configuration
    /// error surfaced at setup time, before any event flows.
    pub fn setup<T, F>(&mut self, configure: F) -> &mut Self
    where
        T: SubIntent<I>,
        F: FnOnce(&mut HandlerBuilder<T, S, I, E>),
    {
        let stream = filtered_intent_stream::<T, I>(self.intent_tx.subscribe());
        self.register(stream, configure)
    }

    /// Register a handler against an arbitrary external stream.
    ///
    /// The whole source stream is handed to the handler, with no type
    /// filtering.
    ///
    /// # Panics
    ///
    /// Panics if `configure` never selects a strategy.
    pub fn listen<St, T, F>(&mut self, source: St, configure: F) -> &mut Self
    where
        St: Stream<Item = T> + Send + 'static,
        T: Send + 'static,
        F: FnOnce(&mut HandlerBuilder<T, S, I, E>),
    {
        let stream: EventStream<T> = Box::pin(source.map(Ok));
        self.register(stream, configure)
    }

    fn register<T, F>(&mut self, stream: EventStream<T>, configure: F) -> &mut Self
    where
        T: Send + 'static,
        F: FnOnce(&mut HandlerBuilder<T, S, I, E>),
    {
        let mut handler = HandlerBuilder::new();
        configure(&mut handler);
        match handler.build(stream) {
            Ok(handler) => self.handlers.push(handler),
            Err(err) => panic!("invalid handler configuration: {err}"),
        }
        self
    }

    pub(crate) fn finish(
        self,
    ) -> (
        Vec<Handler<S, I, E>>,
        Vec<Arc<dyn Middleware<I, S, E>>>,
    ) {
        (self.handlers, self.middlewares)
    }
}

/// Subscribe a filtered sub-stream of the intent broadcast.
///
/// A handler that lags more than the broadcast capacity skips the missed
/// intents rather than stalling the dispatchers; the skip is logged.
fn filtered_intent_stream<T, I>(rx: broadcast::Receiver<I>) -> EventStream<T>
where
    I: Intent,
    T: SubIntent<I>,
{
    Box::pin(BroadcastStream::new(rx).filter_map(|item| match item {
        Ok(intent) => T::extract(intent).map(Ok),
        Err(BroadcastStreamRecvError::Lagged(missed)) => {
            warn!(missed, "handler lagged behind the intent stream; intents skipped");
            None
        }
    }))
}
