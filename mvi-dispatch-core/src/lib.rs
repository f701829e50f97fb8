//! Core traits and types for mvi-dispatch
//!
//! This crate provides the event-dispatch engine for building applications
//! with unidirectional data flow: a store accepts discrete input events
//! (intents), reduces them against a single state value, and emits one-off
//! notifications (effects) to observers.
//!
//! # Core Concepts
//!
//! - **Intent**: a discrete input event (user action or system trigger)
//! - **State**: the single current value for a feature, replayed to late
//!   subscribers
//! - **Effect**: a one-off notification, delivered at most once per item
//! - **Middleware**: a cross-cutting observer of the event flow
//! - **Handler**: a processing unit bound to one event sub-stream with a
//!   concurrency strategy (serial, latest-wins, concurrent, drop-while-busy)
//!
//! # Basic Example
//!
//! ```ignore
//! use mvi_dispatch_core::prelude::*;
//!
//! #[derive(Clone, Debug, PartialEq, Default)]
//! struct CounterState {
//!     count: i64,
//! }
//! impl State for CounterState {}
//!
//! #[derive(Clone, Debug)]
//! enum CounterIntent {
//!     Add(i64),
//! }
//! impl Intent for CounterIntent {}
//!
//! #[derive(Debug)]
//! enum CounterEffect {
//!     Overflowed,
//! }
//! impl Effect for CounterEffect {}
//!
//! let store = Store::new(StoreConfig::new(CounterState::default, |_, intents| {
//!     intents.install(LoggingMiddleware::new());
//!     intents.on(|store: Store<_, _, CounterEffect>, intent| async move {
//!         let CounterIntent::Add(n) = intent;
//!         store.mutate_state(|state| CounterState { count: state.count + n });
//!         Ok(())
//!     });
//! }));
//!
//! store.dispatch(CounterIntent::Add(1));
//! ```
//!
//! # Concurrency Strategies
//!
//! Each handler picks how it reacts to a new event while a prior one is
//! still in flight:
//!
//! | Selector     | Behavior                                               |
//! |--------------|--------------------------------------------------------|
//! | `serial`     | enqueue; strictly one at a time, in arrival order      |
//! | `latest`     | cancel the in-flight action; start the new one         |
//! | `concurrent` | run in parallel; completions are unordered             |
//! | `dropping`   | ignore new events until the in-flight action finishes  |
//!
//! Stream transforms (`debounce`, `distinct`, `filter`) compose ahead of
//! the strategy loop, and `catch` installs per-handler error recovery.

pub mod builder;
pub mod error;
pub mod ext;
pub mod handler;
pub mod intent;
pub mod middleware;
pub mod store;
pub mod testing;
pub mod transform;
pub mod wait;

// Marker trait exports
pub use intent::{Effect, Intent, State, SubIntent};

// Middleware exports
pub use middleware::{LoggingMiddleware, Middleware, NoopMiddleware};

// Store exports
pub use store::{Store, StoreConfig};

// DSL exports
pub use builder::IntentBuilder;
pub use handler::{ActionFn, ActionFuture, CatchFn, Handler, HandlerBuilder};

// Transform exports
pub use transform::{debounce, distinct, filter, EventStream, Transform};

// Error exports
pub use error::{BuildError, HandlerError};

// State-wait exports
pub use wait::await_state;

// Testing exports
pub use testing::{Record, RecordingMiddleware};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::builder::IntentBuilder;
    pub use crate::error::{BuildError, HandlerError};
    pub use crate::handler::{Handler, HandlerBuilder};
    pub use crate::intent::{Effect, Intent, State, SubIntent};
    pub use crate::middleware::{LoggingMiddleware, Middleware, NoopMiddleware};
    pub use crate::store::{Store, StoreConfig};
    pub use crate::wait::await_state;
}
