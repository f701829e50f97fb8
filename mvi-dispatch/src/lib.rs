//! mvi-dispatch: unidirectional-data-flow state management
//!
//! Intents in, one state value out, one-off effects on the side. A store
//! fans dispatched intents out to typed handlers, each with its own
//! concurrency strategy, and notifies middlewares of everything that flows.
//!
//! # Example
//! ```ignore
//! use mvi_dispatch::prelude::*;
//!
//! #[derive(Clone, Debug, PartialEq, Default)]
//! struct AppState {
//!     query: String,
//! }
//! impl State for AppState {}
//!
//! #[derive(Clone, Debug)]
//! enum AppIntent {
//!     Search(String),
//! }
//! impl Intent for AppIntent {}
//! ```

// Re-export everything from core
pub use mvi_dispatch_core::*;

/// Prelude for convenient imports
pub mod prelude {
    // Marker traits
    pub use mvi_dispatch_core::{Effect, Intent, State, SubIntent};

    // Store
    pub use mvi_dispatch_core::{Store, StoreConfig};

    // DSL
    pub use mvi_dispatch_core::{HandlerBuilder, IntentBuilder};

    // Middleware
    pub use mvi_dispatch_core::{LoggingMiddleware, Middleware, NoopMiddleware};

    // Errors
    pub use mvi_dispatch_core::{BuildError, HandlerError};

    // State-wait helper
    pub use mvi_dispatch_core::await_state;
}
