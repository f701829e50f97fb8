//! Middleware for observing intents, state changes, and effects

use crate::intent::{Effect, Intent, State};

/// Observer of a store's event flow, for logging, analytics, and other
/// cross-cutting concerns.
///
/// All three hooks default to no-ops; implement only what you need. Hooks
/// are invoked synchronously from the triggering store call, in the order
/// middlewares were installed. They take `&self` because the store calls
/// them from multiple tasks; stateful middleware should use interior
/// mutability.
pub trait Middleware<I, S, E>: Send + Sync
where
    I: Intent,
    S: State,
    E: Effect,
{
    /// Called when an intent is dispatched, before it is published to
    /// handlers.
    fn on_intent(&self, _intent: &I) {}

    /// Called after a state mutation commits, with the old and new values.
    /// Never called when a reducer returns a value equal to the old state.
    fn on_state_changed(&self, _old: &S, _new: &S) {}

    /// Called when an effect is emitted, before it is enqueued for delivery.
    fn on_effect(&self, _effect: &E) {}
}

/// A no-op middleware that observes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMiddleware;

impl<I: Intent, S: State, E: Effect> Middleware<I, S, E> for NoopMiddleware {}

/// Middleware that logs the event flow via `tracing` (for debugging).
#[derive(Debug, Clone)]
pub struct LoggingMiddleware {
    /// Whether to log dispatched intents.
    pub log_intents: bool,
    /// Whether to log state transitions.
    pub log_state_changes: bool,
    /// Whether to log emitted effects.
    pub log_effects: bool,
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingMiddleware {
    /// Log intents and effects only.
    pub fn new() -> Self {
        Self {
            log_intents: true,
            log_state_changes: false,
            log_effects: true,
        }
    }

    /// Log everything, including full state transitions.
    pub fn verbose() -> Self {
        Self {
            log_intents: true,
            log_state_changes: true,
            log_effects: true,
        }
    }
}

impl<I: Intent, S: State, E: Effect> Middleware<I, S, E> for LoggingMiddleware {
    fn on_intent(&self, intent: &I) {
        if self.log_intents {
            tracing::debug!(intent = %intent.name(), "intent dispatched");
        }
    }

    fn on_state_changed(&self, old: &S, new: &S) {
        if self.log_state_changes {
            tracing::debug!(?old, ?new, "state changed");
        }
    }

    fn on_effect(&self, effect: &E) {
        if self.log_effects {
            tracing::debug!(?effect, "effect emitted");
        }
    }
}
