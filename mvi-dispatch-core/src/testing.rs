//! Test utilities for exercising stores
//!
//! # Example
//!
//! ```ignore
//! let recorder = RecordingMiddleware::default();
//! let mw = recorder.clone();
//! let store = Store::new(StoreConfig::new(AppState::default, move |_, intents| {
//!     intents.install(mw.clone());
//!     // handlers...
//! }));
//!
//! store.dispatch(AppIntent::Refresh);
//! assert_eq!(recorder.records()[0], Record::Intent("Refresh".into()));
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use crate::intent::{Effect, Intent, State};
use crate::middleware::Middleware;

/// One observed event in a store's flow, captured as debug strings so the
/// recorder stays generic over the consumer's types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// A dispatched intent, by its `Intent::name`.
    Intent(String),
    /// A committed state transition.
    StateChange {
        /// Debug rendering of the previous state.
        old: String,
        /// Debug rendering of the new state.
        new: String,
    },
    /// An emitted effect, debug-rendered.
    Effect(String),
}

/// Middleware that records everything it observes, for assertions in tests.
///
/// Clones share the same log: keep one handle for assertions and install
/// another into the store.
#[derive(Debug, Clone, Default)]
pub struct RecordingMiddleware {
    records: Arc<Mutex<Vec<Record>>>,
}

impl RecordingMiddleware {
    /// Snapshot of everything recorded so far, in observation order.
    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Clear the log.
    pub fn reset(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn push(&self, record: Record) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

impl<I: Intent, S: State, E: Effect> Middleware<I, S, E> for RecordingMiddleware {
    fn on_intent(&self, intent: &I) {
        self.push(Record::Intent(intent.name().to_string()));
    }

    fn on_state_changed(&self, old: &S, new: &S) {
        self.push(Record::StateChange {
            old: format!("{old:?}"),
            new: format!("{new:?}"),
        });
    }

    fn on_effect(&self, effect: &E) {
        self.push(Record::Effect(format!("{effect:?}")));
    }
}
