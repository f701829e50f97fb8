//! Marker traits for the three MVI roles

use std::fmt::Debug;

/// Marker trait for intents dispatched to a store.
///
/// Intents represent discrete input events: user actions or system triggers.
/// They should be:
/// - Clone: intents are fanned out to every registered handler
/// - Debug: for debugging and logging
/// - Send + 'static: for async dispatch across tasks
pub trait Intent: Clone + Debug + Send + 'static {
    /// Get the intent name for logging and middleware.
    ///
    /// Defaults to the type name; override to report per-variant names.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Marker trait for the single current state value of a store.
///
/// `PartialEq` is required so no-op reducers can be detected: middleware is
/// only notified of a state change when the new value differs from the old.
pub trait State: Clone + Debug + PartialEq + Send + Sync + 'static {}

/// Marker trait for one-off notifications emitted by a store.
///
/// Effects are queued until consumed and delivered at most once per item.
pub trait Effect: Debug + Send + 'static {}

/// Extraction of a typed sub-stream from the intent broadcast.
///
/// `IntentBuilder::setup::<T>` registers a handler that only sees intents
/// for which `T::extract` returns `Some`. This is how type-filtered
/// registration works without runtime reflection: each registerable subtype
/// declares how it is carved out of the store's intent type.
///
/// # Example
///
/// ```ignore
/// #[derive(Clone, Debug)]
/// enum CounterIntent {
///     Add(i64),
///     Reset,
/// }
///
/// impl Intent for CounterIntent {}
///
/// #[derive(Clone, Debug)]
/// struct Add(i64);
///
/// impl SubIntent<CounterIntent> for Add {
///     fn extract(intent: CounterIntent) -> Option<Self> {
///         match intent {
///             CounterIntent::Add(n) => Some(Add(n)),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait SubIntent<I: Intent>: Send + 'static {
    /// Extract this subtype from an intent, or `None` if it does not match.
    fn extract(intent: I) -> Option<Self>
    where
        Self: Sized;
}

/// Every intent type matches itself: `setup::<I>` receives the whole stream.
impl<I: Intent> SubIntent<I> for I {
    fn extract(intent: I) -> Option<Self> {
        Some(intent)
    }
}
