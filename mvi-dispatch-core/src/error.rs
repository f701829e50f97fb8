//! Error types for handler configuration and execution

use thiserror::Error;

/// Error produced by a handler action or injected by a stream transform.
///
/// Boxed so consumer actions can bubble up any error type with `?`. How the
/// error is handled is decided by the handler's `catch` configuration.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Raised when a handler builder is finalized with an invalid configuration.
///
/// This is a fail-fast error: it surfaces during store setup, before any
/// event flows through the handler.
#[derive(Debug, Error)]
pub enum BuildError {
    /// No strategy selector was ever called on the builder, so the handler
    /// has no action to run.
    #[error("handler has no action: call serial/latest/concurrent/dropping before registering")]
    MissingAction,
}
