//! Error types for the dispatch crate.

use std::time::Duration;

use relay_core::{CoreError, RoutePath};

/// Failures reported by a [`BackendGateway`](crate::BackendGateway).
///
/// All of them are treated as transient by the dispatcher.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BackendError {
    /// The backend server has not started, or has already stopped.
    #[error("backend server is not running")]
    ServerNotRunning,

    /// A call into the backend failed.
    #[error("backend call failed: {0}")]
    Transport(String),

    /// Underlying I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// How a handler invocation went wrong.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum HandlerFailure {
    /// The handler returned an error.
    #[error("returned error: {0}")]
    Failed(String),

    /// The handler panicked.
    #[error("panicked: {0}")]
    Panicked(String),

    /// The handler's thread was cancelled before it finished, e.g. because
    /// the runtime is shutting down.
    #[error("was cancelled before finishing")]
    Cancelled,

    /// The handler did not finish within the configured timeout.
    #[error("timed out after {} ms", .0.as_millis())]
    TimedOut(Duration),
}

/// Errors raised by route registration and by dispatching a single request.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DispatchError {
    /// The path already has a handler. Never retried.
    #[error("route already registered: {0}")]
    DuplicateRoute(RoutePath),

    /// A fetched request names a path with no handler on this process.
    #[error("no handler registered for path '{0}'")]
    UnknownRoute(String),

    /// The handler for a request failed. Isolated to that request.
    #[error("handler for '{path}' {failure}")]
    HandlerExecution { path: String, failure: HandlerFailure },

    /// Fetching, sending or registering against the backend failed.
    #[error("backend communication failed: {0}")]
    Backend(#[from] BackendError),

    /// A route path could not be normalised.
    #[error(transparent)]
    InvalidPath(#[from] CoreError),

    /// A configuration value is out of range or unparsable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_execution_display_includes_path_and_failure() {
        let err = DispatchError::HandlerExecution {
            path: "/ping".to_owned(),
            failure: HandlerFailure::TimedOut(Duration::from_millis(250)),
        };
        assert_eq!(err.to_string(), "handler for '/ping' timed out after 250 ms");
    }

    #[test]
    fn backend_error_converts_into_dispatch_error() {
        let err: DispatchError = BackendError::ServerNotRunning.into();
        assert!(matches!(err, DispatchError::Backend(BackendError::ServerNotRunning)));
    }
}
