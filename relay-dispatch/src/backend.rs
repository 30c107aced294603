//! Backend gateway abstraction trait.
//!
//! The backend owns the network listener and the pending-request queue.
//! This crate only talks to it through this trait, so any backend (an
//! embedded HTTP server, an FFI bridge, an in-memory fake) can be plugged
//! in without changing the dispatch logic.

use async_trait::async_trait;
use relay_core::{ApiRequest, ApiResponse, RoutePath};
use tokio_util::sync::CancellationToken;

use crate::BackendError;

/// Contract between the bridge and the backend that serves external callers.
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// Run the backend server until `shutdown` fires or the server fails.
    ///
    /// # Errors
    /// Returns a [`BackendError`] if the server cannot start or stops
    /// abnormally. The supervisor reports it; it does not restart the server.
    async fn run_server(&self, shutdown: CancellationToken) -> Result<(), BackendError>;

    /// Tell the backend to queue requests matching `path` for this process.
    ///
    /// # Errors
    /// Returns a [`BackendError`] if the backend cannot be reached.
    async fn register_route(&self, path: &RoutePath) -> Result<(), BackendError>;

    /// Return the requests queued since the last call, oldest first.
    ///
    /// May return an empty batch. Must not block indefinitely.
    ///
    /// # Errors
    /// Returns [`BackendError::ServerNotRunning`] before the server is up,
    /// or another [`BackendError`] if the queue cannot be read.
    async fn fetch_pending_requests(&self) -> Result<Vec<ApiRequest>, BackendError>;

    /// Deliver a response to the caller waiting on `response.id`.
    ///
    /// # Errors
    /// Returns a [`BackendError`] if the response cannot be handed over.
    async fn send_response(&self, response: ApiResponse) -> Result<(), BackendError>;
}
