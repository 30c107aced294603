//! Polling loop that moves requests from the backend to their handlers.
//!
//! Each cycle:
//! 1. Skips the fetch entirely if no routes are registered
//! 2. Fetches the pending batch from the backend
//! 3. Runs the handler for each request, in batch order, one at a time
//! 4. Sends each successful result back, stamped with the request's id
//!
//! Failures are attributed to the single request (or cycle) that caused
//! them and never end the loop. Only the cancellation token does.

use std::sync::Arc;

use relay_core::{ApiRequest, ApiResponse, RequestId};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use crate::supervisor::panic_message;
use crate::{
    BackendError, BackendGateway, DispatchError, DispatchStats, DispatcherConfig, Handler,
    HandlerFailure, HandlerRegistry,
};

/// What one dispatch cycle did.
#[derive(Debug)]
#[non_exhaustive]
pub enum CycleReport {
    /// No routes were registered, so nothing was fetched.
    Idle,
    /// The fetch failed; no request was processed.
    FetchFailed(BackendError),
    /// The batch was fetched and every request in it was attempted, in order.
    Dispatched(Vec<RequestOutcome>),
}

/// Result of processing one fetched request.
#[derive(Debug)]
#[non_exhaustive]
pub struct RequestOutcome {
    /// Id of the request this outcome belongs to.
    pub id: RequestId,
    /// Path of the request as the backend reported it.
    pub path: String,
    /// `Ok` once the response has been handed to the backend.
    pub result: Result<(), DispatchError>,
}

/// Drains the backend's pending requests into registered handlers.
///
/// # Cancel Safety
/// Cancelling the token stops the loop at the next cycle boundary or during
/// the inter-cycle sleep. A batch already being processed is finished first,
/// so no fetched request is silently dropped.
pub struct Dispatcher<B: BackendGateway> {
    gateway: Arc<B>,
    registry: Arc<HandlerRegistry<B>>,
    config: DispatcherConfig,
    stats: Arc<DispatchStats>,
}

impl<B: BackendGateway> Dispatcher<B> {
    /// Create a dispatcher serving the routes in `registry`, using the
    /// registry's gateway.
    ///
    /// # Errors
    /// Returns [`DispatchError::InvalidConfig`] if `config` does not validate.
    pub fn new(
        registry: Arc<HandlerRegistry<B>>,
        config: DispatcherConfig,
    ) -> Result<Self, DispatchError> {
        config.validate()?;
        Ok(Self {
            gateway: Arc::clone(registry.gateway()),
            registry,
            config,
            stats: Arc::new(DispatchStats::default()),
        })
    }

    /// The registry requests are dispatched from.
    #[must_use]
    pub fn registry(&self) -> &Arc<HandlerRegistry<B>> {
        &self.registry
    }

    /// Counters updated by every cycle.
    #[must_use]
    pub fn stats(&self) -> &Arc<DispatchStats> {
        &self.stats
    }

    /// The configuration this dispatcher polls with.
    #[must_use]
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Run dispatch cycles until `shutdown` fires.
    pub async fn run(&self, shutdown: CancellationToken) {
        let interval = self.config.poll_interval();
        tracing::info!(poll_interval_ms = interval.as_millis(), "dispatcher started");

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            self.run_cycle().await;

            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(interval) => {}
            }
        }

        tracing::info!("dispatcher stopped");
    }

    /// Run a single dispatch cycle without sleeping.
    pub async fn run_cycle(&self) -> CycleReport {
        self.stats.record_cycle();

        if self.registry.is_empty() {
            self.stats.record_idle();
            tracing::trace!("no routes registered; skipping fetch");
            return CycleReport::Idle;
        }

        let batch = match self.gateway.fetch_pending_requests().await {
            Ok(batch) => batch,
            Err(e) => {
                self.stats.record_fetch_failure();
                tracing::warn!(error = %e, "failed to fetch pending requests");
                return CycleReport::FetchFailed(e);
            }
        };

        if !batch.is_empty() {
            tracing::debug!(count = batch.len(), "dispatching batch");
        }

        let mut outcomes = Vec::with_capacity(batch.len());
        for request in batch {
            outcomes.push(self.dispatch(request).await);
        }
        CycleReport::Dispatched(outcomes)
    }

    async fn dispatch(&self, request: ApiRequest) -> RequestOutcome {
        let id = request.id.clone();
        let path = request.path.clone();
        let result = self.process(request).await;

        match &result {
            Ok(()) => {
                self.stats.record_dispatched();
                tracing::debug!(request_id = %id, path = %path, "request answered");
            }
            Err(DispatchError::UnknownRoute(_)) => {
                self.stats.record_unknown_route();
                tracing::warn!(request_id = %id, path = %path, "no handler for request");
            }
            Err(DispatchError::HandlerExecution { failure, .. }) => {
                self.stats.record_handler_failure();
                tracing::warn!(request_id = %id, path = %path, %failure, "handler failed");
            }
            Err(e) => {
                self.stats.record_send_failure();
                tracing::warn!(
                    request_id = %id, path = %path, error = %e,
                    "failed to send response"
                );
            }
        }

        RequestOutcome { id, path, result }
    }

    async fn process(&self, request: ApiRequest) -> Result<(), DispatchError> {
        let handler = self.registry.lookup(&request.path)?;
        let request = Arc::new(request);
        let body = self.invoke(handler, Arc::clone(&request)).await?;
        self.gateway
            .send_response(ApiResponse::answering(&request, body))
            .await?;
        Ok(())
    }

    async fn invoke(
        &self,
        handler: Arc<dyn Handler>,
        request: Arc<ApiRequest>,
    ) -> Result<Vec<u8>, DispatchError> {
        let path = request.path.clone();
        let task = tokio::task::spawn_blocking(move || handler.handle(&request));

        let joined = match self.config.handler_timeout() {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    return Err(DispatchError::HandlerExecution {
                        path,
                        failure: HandlerFailure::TimedOut(limit),
                    })
                }
            },
            None => task.await,
        };

        let failure = match joined {
            Ok(Ok(body)) => return Ok(body),
            Ok(Err(e)) => HandlerFailure::Failed(e.to_string()),
            Err(e) => join_failure(e),
        };
        Err(DispatchError::HandlerExecution { path, failure })
    }
}

fn join_failure(err: JoinError) -> HandlerFailure {
    if err.is_panic() {
        HandlerFailure::Panicked(panic_message(&*err.into_panic()))
    } else {
        HandlerFailure::Cancelled
    }
}

impl<B: BackendGateway> std::fmt::Debug for Dispatcher<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}
