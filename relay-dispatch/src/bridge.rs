//! One-stop wiring of registry, dispatcher and supervisor.

use std::sync::Arc;

use relay_core::RoutePath;

use crate::{
    BackendGateway, DispatchError, DispatchStats, Dispatcher, DispatcherConfig, Handler,
    HandlerRegistry, TaskKind, TaskReport, TaskSupervisor,
};

/// A backend gateway plus the routes this process serves for it.
///
/// Each bridge owns its own registry, so several independent bridges can
/// live in one process. [`Bridge::start`] consumes the bridge, so its
/// server and dispatcher run at most once.
pub struct Bridge<B: BackendGateway> {
    dispatcher: Dispatcher<B>,
}

impl<B: BackendGateway + 'static> Bridge<B> {
    /// Create a bridge over `gateway`.
    ///
    /// # Errors
    /// Returns [`DispatchError::InvalidConfig`] if `config` does not validate.
    pub fn new(gateway: B, config: DispatcherConfig) -> Result<Self, DispatchError> {
        Self::with_shared_gateway(Arc::new(gateway), config)
    }

    /// Create a bridge over a gateway that is also used elsewhere.
    ///
    /// # Errors
    /// Returns [`DispatchError::InvalidConfig`] if `config` does not validate.
    pub fn with_shared_gateway(
        gateway: Arc<B>,
        config: DispatcherConfig,
    ) -> Result<Self, DispatchError> {
        let registry = Arc::new(HandlerRegistry::new(gateway));
        Ok(Self {
            dispatcher: Dispatcher::new(registry, config)?,
        })
    }

    /// The registry routes are registered in.
    #[must_use]
    pub fn registry(&self) -> &Arc<HandlerRegistry<B>> {
        self.dispatcher.registry()
    }

    /// Register `handler` for `path`. Routes can still be added after
    /// [`Bridge::start`] through [`RunningBridge::register`].
    ///
    /// # Errors
    /// See [`HandlerRegistry::register`].
    pub async fn register<H: Handler>(
        &self,
        path: &str,
        handler: H,
    ) -> Result<RoutePath, DispatchError> {
        self.registry().register(path, handler).await
    }

    /// Start the backend server and the dispatcher as two supervised tasks.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    #[must_use = "dropping the handle leaves the tasks running with no way to stop them"]
    pub fn start(self) -> RunningBridge<B> {
        let mut supervisor = TaskSupervisor::new();
        let registry = Arc::clone(self.dispatcher.registry());
        let stats = Arc::clone(self.dispatcher.stats());

        let gateway = Arc::clone(registry.gateway());
        let server_shutdown = supervisor.shutdown_token();
        supervisor.spawn(TaskKind::Server, async move {
            gateway.run_server(server_shutdown).await
        });

        let dispatcher = self.dispatcher;
        let dispatcher_shutdown = supervisor.shutdown_token();
        supervisor.spawn(TaskKind::Dispatcher, async move {
            dispatcher.run(dispatcher_shutdown).await;
            Ok::<(), DispatchError>(())
        });

        RunningBridge {
            registry,
            supervisor,
            stats,
        }
    }
}

impl<B: BackendGateway> std::fmt::Debug for Bridge<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("registry", self.dispatcher.registry())
            .field("config", self.dispatcher.config())
            .finish()
    }
}

/// Handle to a started [`Bridge`].
pub struct RunningBridge<B: BackendGateway> {
    registry: Arc<HandlerRegistry<B>>,
    supervisor: TaskSupervisor,
    stats: Arc<DispatchStats>,
}

impl<B: BackendGateway> RunningBridge<B> {
    /// The registry the running dispatcher serves.
    #[must_use]
    pub fn registry(&self) -> &Arc<HandlerRegistry<B>> {
        &self.registry
    }

    /// Register `handler` for `path` while the bridge is running. The
    /// dispatcher picks it up on its next cycle.
    ///
    /// # Errors
    /// See [`HandlerRegistry::register`].
    pub async fn register<H: Handler>(
        &self,
        path: &str,
        handler: H,
    ) -> Result<RoutePath, DispatchError> {
        self.registry.register(path, handler).await
    }

    /// The dispatcher's counters.
    #[must_use]
    pub fn stats(&self) -> &Arc<DispatchStats> {
        &self.stats
    }

    /// Ask both tasks to stop.
    pub fn shutdown(&self) {
        self.supervisor.shutdown();
    }

    /// Wait for the next task to end. `None` once both have been reported.
    pub async fn next_report(&mut self) -> Option<TaskReport> {
        self.supervisor.next_report().await
    }

    /// Stop both tasks and collect their reports.
    pub async fn shutdown_and_wait(self) -> Vec<TaskReport> {
        self.supervisor.shutdown();
        self.supervisor.wait().await
    }

    /// Wait for both tasks to end on their own and collect their reports.
    pub async fn wait(self) -> Vec<TaskReport> {
        self.supervisor.wait().await
    }
}

impl<B: BackendGateway> std::fmt::Debug for RunningBridge<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningBridge")
            .field("registry", &self.registry)
            .field("supervisor", &self.supervisor)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use relay_core::ApiRequest;

    use super::*;
    use crate::handler_fn;
    use crate::mock::MockGateway;

    fn fast_config() -> DispatcherConfig {
        DispatcherConfig::default().with_poll_interval(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn start_runs_one_server_and_accepts_late_routes() {
        let gateway = Arc::new(MockGateway::default());
        let bridge = Bridge::with_shared_gateway(Arc::clone(&gateway), fast_config())
            .unwrap_or_else(|e| panic!("bridge rejected config: {e}"));
        let running = bridge.start();

        running
            .register("/ping", handler_fn(|_request| Ok(b"pong".to_vec())))
            .await
            .unwrap_or_else(|e| panic!("late register failed: {e}"));
        gateway.push_batch(vec![ApiRequest::new("r1", "/ping", Vec::<u8>::new())]);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while gateway.sent().is_empty() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let reports = running.shutdown_and_wait().await;

        assert_eq!(gateway.server_starts.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.sent().len(), 1, "late route must be served exactly once");
        assert_eq!(gateway.sent()[0].body, b"pong");
        assert_eq!(reports.len(), 2);
    }

    #[test]
    fn zero_handler_timeout_is_rejected_before_start() {
        let config = DispatcherConfig::default().with_handler_timeout(Duration::ZERO);
        let result = Bridge::new(MockGateway::default(), config);
        assert!(matches!(result, Err(DispatchError::InvalidConfig(_))));
    }
}
