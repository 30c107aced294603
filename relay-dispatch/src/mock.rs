//! Scripted in-memory gateway for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use relay_core::{ApiRequest, ApiResponse, RequestId, RoutePath};
use tokio_util::sync::CancellationToken;

use crate::{BackendError, BackendGateway};

/// Gateway whose fetches are scripted per call and whose side effects are
/// recorded for assertions.
#[derive(Default)]
pub(crate) struct MockGateway {
    pub routes: Mutex<Vec<RoutePath>>,
    pub batches: Mutex<VecDeque<Result<Vec<ApiRequest>, BackendError>>>,
    pub sent: Mutex<Vec<ApiResponse>>,
    pub fetches: AtomicUsize,
    pub fail_register: AtomicBool,
    pub fail_next_register: AtomicBool,
    pub register_delay_ms: AtomicU64,
    pub server_starts: AtomicUsize,
    pub fail_server: AtomicBool,
    pub refuse_send_for: Mutex<Vec<RequestId>>,
}

impl MockGateway {
    pub fn push_batch(&self, batch: Vec<ApiRequest>) {
        self.batches.lock().expect("batches lock").push_back(Ok(batch));
    }

    pub fn push_fetch_error(&self, error: BackendError) {
        self.batches.lock().expect("batches lock").push_back(Err(error));
    }

    pub fn registered_routes(&self) -> Vec<RoutePath> {
        self.routes.lock().expect("routes lock").clone()
    }

    pub fn sent(&self) -> Vec<ApiResponse> {
        self.sent.lock().expect("sent lock").clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendGateway for MockGateway {
    async fn run_server(&self, shutdown: CancellationToken) -> Result<(), BackendError> {
        self.server_starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_server.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("couldn't bind to 127.0.0.1:8766".to_owned()));
        }
        shutdown.cancelled().await;
        Ok(())
    }

    async fn register_route(&self, path: &RoutePath) -> Result<(), BackendError> {
        let delay = self.register_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_register.load(Ordering::SeqCst)
            || self.fail_next_register.swap(false, Ordering::SeqCst)
        {
            return Err(BackendError::ServerNotRunning);
        }
        self.routes.lock().expect("routes lock").push(path.clone());
        Ok(())
    }

    async fn fetch_pending_requests(&self) -> Result<Vec<ApiRequest>, BackendError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.batches
            .lock()
            .expect("batches lock")
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn send_response(&self, response: ApiResponse) -> Result<(), BackendError> {
        if self.refuse_send_for.lock().expect("refuse lock").contains(&response.id) {
            return Err(BackendError::Transport(format!("caller for {} went away", response.id)));
        }
        self.sent.lock().expect("sent lock").push(response);
        Ok(())
    }
}
