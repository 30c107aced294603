//! Dispatch counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Running totals kept by a [`Dispatcher`](crate::Dispatcher).
///
/// Every per-request failure increments exactly one failure counter, so
/// failures stay queryable after the log line has scrolled away.
#[derive(Debug, Default)]
pub struct DispatchStats {
    cycles: AtomicU64,
    idle_cycles: AtomicU64,
    fetch_failures: AtomicU64,
    dispatched: AtomicU64,
    unknown_routes: AtomicU64,
    handler_failures: AtomicU64,
    send_failures: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Cycles started, idle ones included.
    pub cycles: u64,
    /// Cycles skipped because no routes were registered.
    pub idle_cycles: u64,
    /// Cycles whose fetch failed.
    pub fetch_failures: u64,
    /// Requests answered successfully.
    pub dispatched: u64,
    /// Requests for paths with no handler.
    pub unknown_routes: u64,
    /// Requests whose handler failed, panicked or timed out.
    pub handler_failures: u64,
    /// Responses the backend refused to take.
    pub send_failures: u64,
}

impl DispatchStats {
    /// Copy the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            idle_cycles: self.idle_cycles.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            unknown_routes: self.unknown_routes.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_idle(&self) {
        self.idle_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unknown_route(&self) {
        self.unknown_routes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_handler_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }
}
