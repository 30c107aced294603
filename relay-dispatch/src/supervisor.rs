//! Runs long-lived tasks side by side and reports how each one ended.
//!
//! The supervisor observes, it does not recover: a task that fails is
//! reported once and stays down, and its siblings keep running.

use std::any::Any;
use std::fmt;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

/// Which long-lived task a report is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum TaskKind {
    /// The backend's server entry point.
    Server,
    /// The request dispatcher loop.
    Dispatcher,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => write!(f, "server"),
            Self::Dispatcher => write!(f, "dispatcher"),
        }
    }
}

/// How a supervised task ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
#[non_exhaustive]
pub enum TaskOutcome {
    /// Returned `Ok`.
    Completed,
    /// Returned an error.
    Failed(String),
    /// Panicked.
    Panicked(String),
    /// Was aborted through [`TaskSupervisor::abort`], or dropped by the
    /// runtime, before finishing.
    Aborted,
}

impl TaskOutcome {
    /// Return `true` for [`TaskOutcome::Completed`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// A task's termination, as observed by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub struct TaskReport {
    /// The task that ended.
    pub task: TaskKind,
    /// How it ended.
    pub outcome: TaskOutcome,
    /// When the supervisor saw it end.
    pub finished_at: DateTime<Utc>,
}

/// Starts tasks and collects one [`TaskReport`] per task.
///
/// Dropping the supervisor does NOT stop its tasks. Call
/// [`TaskSupervisor::shutdown`] to fire the shared cancellation token, or
/// [`TaskSupervisor::abort`] to stop tasks that do not observe it.
pub struct TaskSupervisor {
    shutdown: CancellationToken,
    reports_tx: mpsc::UnboundedSender<TaskReport>,
    reports_rx: mpsc::UnboundedReceiver<TaskReport>,
    outstanding: usize,
    handles: Vec<(TaskKind, AbortHandle)>,
}

impl TaskSupervisor {
    /// Create a supervisor with a fresh cancellation token.
    #[must_use]
    pub fn new() -> Self {
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        Self {
            shutdown: CancellationToken::new(),
            reports_tx,
            reports_rx,
            outstanding: 0,
            handles: Vec::new(),
        }
    }

    /// Token fired by [`TaskSupervisor::shutdown`]. Tasks should observe it.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawn `future` as the task named `task`.
    ///
    /// Its result is turned into a [`TaskReport`] when it ends, however it
    /// ends. Nothing else happens: no restart, no effect on other tasks.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn spawn<F, E>(&mut self, task: TaskKind, future: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let inner = tokio::spawn(future);
        self.handles.push((task, inner.abort_handle()));
        let reports = self.reports_tx.clone();
        self.outstanding += 1;
        tracing::info!(%task, "task started");

        tokio::spawn(async move {
            let outcome = match inner.await {
                Ok(Ok(())) => TaskOutcome::Completed,
                Ok(Err(e)) => TaskOutcome::Failed(e.to_string()),
                Err(e) if e.is_panic() => TaskOutcome::Panicked(panic_message(&*e.into_panic())),
                Err(_) => TaskOutcome::Aborted,
            };

            match &outcome {
                TaskOutcome::Completed => tracing::info!(%task, "task completed"),
                TaskOutcome::Failed(reason) => tracing::error!(%task, %reason, "task failed"),
                TaskOutcome::Panicked(reason) => tracing::error!(%task, %reason, "task panicked"),
                TaskOutcome::Aborted => tracing::error!(%task, "task aborted"),
            }

            // Receiver is gone if the supervisor was dropped; the event
            // above still records the outcome.
            let _ = reports.send(TaskReport {
                task,
                outcome,
                finished_at: Utc::now(),
            });
        });
    }

    /// Fire the cancellation token shared with every task.
    pub fn shutdown(&self) {
        tracing::info!("shutdown requested");
        self.shutdown.cancel();
    }

    /// Abort every task that is still running. Each one is reported as
    /// [`TaskOutcome::Aborted`] at its next `.await`.
    pub fn abort(&self) {
        for (task, handle) in &self.handles {
            if !handle.is_finished() {
                tracing::warn!(%task, "aborting task");
                handle.abort();
            }
        }
    }

    /// Number of tasks that have not been reported yet.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Wait for the next task to end. Returns `None` once every task has
    /// been reported.
    pub async fn next_report(&mut self) -> Option<TaskReport> {
        if self.outstanding == 0 {
            return None;
        }
        let report = self.reports_rx.recv().await;
        if report.is_some() {
            self.outstanding -= 1;
        }
        report
    }

    /// Wait for every task to end and return their reports in the order
    /// they finished.
    pub async fn wait(mut self) -> Vec<TaskReport> {
        let mut reports = Vec::with_capacity(self.outstanding);
        while let Some(report) = self.next_report().await {
            reports.push(report);
        }
        reports
    }
}

impl Default for TaskSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TaskSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSupervisor")
            .field("outstanding", &self.outstanding)
            .field("cancelled", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Extract the message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
