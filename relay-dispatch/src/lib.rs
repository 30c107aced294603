//! Request-dispatch bridge between a backend's pending-request queue and
//! handlers registered by the foreground application.
//!
//! The backend (anything implementing [`BackendGateway`]) accepts external
//! connections and queues requests. This crate registers routes with it,
//! polls its queue, runs the matching handler for each request and hands the
//! result back, tagged with the request's correlation id.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod bridge;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod registry;
pub mod stats;
pub mod supervisor;

#[cfg(test)]
mod mock;

pub use backend::BackendGateway;
pub use bridge::{Bridge, RunningBridge};
pub use config::DispatcherConfig;
pub use dispatcher::{CycleReport, Dispatcher, RequestOutcome};
pub use error::{BackendError, DispatchError, HandlerFailure};
pub use handler::{handler_fn, FnHandler, Handler, HandlerError};
pub use registry::HandlerRegistry;
pub use stats::{DispatchStats, StatsSnapshot};
pub use supervisor::{TaskKind, TaskOutcome, TaskReport, TaskSupervisor};
