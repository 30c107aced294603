//! Core types for the relay request-dispatch bridge.
//!
//! Defines the records exchanged with the backend (requests, responses and
//! their correlation ids) and the normalised route path used as the
//! registry key.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod id;
pub mod message;

pub use error::CoreError;
pub use id::{RequestId, RoutePath};
pub use message::{ApiRequest, ApiResponse};
