/// Errors produced by the `relay-core` crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    /// A route path could not be normalised.
    #[error("invalid route path '{path}': {reason}")]
    InvalidRoutePath { path: String, reason: String },
}
