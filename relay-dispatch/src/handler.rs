//! Application-supplied request handlers.

use std::fmt;

use relay_core::ApiRequest;

/// Error type handlers may return. Any `std::error::Error` converts into it.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Converts a request into a response body.
///
/// Handlers run synchronously on the blocking thread pool, one at a time.
/// They should be fast; a slow handler delays every request behind it.
pub trait Handler: Send + Sync + 'static {
    /// Produce the body of the response to `request`.
    ///
    /// # Errors
    /// Any error is reported against this request only.
    fn handle(&self, request: &ApiRequest) -> Result<Vec<u8>, HandlerError>;
}

/// A [`Handler`] built from a closure. See [`handler_fn`].
#[derive(Clone)]
pub struct FnHandler<F> {
    f: F,
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(&ApiRequest) -> Result<Vec<u8>, HandlerError> + Send + Sync + 'static,
{
    fn handle(&self, request: &ApiRequest) -> Result<Vec<u8>, HandlerError> {
        (self.f)(request)
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

/// Wrap a closure as a [`Handler`].
///
/// ```
/// use relay_dispatch::handler_fn;
///
/// let ping = handler_fn(|_request| Ok(b"pong".to_vec()));
/// # let _ = ping;
/// ```
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&ApiRequest) -> Result<Vec<u8>, HandlerError> + Send + Sync + 'static,
{
    FnHandler { f }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl Handler for Echo {
        fn handle(&self, request: &ApiRequest) -> Result<Vec<u8>, HandlerError> {
            Ok(request.body.clone())
        }
    }

    #[test]
    fn struct_handler_echoes_body() {
        let request = ApiRequest::new("1", "echo", b"hello".to_vec());
        let body = Echo.handle(&request).unwrap_or_else(|e| panic!("echo failed: {e}"));
        assert_eq!(body, b"hello");
    }

    #[test]
    fn closure_handler_can_fail() {
        let handler = handler_fn(|_request| Err("no collection open".into()));
        let request = ApiRequest::new("1", "decks", Vec::<u8>::new());
        let err = match handler.handle(&request) {
            Err(e) => e,
            Ok(body) => panic!("expected failure, got {body:?}"),
        };
        assert_eq!(err.to_string(), "no collection open");
    }
}
