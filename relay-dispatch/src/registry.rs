//! Route table mapping paths to handlers.
//!
//! The registry is the only owner of the path→handler map. Registration
//! also tells the backend to start queuing requests for the path.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use relay_core::RoutePath;

use crate::{BackendGateway, DispatchError, Handler};

type RouteMap = HashMap<RoutePath, Arc<dyn Handler>>;

/// Thread-safe table of registered routes.
///
/// Reads (dispatch) and writes (registration) may happen at any time
/// relative to each other. The route lock is never held across an `.await`
/// or while a handler runs. Registrations are serialised among themselves
/// by a separate async lock held until the backend has answered.
pub struct HandlerRegistry<B: BackendGateway> {
    gateway: Arc<B>,
    routes: Mutex<RouteMap>,
    registration: tokio::sync::Mutex<()>,
}

impl<B: BackendGateway> HandlerRegistry<B> {
    /// Create an empty registry that announces routes to `gateway`.
    #[must_use]
    pub fn new(gateway: Arc<B>) -> Self {
        Self {
            gateway,
            routes: Mutex::new(HashMap::new()),
            registration: tokio::sync::Mutex::new(()),
        }
    }

    /// The backend this registry announces routes to.
    #[must_use]
    pub fn gateway(&self) -> &Arc<B> {
        &self.gateway
    }

    /// Register `handler` for `path` and announce the path to the backend.
    ///
    /// The handler is inserted before the backend is told, so the backend
    /// never queues a request this process cannot serve. If the backend
    /// call fails the insertion is undone.
    ///
    /// Concurrent registrations run one at a time, so a duplicate is only
    /// reported once the earlier registration of the same path has been
    /// confirmed by the backend.
    ///
    /// # Errors
    /// Returns [`DispatchError::InvalidPath`] if `path` cannot be normalised,
    /// [`DispatchError::DuplicateRoute`] if the path already has a handler
    /// (the existing handler is left in place), or
    /// [`DispatchError::Backend`] if the backend rejects the registration.
    ///
    /// # Panics
    /// Panics if the internal `Mutex` is poisoned.
    pub async fn register<H: Handler>(
        &self,
        path: &str,
        handler: H,
    ) -> Result<RoutePath, DispatchError> {
        let route = RoutePath::parse(path)?;
        let handler: Arc<dyn Handler> = Arc::new(handler);
        let _registration = self.registration.lock().await;
        {
            let mut routes = self.routes();
            if routes.contains_key(&route) {
                return Err(DispatchError::DuplicateRoute(route));
            }
            routes.insert(route.clone(), Arc::clone(&handler));
        }

        if let Err(e) = self.gateway.register_route(&route).await {
            tracing::warn!(path = %route, error = %e, "backend rejected route; rolling back");
            let mut routes = self.routes();
            if routes.get(&route).is_some_and(|current| Arc::ptr_eq(current, &handler)) {
                routes.remove(&route);
            }
            return Err(e.into());
        }

        tracing::info!(path = %route, "route registered");
        Ok(route)
    }

    /// Return the handler for a request path.
    ///
    /// # Errors
    /// Returns [`DispatchError::UnknownRoute`] if no handler is registered,
    /// including when the path cannot be normalised at all.
    ///
    /// # Panics
    /// Panics if the internal `Mutex` is poisoned.
    pub fn lookup(&self, path: &str) -> Result<Arc<dyn Handler>, DispatchError> {
        RoutePath::parse(path)
            .ok()
            .and_then(|route| self.routes().get(&route).cloned())
            .ok_or_else(|| DispatchError::UnknownRoute(path.to_owned()))
    }

    /// Remove the handler for `path`. Returns `true` if one was registered.
    ///
    /// The backend is not told; requests it already queued for the path
    /// will be reported as unknown routes.
    ///
    /// # Panics
    /// Panics if the internal `Mutex` is poisoned.
    pub fn deregister(&self, path: &str) -> bool {
        let Ok(route) = RoutePath::parse(path) else {
            return false;
        };
        let removed = self.routes().remove(&route).is_some();
        if removed {
            tracing::info!(path = %route, "route deregistered");
        }
        removed
    }

    /// Return `true` if no routes are registered.
    ///
    /// # Panics
    /// Panics if the internal `Mutex` is poisoned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes().is_empty()
    }

    /// Number of registered routes.
    ///
    /// # Panics
    /// Panics if the internal `Mutex` is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes().len()
    }

    /// Registered paths, sorted.
    ///
    /// # Panics
    /// Panics if the internal `Mutex` is poisoned.
    #[must_use]
    pub fn paths(&self) -> Vec<RoutePath> {
        let mut paths: Vec<RoutePath> = self.routes().keys().cloned().collect();
        paths.sort();
        paths
    }

    #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
    fn routes(&self) -> MutexGuard<'_, RouteMap> {
        self.routes.lock().expect("handler registry lock poisoned")
    }
}

impl<B: BackendGateway> std::fmt::Debug for HandlerRegistry<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("paths", &self.paths())
            .finish_non_exhaustive()
    }
}
